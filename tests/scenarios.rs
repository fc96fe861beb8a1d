use std::collections::HashSet;

use proptest::prelude::*;
use taxon_align::core::candidates::{Reach, candidates};
use taxon_align::core::criteria::{Criterion, Scope};
use taxon_align::{
    AlignConfig, Alignment, Node, NodeId, QualifiedId, Rank, Score, Strategy, Synonym, Taxonomy, align,
};

const BOTH: [Strategy; 2] = [Strategy::Group, Strategy::Cascade];

fn run(source: &mut Taxonomy, union: &mut Taxonomy, strategy: Strategy) -> Alignment {
    align(source, union, &AlignConfig::default().with_strategy(strategy))
}

///scenario 1: one union node carries the source node's name
#[test]
fn unique_primary_match_is_confirmed() {
    for strategy in BOTH {
        let mut s = Taxonomy::new("src");
        let felidae = s.add_node(Node::new("Felidae", None)).unwrap();
        let mut u = Taxonomy::new("union");
        let carnivora = u.add_node(Node::new("Carnivora", None)).unwrap();
        let ufelidae = u.add_node(Node::new("Felidae", Some(carnivora))).unwrap();

        let al = run(&mut s, &mut u, strategy);
        assert_eq!(al.mapping_of(felidae), Some(ufelidae), "{strategy:?}");
        assert_eq!(al.decision_of(felidae).unwrap().reason, "confirmed");
        assert_eq!(al.mapping_of(felidae).and_then(|u| al.comapping_of(u)), Some(felidae));
    }
}

///scenario 2: source primary name is a union synonym
#[test]
fn synonym_reach_is_confirmed() {
    for strategy in BOTH {
        let mut s = Taxonomy::new("src");
        let cats = s.add_node(Node::new("Cats", None)).unwrap();
        let mut u = Taxonomy::new("union");
        let felidae = u
            .add_node(Node::new("Felidae", None).with_synonym(Synonym::new("Cats", "common name")))
            .unwrap();

        let found = candidates(&s, &u, cats);
        assert_eq!(found.len(), 1);
        assert!(found[&felidae].has(Reach::Synonym));
        assert_eq!(found[&felidae].to_string(), "S");

        let al = run(&mut s, &mut u, strategy);
        assert_eq!(al.mapping_of(cats), Some(felidae), "{strategy:?}");
        assert_eq!(al.decision_of(cats).unwrap().reason, "confirmed");
    }
}

///scenario 3: two source homonyms, one union node, nothing tells them apart
#[test]
fn unresolved_homonym_is_not_committed() {
    let mut s = Taxonomy::new("src");
    let metazoa = s.add_node(Node::new("Metazoa", None)).unwrap();
    let mammals = s.add_node(Node::new("Mammalia", Some(metazoa))).unwrap();
    let birds = s.add_node(Node::new("Aves", Some(metazoa))).unwrap();
    let monkey = s.add_node(Node::new("Aotus", Some(mammals)).with_rank(Rank::Genus)).unwrap();
    let bird = s.add_node(Node::new("Aotus", Some(birds)).with_rank(Rank::Genus)).unwrap();

    let mut u = Taxonomy::new("union");
    let umetazoa = u.add_node(Node::new("Metazoa", None)).unwrap();
    let primates = u.add_node(Node::new("Primates", Some(umetazoa))).unwrap();
    let uaotus = u.add_node(Node::new("Aotus", Some(primates)).with_rank(Rank::Genus)).unwrap();

    let al = run(&mut s, &mut u, Strategy::Group);
    assert_eq!(al.mapping_of(metazoa), Some(umetazoa));
    assert_eq!(al.mapping_of(monkey), None);
    assert_eq!(al.mapping_of(bird), None);
    assert_eq!(al.comapping_of(uaotus), None);
    for node in [monkey, bird] {
        let d = al.decision_of(node).unwrap();
        assert_eq!(d.reason, "unresolved/ambiguous");
        assert!(d.score < Score::WeakYes);
    }
    assert_eq!(al.decision_of(monkey).unwrap().evidence.as_deref(), Some("src#4"));
}

///scenario 4: same name, incompatible ranks
#[test]
fn rank_mismatch_blocks() {
    let mut s = Taxonomy::new("src");
    let p = s.add_node(Node::new("Pinaceae", None).with_rank(Rank::Genus)).unwrap();
    let mut u = Taxonomy::new("union");
    let up = u.add_node(Node::new("Pinaceae", None).with_rank(Rank::Family)).unwrap();

    let al = run(&mut s, &mut u, Strategy::Group);
    assert_eq!(al.mapping_of(p), None);
    assert_eq!(al.comapping_of(up), None);
    let d = al.decision_of(p).unwrap();
    assert_eq!(d.reason, "unresolved/blocked");
    assert!(d.evidence.as_deref().unwrap().contains("not-same/rank(genus vs family)"));

    let mut s2 = s.clone();
    let mut u2 = u.clone();
    let al = run(&mut s2, &mut u2, Strategy::Cascade);
    assert_eq!(al.mapping_of(p), None);
    let d = al.decision_of(p).unwrap();
    assert_eq!(d.reason, "rejected");
    assert_eq!(d.evidence.as_deref(), Some("not-same/rank(genus vs family)"));
}

///scenario 5: two source nodes lumped into one union node
#[test]
fn lumping_names_the_winner() {
    let build = || {
        let mut s = Taxonomy::new("src");
        let winner = s
            .add_node(Node::new("Bacteria", None).with_source_id(QualifiedId::new("ncbi", "2")))
            .unwrap();
        let loser = s
            .add_node(Node::new("Bacteria ", None).with_source_id(QualifiedId::new("gbif", "3")))
            .unwrap();
        let mut u = Taxonomy::new("union");
        let ubac = u
            .add_node(Node::new("Bacteria", None).with_source_id(QualifiedId::new("ncbi", "2")))
            .unwrap();
        (s, u, winner, loser, ubac)
    };

    let (mut s, mut u, winner, loser, ubac) = build();
    let al = run(&mut s, &mut u, Strategy::Group);
    assert_eq!(al.mapping_of(winner), Some(ubac));
    assert_eq!(al.decision_of(winner).unwrap().evidence.as_deref(), Some("same/source-id"));
    assert_eq!(al.mapping_of(loser), None);
    let d = al.decision_of(loser).unwrap();
    assert_eq!(d.reason, "unresolved/lumping");
    assert_eq!(d.evidence.as_deref(), Some("ncbi:2"));

    let (mut s, mut u, winner, loser, ubac) = build();
    let al = run(&mut s, &mut u, Strategy::Cascade);
    assert_eq!(al.mapping_of(winner), Some(ubac));
    assert_eq!(al.mapping_of(loser), None);
    assert_eq!(al.decision_of(loser).unwrap().evidence.as_deref(), Some("ncbi:2"));
}

#[test]
fn veto_beats_later_strong_evidence() {
    for strategy in BOTH {
        let mut s = Taxonomy::new("src");
        let p = s
            .add_node(
                Node::new("Pinus", None)
                    .with_rank(Rank::Genus)
                    .with_source_id(QualifiedId::new("ncbi", "3337")),
            )
            .unwrap();
        let mut u = Taxonomy::new("union");
        u.add_node(
            Node::new("Pinus", None)
                .with_rank(Rank::Family)
                .with_source_id(QualifiedId::new("ncbi", "3337")),
        )
        .unwrap();

        let al = run(&mut s, &mut u, strategy);
        assert_eq!(al.mapping_of(p), None, "{strategy:?}");
        assert!(al.decision_of(p).unwrap().score.is_veto());
    }
}

#[test]
fn log_keeps_vetoes_and_decisions() {
    let mut s = Taxonomy::new("src");
    let p = s.add_node(Node::new("Pinaceae", None).with_rank(Rank::Genus)).unwrap();
    let mut u = Taxonomy::new("union");
    u.add_node(Node::new("Pinaceae", None).with_rank(Rank::Family)).unwrap();

    let al = run(&mut s, &mut u, Strategy::Group);
    let reasons: Vec<&str> = al
        .log()
        .iter()
        .filter(|a| a.subject == p)
        .map(|a| a.reason.as_str())
        .collect();
    assert_eq!(reasons, vec!["not-same/rank", "unresolved/blocked"]);
}

const NAMES: [&str; 6] = ["Aotus", "Felis", "Cats", "Bacteria", "Pinus", "Metazoa"];

fn random_tree(tag: &str, spec: &[(prop::sample::Index, u8, u8)]) -> Taxonomy {
    let mut t = Taxonomy::new(tag);
    for (i, (parent, name, extra)) in spec.iter().enumerate() {
        let pick = parent.index(i + 1);
        let parent = (pick < i).then_some(pick as NodeId);
        let rank = match extra % 4 {
            0 => Rank::Genus,
            1 => Rank::Family,
            _ => Rank::NoRank,
        };
        let mut node = Node::new(NAMES[*name as usize % NAMES.len()], parent).with_rank(rank);
        if extra % 5 == 0 {
            node = node.with_source_id(QualifiedId::new("ncbi", (extra % 3).to_string()));
        }
        if extra % 7 == 0 {
            node = node.with_synonym(Synonym::new(NAMES[(*name as usize + 2) % NAMES.len()], "synonym"));
        }
        t.add_node(node).unwrap();
    }
    t
}

fn tree_spec() -> impl prop::strategy::Strategy<Value = Vec<(prop::sample::Index, u8, u8)>> {
    prop::collection::vec((any::<prop::sample::Index>(), any::<u8>(), any::<u8>()), 1..25)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn runs_are_injective_total_and_deterministic(source in tree_spec(), union in tree_spec(), cascade in any::<bool>()) {
        let strategy = if cascade { Strategy::Cascade } else { Strategy::Group };
        let config = AlignConfig::default().with_strategy(strategy);
        let mut s = random_tree("src", &source);
        let mut u = random_tree("union", &union);

        let first = align(&mut s, &mut u, &config);
        let second = align(&mut s, &mut u, &config);

        // totality
        prop_assert_eq!(first.decisions().count(), s.len());

        // injectivity
        let mut claimed = HashSet::new();
        for node in 0..s.len() as NodeId {
            if let Some(unode) = first.mapping_of(node) {
                prop_assert!(claimed.insert(unode));
                prop_assert_eq!(first.comapping_of(unode), Some(node));
            }
        }

        // determinism
        let a: Vec<_> = first.decisions().map(|(n, d)| (n, d.clone())).collect();
        let b: Vec<_> = second.decisions().map(|(n, d)| (n, d.clone())).collect();
        prop_assert_eq!(a, b);

        // division and rank run first, so a pair they veto is never committed
        let scope = Scope::new(&s, &u, &config);
        for node in 0..s.len() as NodeId {
            if let Some(unode) = first.mapping_of(node) {
                for criterion in [Criterion::Division, Criterion::Rank] {
                    prop_assert!(!criterion.assess(&scope, &first, node, unode).score.is_veto());
                }
            }
        }
    }
}
