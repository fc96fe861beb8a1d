/*
Inputs:

    source taxonomy (the one being aligned)

    union taxonomy (the one being aligned against)

    AlignConfig (strategy, divisions, thresholds)

Outputs:

    Alignment: mapped / comapped pointers, one decision per source node,
    lub per source node, decision log, run statistics

Steps:

    mark divisions in both trees

    number the union tree and bracket the source tree

    match (group or cascade), then give every leftover node a decision

    lift every source subtree into the union tree
*/
use tracing::info;

use crate::core::alignment::Alignment;
use crate::core::cascade::align_by_cascade;
use crate::core::criteria::Scope;
use crate::core::group::align_by_groups;
use crate::core::taxonomy::Taxonomy;
use crate::mapping::config::{AlignConfig, Strategy};

/// Align `source` against `union`. Always completes; failures show up as decision reasons.
pub fn align(source: &mut Taxonomy, union: &mut Taxonomy, config: &AlignConfig) -> Alignment {
    source.mark_divisions(&config.divisions);
    union.mark_divisions(&config.divisions);
    let mut alignment = Alignment::new(source, union);
    realign(&mut alignment, source, union, config);
    alignment
}

/// Rerun from scratch into an existing alignment, e.g. after the union tree changed.
pub fn realign(alignment: &mut Alignment, source: &Taxonomy, union: &Taxonomy, config: &AlignConfig) {
    alignment.reset(source, union);
    info!(
        source = source.tag(),
        union = union.tag(),
        strategy = ?config.strategy,
        source_nodes = source.len(),
        union_nodes = union.len(),
        "aligning"
    );

    let scope = Scope::new(source, union, config);
    match config.strategy {
        Strategy::Group => align_by_groups(&scope, alignment),
        Strategy::Cascade => align_by_cascade(&scope, alignment),
    }
    alignment.finalize_decisions(source);
    alignment.compute_lubs(source, union);

    let stats = alignment.stats();
    info!(
        mapped = alignment.mapped_count(),
        names_in_common = stats.names_in_common,
        refused_commits = stats.refused_commits,
        bad_alignments = stats.bad_alignments,
        internal_warnings = stats.internal_warnings,
        "alignment done"
    );
}
