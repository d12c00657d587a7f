//! Pass 4: filter pruning.
//!
//! Drops a NonEmptyFilter that has nothing to observe (no projected
//! measures) and merges filters that are exact duplicates.

use crate::diag::{DiagKind, Diagnostic};
use crate::ir::{Filter, Query};

use super::LintCtx;

pub(super) fn run(query: &Query, ctx: &mut LintCtx) -> Query {
    let mut next = query.clone();

    let no_measures = next.measures.is_empty();
    let before = next.filters.len();
    next.filters.retain(|f| {
        !(no_measures && matches!(f, Filter::NonEmpty(n) if n.measure.is_none()))
    });
    if next.filters.len() < before {
        ctx.bag.push(Diagnostic::warning(
            DiagKind::NormalizationWarning,
            "NON EMPTY has no measures to observe; filter removed",
            next.metadata.source_span,
        ));
    }

    // Identical filters collapse to the first occurrence.
    let mut kept: Vec<Filter> = Vec::with_capacity(next.filters.len());
    let mut merged = 0usize;
    for filter in next.filters.drain(..) {
        if kept.contains(&filter) {
            merged += 1;
            continue;
        }
        kept.push(filter);
    }
    if merged > 0 {
        ctx.bag.push(Diagnostic::warning(
            DiagKind::NormalizationWarning,
            format!("merged {merged} duplicate filter(s)"),
            next.metadata.source_span,
        ));
    }
    next.filters = kept;
    next
}

#[cfg(test)]
mod tests {
    use crate::config::OptimizationLevel;
    use crate::ir::Filter;
    use crate::lint::tests::optimize_src;

    #[test]
    fn duplicate_slicer_filters_merge() {
        let (q, _) = optimize_src(
            "SELECT {[Measures].[X]} ON 0 FROM [C] \
             WHERE ([Date].[Year].&[2023], [Date].[Year].&[2023])",
            OptimizationLevel::Conservative,
        );
        let dims = q
            .filters
            .iter()
            .filter(|f| matches!(f, Filter::Dimension(_)))
            .count();
        assert_eq!(dims, 1);
    }

    #[test]
    fn non_empty_without_measures_is_dropped() {
        let (q, _) = optimize_src(
            "SELECT NON EMPTY {[Product].[Category].Members} ON 0 FROM [C]",
            OptimizationLevel::Conservative,
        );
        assert!(q
            .filters
            .iter()
            .all(|f| !matches!(f, Filter::NonEmpty(_))));
    }
}
