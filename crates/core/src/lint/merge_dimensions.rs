//! Pass 6: crossjoin optimization.
//!
//! A dimension repeated with the same hierarchy, level and selection
//! groups identical columns; keep one. Crossjoins deeper than the
//! configured limit are reported but not altered -- coalescing across
//! distinct hierarchies would change grouping semantics.

use crate::diag::{DiagKind, Diagnostic};
use crate::ir::Query;

use super::LintCtx;

pub(super) fn run(query: &Query, ctx: &mut LintCtx) -> Query {
    let mut next = query.clone();

    let mut kept: Vec<crate::ir::Dimension> = Vec::with_capacity(next.dimensions.len());
    let mut removed = 0usize;
    for dim in next.dimensions.drain(..) {
        let duplicate = kept.iter().any(|k| {
            k.hierarchy == dim.hierarchy && k.level == dim.level && k.members == dim.members
        });
        if duplicate {
            removed += 1;
            continue;
        }
        kept.push(dim);
    }
    if removed > 0 {
        ctx.bag.push(Diagnostic::warning(
            DiagKind::NormalizationWarning,
            format!("removed {removed} repeated dimension(s) from the crossjoin"),
            next.metadata.source_span,
        ));
    }
    next.dimensions = kept;

    let max_depth = ctx.config.linter.max_crossjoin_depth;
    if max_depth > 0 && next.dimensions.len() > max_depth {
        ctx.bag.push(Diagnostic::warning(
            DiagKind::NormalizationWarning,
            format!(
                "crossjoin spans {} dimensions (configured depth limit {})",
                next.dimensions.len(),
                max_depth
            ),
            next.metadata.source_span,
        ));
    }
    next
}

#[cfg(test)]
mod tests {
    use crate::config::OptimizationLevel;
    use crate::lint::tests::optimize_src;

    #[test]
    fn identical_dimensions_merge() {
        let (q, _) = optimize_src(
            "SELECT {[Measures].[X]} ON 0, \
             CROSSJOIN({[Product].[Category].Members}, {[Product].[Category].Members}) ON 1 FROM [C]",
            OptimizationLevel::Moderate,
        );
        assert_eq!(q.dimensions.len(), 1);
    }

    #[test]
    fn deep_crossjoin_is_reported() {
        let (_, bag) = optimize_src(
            "SELECT {[Measures].[X]} ON 0, \
             CROSSJOIN({[A].[P].Members}, CROSSJOIN({[B].[Q].Members}, \
             CROSSJOIN({[C].[R].Members}, {[D].[S].Members}))) ON 1 FROM [Cube]",
            OptimizationLevel::Moderate,
        );
        assert!(bag
            .iter()
            .any(|d| d.message.contains("depth limit")));
    }
}
