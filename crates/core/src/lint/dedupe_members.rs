//! Pass 3: order-insensitive member deduplication inside SPECIFIC
//! selections, first occurrence preserved.

use crate::diag::{DiagKind, Diagnostic};
use crate::ir::{MemberSelection, Query};

use super::LintCtx;

pub(super) fn run(query: &Query, ctx: &mut LintCtx) -> Query {
    let mut next = query.clone();
    for dim in &mut next.dimensions {
        if let MemberSelection::Specific { names } = &mut dim.members {
            let before = names.len();
            let mut seen: Vec<String> = Vec::with_capacity(names.len());
            names.retain(|n| {
                if seen.contains(n) {
                    false
                } else {
                    seen.push(n.clone());
                    true
                }
            });
            if names.len() < before {
                ctx.bag.push(Diagnostic::warning(
                    DiagKind::DuplicateMembers,
                    format!(
                        "removed {} duplicate member(s) from '{}'[{}]",
                        before - names.len(),
                        dim.hierarchy.table,
                        dim.level.name
                    ),
                    dim.span,
                ));
            }
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use crate::config::OptimizationLevel;
    use crate::diag::DiagKind;
    use crate::ir::MemberSelection;
    use crate::lint::tests::optimize_src;

    #[test]
    fn non_consecutive_duplicates_are_removed() {
        let (q, bag) = optimize_src(
            "SELECT {[Measures].[X]} ON 0, \
             {[Product].[Category].[Bikes], [Product].[Category].[Accessories], \
              [Product].[Category].[Bikes]} ON 1 FROM [C]",
            OptimizationLevel::Conservative,
        );
        assert_eq!(
            q.dimensions[0].members,
            MemberSelection::Specific {
                names: vec!["Bikes".to_string(), "Accessories".to_string()]
            }
        );
        assert!(bag.iter().any(|d| d.kind == DiagKind::DuplicateMembers));
    }
}
