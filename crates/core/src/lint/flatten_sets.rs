//! Pass 1: structural cleanup left over from lowering.
//!
//! The lowerer already flattens parse-level sets; this pass guarantees no
//! degenerate structures survive paths the lowerer did not visit: empty
//! member names inside SPECIFIC selections and dimensions whose selection
//! carries no information at all.

use crate::diag::DiagKind;
use crate::ir::{MemberSelection, Query};

use super::LintCtx;

pub(super) fn run(query: &Query, ctx: &mut LintCtx) -> Query {
    let mut next = query.clone();
    for dim in &mut next.dimensions {
        if let MemberSelection::Specific { names } = &mut dim.members {
            let before = names.len();
            names.retain(|n| !n.trim().is_empty());
            if names.len() < before {
                ctx.bag.push(crate::diag::Diagnostic::warning(
                    DiagKind::NormalizationWarning,
                    format!(
                        "dropped {} empty member name(s) from '{}'[{}]",
                        before - names.len(),
                        dim.hierarchy.table,
                        dim.level.name
                    ),
                    dim.span,
                ));
            }
        }
    }
    // A SPECIFIC selection emptied by the cleanup carries nothing; drop
    // the dimension with a warning rather than failing validation later.
    next.dimensions.retain(|dim| {
        let empty =
            matches!(&dim.members, MemberSelection::Specific { names } if names.is_empty());
        if empty {
            ctx.bag.push(crate::diag::Diagnostic::warning(
                DiagKind::NormalizationWarning,
                format!(
                    "dimension '{}'[{}] had no members left and was removed",
                    dim.hierarchy.table, dim.level.name
                ),
                dim.span,
            ));
        }
        !empty
    });
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::diag::DiagnosticBag;
    use crate::ir::{CubeReference, Dimension, HierarchyReference, LevelReference};
    use crate::lexer::Span;

    fn dim(names: Vec<&str>) -> Dimension {
        Dimension {
            hierarchy: HierarchyReference {
                table: "Product".to_string(),
                hierarchy: "Category".to_string(),
            },
            level: LevelReference::named("Category"),
            members: MemberSelection::Specific {
                names: names.into_iter().map(String::from).collect(),
            },
            span: Span::default(),
        }
    }

    #[test]
    fn empty_names_are_dropped_and_empty_dimension_removed() {
        let mut q = Query::new(CubeReference {
            name: "C".to_string(),
            database: None,
        });
        q.dimensions.push(dim(vec!["Bikes", "", "  "]));
        q.dimensions.push(dim(vec![""]));
        let config = Config::default();
        let mut bag = DiagnosticBag::new();
        let mut ctx = LintCtx {
            config: &config,
            bag: &mut bag,
        };
        let out = run(&q, &mut ctx);
        assert_eq!(out.dimensions.len(), 1);
        assert_eq!(
            out.dimensions[0].members,
            MemberSelection::Specific {
                names: vec!["Bikes".to_string()]
            }
        );
    }
}
