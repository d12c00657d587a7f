//! Pass 2: hierarchy collapse at IR level.
//!
//! The lowerer collapses redundant levels within one axis; dimensions
//! arriving through crossjoin expansion of separate axes can still
//! enumerate several whole levels of the same table. Keep the deepest
//! known level; among unknown depths the last listed wins.

use crate::diag::{DiagKind, Diagnostic};
use crate::ir::{MemberSelection, Query};

use super::LintCtx;

pub(super) fn run(query: &Query, ctx: &mut LintCtx) -> Query {
    let mut next = query.clone();

    let mut drop: Vec<usize> = Vec::new();
    let mut reported: Vec<String> = Vec::new();
    for (i, dim) in next.dimensions.iter().enumerate() {
        if !matches!(dim.members, MemberSelection::All) {
            continue;
        }
        let table = dim.hierarchy.table.to_ascii_lowercase();
        let group: Vec<usize> = next
            .dimensions
            .iter()
            .enumerate()
            .filter(|(_, d)| {
                d.hierarchy.table.eq_ignore_ascii_case(&dim.hierarchy.table)
                    && matches!(d.members, MemberSelection::All)
            })
            .map(|(j, _)| j)
            .collect();
        if group.len() < 2 {
            continue;
        }
        let keep = *group
            .iter()
            .max_by_key(|&&j| (next.dimensions[j].level.depth.unwrap_or(0), j))
            .expect("non-empty group");
        if i != keep && !drop.contains(&i) {
            drop.push(i);
            if !reported.contains(&table) {
                reported.push(table);
                ctx.bag.push(Diagnostic::warning(
                    DiagKind::RedundantHierarchyLevels,
                    format!(
                        "levels of '{}' are redundant; keeping '{}'",
                        dim.hierarchy.table, next.dimensions[keep].level.name
                    ),
                    dim.span,
                ));
            }
        }
    }

    let mut index = 0;
    next.dimensions.retain(|_| {
        let d = drop.contains(&index);
        index += 1;
        !d
    });
    next
}
