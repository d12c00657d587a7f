//! Aggressive-only pass: inline simple single-use calculations.
//!
//! A calculation referenced exactly once, by exactly one other
//! calculation, and small enough to move without bloating the output is
//! substituted into its referrer and dropped. Calculations that appear in
//! the projection stay: their name is part of the observable result.

use crate::ir::Query;

use super::LintCtx;

/// Expression node-count ceiling for an inlining candidate.
const MAX_INLINE_SIZE: usize = 9;

pub(super) fn run(query: &Query, _ctx: &mut LintCtx) -> Query {
    let mut next = query.clone();

    loop {
        let Some((name, expression)) = find_candidate(&next) else {
            break;
        };
        for calc in &mut next.calculations {
            calc.expression = calc.expression.substitute_measure(&name, &expression);
        }
        // Projected calculations carry a copy of their body on the
        // measure; keep it in lockstep with the rewritten calculation.
        for measure in &mut next.measures {
            if let Some(expr) = &measure.expression {
                measure.expression = Some(expr.substitute_measure(&name, &expression));
            }
        }
        next.calculations.retain(|c| c.name != name);
    }
    next
}

fn find_candidate(query: &Query) -> Option<(String, crate::ir::Expression)> {
    for calc in &query.calculations {
        if calc.expression.size() > MAX_INLINE_SIZE {
            continue;
        }
        // Projected names are observable output columns.
        if query.measures.iter().any(|m| m.name == calc.name) {
            continue;
        }
        let referrers: usize = query
            .calculations
            .iter()
            .filter(|other| other.name != calc.name)
            .map(|other| {
                other
                    .expression
                    .measure_refs()
                    .iter()
                    .filter(|r| **r == calc.name)
                    .count()
            })
            .sum();
        if referrers == 1 {
            return Some((calc.name.clone(), calc.expression.clone()));
        }
    }
    None
}
