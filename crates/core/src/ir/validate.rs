//! Structural IR validation.
//!
//! Run once after lowering and again after the linter (pass 7). Failures
//! become diagnostics and mark the query invalid; downstream stages keep
//! running best-effort over whatever is well-formed. Calculations caught
//! in a dependency cycle are dropped, never silently rewritten.

use std::collections::{BTreeMap, BTreeSet};

use crate::diag::{DiagKind, Diagnostic, DiagnosticBag};
use crate::ir::{Aggregation, MemberSelection, Query};

/// Validate `query` in place. Returns true when no new error was found.
pub fn validate(query: &mut Query, bag: &mut DiagnosticBag) -> bool {
    let mut clean = true;

    // Unique calculation names.
    let mut seen = BTreeSet::new();
    for calc in &query.calculations {
        if !seen.insert(calc.name.clone()) {
            bag.push(Diagnostic::error(
                DiagKind::SemanticError,
                format!("calculation '{}' is defined more than once", calc.name),
                calc.span,
            ));
            clean = false;
        }
    }

    // Acyclic calculation dependency graph.
    let cyclic = find_cycle_participants(query, bag);
    if !cyclic.is_empty() {
        clean = false;
        query.calculations.retain(|c| !cyclic.contains(&c.name));
    }

    // SPECIFIC selections are never empty.
    for dim in &query.dimensions {
        if let MemberSelection::Specific { names } = &dim.members {
            if names.is_empty() {
                bag.push(Diagnostic::error(
                    DiagKind::SemanticError,
                    format!(
                        "dimension '{}'[{}] selects an empty member list",
                        dim.hierarchy.table, dim.level.name
                    ),
                    dim.span,
                ));
                clean = false;
            }
        }
    }

    // A CUSTOM measure always carries its defining expression.
    for measure in &query.measures {
        if measure.aggregation == Aggregation::Custom && measure.expression.is_none() {
            bag.push(Diagnostic::error(
                DiagKind::SemanticError,
                format!(
                    "custom measure '{}' has no defining expression",
                    measure.name
                ),
                measure.span,
            ));
            clean = false;
        }
    }

    // Every measure reference resolves to a projected measure or a
    // calculation.
    for calc in &query.calculations {
        for referenced in calc.expression.measure_refs() {
            if referenced != calc.name && !query.resolves_measure(referenced) {
                bag.push(Diagnostic::error(
                    DiagKind::SemanticError,
                    format!(
                        "calculation '{}' references undefined measure '{}'",
                        calc.name, referenced
                    ),
                    calc.span,
                ));
                clean = false;
            }
        }
    }

    if !clean {
        query.metadata.valid = false;
    }
    clean
}

/// Names of all calculations participating in a dependency cycle. Each
/// cycle is reported once with its path trace in the suggestion field.
fn find_cycle_participants(query: &Query, bag: &mut DiagnosticBag) -> BTreeSet<String> {
    let deps: BTreeMap<&str, Vec<&str>> = query
        .calculations
        .iter()
        .map(|c| {
            let calc_deps: Vec<&str> = c
                .expression
                .measure_refs()
                .into_iter()
                .filter(|name| query.calculation(name).is_some())
                .collect();
            (c.name.as_str(), calc_deps)
        })
        .collect();

    let mut cyclic: BTreeSet<String> = BTreeSet::new();
    let mut reported: BTreeSet<String> = BTreeSet::new();

    for calc in &query.calculations {
        let mut path = Vec::new();
        if let Some(cycle) = walk(calc.name.as_str(), &deps, &mut path) {
            for name in &cycle {
                cyclic.insert((*name).to_string());
            }
            let trace = cycle.join(" -> ");
            if reported.insert(trace.clone()) {
                bag.push(
                    Diagnostic::error(
                        DiagKind::SemanticError,
                        format!("circular calculation reference involving '{}'", cycle[0]),
                        calc.span,
                    )
                    .with_suggestion(format!("dependency cycle: {trace}")),
                );
            }
        }
    }
    cyclic
}

/// DFS returning the first cycle found from `node`, as the path segment
/// that closes on itself (e.g. `["A", "B", "A"]`).
fn walk<'a>(
    node: &'a str,
    deps: &BTreeMap<&'a str, Vec<&'a str>>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<&'a str>> {
    if let Some(at) = path.iter().position(|n| *n == node) {
        let mut cycle: Vec<&str> = path[at..].to_vec();
        cycle.push(node);
        return Some(cycle);
    }
    path.push(node);
    if let Some(children) = deps.get(node) {
        for child in children {
            if let Some(cycle) = walk(child, deps, path) {
                path.pop();
                return Some(cycle);
            }
        }
    }
    path.pop();
    None
}
