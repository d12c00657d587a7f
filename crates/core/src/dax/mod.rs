//! DAX query emission.
//!
//! Output shape: optional DEFINE section, EVALUATE over a table
//! expression, optional ORDER BY. The table expression nests, inside
//! out: SUMMARIZECOLUMNS (grouping), CALCULATETABLE (filter context),
//! FILTER (non-empty), TOPN (limit). Emission is best-effort: problems
//! become diagnostics, the returned text is whatever could be produced.

mod expr;
mod format;

use tracing::debug;

use crate::config::Config;
use crate::diag::{DiagKind, Diagnostic, DiagnosticBag};
use crate::ir::{
    Calculation, Dimension, DimensionFilterOp, Filter, LimitDirection, MemberSelection, Query,
    SortDirection,
};

pub(crate) use expr::ExprCtx;

/// Render `query` to DAX text. Always newline-terminated, no trailing
/// whitespace on any line.
pub fn generate(query: &Query, config: &Config, bag: &mut DiagnosticBag) -> String {
    let mut sections: Vec<String> = Vec::new();

    if !query.calculations.is_empty() {
        sections.push(define_section(query, config, bag));
    }

    sections.push("EVALUATE".to_string());
    sections.push(table_expression(query, config, bag));

    if !query.order_by.is_empty() {
        let parts: Vec<String> = query
            .order_by
            .iter()
            .map(|o| {
                let column = order_column(query, &o.column, config);
                match o.direction {
                    SortDirection::Desc => format!("{column} DESC"),
                    SortDirection::Asc => column,
                }
            })
            .collect();
        sections.push(format!("ORDER BY {}", parts.join(", ")));
    }

    debug!(bytes = sections.iter().map(String::len).sum::<usize>(), "generated DAX");
    let mut out = sections.join("\n");
    out.push('\n');
    out
}

// ── DEFINE ───────────────────────────────────────────────────────────

fn define_section(query: &Query, config: &Config, bag: &mut DiagnosticBag) -> String {
    bag.push(Diagnostic::info(
        DiagKind::CalculationTableAssumption,
        format!(
            "calculated measures are defined against the cube table '{}'",
            query.cube.name
        ),
        query.metadata.source_span,
    ));

    let mut ordered: Vec<&Calculation> = query.calculations.iter().collect();
    ordered.sort_by_key(|c| c.solve_order.unwrap_or(0));

    let pad = " ".repeat(config.dax.indent_size);
    let table = format::table(&query.cube.name, &config.dax);
    let mut lines = vec!["DEFINE".to_string()];
    for calc in ordered {
        let mut ctx = ExprCtx {
            config: &config.dax,
            bag: &mut *bag,
            span: calc.span,
        };
        let body = expr::render(&calc.expression, &mut ctx);
        let mut line = format!("{pad}MEASURE {table}[{}] = {body}", calc.name);
        if let Some(fs) = &calc.format_string {
            line.push_str(&format!(" FORMAT_STRING = {}", format::string_literal(fs)));
        }
        lines.push(line);
    }
    lines.join("\n")
}

// ── Table expression ─────────────────────────────────────────────────

fn table_expression(query: &Query, config: &Config, bag: &mut DiagnosticBag) -> String {
    let dax = &config.dax;

    if query.dimensions.is_empty() {
        return measure_only_expression(query, config, bag);
    }

    // Collect CALCULATETABLE filter arguments: member selections first,
    // then WHERE-derived filters, in source order.
    let mut filter_args: Vec<String> = Vec::new();
    for dim in &query.dimensions {
        selection_predicates(dim, config, bag, &mut filter_args);
    }
    let mut non_empty_measure: Option<String> = None;
    for filter in &query.filters {
        match filter {
            Filter::Dimension(f) => {
                let column = format::column(
                    &f.dimension.hierarchy.table,
                    &f.dimension.level.name,
                    dax,
                );
                filter_args.push(dimension_predicate(&column, f.operator, &f.values, dax));
            }
            Filter::Measure(f) => {
                filter_args.push(format!(
                    "{} {} {}",
                    format::measure(&f.measure),
                    f.operator.as_str(),
                    format::number(f.value)
                ));
            }
            Filter::NonEmpty(f) => {
                if non_empty_measure.is_none() {
                    let name = f
                        .measure
                        .clone()
                        .or_else(|| query.measures.first().map(|m| m.name.clone()));
                    match name {
                        Some(name) => non_empty_measure = Some(name),
                        None => bag.push(Diagnostic::warning(
                            DiagKind::EmitterError,
                            "NON EMPTY with no measures in the projection; filter skipped",
                            query.metadata.source_span,
                        )),
                    }
                }
            }
        }
    }

    let has_filters = !filter_args.is_empty();
    let has_non_empty = non_empty_measure.is_some();
    let has_limit = query.limit.is_some();
    let depth = usize::from(has_filters) + usize::from(has_non_empty) + usize::from(has_limit);

    let mut table = grouping_expression(query, depth, config);
    let mut depth = depth;

    if has_filters {
        depth -= 1;
        let mut args = vec![table];
        args.extend(filter_args);
        table = format::call_layout("CALCULATETABLE", &args, depth, dax);
    }
    if let Some(measure) = non_empty_measure {
        depth -= 1;
        let predicate = format!("{} <> BLANK()", format::measure(&measure));
        table = format::call_layout("FILTER", &[table, predicate], depth, dax);
    }
    if let Some(limit) = query.limit {
        depth -= 1;
        let mut args = vec![limit.count.to_string(), table];
        if let Some(order) = query.order_by.first() {
            args.push(format::measure(&order.column));
            args.push(
                if limit.direction == LimitDirection::Bottom {
                    "1"
                } else {
                    "0"
                }
                .to_string(),
            );
        }
        table = format::call_layout("TOPN", &args, depth, dax);
    }
    table
}

fn measure_only_expression(query: &Query, config: &Config, bag: &mut DiagnosticBag) -> String {
    if query.measures.is_empty() {
        bag.push(Diagnostic::warning(
            DiagKind::EmitterError,
            "query projects neither measures nor dimensions",
            query.metadata.source_span,
        ));
        return "ROW(\"Value\", BLANK())".to_string();
    }
    let items: Vec<String> = query
        .measures
        .iter()
        .map(|m| format::measure(&m.name))
        .collect();
    let row = format::row_constructor(&items, &config.dax);
    match query.limit {
        Some(limit) => format::call_layout("TOPN", &[limit.count.to_string(), row], 0, &config.dax),
        None => row,
    }
}

/// The grouping core: SUMMARIZECOLUMNS, or SUMMARIZE over the cube table
/// when SUMMARIZECOLUMNS is configured off.
fn grouping_expression(query: &Query, depth: usize, config: &Config) -> String {
    let dax = &config.dax;
    let mut args: Vec<String> = Vec::new();

    if !dax.use_summarizecolumns {
        args.push(format::table(&query.cube.name, dax));
    }
    for dim in &query.dimensions {
        args.push(format::column(
            &dim.hierarchy.table,
            &dim.level.name,
            dax,
        ));
    }
    for measure in &query.measures {
        let reference = format::measure(&measure.name);
        let value = if dax.use_summarizecolumns {
            reference
        } else {
            format!("CALCULATE({reference})")
        };
        args.push(format!(
            "{}, {}",
            format::string_literal(measure.display_name()),
            value
        ));
    }

    let name = if dax.use_summarizecolumns {
        "SUMMARIZECOLUMNS"
    } else {
        "SUMMARIZE"
    };
    format::call_layout(name, &args, depth, dax)
}

/// Predicates realizing a dimension's member selection.
fn selection_predicates(
    dim: &Dimension,
    config: &Config,
    bag: &mut DiagnosticBag,
    out: &mut Vec<String>,
) {
    let dax = &config.dax;
    let column = format::column(&dim.hierarchy.table, &dim.level.name, dax);
    match &dim.members {
        MemberSelection::All => {}
        MemberSelection::Specific { names } => {
            out.push(dimension_predicate(
                &column,
                DimensionFilterOp::In,
                names,
                dax,
            ));
        }
        MemberSelection::Children { parent } => {
            bag.push(Diagnostic::warning(
                DiagKind::UnsupportedConstruct,
                format!(
                    "CHILDREN of '{parent}' approximated by filtering the level to its parent"
                ),
                dim.span,
            ));
            out.push(format!("{column} = {}", format::scalar_literal(parent)));
        }
        MemberSelection::Descendants { ancestor, .. } => {
            bag.push(Diagnostic::warning(
                DiagKind::UnsupportedConstruct,
                format!(
                    "DESCENDANTS of '{ancestor}' grouped at the leaf level without the \
                     ancestor constraint"
                ),
                dim.span,
            ));
        }
        MemberSelection::Range { from, to } => {
            out.push(format!("{column} >= {}", format::scalar_literal(from)));
            out.push(format!("{column} <= {}", format::scalar_literal(to)));
        }
    }
}

fn dimension_predicate(
    column: &str,
    operator: DimensionFilterOp,
    values: &[String],
    dax: &crate::config::DaxConfig,
) -> String {
    let literals: Vec<String> = values.iter().map(|v| format::scalar_literal(v)).collect();
    match operator {
        DimensionFilterOp::Equals if literals.len() == 1 => {
            format!("{column} = {}", literals[0])
        }
        DimensionFilterOp::In | DimensionFilterOp::Equals => {
            format!("{column} IN {}", format::value_set(&literals, dax))
        }
        DimensionFilterOp::NotEquals if literals.len() == 1 => {
            format!("{column} <> {}", literals[0])
        }
        DimensionFilterOp::NotEquals => {
            format!("NOT({column} IN {})", format::value_set(&literals, dax))
        }
        DimensionFilterOp::Contains => {
            let needle = values.first().map(String::as_str).unwrap_or_default();
            format!(
                "SEARCH({}, {column}, 1, 0) > 0",
                format::string_literal(needle)
            )
        }
    }
}

/// ORDER BY columns: a projected dimension level renders as its column,
/// anything else as a measure reference.
fn order_column(query: &Query, name: &str, config: &Config) -> String {
    for dim in &query.dimensions {
        if dim.level.name.eq_ignore_ascii_case(name) {
            return format::column(&dim.hierarchy.table, &dim.level.name, &config.dax);
        }
    }
    format::measure(name)
}
