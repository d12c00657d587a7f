//! SQL-flavored reconstruction of the query intent.

use crate::config::{Config, ExplanationDetail};
use crate::ir::{Aggregation, Filter, Query, SortDirection};

use super::filter_phrase;

pub(super) fn render(query: &Query, config: &Config) -> String {
    let mut lines: Vec<String> = Vec::new();

    let mut select_items: Vec<String> = query
        .dimensions
        .iter()
        .map(|d| d.level.name.clone())
        .collect();
    for measure in &query.measures {
        let alias = measure.display_name();
        let item = match measure.aggregation {
            Aggregation::Custom => alias.to_string(),
            Aggregation::DistinctCount => {
                format!("COUNT(DISTINCT {}) AS {alias}", measure.name)
            }
            agg => format!("{}({}) AS {alias}", agg_name(agg), measure.name),
        };
        select_items.push(item);
    }
    if select_items.is_empty() {
        select_items.push("*".to_string());
    }
    lines.push(format!("SELECT {}", select_items.join(", ")));
    lines.push(format!("FROM {}", query.cube.name));

    let where_parts: Vec<String> = query
        .filters
        .iter()
        .filter(|f| matches!(f, Filter::Dimension(_)))
        .map(filter_phrase)
        .collect();
    if !where_parts.is_empty() {
        lines.push(format!("WHERE {}", where_parts.join(" AND ")));
    }

    if !query.dimensions.is_empty() {
        let group_by: Vec<String> = query
            .dimensions
            .iter()
            .map(|d| d.level.name.clone())
            .collect();
        lines.push(format!("GROUP BY {}", group_by.join(", ")));
    }

    let mut having_parts: Vec<String> = Vec::new();
    for filter in &query.filters {
        match filter {
            Filter::Measure(_) => having_parts.push(filter_phrase(filter)),
            Filter::NonEmpty(f) => {
                let measure = f
                    .measure
                    .clone()
                    .or_else(|| query.measures.first().map(|m| m.name.clone()))
                    .unwrap_or_else(|| "result".to_string());
                having_parts.push(format!("{measure} IS NOT NULL"));
            }
            Filter::Dimension(_) => {}
        }
    }
    if !having_parts.is_empty() {
        lines.push(format!("HAVING {}", having_parts.join(" AND ")));
    }

    if !query.order_by.is_empty() {
        let order: Vec<String> = query
            .order_by
            .iter()
            .map(|o| match o.direction {
                SortDirection::Desc => format!("{} DESC", o.column),
                SortDirection::Asc => o.column.clone(),
            })
            .collect();
        lines.push(format!("ORDER BY {}", order.join(", ")));
    }
    if let Some(limit) = query.limit {
        lines.push(format!("LIMIT {}", limit.count));
    }

    if config.explanation.detail != ExplanationDetail::Minimal && !query.calculations.is_empty() {
        lines.push(String::new());
        lines.push("-- calculated measures".to_string());
        for calc in &query.calculations {
            lines.push(format!(
                "--   {} = {}",
                calc.name,
                super::natural::expression_phrase(&calc.expression)
            ));
        }
    }
    if config.explanation.include_dax_comparison {
        lines.push(String::new());
        lines.push("-- DAX equivalent".to_string());
        for line in super::dax_for_embedding(query, config).lines() {
            lines.push(format!("-- {line}"));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn agg_name(agg: Aggregation) -> &'static str {
    match agg {
        Aggregation::Sum => "SUM",
        Aggregation::Avg => "AVG",
        Aggregation::Count => "COUNT",
        Aggregation::Min => "MIN",
        Aggregation::Max => "MAX",
        Aggregation::DistinctCount | Aggregation::Custom => "",
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ExplanationDetail, ExplanationFormat};
    use crate::explain::tests::explain_src;

    #[test]
    fn sql_shape_matches_query_intent() {
        let out = explain_src(
            "SELECT {[Measures].[Sales Amount]} ON 0, {[Product].[Category].Members} ON 1 \
             FROM [Adventure Works] WHERE ([Date].[Calendar Year].&[2023])",
            ExplanationFormat::Sql,
            ExplanationDetail::Standard,
        );
        assert!(out.contains("SELECT Category, SUM(Sales Amount) AS Sales Amount"), "got: {out}");
        assert!(out.contains("FROM Adventure Works"));
        assert!(out.contains("WHERE Calendar Year equals 2023"));
        assert!(out.contains("GROUP BY Category"));
    }

    #[test]
    fn non_empty_becomes_having() {
        let out = explain_src(
            "SELECT NON EMPTY {[Measures].[Sales]} ON 0, \
             {[Product].[Category].Members} ON 1 FROM [C]",
            ExplanationFormat::Sql,
            ExplanationDetail::Standard,
        );
        assert!(out.contains("HAVING Sales IS NOT NULL"), "got: {out}");
    }
}
