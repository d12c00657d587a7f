//! Sectioned markdown report.

use crate::config::{Config, ExplanationDetail};
use crate::ir::Query;

use super::{dimension_phrase, filter_phrase, measure_phrase, natural};

pub(super) fn render(query: &Query, config: &Config) -> String {
    let mut out = String::new();
    out.push_str("# Query Explanation\n\n");
    out.push_str(&format!("**Source model:** {}\n\n", query.cube.name));

    out.push_str("## Summary\n\n");
    out.push_str(&natural::render(query, &summary_config(config)));
    out.push('\n');

    if !query.measures.is_empty() {
        out.push_str("## Measures\n\n");
        for measure in &query.measures {
            out.push_str(&format!("- {}\n", measure_phrase(measure)));
        }
        out.push('\n');
    }
    if !query.dimensions.is_empty() {
        out.push_str("## Grouping\n\n");
        for dim in &query.dimensions {
            out.push_str(&format!(
                "- {} (`{}`[`{}`])\n",
                dimension_phrase(dim),
                dim.hierarchy.table,
                dim.level.name
            ));
        }
        out.push('\n');
    }
    if !query.filters.is_empty() {
        out.push_str("## Filters\n\n");
        for filter in &query.filters {
            out.push_str(&format!("- {}\n", filter_phrase(filter)));
        }
        out.push('\n');
    }
    if config.explanation.detail != ExplanationDetail::Minimal && !query.calculations.is_empty() {
        out.push_str("## Calculations\n\n");
        for calc in &query.calculations {
            out.push_str(&format!(
                "- **{}** = {}\n",
                calc.name,
                natural::expression_phrase(&calc.expression)
            ));
        }
        out.push('\n');
    }

    if config.explanation.include_dax_comparison {
        out.push_str("## DAX\n\n");
        out.push_str("```dax\n");
        out.push_str(&super::dax_for_embedding(query, config));
        out.push_str("```\n\n");
    }

    if config.explanation.detail == ExplanationDetail::Detailed {
        out.push_str("## Metadata\n\n");
        out.push_str("| Field | Value |\n|---|---|\n");
        out.push_str(&format!("| Valid | {} |\n", query.metadata.valid));
        out.push_str(&format!(
            "| Warnings | {} |\n",
            query.metadata.warnings.len()
        ));
        out.push_str(&format!("| Errors | {} |\n", query.metadata.errors.len()));
        for hint in &query.metadata.hints {
            out.push_str(&format!("| Hint | {} |\n", hint.label()));
        }
    }

    out
}

/// The embedded summary never re-embeds DAX or calculation detail.
fn summary_config(config: &Config) -> Config {
    let mut inner = config.clone();
    inner.explanation.include_dax_comparison = false;
    inner.explanation.detail = ExplanationDetail::Minimal;
    inner
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, ExplanationDetail, ExplanationFormat};
    use crate::diag::DiagnosticBag;

    #[test]
    fn markdown_sections_and_embedded_dax() {
        let src = "SELECT {[Measures].[Sales]} ON 0, {[Product].[Category].Members} ON 1 FROM [C]";
        let mut config = Config::default();
        config.explanation.format = ExplanationFormat::Markdown;
        config.explanation.detail = ExplanationDetail::Detailed;
        config.explanation.include_dax_comparison = true;
        let mut bag = DiagnosticBag::new();
        let out = crate::lexer::lex(src, &mut bag);
        let stmt = crate::parser::parse(&out.tokens, src, true, None, &mut bag).expect("tree");
        let query = crate::lower::lower(&stmt, src, Vec::new(), &config, &mut bag);
        let md = crate::explain::explain(&query, &config, &mut bag);
        assert!(md.starts_with("# Query Explanation"));
        assert!(md.contains("## Measures"));
        assert!(md.contains("## Grouping"));
        assert!(md.contains("```dax\nEVALUATE"));
        assert!(md.contains("## Metadata"));
    }
}
