//! Explanation emission: sql, natural, json and markdown renderings of a
//! (possibly linted) query.

mod json;
mod markdown;
mod natural;
mod sql;

use crate::config::{Config, ExplanationFormat};
use crate::diag::DiagnosticBag;
use crate::ir::{
    Aggregation, Dimension, DimensionFilterOp, Filter, Measure, MemberSelection, Query,
};

/// Render the configured explanation format.
pub fn explain(query: &Query, config: &Config, bag: &mut DiagnosticBag) -> String {
    match config.explanation.format {
        ExplanationFormat::Sql => sql::render(query, config),
        ExplanationFormat::Natural => natural::render(query, config),
        ExplanationFormat::Json => json::render(query, config, bag),
        ExplanationFormat::Markdown => markdown::render(query, config),
    }
}

// ── Shared phrasing helpers ──────────────────────────────────────────

pub(crate) fn measure_phrase(measure: &Measure) -> String {
    let prefix = match measure.aggregation {
        Aggregation::Sum => "total ",
        Aggregation::Avg => "average ",
        Aggregation::Count => "count of ",
        Aggregation::DistinctCount => "distinct count of ",
        Aggregation::Min => "minimum ",
        Aggregation::Max => "maximum ",
        Aggregation::Custom => "",
    };
    format!("{prefix}{}", measure.display_name())
}

pub(crate) fn dimension_phrase(dim: &Dimension) -> String {
    match &dim.members {
        MemberSelection::All => format!("each {}", dim.level.name),
        MemberSelection::Specific { names } => {
            if names.len() <= 3 {
                format!("{} ({})", dim.level.name, names.join(", "))
            } else {
                format!("{} ({} specific values)", dim.level.name, names.len())
            }
        }
        MemberSelection::Children { parent } => {
            format!("children of {parent} in {}", dim.level.name)
        }
        MemberSelection::Descendants { ancestor, .. } => {
            format!("descendants of {ancestor} at {}", dim.level.name)
        }
        MemberSelection::Range { from, to } => {
            format!("{} from {from} to {to}", dim.level.name)
        }
    }
}

pub(crate) fn filter_phrase(filter: &Filter) -> String {
    match filter {
        Filter::Dimension(f) => {
            let level = &f.dimension.level.name;
            match f.operator {
                DimensionFilterOp::Equals if f.values.len() == 1 => {
                    format!("{level} equals {}", f.values[0])
                }
                DimensionFilterOp::Equals | DimensionFilterOp::In => {
                    format!("{level} is one of ({})", f.values.join(", "))
                }
                DimensionFilterOp::NotEquals if f.values.len() == 1 => {
                    format!("{level} is not {}", f.values[0])
                }
                DimensionFilterOp::NotEquals => {
                    format!("{level} is not in ({})", f.values.join(", "))
                }
                DimensionFilterOp::Contains => {
                    format!(
                        "{level} contains {}",
                        f.values.first().map(String::as_str).unwrap_or_default()
                    )
                }
            }
        }
        Filter::Measure(f) => {
            let op = match f.operator {
                crate::ir::ComparisonOp::Gt => "greater than",
                crate::ir::ComparisonOp::Lt => "less than",
                crate::ir::ComparisonOp::Gte => "at least",
                crate::ir::ComparisonOp::Lte => "at most",
                crate::ir::ComparisonOp::Eq => "equal to",
                crate::ir::ComparisonOp::Neq => "not equal to",
            };
            format!("{} is {op} {}", f.measure, trim_float(f.value))
        }
        Filter::NonEmpty(f) => match &f.measure {
            Some(m) => format!("{m} is not empty"),
            None => "empty results are excluded".to_string(),
        },
    }
}

pub(crate) fn trim_float(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// DAX for embedding into explanations. Emission diagnostics are
/// discarded here; the convert path reports them.
pub(crate) fn dax_for_embedding(query: &Query, config: &Config) -> String {
    let mut scratch = DiagnosticBag::new();
    crate::dax::generate(query, config, &mut scratch)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{Config, ExplanationDetail, ExplanationFormat};

    pub(crate) fn explain_src(
        src: &str,
        format: ExplanationFormat,
        detail: ExplanationDetail,
    ) -> String {
        let mut config = Config::default();
        config.explanation.format = format;
        config.explanation.detail = detail;
        let mut bag = DiagnosticBag::new();
        let out = crate::lexer::lex(src, &mut bag);
        let hints = crate::hints::extract(&out.comments);
        let stmt = crate::parser::parse(&out.tokens, src, true, None, &mut bag).expect("tree");
        let query = crate::lower::lower(&stmt, src, hints, &config, &mut bag);
        explain(&query, &config, &mut bag)
    }

    const QUERY: &str = "SELECT {[Measures].[Sales Amount]} ON 0, \
         {[Product].[Category].Members} ON 1 \
         FROM [Adventure Works] WHERE ([Date].[Calendar Year].&[2023])";

    #[test]
    fn all_formats_produce_output() {
        for format in [
            ExplanationFormat::Sql,
            ExplanationFormat::Natural,
            ExplanationFormat::Json,
            ExplanationFormat::Markdown,
        ] {
            let out = explain_src(QUERY, format, ExplanationDetail::Standard);
            assert!(!out.trim().is_empty(), "{format:?} produced nothing");
        }
    }

    #[test]
    fn phrases_are_stable() {
        let out = explain_src(QUERY, ExplanationFormat::Natural, ExplanationDetail::Standard);
        assert!(out.contains("total Sales Amount"), "got: {out}");
        assert!(out.contains("each Category"), "got: {out}");
        assert!(out.contains("Calendar Year equals 2023"), "got: {out}");
    }
}
