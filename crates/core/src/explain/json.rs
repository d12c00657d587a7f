//! Structured JSON explanation.

use serde_json::{json, Value};

use crate::config::{Config, ExplanationDetail};
use crate::diag::DiagnosticBag;
use crate::ir::Query;

pub(super) fn render(query: &Query, config: &Config, bag: &mut DiagnosticBag) -> String {
    let mut root = json!({
        "cube": query.cube,
        "measures": query.measures,
        "dimensions": query.dimensions,
        "filters": query.filters,
        "order_by": query.order_by,
        "limit": query.limit,
    });

    if config.explanation.detail != ExplanationDetail::Minimal {
        root["calculations"] = serde_json::to_value(&query.calculations).unwrap_or(Value::Null);
    }
    if config.explanation.detail == ExplanationDetail::Detailed {
        root["metadata"] = serde_json::to_value(&query.metadata).unwrap_or(Value::Null);
    }
    if config.explanation.include_dax_comparison {
        root["dax"] = Value::String(super::dax_for_embedding(query, config));
    }

    match serde_json::to_string_pretty(&root) {
        Ok(mut s) => {
            s.push('\n');
            s
        }
        Err(e) => {
            bag.push(crate::diag::Diagnostic::error(
                crate::diag::DiagKind::EmitterError,
                format!("failed to serialize explanation: {e}"),
                query.metadata.source_span,
            ));
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ExplanationDetail, ExplanationFormat};
    use crate::explain::tests::explain_src;

    #[test]
    fn json_is_parseable_and_carries_the_model() {
        let out = explain_src(
            "SELECT {[Measures].[Sales Amount]} ON 0, {[Product].[Category].Members} ON 1 \
             FROM [Adventure Works] WHERE ([Date].[Year].&[2023])",
            ExplanationFormat::Json,
            ExplanationDetail::Standard,
        );
        let v: serde_json::Value = serde_json::from_str(&out).expect("valid json");
        assert_eq!(v["cube"]["name"], "Adventure Works");
        assert_eq!(v["measures"][0]["name"], "Sales Amount");
        assert_eq!(v["dimensions"][0]["level"]["name"], "Category");
        assert!(v["filters"][0]["filter"].is_string());
    }

    #[test]
    fn metadata_only_at_detailed() {
        let src = "SELECT {[Measures].[X]} ON 0 FROM [C]";
        let standard = explain_src(src, ExplanationFormat::Json, ExplanationDetail::Standard);
        let v: serde_json::Value = serde_json::from_str(&standard).unwrap();
        assert!(v.get("metadata").is_none());

        let detailed = explain_src(src, ExplanationFormat::Json, ExplanationDetail::Detailed);
        let v: serde_json::Value = serde_json::from_str(&detailed).unwrap();
        assert!(v.get("metadata").is_some());
    }
}
