//! Public pipeline API.
//!
//! Thin orchestrator over the stages: lex+parse -> lower -> lint ->
//! emit. Each entry point takes a [`Config`] and returns its output
//! together with the diagnostics it produced; nothing here panics on
//! user input.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::Config;
use crate::diag::{DiagKind, Diagnostic, DiagnosticBag, Severity};
use crate::ir::{CubeReference, Query};
use crate::{dax, explain, hints, lexer, lint, lower, parser};

/// Wall-clock spent per stage, milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct StageTimings {
    pub parse_ms: f64,
    pub lint_ms: f64,
    pub generate_ms: f64,
    pub total_ms: f64,
}

/// Output of [`parse_mdx`]: the lowered IR plus everything diagnosed on
/// the way. The query is always present; a hopeless input yields an
/// empty, invalid one.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub query: Query,
    pub diagnostics: Vec<Diagnostic>,
}

/// Output of the full conversion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    pub dax: String,
    pub query: Query,
    pub diagnostics: Vec<Diagnostic>,
    pub timings: StageTimings,
    /// Hex sha-256 of the input text.
    pub query_hash: String,
    /// Stage-by-stage IR snapshots, present under `global.debug`.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub debug_snapshots: Vec<DebugSnapshot>,
}

impl ConversionResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugSnapshot {
    pub stage: String,
    pub content: serde_json::Value,
}

/// Parse MDX text and lower it to IR.
pub fn parse_mdx(text: &str, config: &Config) -> ParseOutcome {
    let mut bag = DiagnosticBag::with_max_errors(config.parser.max_parse_errors);
    let query = parse_into(text, config, &mut bag);
    finish(query, bag)
}

/// Run the linter over an existing IR.
pub fn optimize_ir(query: &Query, config: &Config) -> (Query, Vec<Diagnostic>) {
    let mut bag = DiagnosticBag::new();
    let optimized = lint::optimize(query, config, &mut bag);
    let outcome = finish(optimized, bag);
    (outcome.query, outcome.diagnostics)
}

/// Render IR to DAX text.
pub fn generate_dax(query: &Query, config: &Config) -> (String, Vec<Diagnostic>) {
    let mut bag = DiagnosticBag::new();
    let text = dax::generate(query, config, &mut bag);
    (text, bag.into_vec())
}

/// Render IR to the configured explanation format.
pub fn explain_ir(query: &Query, config: &Config) -> (String, Vec<Diagnostic>) {
    let mut bag = DiagnosticBag::new();
    let text = explain::explain(query, config, &mut bag);
    (text, bag.into_vec())
}

/// Full pipeline: parse -> optimize -> generate.
pub fn mdx_to_dax(text: &str, config: &Config) -> ConversionResult {
    let total_start = Instant::now();
    let query_hash = sha256_hex(text.as_bytes());

    if config.global.enable_caching {
        if let Some(mut hit) = cache_get(&query_hash, config) {
            debug!(hash = %&query_hash[..8], "conversion cache hit");
            hit.timings.total_ms = duration_ms(total_start.elapsed());
            return hit;
        }
    }

    let mut bag = DiagnosticBag::with_max_errors(config.parser.max_parse_errors);
    for problem in config.validate() {
        bag.push(Diagnostic::error(
            DiagKind::SemanticError,
            format!("invalid configuration: {problem}"),
            Default::default(),
        ));
    }

    let mut timings = StageTimings::default();
    let mut debug_snapshots = Vec::new();

    // Parse + lower.
    let parse_start = Instant::now();
    let mut query = parse_into(text, config, &mut bag);
    timings.parse_ms = duration_ms(parse_start.elapsed());
    if config.global.debug {
        debug_snapshots.push(DebugSnapshot {
            stage: "lowered".to_string(),
            content: serde_json::to_value(&query).unwrap_or_default(),
        });
    }

    let stop_early = config.global.fail_fast && bag.has_errors();

    // Lint.
    if !stop_early {
        let lint_start = Instant::now();
        query = lint::optimize(&query, config, &mut bag);
        timings.lint_ms = duration_ms(lint_start.elapsed());
        if config.global.debug {
            debug_snapshots.push(DebugSnapshot {
                stage: "linted".to_string(),
                content: serde_json::to_value(&query).unwrap_or_default(),
            });
        }
    }

    // Emit. Best-effort even with errors unless fail-fast tripped.
    let generate_start = Instant::now();
    let dax = if stop_early || (config.global.fail_fast && bag.has_errors()) {
        String::new()
    } else {
        dax::generate(&query, config, &mut bag)
    };
    timings.generate_ms = duration_ms(generate_start.elapsed());
    timings.total_ms = duration_ms(total_start.elapsed());

    mirror_metadata(&mut query, &bag);
    let result = ConversionResult {
        dax,
        query,
        diagnostics: bag.into_vec(),
        timings,
        query_hash: query_hash.clone(),
        debug_snapshots,
    };

    if config.global.enable_caching {
        cache_put(&query_hash, config, &result);
    }
    result
}

// ── Internals ────────────────────────────────────────────────────────

/// Lex, parse and lower `text`, depositing diagnostics into `bag`.
fn parse_into(text: &str, config: &Config, bag: &mut DiagnosticBag) -> Query {
    // The size cap aborts before lexing and suppresses everything else.
    if let Some(cap) = config.parser.max_input_chars {
        let chars = text.chars().count();
        if chars > cap {
            bag.push(Diagnostic::error(
                DiagKind::InputTooLarge,
                format!("input is {chars} characters; the configured cap is {cap}"),
                Default::default(),
            ));
            return empty_query();
        }
    }

    let lexed = lexer::lex(text, bag);
    let hint_records = hints::extract(&lexed.comments);

    let deadline = config
        .parser
        .parse_timeout_ms
        .map(|ms| Instant::now() + Duration::from_millis(ms));
    let stmt = parser::parse(
        &lexed.tokens,
        text,
        config.parser.allow_unknown_functions,
        deadline,
        bag,
    );

    match stmt {
        Some(stmt) => lower::lower(&stmt, text, hint_records, config, bag),
        None => empty_query(),
    }
}

fn empty_query() -> Query {
    let mut query = Query::new(CubeReference {
        name: "Unknown".to_string(),
        database: None,
    });
    query.metadata.valid = false;
    query
}

fn finish(mut query: Query, bag: DiagnosticBag) -> ParseOutcome {
    mirror_metadata(&mut query, &bag);
    ParseOutcome {
        query,
        diagnostics: bag.into_vec(),
    }
}

/// Copy diagnostic messages into query metadata so serialized IR remains
/// self-describing.
fn mirror_metadata(query: &mut Query, bag: &DiagnosticBag) {
    query.metadata.warnings = bag.warning_messages();
    query.metadata.errors = bag.error_messages();
    if bag.has_errors() {
        query.metadata.valid = false;
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    crate::config::hex(&hasher.finalize())
}

// ── Conversion cache ─────────────────────────────────────────────────
//
// Pure function cache keyed by (input digest, config digest). Process
// lifetime, no TTL, off unless `global.enable_caching` is set.

fn cache() -> &'static Mutex<HashMap<String, ConversionResult>> {
    static CACHE: OnceLock<Mutex<HashMap<String, ConversionResult>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn cache_key(query_hash: &str, config: &Config) -> String {
    format!("{query_hash}:{}", config.digest())
}

fn cache_get(query_hash: &str, config: &Config) -> Option<ConversionResult> {
    cache()
        .lock()
        .ok()?
        .get(&cache_key(query_hash, config))
        .cloned()
}

fn cache_put(query_hash: &str, config: &Config, result: &ConversionResult) {
    if let Ok(mut map) = cache().lock() {
        map.insert(cache_key(query_hash, config), result.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mdx_returns_ir_and_diagnostics() {
        let outcome = parse_mdx(
            "SELECT {[Measures].[Sales Amount]} ON 0 FROM [Adventure Works]",
            &Config::default(),
        );
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(outcome.query.measures.len(), 1);
        assert!(outcome.query.metadata.valid);
    }

    #[test]
    fn oversized_input_fails_with_only_input_too_large() {
        let mut config = Config::default();
        config.parser.max_input_chars = Some(10);
        let result = mdx_to_dax("SELECT {[Measures].[X]} ON 0 FROM [C]", &config);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagKind::InputTooLarge);
    }

    #[test]
    fn fail_fast_suppresses_emission() {
        let mut config = Config::default();
        config.global.fail_fast = true;
        let result = mdx_to_dax("SELECT {[Measures].[X]} ON 0", &config);
        assert!(result.has_errors());
        assert!(result.dax.is_empty());
    }

    #[test]
    fn broken_input_still_emits_best_effort_by_default() {
        let result = mdx_to_dax("SELECT {[Measures].[X]} ON 0", &Config::default());
        assert!(result.has_errors());
        assert!(result.dax.contains("EVALUATE"), "got: {}", result.dax);
    }

    #[test]
    fn conversion_is_deterministic() {
        let src = "SELECT {[Measures].[Sales]} ON 0, {[Product].[Category].Members} ON 1 \
                   FROM [Adventure Works] WHERE ([Date].[Year].&[2023])";
        let a = mdx_to_dax(src, &Config::default());
        let b = mdx_to_dax(src, &Config::default());
        assert_eq!(a.dax, b.dax);
        assert_eq!(a.diagnostics, b.diagnostics);
        assert_eq!(a.query_hash, b.query_hash);
    }

    #[test]
    fn caching_returns_identical_output() {
        let mut config = Config::default();
        config.global.enable_caching = true;
        let src = "SELECT {[Measures].[Cached]} ON 0 FROM [CacheCube]";
        let first = mdx_to_dax(src, &config);
        let second = mdx_to_dax(src, &config);
        assert_eq!(first.dax, second.dax);
        assert_eq!(first.diagnostics, second.diagnostics);
    }

    #[test]
    fn debug_flag_attaches_snapshots() {
        let mut config = Config::default();
        config.global.debug = true;
        let result = mdx_to_dax("SELECT {[Measures].[X]} ON 0 FROM [C]", &config);
        let stages: Vec<&str> = result
            .debug_snapshots
            .iter()
            .map(|s| s.stage.as_str())
            .collect();
        assert_eq!(stages, vec!["lowered", "linted"]);
    }

    #[test]
    fn metadata_mirrors_diagnostics() {
        let outcome = parse_mdx(
            "SELECT {[Measures].[X], [Measures].[X]} ON 0 FROM [C]",
            &Config::default(),
        );
        assert!(!outcome.query.metadata.warnings.is_empty());
    }

    #[test]
    fn parse_timeout_is_reported() {
        let mut config = Config::default();
        config.parser.parse_timeout_ms = Some(0);
        // A zero budget trips the deadline on the first production.
        let outcome = parse_mdx("SELECT {[Measures].[X]} ON 0 FROM [C]", &config);
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagKind::ParseTimeout));
    }
}
