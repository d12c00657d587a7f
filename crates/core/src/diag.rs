//! Diagnostic records and the per-invocation bag.
//!
//! Every pipeline stage appends to a shared [`DiagnosticBag`]; nothing in
//! the core unwinds across the public API on user input. Diagnostics keep
//! their emission order, which is source order for parse errors and pass
//! order for everything downstream.

use serde::{Deserialize, Serialize};

use crate::lexer::Span;

/// Diagnostic severity. Any `Error` marks the query invalid but does not
/// stop the pipeline unless `fail_fast` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Stable diagnostic kinds. The string form of each tag is part of the
/// public contract; renderers and tests match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagKind {
    ParseError,
    ParseTimeout,
    UnsupportedConstruct,
    SemanticError,
    MixedAxis,
    ExcessiveNesting,
    RedundantHierarchyLevels,
    DuplicateMeasure,
    DuplicateMembers,
    EmptyWhere,
    NormalizationWarning,
    EmitterError,
    InputTooLarge,
    LinterTimeout,
    CalculationTableAssumption,
}

impl DiagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagKind::ParseError => "parse_error",
            DiagKind::ParseTimeout => "parse_timeout",
            DiagKind::UnsupportedConstruct => "unsupported_construct",
            DiagKind::SemanticError => "semantic_error",
            DiagKind::MixedAxis => "mixed_axis",
            DiagKind::ExcessiveNesting => "excessive_nesting",
            DiagKind::RedundantHierarchyLevels => "redundant_hierarchy_levels",
            DiagKind::DuplicateMeasure => "duplicate_measure",
            DiagKind::DuplicateMembers => "duplicate_members",
            DiagKind::EmptyWhere => "empty_where",
            DiagKind::NormalizationWarning => "normalization_warning",
            DiagKind::EmitterError => "emitter_error",
            DiagKind::InputTooLarge => "input_too_large",
            DiagKind::LinterTimeout => "linter_timeout",
            DiagKind::CalculationTableAssumption => "calculation_table_assumption",
        }
    }
}

impl std::fmt::Display for DiagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed suggestion catalogue. Parse errors pick one of these rather than
/// free-form advice so that downstream tooling can match on the text.
pub mod suggestion {
    pub const MISSING_FROM: &str = "missing FROM clause";
    pub const UNBALANCED_BRACKETS: &str = "unbalanced brackets";
    pub const DUPLICATE_AXIS: &str = "duplicate axis";
    pub const MISSING_ON: &str = "axis set must be followed by ON <axis>";
    pub const INVALID_WHERE: &str = "invalid WHERE syntax";
    pub const UNTERMINATED_STRING: &str = "unterminated string literal";
    pub const UNTERMINATED_COMMENT: &str = "unterminated block comment";
    pub const EMPTY_SET: &str = "empty set: remove the braces or add members";
    pub const CHECK_MEMBER_PATH: &str = "check the member path: expected [Dimension].[Level].[Member]";
}

/// A single diagnostic. Serialized form is stable and used by the CLI's
/// JSON output and by fixture tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagKind,
    pub message: String,
    pub span: Span,
    /// ~40 characters of source around the span, for terminal rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, kind: DiagKind, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            severity,
            kind,
            message: message.into(),
            span,
            snippet: None,
            suggestion: None,
        }
    }

    pub fn error(kind: DiagKind, message: impl Into<String>, span: Span) -> Self {
        Diagnostic::new(Severity::Error, kind, message, span)
    }

    pub fn warning(kind: DiagKind, message: impl Into<String>, span: Span) -> Self {
        Diagnostic::new(Severity::Warning, kind, message, span)
    }

    pub fn info(kind: DiagKind, message: impl Into<String>, span: Span) -> Self {
        Diagnostic::new(Severity::Info, kind, message, span)
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_snippet_from(mut self, source: &str) -> Self {
        self.snippet = Some(snippet_around(source, &self.span));
        self
    }

    /// One-line rendering: `severity[kind] line:col message`.
    pub fn render(&self) -> String {
        let mut out = format!(
            "{}[{}] {}:{} {}",
            self.severity, self.kind, self.span.line, self.span.column, self.message
        );
        if let Some(s) = &self.snippet {
            out.push_str(&format!("\n    near: {s}"));
        }
        if let Some(s) = &self.suggestion {
            out.push_str(&format!("\n    hint: {s}"));
        }
        out
    }
}

/// Extract roughly 40 characters of context around a span, with the
/// offending region delimited by `>>> <<<` when it fits.
pub fn snippet_around(source: &str, span: &Span) -> String {
    let len = source.len();
    let start = span.start.min(len);
    let end = span.end.min(len).max(start);
    let ctx_start = floor_char_boundary(source, start.saturating_sub(20));
    let ctx_end = ceil_char_boundary(source, (end + 20).min(len));
    let before = source[ctx_start..start].trim_start();
    let inner = &source[start..end];
    let after = source[end..ctx_end].trim_end();
    let mut out = String::new();
    if ctx_start > 0 {
        out.push('…');
    }
    out.push_str(before);
    if !inner.is_empty() {
        out.push_str(">>>");
        out.push_str(inner);
        out.push_str("<<<");
    }
    out.push_str(after);
    if ctx_end < len {
        out.push('…');
    }
    out.replace(['\n', '\r'], " ")
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Accumulates diagnostics across the pipeline. One bag per invocation;
/// the bag is never shared between invocations.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticBag {
    diags: Vec<Diagnostic>,
    /// Emission stops contributing past this count (0 = unlimited).
    max_errors: usize,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        DiagnosticBag::default()
    }

    pub fn with_max_errors(max_errors: usize) -> Self {
        DiagnosticBag {
            diags: Vec::new(),
            max_errors,
        }
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.diags.push(diag);
    }

    pub fn extend(&mut self, diags: impl IntoIterator<Item = Diagnostic>) {
        self.diags.extend(diags);
    }

    pub fn error_count(&self) -> usize {
        self.diags
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.diags.iter().any(|d| d.severity == Severity::Error)
    }

    /// True when the configured error cap has been reached.
    pub fn at_error_limit(&self) -> bool {
        self.max_errors > 0 && self.error_count() >= self.max_errors
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diags.iter()
    }

    pub fn len(&self) -> usize {
        self.diags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diags
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.diags
    }

    /// Messages of all warnings, for mirroring into query metadata.
    pub fn warning_messages(&self) -> Vec<String> {
        self.diags
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| d.message.clone())
            .collect()
    }

    /// Messages of all errors, for mirroring into query metadata.
    pub fn error_messages(&self) -> Vec<String> {
        self.diags
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.message.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_marks_the_offending_region() {
        let src = "SELECT {[Measures].[Sales]} ON 0 FROM [Adventure Works]";
        let span = Span {
            start: 28,
            end: 30,
            line: 1,
            column: 29,
        };
        let snip = snippet_around(src, &span);
        assert!(snip.contains(">>>ON<<<"), "snippet was: {snip}");
    }

    #[test]
    fn snippet_clamps_out_of_range_spans() {
        let src = "SELECT";
        let span = Span {
            start: 100,
            end: 120,
            line: 1,
            column: 1,
        };
        // Must not panic; returns the tail context.
        let snip = snippet_around(src, &span);
        assert!(!snip.contains(">>>"));
    }

    #[test]
    fn bag_counts_errors_only() {
        let mut bag = DiagnosticBag::new();
        bag.push(Diagnostic::warning(
            DiagKind::MixedAxis,
            "w",
            Span::default(),
        ));
        bag.push(Diagnostic::error(
            DiagKind::ParseError,
            "e",
            Span::default(),
        ));
        assert_eq!(bag.error_count(), 1);
        assert!(bag.has_errors());
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn error_limit_is_reported() {
        let mut bag = DiagnosticBag::with_max_errors(2);
        assert!(!bag.at_error_limit());
        bag.push(Diagnostic::error(
            DiagKind::ParseError,
            "a",
            Span::default(),
        ));
        bag.push(Diagnostic::error(
            DiagKind::ParseError,
            "b",
            Span::default(),
        ));
        assert!(bag.at_error_limit());
    }
}
