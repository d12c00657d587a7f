//! Pipeline configuration.
//!
//! One nested record threaded explicitly through every stage; nothing in
//! the core reads process-global state. The CLI layers file and
//! environment discovery on top of this and hands the finished record in.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    None,
    #[default]
    Conservative,
    Moderate,
    Aggressive,
}

impl std::str::FromStr for OptimizationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(OptimizationLevel::None),
            "conservative" => Ok(OptimizationLevel::Conservative),
            "moderate" => Ok(OptimizationLevel::Moderate),
            "aggressive" => Ok(OptimizationLevel::Aggressive),
            other => Err(format!("unknown optimization level '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationFormat {
    #[default]
    Sql,
    Natural,
    Json,
    Markdown,
}

impl std::str::FromStr for ExplanationFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sql" => Ok(ExplanationFormat::Sql),
            "natural" => Ok(ExplanationFormat::Natural),
            "json" => Ok(ExplanationFormat::Json),
            "markdown" => Ok(ExplanationFormat::Markdown),
            other => Err(format!("unknown explanation format '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationDetail {
    Minimal,
    #[default]
    Standard,
    Detailed,
}

impl std::str::FromStr for ExplanationDetail {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(ExplanationDetail::Minimal),
            "standard" => Ok(ExplanationDetail::Standard),
            "detailed" => Ok(ExplanationDetail::Detailed),
            other => Err(format!("unknown detail level '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Treat warnings as errors during lowering.
    pub strict_mode: bool,
    /// Accept unrecognized identifiers as function names.
    pub allow_unknown_functions: bool,
    /// Abort after this many parse errors (0 = unlimited).
    pub max_parse_errors: usize,
    /// Wall-clock budget for parsing.
    pub parse_timeout_ms: Option<u64>,
    /// Input size cap in characters, checked before lexing.
    pub max_input_chars: Option<usize>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            strict_mode: false,
            allow_unknown_functions: true,
            max_parse_errors: 10,
            parse_timeout_ms: None,
            max_input_chars: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinterConfig {
    pub optimization_level: OptimizationLevel,
    /// Depth above which repeated dimensions are coalesced.
    pub max_crossjoin_depth: usize,
    /// Pass names to skip (see [`crate::lint::RULE_NAMES`]).
    pub disabled_rules: Vec<String>,
    /// Time cap for the whole linter run (0 = unlimited).
    pub max_processing_ms: u64,
}

impl Default for LinterConfig {
    fn default() -> Self {
        LinterConfig {
            optimization_level: OptimizationLevel::Conservative,
            max_crossjoin_depth: 3,
            disabled_rules: Vec::new(),
            max_processing_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaxConfig {
    pub format_output: bool,
    pub indent_size: usize,
    /// Soft wrap threshold for argument lists.
    pub line_width: usize,
    /// Prefer SUMMARIZECOLUMNS grouping; `false` falls back to
    /// SUMMARIZE with CALCULATE-wrapped measures.
    pub use_summarizecolumns: bool,
    /// Quote table identifiers that collide with reserved words.
    pub escape_reserved_words: bool,
}

impl Default for DaxConfig {
    fn default() -> Self {
        DaxConfig {
            format_output: true,
            indent_size: 4,
            line_width: 100,
            use_summarizecolumns: true,
            escape_reserved_words: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExplanationConfig {
    pub format: ExplanationFormat,
    pub detail: ExplanationDetail,
    /// Embed the generated DAX into the explanation.
    pub include_dax_comparison: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Attach pass-by-pass IR snapshots to the conversion result.
    pub debug: bool,
    /// Stop the pipeline at the first error.
    pub fail_fast: bool,
    /// Memoize (input, config) -> conversion result for the process
    /// lifetime.
    pub enable_caching: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub parser: ParserConfig,
    pub linter: LinterConfig,
    pub dax: DaxConfig,
    pub explanation: ExplanationConfig,
    pub global: GlobalConfig,
}

impl Config {
    /// Check option values that serde cannot. Returns human-readable
    /// problems; an empty vec means the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.dax.indent_size == 0 || self.dax.indent_size > 16 {
            problems.push(format!(
                "dax.indent_size must be between 1 and 16, got {}",
                self.dax.indent_size
            ));
        }
        if self.dax.line_width < 40 {
            problems.push(format!(
                "dax.line_width must be at least 40, got {}",
                self.dax.line_width
            ));
        }
        if let Some(0) = self.parser.parse_timeout_ms {
            problems.push("parser.parse_timeout_ms must be positive when set".to_string());
        }
        if let Some(0) = self.parser.max_input_chars {
            problems.push("parser.max_input_chars must be positive when set".to_string());
        }
        problems
    }

    /// Stable digest of the whole record, used as part of cache keys.
    pub fn digest(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&json);
        hex(&hasher.finalize())
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_clean() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn digest_is_stable_and_config_sensitive() {
        let a = Config::default();
        let b = Config::default();
        assert_eq!(a.digest(), b.digest());

        let mut c = Config::default();
        c.linter.optimization_level = OptimizationLevel::Aggressive;
        assert_ne!(a.digest(), c.digest());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: Config =
            serde_json::from_str(r#"{"dax": {"indent_size": 2}}"#).expect("parse config");
        assert_eq!(cfg.dax.indent_size, 2);
        assert_eq!(cfg.dax.line_width, 100);
        assert_eq!(
            cfg.linter.optimization_level,
            OptimizationLevel::Conservative
        );
    }

    #[test]
    fn bad_values_are_reported() {
        let mut cfg = Config::default();
        cfg.dax.indent_size = 0;
        cfg.dax.line_width = 10;
        assert_eq!(cfg.validate().len(), 2);
    }
}
