//! Configuration discovery: file, then `UNMDX_*` environment variables.
//!
//! Precedence, lowest to highest: built-in defaults, configuration file,
//! environment, command-line flags (applied by the subcommands).

use std::path::Path;

use unmdx_core::Config;

/// Load the effective configuration. JSON for `.json` files, YAML for
/// `.yaml`/`.yml`; the extension decides, defaulting to YAML.
pub(crate) fn load(path: Option<&Path>) -> Result<Config, String> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => Config::default(),
    };
    apply_env(&mut config, |name| std::env::var(name).ok());
    let problems = config.validate();
    if !problems.is_empty() {
        return Err(problems.join("; "));
    }
    Ok(config)
}

fn parse_file(path: &Path) -> Result<Config, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&text)
            .map_err(|e| format!("invalid JSON config {}: {e}", path.display()))
    } else {
        serde_yaml::from_str(&text)
            .map_err(|e| format!("invalid YAML config {}: {e}", path.display()))
    }
}

/// Apply `UNMDX_<SECTION>_<OPTION>` overrides. `lookup` is injected so
/// tests can run without touching the process environment.
pub(crate) fn apply_env(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    fn flag(lookup: &impl Fn(&str) -> Option<String>, name: &str, target: &mut bool) {
        if let Some(v) = lookup(name) {
            *target = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
    }
    fn num<T: std::str::FromStr>(
        lookup: &impl Fn(&str) -> Option<String>,
        name: &str,
        target: &mut T,
    ) {
        if let Some(v) = lookup(name) {
            if let Ok(parsed) = v.parse() {
                *target = parsed;
            }
        }
    }

    flag(
        &lookup,
        "UNMDX_PARSER_STRICT_MODE",
        &mut config.parser.strict_mode,
    );
    flag(
        &lookup,
        "UNMDX_PARSER_ALLOW_UNKNOWN_FUNCTIONS",
        &mut config.parser.allow_unknown_functions,
    );
    num(
        &lookup,
        "UNMDX_PARSER_MAX_PARSE_ERRORS",
        &mut config.parser.max_parse_errors,
    );
    if let Some(v) = lookup("UNMDX_PARSER_PARSE_TIMEOUT_MS") {
        config.parser.parse_timeout_ms = v.parse().ok();
    }
    if let Some(v) = lookup("UNMDX_PARSER_MAX_INPUT_CHARS") {
        config.parser.max_input_chars = v.parse().ok();
    }

    if let Some(v) = lookup("UNMDX_LINTER_OPTIMIZATION_LEVEL") {
        if let Ok(level) = v.parse() {
            config.linter.optimization_level = level;
        }
    }
    num(
        &lookup,
        "UNMDX_LINTER_MAX_CROSSJOIN_DEPTH",
        &mut config.linter.max_crossjoin_depth,
    );
    num(
        &lookup,
        "UNMDX_LINTER_MAX_PROCESSING_MS",
        &mut config.linter.max_processing_ms,
    );
    if let Some(v) = lookup("UNMDX_LINTER_DISABLED_RULES") {
        config.linter.disabled_rules = v
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    flag(
        &lookup,
        "UNMDX_DAX_FORMAT_OUTPUT",
        &mut config.dax.format_output,
    );
    num(&lookup, "UNMDX_DAX_INDENT_SIZE", &mut config.dax.indent_size);
    num(&lookup, "UNMDX_DAX_LINE_WIDTH", &mut config.dax.line_width);
    flag(
        &lookup,
        "UNMDX_DAX_USE_SUMMARIZECOLUMNS",
        &mut config.dax.use_summarizecolumns,
    );
    flag(
        &lookup,
        "UNMDX_DAX_ESCAPE_RESERVED_WORDS",
        &mut config.dax.escape_reserved_words,
    );

    if let Some(v) = lookup("UNMDX_EXPLANATION_FORMAT") {
        if let Ok(format) = v.parse() {
            config.explanation.format = format;
        }
    }
    if let Some(v) = lookup("UNMDX_EXPLANATION_DETAIL") {
        if let Ok(detail) = v.parse() {
            config.explanation.detail = detail;
        }
    }
    flag(
        &lookup,
        "UNMDX_EXPLANATION_INCLUDE_DAX_COMPARISON",
        &mut config.explanation.include_dax_comparison,
    );

    flag(&lookup, "UNMDX_GLOBAL_DEBUG", &mut config.global.debug);
    flag(
        &lookup,
        "UNMDX_GLOBAL_FAIL_FAST",
        &mut config.global.fail_fast,
    );
    flag(
        &lookup,
        "UNMDX_GLOBAL_ENABLE_CACHING",
        &mut config.global.enable_caching,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(map: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
        move |name| map.get(name).map(|v| v.to_string())
    }

    #[test]
    fn env_overrides_sections() {
        let mut config = Config::default();
        apply_env(
            &mut config,
            lookup_from(HashMap::from([
                ("UNMDX_PARSER_STRICT_MODE", "true"),
                ("UNMDX_LINTER_OPTIMIZATION_LEVEL", "aggressive"),
                ("UNMDX_DAX_INDENT_SIZE", "2"),
                ("UNMDX_EXPLANATION_FORMAT", "markdown"),
                ("UNMDX_LINTER_DISABLED_RULES", "dedupe_members, prune_filters"),
            ])),
        );
        assert!(config.parser.strict_mode);
        assert_eq!(
            config.linter.optimization_level,
            unmdx_core::OptimizationLevel::Aggressive
        );
        assert_eq!(config.dax.indent_size, 2);
        assert_eq!(
            config.explanation.format,
            unmdx_core::ExplanationFormat::Markdown
        );
        assert_eq!(
            config.linter.disabled_rules,
            vec!["dedupe_members".to_string(), "prune_filters".to_string()]
        );
    }

    #[test]
    fn unknown_values_are_ignored() {
        let mut config = Config::default();
        apply_env(
            &mut config,
            lookup_from(HashMap::from([
                ("UNMDX_LINTER_OPTIMIZATION_LEVEL", "warp-speed"),
                ("UNMDX_DAX_INDENT_SIZE", "lots"),
            ])),
        );
        assert_eq!(config, Config::default());
    }
}
