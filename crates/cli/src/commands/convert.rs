//! `unmdx convert` -- MDX in, DAX out.

use std::path::Path;

use unmdx_core::{mdx_to_dax, Config, OptimizationLevel};

use crate::LevelArg;

pub(crate) fn run(
    input: Option<&Path>,
    output: Option<&Path>,
    optimization_level: Option<LevelArg>,
    no_linter: bool,
    mut config: Config,
) -> i32 {
    if let Some(level) = optimization_level {
        config.linter.optimization_level = level.into();
    }
    if no_linter {
        config.linter.optimization_level = OptimizationLevel::None;
        config.linter.disabled_rules = unmdx_core::lint::RULE_NAMES
            .iter()
            .map(|r| r.to_string())
            .collect();
    }

    let text = match super::read_input(input) {
        Ok(text) => text,
        Err(message) => {
            eprintln!("error: {message}");
            return 1;
        }
    };

    let result = mdx_to_dax(&text, &config);
    let had_errors = super::report_diagnostics(&result.diagnostics);

    if let Err(message) = super::write_output(output, &result.dax) {
        eprintln!("error: {message}");
        return 1;
    }
    if had_errors {
        1
    } else {
        0
    }
}
