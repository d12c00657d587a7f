//! `unmdx explain` -- MDX in, explanation out.

use std::path::Path;

use unmdx_core::{explain_ir, parse_mdx, Config};

use crate::{DetailArg, FormatArg};

pub(crate) fn run(
    input: Option<&Path>,
    output: Option<&Path>,
    format: Option<FormatArg>,
    detail: Option<DetailArg>,
    include_dax: bool,
    mut config: Config,
) -> i32 {
    if let Some(format) = format {
        config.explanation.format = format.into();
    }
    if let Some(detail) = detail {
        config.explanation.detail = detail.into();
    }
    if include_dax {
        config.explanation.include_dax_comparison = true;
    }

    let text = match super::read_input(input) {
        Ok(text) => text,
        Err(message) => {
            eprintln!("error: {message}");
            return 1;
        }
    };

    let outcome = parse_mdx(&text, &config);
    let (explanation, emit_diags) = explain_ir(&outcome.query, &config);

    let mut diagnostics = outcome.diagnostics;
    diagnostics.extend(emit_diags);
    let had_errors = super::report_diagnostics(&diagnostics);

    if let Err(message) = super::write_output(output, &explanation) {
        eprintln!("error: {message}");
        return 1;
    }
    if had_errors {
        1
    } else {
        0
    }
}
