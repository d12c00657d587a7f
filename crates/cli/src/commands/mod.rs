//! Subcommand implementations. Each returns the process exit code.

pub(crate) mod convert;
pub(crate) mod explain;

use std::io::Read;
use std::path::Path;

use unmdx_core::{Diagnostic, Severity};

/// Read the query text from a file, or stdin for `-`/no path.
pub(crate) fn read_input(path: Option<&Path>) -> Result<String, String> {
    match path {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("cannot read stdin: {e}"))?;
            Ok(buf)
        }
    }
}

/// Write the result to a file or stdout.
pub(crate) fn write_output(path: Option<&Path>, text: &str) -> Result<(), String> {
    match path {
        Some(path) => std::fs::write(path, text)
            .map_err(|e| format!("cannot write {}: {e}", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

/// Print diagnostics to stderr; returns true when any error was present.
pub(crate) fn report_diagnostics(diagnostics: &[Diagnostic]) -> bool {
    for diag in diagnostics {
        eprintln!("{}", diag.render());
    }
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}
