//! Identifier escaping and argument layout for the DAX emitter.

use crate::config::DaxConfig;

/// Table names that collide with DAX reserved tokens and always need
/// quoting when `escape_reserved_words` is on.
const RESERVED_TABLE_NAMES: &[&str] = &[
    "Date", "Time", "Value", "Min", "Max", "Sum", "Count", "Average",
];

pub(crate) fn is_reserved_table(name: &str) -> bool {
    RESERVED_TABLE_NAMES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(name))
}

/// Render a table identifier, single-quoted when it contains anything
/// beyond `[A-Za-z0-9_]` or collides with a reserved word.
pub(crate) fn table(name: &str, config: &DaxConfig) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    let needs_quotes = !plain || (config.escape_reserved_words && is_reserved_table(name));
    if needs_quotes {
        format!("'{}'", name.replace('\'', "''"))
    } else {
        name.to_string()
    }
}

/// `Table[Column]` reference.
pub(crate) fn column(table_name: &str, column_name: &str, config: &DaxConfig) -> String {
    format!("{}[{}]", table(table_name, config), bracket(column_name))
}

/// `[Measure]` reference.
pub(crate) fn measure(name: &str) -> String {
    format!("[{}]", bracket(name))
}

fn bracket(name: &str) -> String {
    name.replace(']', "]]")
}

/// DAX string literal: double quotes, embedded quotes doubled.
pub(crate) fn string_literal(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Filter comparand: numbers stay bare, everything else is a string.
pub(crate) fn scalar_literal(value: &str) -> String {
    if value.parse::<f64>().is_ok() {
        value.to_string()
    } else {
        string_literal(value)
    }
}

/// Trim a float for display (`100` not `100.0`).
pub(crate) fn number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Lay out a table-function call. Under `format_output` the arguments go
/// one per line at the given indent depth; otherwise everything stays on
/// one line.
pub(crate) fn call_layout(name: &str, args: &[String], depth: usize, config: &DaxConfig) -> String {
    if !config.format_output || args.is_empty() {
        return format!("{}({})", name, args.join(", "));
    }
    let pad = " ".repeat(config.indent_size * (depth + 1));
    let close_pad = " ".repeat(config.indent_size * depth);
    let body = args
        .iter()
        .map(|a| format!("{pad}{a}"))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("{name}(\n{body}\n{close_pad})")
}

/// Inline row constructor `{ [a], [b] }`, wrapping only past the
/// configured width.
pub(crate) fn row_constructor(items: &[String], config: &DaxConfig) -> String {
    let inline = format!("{{ {} }}", items.join(", "));
    if !config.format_output || inline.len() <= config.line_width {
        return inline;
    }
    let pad = " ".repeat(config.indent_size);
    let body = items
        .iter()
        .map(|i| format!("{pad}{i}"))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("{{\n{body}\n}}")
}

/// Inline value set `{ "a", "b" }` for IN filters, wrapping past the
/// configured width.
pub(crate) fn value_set(values: &[String], config: &DaxConfig) -> String {
    let inline = format!("{{{}}}", values.join(", "));
    if inline.len() <= config.line_width {
        inline
    } else {
        // Long lists still stay structurally on one logical argument;
        // break after commas to respect the width.
        format!("{{{}}}", values.join(",\n    "))
    }
}
