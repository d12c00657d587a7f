//! English prose explanation.

use crate::config::{Config, ExplanationDetail};
use crate::ir::{BinaryOp, Constant, Expression, LogicalOp, Query, UnaryOp};

use super::{dimension_phrase, filter_phrase, measure_phrase};

pub(super) fn render(query: &Query, config: &Config) -> String {
    let mut out = String::new();

    let measures: Vec<String> = query.measures.iter().map(measure_phrase).collect();
    let dimensions: Vec<String> = query.dimensions.iter().map(dimension_phrase).collect();

    out.push_str("This query calculates ");
    if measures.is_empty() {
        out.push_str("no measures");
    } else {
        out.push_str(&join_and(&measures));
    }
    out.push_str(&format!(" from the {} model", query.cube.name));
    if !dimensions.is_empty() {
        out.push_str(&format!(", grouped by {}", join_and(&dimensions)));
    }
    let filters: Vec<String> = query.filters.iter().map(filter_phrase).collect();
    if !filters.is_empty() {
        out.push_str(&format!(", where {}", filters.join(" and ")));
    }
    if let Some(limit) = query.limit {
        let side = match limit.direction {
            crate::ir::LimitDirection::Top => "top",
            crate::ir::LimitDirection::Bottom => "bottom",
        };
        out.push_str(&format!(", keeping the {side} {} rows", limit.count));
    }
    out.push_str(".\n");

    if config.explanation.detail != ExplanationDetail::Minimal && !query.calculations.is_empty() {
        out.push('\n');
        out.push_str("Calculated measures:\n");
        for calc in &query.calculations {
            out.push_str(&format!(
                "  - {} is {}\n",
                calc.name,
                expression_phrase(&calc.expression)
            ));
        }
    }

    if config.explanation.detail == ExplanationDetail::Detailed {
        if !query.metadata.hints.is_empty() {
            out.push('\n');
            out.push_str("Optimizer hints:\n");
            for hint in &query.metadata.hints {
                out.push_str(&format!("  - {}\n", hint.label()));
            }
        }
        if !query.metadata.warnings.is_empty() {
            out.push('\n');
            out.push_str("Warnings raised during conversion:\n");
            for warning in &query.metadata.warnings {
                out.push_str(&format!("  - {warning}\n"));
            }
        }
    }

    if config.explanation.include_dax_comparison {
        out.push('\n');
        out.push_str("DAX equivalent:\n");
        out.push_str(&super::dax_for_embedding(query, config));
    }
    out
}

fn join_and(items: &[String]) -> String {
    match items.len() {
        0 => String::new(),
        1 => items[0].clone(),
        2 => format!("{} and {}", items[0], items[1]),
        _ => format!(
            "{} and {}",
            items[..items.len() - 1].join(", "),
            items[items.len() - 1]
        ),
    }
}

/// Prose rendering of an expression tree.
pub(crate) fn expression_phrase(expr: &Expression) -> String {
    match expr {
        Expression::Constant { value } => match value {
            Constant::Number { raw } => raw.clone(),
            Constant::String { value } => format!("\"{value}\""),
            Constant::Bool { value } => value.to_string(),
        },
        Expression::MeasureRef { name } => name.clone(),
        Expression::MemberRef { level, name, .. } => {
            if name.is_empty() {
                level.clone()
            } else {
                format!("{name} in {level}")
            }
        }
        Expression::Unary { op, operand } => match op {
            UnaryOp::Neg => format!("negative {}", expression_phrase(operand)),
            UnaryOp::Not => format!("not {}", expression_phrase(operand)),
        },
        Expression::Binary { op, left, right } => {
            let word = match op {
                BinaryOp::Add => "plus",
                BinaryOp::Sub => "minus",
                BinaryOp::Mul => "times",
                BinaryOp::Div => "divided by",
                BinaryOp::Concat => "joined with",
            };
            format!(
                "{} {word} {}",
                expression_phrase(left),
                expression_phrase(right)
            )
        }
        Expression::Comparison { op, left, right } => format!(
            "{} {} {}",
            expression_phrase(left),
            op.as_str(),
            expression_phrase(right)
        ),
        Expression::Logical { op, operands } => {
            let word = match op {
                LogicalOp::And => " and ",
                LogicalOp::Or => " or ",
                LogicalOp::Not => {
                    return format!(
                        "not {}",
                        operands
                            .first()
                            .map(expression_phrase)
                            .unwrap_or_default()
                    )
                }
            };
            operands
                .iter()
                .map(expression_phrase)
                .collect::<Vec<_>>()
                .join(word)
        }
        Expression::FunctionCall { name, args } => {
            if name == "DIVIDE" && args.len() == 2 {
                return format!(
                    "{} divided by {}",
                    expression_phrase(&args[0]),
                    expression_phrase(&args[1])
                );
            }
            format!(
                "{}({})",
                name.to_lowercase(),
                args.iter()
                    .map(expression_phrase)
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        }
        Expression::Conditional {
            cond,
            then_branch,
            else_branch,
        } => format!(
            "if {} then {} else {}",
            expression_phrase(cond),
            expression_phrase(then_branch),
            expression_phrase(else_branch)
        ),
    }
}
