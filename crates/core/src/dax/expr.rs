//! Expression rendering to DAX.
//!
//! Division always goes through DIVIDE (BLANK on a zero denominator
//! matches MDX empty-cell arithmetic). Time-intelligence calls lower to
//! their TOTAL* counterparts where one exists; the rest pass through
//! uppercase with an unsupported-construct warning.

use crate::config::DaxConfig;
use crate::diag::{DiagKind, Diagnostic, DiagnosticBag};
use crate::ir::{BinaryOp, Constant, Expression, LogicalOp, UnaryOp};
use crate::lexer::Span;

use super::format;

pub(crate) struct ExprCtx<'a> {
    pub config: &'a DaxConfig,
    pub bag: &'a mut DiagnosticBag,
    pub span: Span,
}

pub(crate) fn render(expr: &Expression, ctx: &mut ExprCtx) -> String {
    render_prec(expr, 0, ctx)
}

fn prec(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Mul | BinaryOp::Div => 2,
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Concat => 1,
    }
}

fn render_prec(expr: &Expression, parent_prec: u8, ctx: &mut ExprCtx) -> String {
    match expr {
        Expression::Constant { value } => match value {
            Constant::Number { raw } => raw.clone(),
            Constant::String { value } => format::string_literal(value),
            Constant::Bool { value } => if *value { "TRUE" } else { "FALSE" }.to_string(),
        },
        Expression::MeasureRef { name } => format::measure(name),
        Expression::MemberRef {
            hierarchy,
            level,
            name,
        } => {
            let col = format::column(hierarchy, level, ctx.config);
            if name.is_empty() {
                col
            } else {
                format!("{col} = {}", format::scalar_literal(name))
            }
        }
        Expression::Unary { op, operand } => match op {
            UnaryOp::Neg => {
                let inner = render_prec(operand, 3, ctx);
                if matches!(
                    **operand,
                    Expression::Constant { .. } | Expression::MeasureRef { .. }
                ) {
                    format!("-{inner}")
                } else {
                    format!("-({inner})")
                }
            }
            UnaryOp::Not => format!("NOT({})", render(operand, ctx)),
        },
        Expression::Binary { op, left, right } => {
            if *op == BinaryOp::Div {
                return format!(
                    "DIVIDE({}, {})",
                    render(left, ctx),
                    render(right, ctx)
                );
            }
            let my_prec = prec(*op);
            let symbol = match op {
                BinaryOp::Add => "+",
                BinaryOp::Sub => "-",
                BinaryOp::Mul => "*",
                BinaryOp::Concat => "&",
                BinaryOp::Div => unreachable!("handled above"),
            };
            let l = render_prec(left, my_prec, ctx);
            // Right operand of - needs parens at equal precedence.
            let right_floor = if *op == BinaryOp::Sub {
                my_prec + 1
            } else {
                my_prec
            };
            let r = render_prec(right, right_floor, ctx);
            let rendered = format!("{l} {symbol} {r}");
            if my_prec < parent_prec {
                format!("({rendered})")
            } else {
                rendered
            }
        }
        Expression::Comparison { op, left, right } => {
            format!(
                "{} {} {}",
                render(left, ctx),
                op.as_str(),
                render(right, ctx)
            )
        }
        Expression::Logical { op, operands } => match op {
            LogicalOp::Not => {
                let inner = operands
                    .first()
                    .map(|o| render(o, ctx))
                    .unwrap_or_else(|| "TRUE".to_string());
                format!("NOT({inner})")
            }
            LogicalOp::And | LogicalOp::Or => {
                let symbol = if *op == LogicalOp::And { "&&" } else { "||" };
                let parts: Vec<String> = operands
                    .iter()
                    .map(|o| {
                        let rendered = render(o, ctx);
                        if matches!(o, Expression::Logical { op: inner, .. } if inner != op) {
                            format!("({rendered})")
                        } else {
                            rendered
                        }
                    })
                    .collect();
                parts.join(&format!(" {symbol} "))
            }
        },
        Expression::FunctionCall { name, args } => render_call(name, args, ctx),
        Expression::Conditional {
            cond,
            then_branch,
            else_branch,
        } => format!(
            "IF({}, {}, {})",
            render(cond, ctx),
            render(then_branch, ctx),
            render(else_branch, ctx)
        ),
    }
}

fn render_call(name: &str, args: &[Expression], ctx: &mut ExprCtx) -> String {
    let rendered_args = |ctx: &mut ExprCtx| -> Vec<String> {
        args.iter().map(|a| render(a, ctx)).collect()
    };

    match name {
        "DIVIDE" => {
            let a = rendered_args(ctx);
            format!("DIVIDE({})", a.join(", "))
        }
        "BLANK" => "BLANK()".to_string(),
        "ISBLANK" => format!("ISBLANK({})", rendered_args(ctx).join(", ")),
        "COALESCEEMPTY" => format!("COALESCE({})", rendered_args(ctx).join(", ")),
        "CONCATENATE" => format!("CONCATENATE({})", rendered_args(ctx).join(", ")),
        // Tuple pseudo-call: a measure evaluated inside member
        // coordinates becomes CALCULATE with column filters.
        "TUPLE" => render_tuple(args, ctx),
        // Aggregates: single argument keeps the plain form, a second
        // argument selects the iterator (X) form.
        "SUM" | "MIN" | "MAX" | "COUNT" | "AVG" | "AVERAGE" => {
            let dax_name = if name == "AVG" { "AVERAGE" } else { name };
            let a = rendered_args(ctx);
            if a.len() == 2 {
                format!("{dax_name}X({})", a.join(", "))
            } else {
                format!("{dax_name}({})", a.join(", "))
            }
        }
        "AGGREGATE" => {
            ctx.bag.push(Diagnostic::warning(
                DiagKind::UnsupportedConstruct,
                "AGGREGATE has no direct DAX equivalent; emitted as CALCULATE",
                ctx.span,
            ));
            format!("CALCULATE({})", rendered_args(ctx).join(", "))
        }
        // Time intelligence with a TOTAL* counterpart. The date column
        // is assumed to be 'Date'[Date]; the model cannot name it.
        "YTD" | "QTD" | "MTD" => {
            let total = match name {
                "YTD" => "TOTALYTD",
                "QTD" => "TOTALQTD",
                _ => "TOTALMTD",
            };
            ctx.bag.push(Diagnostic::info(
                DiagKind::CalculationTableAssumption,
                format!("{name} assumes the date column 'Date'[Date]"),
                ctx.span,
            ));
            let a = rendered_args(ctx);
            let measure = a
                .first()
                .cloned()
                .unwrap_or_else(|| "BLANK()".to_string());
            format!("{total}({measure}, 'Date'[Date])")
        }
        "PARALLELPERIOD" | "PERIODSTODATE" | "PREVIOUSMONTH" | "OPENINGPERIOD"
        | "CLOSINGPERIOD" | "LASTPERIODS" | "WTD" => {
            ctx.bag.push(Diagnostic::warning(
                DiagKind::UnsupportedConstruct,
                format!("time-intelligence function {name} is passed through untranslated"),
                ctx.span,
            ));
            format!("{}({})", name, rendered_args(ctx).join(", "))
        }
        other => format!("{}({})", other, rendered_args(ctx).join(", ")),
    }
}

fn render_tuple(args: &[Expression], ctx: &mut ExprCtx) -> String {
    let measure = args.iter().find_map(|a| match a {
        Expression::MeasureRef { name } => Some(format::measure(name)),
        _ => None,
    });
    let Some(measure) = measure else {
        ctx.bag.push(Diagnostic::error(
            DiagKind::EmitterError,
            "tuple expression has no measure; cannot form CALCULATE",
            ctx.span,
        ));
        return "BLANK()".to_string();
    };
    let mut filters = Vec::new();
    for arg in args {
        if let Expression::MemberRef {
            hierarchy,
            level,
            name,
        } = arg
        {
            if !name.is_empty() {
                filters.push(format!(
                    "{} = {}",
                    format::column(hierarchy, level, ctx.config),
                    format::scalar_literal(name)
                ));
            }
        }
    }
    if filters.is_empty() {
        measure
    } else {
        format!("CALCULATE({measure}, {})", filters.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DaxConfig;

    fn render_str(expr: &Expression) -> (String, DiagnosticBag) {
        let config = DaxConfig::default();
        let mut bag = DiagnosticBag::new();
        let out = {
            let mut ctx = ExprCtx {
                config: &config,
                bag: &mut bag,
                span: Span::default(),
            };
            render(expr, &mut ctx)
        };
        (out, bag)
    }

    fn num(raw: &str) -> Expression {
        Expression::constant_number(raw)
    }

    #[test]
    fn division_renders_as_divide_without_third_argument() {
        let e = Expression::Binary {
            op: BinaryOp::Div,
            left: Box::new(Expression::measure("Sales Amount")),
            right: Box::new(Expression::measure("Order Quantity")),
        };
        let (out, _) = render_str(&e);
        assert_eq!(out, "DIVIDE([Sales Amount], [Order Quantity])");
    }

    #[test]
    fn precedence_parenthesizes_only_when_needed() {
        // (a + b) * c
        let e = Expression::Binary {
            op: BinaryOp::Mul,
            left: Box::new(Expression::Binary {
                op: BinaryOp::Add,
                left: Box::new(Expression::measure("A")),
                right: Box::new(Expression::measure("B")),
            }),
            right: Box::new(num("2")),
        };
        let (out, _) = render_str(&e);
        assert_eq!(out, "([A] + [B]) * 2");

        // a + b * c stays flat
        let e2 = Expression::Binary {
            op: BinaryOp::Add,
            left: Box::new(Expression::measure("A")),
            right: Box::new(Expression::Binary {
                op: BinaryOp::Mul,
                left: Box::new(Expression::measure("B")),
                right: Box::new(num("2")),
            }),
        };
        let (out2, _) = render_str(&e2);
        assert_eq!(out2, "[A] + [B] * 2");
    }

    #[test]
    fn conditional_renders_as_if() {
        let e = Expression::Conditional {
            cond: Box::new(Expression::Comparison {
                op: crate::ir::ComparisonOp::Gt,
                left: Box::new(Expression::measure("X")),
                right: Box::new(num("0")),
            }),
            then_branch: Box::new(num("1")),
            else_branch: Box::new(num("0")),
        };
        let (out, _) = render_str(&e);
        assert_eq!(out, "IF([X] > 0, 1, 0)");
    }

    #[test]
    fn tuple_renders_as_calculate() {
        let e = Expression::FunctionCall {
            name: "TUPLE".to_string(),
            args: vec![
                Expression::measure("Sales"),
                Expression::MemberRef {
                    hierarchy: "Date".to_string(),
                    level: "Year".to_string(),
                    name: "2023".to_string(),
                },
            ],
        };
        let (out, _) = render_str(&e);
        assert_eq!(out, "CALCULATE([Sales], 'Date'[Year] = 2023)");
    }

    #[test]
    fn ytd_lowers_to_totalytd() {
        let e = Expression::FunctionCall {
            name: "YTD".to_string(),
            args: vec![Expression::measure("Sales")],
        };
        let (out, bag) = render_str(&e);
        assert_eq!(out, "TOTALYTD([Sales], 'Date'[Date])");
        assert!(bag
            .iter()
            .any(|d| d.kind == DiagKind::CalculationTableAssumption));
    }

    #[test]
    fn parallelperiod_passes_through_with_warning() {
        let e = Expression::FunctionCall {
            name: "PARALLELPERIOD".to_string(),
            args: vec![Expression::measure("Sales")],
        };
        let (out, bag) = render_str(&e);
        assert!(out.starts_with("PARALLELPERIOD("));
        assert!(bag
            .iter()
            .any(|d| d.kind == DiagKind::UnsupportedConstruct));
    }

    #[test]
    fn logical_operators_use_dax_symbols() {
        let e = Expression::Logical {
            op: LogicalOp::And,
            operands: vec![
                Expression::Comparison {
                    op: crate::ir::ComparisonOp::Gt,
                    left: Box::new(Expression::measure("A")),
                    right: Box::new(num("0")),
                },
                Expression::Logical {
                    op: LogicalOp::Or,
                    operands: vec![
                        Expression::Comparison {
                            op: crate::ir::ComparisonOp::Eq,
                            left: Box::new(Expression::measure("B")),
                            right: Box::new(num("1")),
                        },
                        Expression::Comparison {
                            op: crate::ir::ComparisonOp::Eq,
                            left: Box::new(Expression::measure("B")),
                            right: Box::new(num("2")),
                        },
                    ],
                },
            ],
        };
        let (out, _) = render_str(&e);
        assert_eq!(out, "[A] > 0 && ([B] = 1 || [B] = 2)");
    }
}
