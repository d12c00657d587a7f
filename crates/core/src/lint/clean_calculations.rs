//! Pass 5: calculation cleanup.
//!
//! Rewrites `a / b` into the safe-division marker (a DIVIDE call, which
//! the emitter would produce anyway -- canonicalizing here keeps the IR
//! and the output in lockstep), folds numeric-only subtrees, and removes
//! double negation. All rewrites preserve what the DAX emitter observes:
//! DIVIDE returns BLANK on a zero denominator, matching MDX's empty-cell
//! arithmetic.

use crate::ir::{BinaryOp, Constant, Expression, LogicalOp, Query, UnaryOp};

use super::LintCtx;

pub(super) fn run(query: &Query, _ctx: &mut LintCtx) -> Query {
    let mut next = query.clone();
    for calc in &mut next.calculations {
        calc.expression = simplify(&calc.expression);
    }
    for measure in &mut next.measures {
        if let Some(expr) = &measure.expression {
            measure.expression = Some(simplify(expr));
        }
    }
    next
}

pub(crate) fn simplify(expr: &Expression) -> Expression {
    match expr {
        Expression::Binary { op, left, right } => {
            let left = simplify(left);
            let right = simplify(right);
            // Safe-division canonical form.
            if *op == BinaryOp::Div {
                return Expression::FunctionCall {
                    name: "DIVIDE".to_string(),
                    args: vec![left, right],
                };
            }
            if let Some(folded) = fold_numeric(*op, &left, &right) {
                return folded;
            }
            Expression::Binary {
                op: *op,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        Expression::Unary { op, operand } => {
            let inner = simplify(operand);
            // -(-x) => x
            if *op == UnaryOp::Neg {
                if let Expression::Unary {
                    op: UnaryOp::Neg,
                    operand: nested,
                } = &inner
                {
                    return (**nested).clone();
                }
            }
            Expression::Unary {
                op: *op,
                operand: Box::new(inner),
            }
        }
        Expression::Logical { op, operands } => {
            let operands: Vec<Expression> = operands.iter().map(simplify).collect();
            // NOT(NOT(x)) => x
            if *op == LogicalOp::Not && operands.len() == 1 {
                if let Expression::Logical {
                    op: LogicalOp::Not,
                    operands: nested,
                } = &operands[0]
                {
                    if nested.len() == 1 {
                        return nested[0].clone();
                    }
                }
            }
            Expression::Logical {
                op: *op,
                operands,
            }
        }
        Expression::Comparison { op, left, right } => Expression::Comparison {
            op: *op,
            left: Box::new(simplify(left)),
            right: Box::new(simplify(right)),
        },
        Expression::FunctionCall { name, args } => Expression::FunctionCall {
            name: name.clone(),
            args: args.iter().map(simplify).collect(),
        },
        Expression::Conditional {
            cond,
            then_branch,
            else_branch,
        } => Expression::Conditional {
            cond: Box::new(simplify(cond)),
            then_branch: Box::new(simplify(then_branch)),
            else_branch: Box::new(simplify(else_branch)),
        },
        Expression::Constant { .. }
        | Expression::MeasureRef { .. }
        | Expression::MemberRef { .. } => expr.clone(),
    }
}

/// Fold `<number> op <number>` for +, -, *. Division is already
/// canonicalized away and never folded, keeping BLANK-on-zero behavior.
fn fold_numeric(op: BinaryOp, left: &Expression, right: &Expression) -> Option<Expression> {
    let (Expression::Constant { value: l }, Expression::Constant { value: r }) = (left, right)
    else {
        return None;
    };
    let (l, r) = (l.as_f64()?, r.as_f64()?);
    let folded = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div | BinaryOp::Concat => return None,
    };
    Some(Expression::Constant {
        value: Constant::number(format_number(folded)),
    })
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}
