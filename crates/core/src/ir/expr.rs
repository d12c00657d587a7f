//! The algebraic expression tree shared by calculations and filters.
//!
//! Acyclic by construction: references are by name, never by node
//! identity. The calculation dependency check in [`super::validate`]
//! walks [`Expression::measure_refs`] edges.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constant {
    /// Numeric literal with the source spelling preserved, so `1.5E+6`
    /// emits exactly as written.
    Number { raw: String },
    String { value: String },
    Bool { value: bool },
}

impl Constant {
    pub fn number(raw: impl Into<String>) -> Self {
        Constant::Number { raw: raw.into() }
    }

    /// Numeric value when this constant is a parseable number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Constant::Number { raw } => raw.parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl ComparisonOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Neq => "<>",
            ComparisonOp::Lt => "<",
            ComparisonOp::Gt => ">",
            ComparisonOp::Lte => "<=",
            ComparisonOp::Gte => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expression {
    Constant { value: Constant },
    MeasureRef { name: String },
    MemberRef {
        hierarchy: String,
        level: String,
        name: String,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Comparison {
        op: ComparisonOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Logical {
        op: LogicalOp,
        operands: Vec<Expression>,
    },
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    Conditional {
        cond: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
    },
}

impl Expression {
    pub fn constant_number(raw: impl Into<String>) -> Self {
        Expression::Constant {
            value: Constant::number(raw),
        }
    }

    pub fn measure(name: impl Into<String>) -> Self {
        Expression::MeasureRef { name: name.into() }
    }

    /// All measure names referenced anywhere in this tree, in visit
    /// order, duplicates preserved.
    pub fn measure_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_measure_refs(&mut refs);
        refs
    }

    fn collect_measure_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expression::MeasureRef { name } => out.push(name),
            Expression::Constant { .. } | Expression::MemberRef { .. } => {}
            Expression::Unary { operand, .. } => operand.collect_measure_refs(out),
            Expression::Binary { left, right, .. }
            | Expression::Comparison { left, right, .. } => {
                left.collect_measure_refs(out);
                right.collect_measure_refs(out);
            }
            Expression::Logical { operands, .. } => {
                for op in operands {
                    op.collect_measure_refs(out);
                }
            }
            Expression::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_measure_refs(out);
                }
            }
            Expression::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.collect_measure_refs(out);
                then_branch.collect_measure_refs(out);
                else_branch.collect_measure_refs(out);
            }
        }
    }

    /// Node count, used by the linter to decide whether a calculation is
    /// simple enough to inline.
    pub fn size(&self) -> usize {
        1 + match self {
            Expression::Constant { .. }
            | Expression::MeasureRef { .. }
            | Expression::MemberRef { .. } => 0,
            Expression::Unary { operand, .. } => operand.size(),
            Expression::Binary { left, right, .. }
            | Expression::Comparison { left, right, .. } => left.size() + right.size(),
            Expression::Logical { operands, .. } => operands.iter().map(Expression::size).sum(),
            Expression::FunctionCall { args, .. } => args.iter().map(Expression::size).sum(),
            Expression::Conditional {
                cond,
                then_branch,
                else_branch,
            } => cond.size() + then_branch.size() + else_branch.size(),
        }
    }

    /// Replace every `MeasureRef` to `name` with `replacement`.
    pub fn substitute_measure(&self, name: &str, replacement: &Expression) -> Expression {
        match self {
            Expression::MeasureRef { name: n } if n == name => replacement.clone(),
            Expression::Constant { .. }
            | Expression::MeasureRef { .. }
            | Expression::MemberRef { .. } => self.clone(),
            Expression::Unary { op, operand } => Expression::Unary {
                op: *op,
                operand: Box::new(operand.substitute_measure(name, replacement)),
            },
            Expression::Binary { op, left, right } => Expression::Binary {
                op: *op,
                left: Box::new(left.substitute_measure(name, replacement)),
                right: Box::new(right.substitute_measure(name, replacement)),
            },
            Expression::Comparison { op, left, right } => Expression::Comparison {
                op: *op,
                left: Box::new(left.substitute_measure(name, replacement)),
                right: Box::new(right.substitute_measure(name, replacement)),
            },
            Expression::Logical { op, operands } => Expression::Logical {
                op: *op,
                operands: operands
                    .iter()
                    .map(|o| o.substitute_measure(name, replacement))
                    .collect(),
            },
            Expression::FunctionCall { name: f, args } => Expression::FunctionCall {
                name: f.clone(),
                args: args
                    .iter()
                    .map(|a| a.substitute_measure(name, replacement))
                    .collect(),
            },
            Expression::Conditional {
                cond,
                then_branch,
                else_branch,
            } => Expression::Conditional {
                cond: Box::new(cond.substitute_measure(name, replacement)),
                then_branch: Box::new(then_branch.substitute_measure(name, replacement)),
                else_branch: Box::new(else_branch.substitute_measure(name, replacement)),
            },
        }
    }
}
