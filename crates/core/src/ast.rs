//! Concrete parse tree for MDX.
//!
//! Produced by the parser, consumed (and dropped) by the lowerer. Every
//! node carries the span of its originating source text. No semantic
//! normalization happens here -- that is the lowerer's job.

use crate::lexer::Span;

/// A full `WITH … SELECT … FROM … WHERE …` statement.
#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub with_items: Vec<WithItem>,
    pub axes: Vec<AxisSpec>,
    pub cube: CubeSpec,
    pub where_clause: Option<WhereClause>,
    pub span: Span,
}

/// An item of the WITH section.
#[derive(Debug, Clone)]
pub enum WithItem {
    /// `MEMBER path AS expr [, FORMAT_STRING = "…"] [, SOLVE_ORDER = n]`
    Member {
        path: MemberExpr,
        expr: ValueExpr,
        format_string: Option<String>,
        solve_order: Option<i64>,
        span: Span,
    },
    /// `SET alias AS set`
    Set {
        name: String,
        set: SetExpr,
        span: Span,
    },
}

/// One `set ON axis` specification.
#[derive(Debug, Clone)]
pub struct AxisSpec {
    pub non_empty: bool,
    pub set: SetExpr,
    /// Axis ordinal: COLUMNS=0, ROWS=1, PAGES=2, CHAPTERS=3, SECTIONS=4,
    /// or an explicit number / AXIS(n).
    pub ordinal: u32,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum CubeSpec {
    Named {
        name: String,
        database: Option<String>,
        span: Span,
    },
    /// `FROM ( SELECT … )` -- a subselect; only the inner cube survives
    /// lowering.
    Subselect(Box<SelectStatement>),
}

impl CubeSpec {
    pub fn span(&self) -> Span {
        match self {
            CubeSpec::Named { span, .. } => *span,
            CubeSpec::Subselect(inner) => inner.span,
        }
    }
}

/// Set-valued expression on an axis or inside a function call.
#[derive(Debug, Clone)]
pub enum SetExpr {
    /// `{ e1, e2, … }` -- possibly nested, flattened by the lowerer.
    Braced { items: Vec<SetExpr>, span: Span },
    Member(MemberExpr),
    /// `( m1, m2, … )` tuple.
    Tuple { members: Vec<MemberExpr>, span: Span },
    /// `a : b` member range.
    Range {
        from: MemberExpr,
        to: MemberExpr,
        span: Span,
    },
    /// `CROSSJOIN(a, b)`, `DESCENDANTS(…)`, `TOPCOUNT(…)`, …
    Call {
        name: String,
        args: Vec<SetCallArg>,
        span: Span,
    },
    /// `a * b` -- implicit cross product.
    Product {
        left: Box<SetExpr>,
        right: Box<SetExpr>,
        span: Span,
    },
}

impl SetExpr {
    pub fn span(&self) -> Span {
        match self {
            SetExpr::Braced { span, .. }
            | SetExpr::Tuple { span, .. }
            | SetExpr::Range { span, .. }
            | SetExpr::Call { span, .. }
            | SetExpr::Product { span, .. } => *span,
            SetExpr::Member(m) => m.span,
        }
    }
}

/// Argument of a set-producing function call. Distinguished because set
/// functions mix set arguments (`CROSSJOIN`) with scalar ones
/// (`TOPCOUNT(set, 10, measure)`).
#[derive(Debug, Clone)]
pub enum SetCallArg {
    Set(SetExpr),
    Value(ValueExpr),
}

impl SetCallArg {
    pub fn span(&self) -> Span {
        match self {
            SetCallArg::Set(s) => s.span(),
            SetCallArg::Value(v) => v.span(),
        }
    }
}

/// Trailing navigation on a member path.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberOp {
    Members,
    AllMembers,
    Children,
    Parent,
    FirstChild,
    LastChild,
    Lead(i64),
    Lag(i64),
}

/// A dotted member path: `[Product].[Category].[Bikes]`,
/// `[Date].[Calendar Year].&[2023]`, `[Geography].[City].Members`.
#[derive(Debug, Clone)]
pub struct MemberExpr {
    /// Name parts in order, bracket content verbatim.
    pub parts: Vec<String>,
    /// `.&[key]` suffix when present.
    pub key: Option<String>,
    pub op: Option<MemberOp>,
    pub span: Span,
}

impl MemberExpr {
    /// Case-insensitive test for a `[Measures].…` path.
    pub fn is_measure(&self) -> bool {
        self.parts
            .first()
            .is_some_and(|p| p.eq_ignore_ascii_case("Measures"))
    }

    /// Last name part, or the key when the path ends `.&[key]`.
    pub fn leaf(&self) -> Option<&str> {
        if let Some(key) = &self.key {
            return Some(key);
        }
        self.parts.last().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl CmpOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Neq => "<>",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Lte => "<=",
            CmpOp::Gte => ">=",
        }
    }
}

/// Scalar-valued expression (WITH MEMBER bodies, function arguments).
#[derive(Debug, Clone)]
pub enum ValueExpr {
    /// Numeric literal, raw text preserved.
    Number { text: String, span: Span },
    Str { value: String, span: Span },
    Member(MemberExpr),
    Tuple { members: Vec<MemberExpr>, span: Span },
    Unary {
        op: UnaryOp,
        expr: Box<ValueExpr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<ValueExpr>,
        right: Box<ValueExpr>,
        span: Span,
    },
    Call {
        name: String,
        args: Vec<ValueExpr>,
        span: Span,
    },
    /// `IIF(cond, then, else)`
    Iif {
        cond: Box<LogicalExpr>,
        then_value: Box<ValueExpr>,
        else_value: Box<ValueExpr>,
        span: Span,
    },
    /// Simple (`CASE x WHEN v THEN r …`) and searched
    /// (`CASE WHEN cond THEN r …`) CASE, unified: for the simple form each
    /// branch condition is an equality against the scrutinee.
    Case {
        branches: Vec<(LogicalExpr, ValueExpr)>,
        else_value: Option<Box<ValueExpr>>,
        span: Span,
    },
}

impl ValueExpr {
    pub fn span(&self) -> Span {
        match self {
            ValueExpr::Number { span, .. }
            | ValueExpr::Str { span, .. }
            | ValueExpr::Tuple { span, .. }
            | ValueExpr::Unary { span, .. }
            | ValueExpr::Binary { span, .. }
            | ValueExpr::Call { span, .. }
            | ValueExpr::Iif { span, .. }
            | ValueExpr::Case { span, .. } => *span,
            ValueExpr::Member(m) => m.span,
        }
    }
}

/// Null-test variants: `IS NULL | EMPTY | LEAF | DATAMEMBER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsTest {
    Null,
    Empty,
    Leaf,
    DataMember,
}

/// Boolean expression inside WHERE or a condition position.
/// Precedence: NOT > AND > OR > XOR.
#[derive(Debug, Clone)]
pub enum LogicalExpr {
    Comparison {
        op: CmpOp,
        left: ValueExpr,
        right: ValueExpr,
        span: Span,
    },
    And(Box<LogicalExpr>, Box<LogicalExpr>),
    Or(Box<LogicalExpr>, Box<LogicalExpr>),
    Xor(Box<LogicalExpr>, Box<LogicalExpr>),
    Not(Box<LogicalExpr>),
    Is {
        expr: ValueExpr,
        test: IsTest,
        span: Span,
    },
    Between {
        expr: ValueExpr,
        low: ValueExpr,
        high: ValueExpr,
        span: Span,
    },
    In {
        expr: ValueExpr,
        set: SetExpr,
        span: Span,
    },
    /// A bare member used as a condition (slicer shorthand).
    Member(MemberExpr),
}

impl LogicalExpr {
    pub fn span(&self) -> Span {
        match self {
            LogicalExpr::Comparison { span, .. }
            | LogicalExpr::Is { span, .. }
            | LogicalExpr::Between { span, .. }
            | LogicalExpr::In { span, .. } => *span,
            LogicalExpr::And(l, r) | LogicalExpr::Or(l, r) | LogicalExpr::Xor(l, r) => {
                l.span().merge(&r.span())
            }
            LogicalExpr::Not(e) => e.span(),
            LogicalExpr::Member(m) => m.span,
        }
    }
}

#[derive(Debug, Clone)]
pub enum WhereClause {
    /// `WHERE ()` -- explicitly empty, no filters, no warning.
    Empty(Span),
    /// `WHERE (m1, m2, …)` or `WHERE [Dim].[Member]`.
    Tuple { members: Vec<MemberExpr>, span: Span },
    /// `WHERE <logical>`.
    Logical { expr: LogicalExpr, span: Span },
}

impl WhereClause {
    pub fn span(&self) -> Span {
        match self {
            WhereClause::Empty(span) => *span,
            WhereClause::Tuple { span, .. } => *span,
            WhereClause::Logical { span, .. } => *span,
        }
    }
}
