//! WHERE lowering: slicer tuples and logical expressions become filters.

use crate::ast::{CmpOp, LogicalExpr, MemberExpr, SetExpr, ValueExpr, WhereClause};
use crate::diag::DiagKind;
use crate::ir::{
    ComparisonOp, Dimension, DimensionFilter, DimensionFilterOp, Filter, HierarchyReference,
    LevelReference, MeasureFilter, MemberSelection, Query,
};
use crate::lexer::Span;

use super::axes::classify_member;
use super::{level_depth, LowerCtx};

pub(crate) fn lower_where(clause: Option<&WhereClause>, query: &mut Query, ctx: &mut LowerCtx) {
    match clause {
        None => {}
        // `WHERE ()` is explicitly empty: no filters, no warning.
        Some(WhereClause::Empty(_)) => {}
        Some(WhereClause::Tuple { members, .. }) => {
            for member in members {
                lower_slicer_member(member, query, ctx);
            }
        }
        Some(WhereClause::Logical { expr, span }) => {
            let mut conjuncts = Vec::new();
            distribute_and(expr, &mut conjuncts);
            for conjunct in conjuncts {
                lower_condition(conjunct, *span, query, ctx);
            }
        }
    }
}

/// A tuple member becomes an EQUALS filter on its leaf: the key when a
/// `.&[key]` suffix is present, the caption otherwise.
fn lower_slicer_member(member: &MemberExpr, query: &mut Query, ctx: &mut LowerCtx) {
    if member.is_measure() {
        ctx.warn(
            DiagKind::UnsupportedConstruct,
            "a measure in the WHERE slicer does not filter rows; ignored",
            member.span,
        );
        return;
    }
    let target = classify_member(member);
    let Some(value) = target.member.clone().or_else(|| member.leaf().map(str::to_string)) else {
        ctx.warn(
            DiagKind::UnsupportedConstruct,
            "slicer member has no leaf value; ignored",
            member.span,
        );
        return;
    };
    push_dimension_filter(
        query,
        target.table,
        target.hierarchy,
        target.level,
        DimensionFilterOp::Equals,
        vec![value],
        member.span,
    );
}

/// Top-level AND distributes into the filter sequence; everything else is
/// handled per conjunct.
fn distribute_and<'a>(expr: &'a LogicalExpr, out: &mut Vec<&'a LogicalExpr>) {
    match expr {
        LogicalExpr::And(left, right) => {
            distribute_and(left, out);
            distribute_and(right, out);
        }
        other => out.push(other),
    }
}

fn lower_condition(expr: &LogicalExpr, span: Span, query: &mut Query, ctx: &mut LowerCtx) {
    match expr {
        LogicalExpr::Comparison {
            op,
            left,
            right,
            span,
        } => lower_comparison(*op, left, right, *span, query, ctx),
        LogicalExpr::Member(member) => lower_slicer_member(member, query, ctx),
        LogicalExpr::In {
            expr: ValueExpr::Member(member),
            set,
            span,
        } => lower_in(member, set, *span, query, ctx),
        LogicalExpr::Not(inner) => lower_negated(inner, span, query, ctx),
        LogicalExpr::Or(_, _) => lower_or(expr, span, query, ctx),
        LogicalExpr::Between {
            expr: ValueExpr::Member(member),
            low,
            high,
            span,
        } if member.is_measure() => {
            // BETWEEN on a measure splits into a >= / <= pair.
            let name = member.leaf().unwrap_or_default().to_string();
            for (op, bound) in [(ComparisonOp::Gte, low), (ComparisonOp::Lte, high)] {
                if let Some(value) = numeric_value(bound) {
                    query.filters.push(Filter::Measure(MeasureFilter {
                        measure: name.clone(),
                        operator: op,
                        value,
                    }));
                } else {
                    ctx.warn(
                        DiagKind::UnsupportedConstruct,
                        "BETWEEN bound is not a numeric literal; dropped",
                        *span,
                    );
                }
            }
        }
        other => {
            ctx.warn(
                DiagKind::UnsupportedConstruct,
                "WHERE condition outside the supported subset; dropped",
                other.span(),
            );
        }
    }
}

fn lower_comparison(
    op: CmpOp,
    left: &ValueExpr,
    right: &ValueExpr,
    span: Span,
    query: &mut Query,
    ctx: &mut LowerCtx,
) {
    let ValueExpr::Member(member) = left else {
        ctx.warn(
            DiagKind::UnsupportedConstruct,
            "comparison does not start with a member reference; dropped",
            span,
        );
        return;
    };

    if member.is_measure() {
        let Some(value) = numeric_value(right) else {
            ctx.warn(
                DiagKind::UnsupportedConstruct,
                "measure comparison against a non-numeric value; dropped",
                span,
            );
            return;
        };
        query.filters.push(Filter::Measure(MeasureFilter {
            measure: member.leaf().unwrap_or_default().to_string(),
            operator: comparison_op(op),
            value,
        }));
        return;
    }

    let operator = match op {
        CmpOp::Eq => DimensionFilterOp::Equals,
        CmpOp::Neq => DimensionFilterOp::NotEquals,
        _ => {
            ctx.warn(
                DiagKind::UnsupportedConstruct,
                format!(
                    "ordering comparison '{}' on a dimension member is not translated; dropped",
                    op.as_str()
                ),
                span,
            );
            return;
        }
    };
    let Some(value) = literal_value(right) else {
        ctx.warn(
            DiagKind::UnsupportedConstruct,
            "dimension comparison against a non-literal value; dropped",
            span,
        );
        return;
    };
    let target = classify_member(member);
    push_dimension_filter(
        query,
        target.table,
        target.hierarchy,
        target.level,
        operator,
        vec![value],
        span,
    );
}

fn lower_in(member: &MemberExpr, set: &SetExpr, span: Span, query: &mut Query, ctx: &mut LowerCtx) {
    let mut values = Vec::new();
    collect_set_leaves(set, &mut values);
    if values.is_empty() {
        ctx.warn(
            DiagKind::UnsupportedConstruct,
            "IN set has no literal members; dropped",
            span,
        );
        return;
    }
    let target = classify_member(member);
    push_dimension_filter(
        query,
        target.table,
        target.hierarchy,
        target.level,
        DimensionFilterOp::In,
        values,
        span,
    );
}

/// `NOT` over an equality or an IN keeps the filter with the operator
/// flipped; anything else is outside the subset.
fn lower_negated(inner: &LogicalExpr, span: Span, query: &mut Query, ctx: &mut LowerCtx) {
    match inner {
        LogicalExpr::Comparison {
            op: CmpOp::Eq,
            left: ValueExpr::Member(member),
            right,
            ..
        } if !member.is_measure() => {
            if let Some(value) = literal_value(right) {
                let target = classify_member(member);
                push_dimension_filter(
                    query,
                    target.table,
                    target.hierarchy,
                    target.level,
                    DimensionFilterOp::NotEquals,
                    vec![value],
                    span,
                );
                return;
            }
            ctx.warn(
                DiagKind::UnsupportedConstruct,
                "negated comparison against a non-literal value; dropped",
                span,
            );
        }
        LogicalExpr::In {
            expr: ValueExpr::Member(member),
            set,
            ..
        } => {
            let mut values = Vec::new();
            collect_set_leaves(set, &mut values);
            if values.is_empty() {
                ctx.warn(
                    DiagKind::UnsupportedConstruct,
                    "negated IN set has no literal members; dropped",
                    span,
                );
                return;
            }
            let target = classify_member(member);
            push_dimension_filter(
                query,
                target.table,
                target.hierarchy,
                target.level,
                DimensionFilterOp::NotEquals,
                values,
                span,
            );
        }
        _ => ctx.warn(
            DiagKind::UnsupportedConstruct,
            "NOT over this condition is not translated; dropped",
            span,
        ),
    }
}

/// OR folds into a single IN filter when every branch is an equality (or
/// slicer member) on the same dimension level.
fn lower_or(expr: &LogicalExpr, span: Span, query: &mut Query, ctx: &mut LowerCtx) {
    let mut branches = Vec::new();
    collect_or_branches(expr, &mut branches);

    let mut key: Option<(String, String)> = None;
    let mut target = None;
    let mut values = Vec::new();
    for branch in &branches {
        let (member, value) = match branch {
            LogicalExpr::Comparison {
                op: CmpOp::Eq,
                left: ValueExpr::Member(m),
                right,
                ..
            } if !m.is_measure() => match literal_value(right) {
                Some(v) => (m, v),
                None => {
                    ctx.warn(
                        DiagKind::UnsupportedConstruct,
                        "OR branch is not an equality on one dimension; dropped",
                        span,
                    );
                    return;
                }
            },
            LogicalExpr::Member(m) if !m.is_measure() => {
                let t = classify_member(m);
                match t.member.clone() {
                    Some(v) => (m, v),
                    None => {
                        ctx.warn(
                            DiagKind::UnsupportedConstruct,
                            "OR branch member has no leaf value; dropped",
                            span,
                        );
                        return;
                    }
                }
            }
            _ => {
                ctx.warn(
                    DiagKind::UnsupportedConstruct,
                    "OR across different conditions is not translated; dropped",
                    span,
                );
                return;
            }
        };
        let t = classify_member(member);
        let branch_key = (
            t.table.to_ascii_lowercase(),
            t.level.to_ascii_lowercase(),
        );
        match &key {
            None => {
                key = Some(branch_key);
                target = Some(t);
            }
            Some(existing) if *existing == branch_key => {}
            Some(_) => {
                ctx.warn(
                    DiagKind::UnsupportedConstruct,
                    "OR across different dimensions is not translated; dropped",
                    span,
                );
                return;
            }
        }
        values.push(value);
    }

    if let Some(t) = target {
        push_dimension_filter(
            query,
            t.table,
            t.hierarchy,
            t.level,
            DimensionFilterOp::In,
            values,
            span,
        );
    }
}

fn collect_or_branches<'a>(expr: &'a LogicalExpr, out: &mut Vec<&'a LogicalExpr>) {
    match expr {
        LogicalExpr::Or(left, right) => {
            collect_or_branches(left, out);
            collect_or_branches(right, out);
        }
        other => out.push(other),
    }
}

fn push_dimension_filter(
    query: &mut Query,
    table: String,
    hierarchy: String,
    level: String,
    operator: DimensionFilterOp,
    values: Vec<String>,
    span: Span,
) {
    query.filters.push(Filter::Dimension(DimensionFilter {
        dimension: Dimension {
            hierarchy: HierarchyReference { table, hierarchy },
            level: LevelReference {
                depth: level_depth(&level),
                name: level,
            },
            members: MemberSelection::Specific {
                names: values.clone(),
            },
            span,
        },
        operator,
        values,
    }));
}

fn comparison_op(op: CmpOp) -> ComparisonOp {
    match op {
        CmpOp::Eq => ComparisonOp::Eq,
        CmpOp::Neq => ComparisonOp::Neq,
        CmpOp::Lt => ComparisonOp::Lt,
        CmpOp::Gt => ComparisonOp::Gt,
        CmpOp::Lte => ComparisonOp::Lte,
        CmpOp::Gte => ComparisonOp::Gte,
    }
}

fn numeric_value(expr: &ValueExpr) -> Option<f64> {
    match expr {
        ValueExpr::Number { text, .. } => text.parse().ok(),
        ValueExpr::Unary {
            op: crate::ast::UnaryOp::Neg,
            expr,
            ..
        } => numeric_value(expr).map(|v| -v),
        _ => None,
    }
}

/// Literal comparison operand: string, number, or a member whose leaf
/// names the value.
fn literal_value(expr: &ValueExpr) -> Option<String> {
    match expr {
        ValueExpr::Str { value, .. } => Some(value.clone()),
        ValueExpr::Number { text, .. } => Some(text.clone()),
        ValueExpr::Member(m) => m.leaf().map(str::to_string),
        _ => None,
    }
}

/// Leaf captions/keys of all members in a braced set, for IN values.
fn collect_set_leaves(set: &SetExpr, out: &mut Vec<String>) {
    match set {
        SetExpr::Braced { items, .. } => {
            for item in items {
                collect_set_leaves(item, out);
            }
        }
        SetExpr::Member(m) => {
            if let Some(leaf) = m.leaf() {
                out.push(leaf.to_string());
            }
        }
        SetExpr::Tuple { members, .. } => {
            for m in members {
                if let Some(leaf) = m.leaf() {
                    out.push(leaf.to_string());
                }
            }
        }
        _ => {}
    }
}
