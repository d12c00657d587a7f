//! WITH-section lowering: named sets and calculated measures.
//!
//! The target dimension of a calculated member is ignored -- DAX
//! measures are dimensionless. Circular definitions are left for the
//! validator, which drops the whole cycle.

use crate::ast::{
    BinaryOp as AstBinaryOp, CmpOp, LogicalExpr, MemberExpr, UnaryOp as AstUnaryOp, ValueExpr,
    WithItem,
};
use crate::diag::DiagKind;
use crate::ir::{
    Aggregation, BinaryOp, Calculation, CalculationKind, ComparisonOp, Expression, LogicalOp,
    Query, UnaryOp,
};

use super::axes::classify_member;
use super::LowerCtx;

pub(crate) fn lower_with_items(items: &[WithItem], query: &mut Query, ctx: &mut LowerCtx) {
    for item in items {
        match item {
            WithItem::Set { name, set, .. } => {
                ctx.named_sets.insert(name.clone(), set.clone());
            }
            WithItem::Member {
                path,
                expr,
                format_string,
                solve_order,
                span,
            } => {
                let name = match path.leaf() {
                    Some(leaf) => leaf.to_string(),
                    None => {
                        ctx.error(
                            DiagKind::SemanticError,
                            "calculated member has no name",
                            *span,
                        );
                        continue;
                    }
                };
                if !path.is_measure() {
                    ctx.warn(
                        DiagKind::UnsupportedConstruct,
                        format!(
                            "calculated member '{name}' targets a non-measure dimension; \
                             treated as a measure"
                        ),
                        *span,
                    );
                }
                let expression = lower_value_expr(expr, ctx);
                query.calculations.push(Calculation {
                    name: name.clone(),
                    kind: CalculationKind::Measure,
                    expression,
                    solve_order: *solve_order,
                    format_string: format_string.clone(),
                    span: *span,
                });
            }
        }
    }
}

/// Mark projected measures that are really calculations as CUSTOM and
/// carry the calculation body into the measure. A CUSTOM measure always
/// has an expression. Called after axes are lowered.
pub(crate) fn mark_calculated_measures(query: &mut Query) {
    let calcs: Vec<(String, Expression)> = query
        .calculations
        .iter()
        .map(|c| (c.name.clone(), c.expression.clone()))
        .collect();
    for measure in &mut query.measures {
        if let Some((_, expression)) = calcs.iter().find(|(name, _)| *name == measure.name) {
            measure.aggregation = Aggregation::Custom;
            measure.expression = Some(expression.clone());
        }
    }
}

pub(crate) fn lower_value_expr(expr: &ValueExpr, ctx: &mut LowerCtx) -> Expression {
    match expr {
        ValueExpr::Number { text, .. } => Expression::constant_number(text.clone()),
        ValueExpr::Str { value, .. } => Expression::Constant {
            value: crate::ir::Constant::String {
                value: value.clone(),
            },
        },
        ValueExpr::Member(member) => lower_member_ref(member),
        ValueExpr::Tuple { members, .. } => {
            // A tuple in a scalar position evaluates a measure inside a
            // member coordinate; modeled as a TUPLE pseudo-function the
            // DAX emitter turns into CALCULATE.
            Expression::FunctionCall {
                name: "TUPLE".to_string(),
                args: members.iter().map(lower_member_ref).collect(),
            }
        }
        ValueExpr::Unary { op, expr, .. } => Expression::Unary {
            op: match op {
                AstUnaryOp::Neg => UnaryOp::Neg,
                AstUnaryOp::Not => UnaryOp::Not,
            },
            operand: Box::new(lower_value_expr(expr, ctx)),
        },
        ValueExpr::Binary {
            op, left, right, ..
        } => Expression::Binary {
            op: match op {
                AstBinaryOp::Add => BinaryOp::Add,
                AstBinaryOp::Sub => BinaryOp::Sub,
                AstBinaryOp::Mul => BinaryOp::Mul,
                AstBinaryOp::Div => BinaryOp::Div,
                AstBinaryOp::Concat => BinaryOp::Concat,
            },
            left: Box::new(lower_value_expr(left, ctx)),
            right: Box::new(lower_value_expr(right, ctx)),
        },
        ValueExpr::Call { name, args, .. } => Expression::FunctionCall {
            name: name.clone(),
            args: args.iter().map(|a| lower_value_expr(a, ctx)).collect(),
        },
        ValueExpr::Iif {
            cond,
            then_value,
            else_value,
            ..
        } => Expression::Conditional {
            cond: Box::new(lower_logical_expr(cond, ctx)),
            then_branch: Box::new(lower_value_expr(then_value, ctx)),
            else_branch: Box::new(lower_value_expr(else_value, ctx)),
        },
        ValueExpr::Case {
            branches,
            else_value,
            ..
        } => {
            // CASE flattens into a Conditional chain built back to front.
            let mut result = match else_value {
                Some(e) => lower_value_expr(e, ctx),
                None => Expression::FunctionCall {
                    name: "BLANK".to_string(),
                    args: Vec::new(),
                },
            };
            for (cond, value) in branches.iter().rev() {
                result = Expression::Conditional {
                    cond: Box::new(lower_logical_expr(cond, ctx)),
                    then_branch: Box::new(lower_value_expr(value, ctx)),
                    else_branch: Box::new(result),
                };
            }
            result
        }
    }
}

fn lower_member_ref(member: &MemberExpr) -> Expression {
    if member.is_measure() {
        return Expression::MeasureRef {
            name: member.leaf().unwrap_or_default().to_string(),
        };
    }
    let target = classify_member(member);
    Expression::MemberRef {
        hierarchy: target.table,
        level: target.level,
        name: target.member.unwrap_or_default(),
    }
}

pub(crate) fn lower_logical_expr(expr: &LogicalExpr, ctx: &mut LowerCtx) -> Expression {
    match expr {
        LogicalExpr::Comparison {
            op, left, right, ..
        } => Expression::Comparison {
            op: lower_cmp(*op),
            left: Box::new(lower_value_expr(left, ctx)),
            right: Box::new(lower_value_expr(right, ctx)),
        },
        LogicalExpr::And(l, r) => Expression::Logical {
            op: LogicalOp::And,
            operands: vec![lower_logical_expr(l, ctx), lower_logical_expr(r, ctx)],
        },
        LogicalExpr::Or(l, r) => Expression::Logical {
            op: LogicalOp::Or,
            operands: vec![lower_logical_expr(l, ctx), lower_logical_expr(r, ctx)],
        },
        LogicalExpr::Xor(l, r) => {
            // a XOR b == (a OR b) AND NOT (a AND b)
            let a = lower_logical_expr(l, ctx);
            let b = lower_logical_expr(r, ctx);
            Expression::Logical {
                op: LogicalOp::And,
                operands: vec![
                    Expression::Logical {
                        op: LogicalOp::Or,
                        operands: vec![a.clone(), b.clone()],
                    },
                    Expression::Logical {
                        op: LogicalOp::Not,
                        operands: vec![Expression::Logical {
                            op: LogicalOp::And,
                            operands: vec![a, b],
                        }],
                    },
                ],
            }
        }
        LogicalExpr::Not(inner) => Expression::Logical {
            op: LogicalOp::Not,
            operands: vec![lower_logical_expr(inner, ctx)],
        },
        LogicalExpr::Is { expr, test, .. } => {
            let inner = lower_value_expr(expr, ctx);
            match test {
                crate::ast::IsTest::Null | crate::ast::IsTest::Empty => {
                    Expression::FunctionCall {
                        name: "ISBLANK".to_string(),
                        args: vec![inner],
                    }
                }
                crate::ast::IsTest::Leaf | crate::ast::IsTest::DataMember => {
                    ctx.warn(
                        DiagKind::UnsupportedConstruct,
                        "IS LEAF / IS DATAMEMBER has no DAX equivalent; treated as TRUE",
                        expr.span(),
                    );
                    Expression::Constant {
                        value: crate::ir::Constant::Bool { value: true },
                    }
                }
            }
        }
        LogicalExpr::Between {
            expr, low, high, ..
        } => {
            let scrut = lower_value_expr(expr, ctx);
            Expression::Logical {
                op: LogicalOp::And,
                operands: vec![
                    Expression::Comparison {
                        op: ComparisonOp::Gte,
                        left: Box::new(scrut.clone()),
                        right: Box::new(lower_value_expr(low, ctx)),
                    },
                    Expression::Comparison {
                        op: ComparisonOp::Lte,
                        left: Box::new(scrut),
                        right: Box::new(lower_value_expr(high, ctx)),
                    },
                ],
            }
        }
        LogicalExpr::In { expr, span, .. } => {
            ctx.warn(
                DiagKind::UnsupportedConstruct,
                "IN inside a value condition is not translated; treated as TRUE",
                *span,
            );
            let _ = expr;
            Expression::Constant {
                value: crate::ir::Constant::Bool { value: true },
            }
        }
        LogicalExpr::Member(member) => lower_member_ref(member),
    }
}

fn lower_cmp(op: CmpOp) -> ComparisonOp {
    match op {
        CmpOp::Eq => ComparisonOp::Eq,
        CmpOp::Neq => ComparisonOp::Neq,
        CmpOp::Lt => ComparisonOp::Lt,
        CmpOp::Gt => ComparisonOp::Gt,
        CmpOp::Lte => ComparisonOp::Lte,
        CmpOp::Gte => ComparisonOp::Gte,
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::lower_src;
    use crate::ir::{Aggregation, BinaryOp, Expression};

    #[test]
    fn with_member_becomes_measure_calculation() {
        let (q, bag) = lower_src(
            "WITH MEMBER [Measures].[Average Price] AS \
               [Measures].[Sales Amount] / [Measures].[Order Quantity] \
             SELECT {[Measures].[Sales Amount],[Measures].[Order Quantity],\
                     [Measures].[Average Price]} ON 0 FROM [Adventure Works]",
        );
        assert!(bag.is_empty(), "diagnostics: {:?}", bag.as_slice());
        assert_eq!(q.calculations.len(), 1);
        let calc = &q.calculations[0];
        assert_eq!(calc.name, "Average Price");
        assert!(matches!(
            calc.expression,
            Expression::Binary {
                op: BinaryOp::Div,
                ..
            }
        ));
        // The projected entry for the calculation is CUSTOM and carries
        // the defining expression.
        let m = q
            .measures
            .iter()
            .find(|m| m.name == "Average Price")
            .expect("projected");
        assert_eq!(m.aggregation, Aggregation::Custom);
        assert_eq!(m.expression.as_ref(), Some(&calc.expression));
    }

    #[test]
    fn format_string_and_solve_order_survive() {
        let (q, _) = lower_src(
            "WITH MEMBER [Measures].[Margin] AS \
               [Measures].[Profit] / [Measures].[Sales], FORMAT_STRING = \"0.0%\", SOLVE_ORDER = 10 \
             SELECT {[Measures].[Profit], [Measures].[Sales], [Measures].[Margin]} ON 0 FROM [C]",
        );
        let calc = &q.calculations[0];
        assert_eq!(calc.format_string.as_deref(), Some("0.0%"));
        assert_eq!(calc.solve_order, Some(10));
    }

    #[test]
    fn iif_lowers_to_conditional() {
        let (q, _) = lower_src(
            "WITH MEMBER [Measures].[Flag] AS IIF([Measures].[Sales] > 0, 1, 0) \
             SELECT {[Measures].[Sales], [Measures].[Flag]} ON 0 FROM [C]",
        );
        assert!(matches!(
            q.calculations[0].expression,
            Expression::Conditional { .. }
        ));
    }

    #[test]
    fn case_flattens_to_conditional_chain() {
        let (q, _) = lower_src(
            "WITH MEMBER [Measures].[Band] AS \
               CASE WHEN [Measures].[Sales] > 100 THEN 2 WHEN [Measures].[Sales] > 10 THEN 1 ELSE 0 END \
             SELECT {[Measures].[Sales], [Measures].[Band]} ON 0 FROM [C]",
        );
        let Expression::Conditional { else_branch, .. } = &q.calculations[0].expression else {
            panic!("expected conditional")
        };
        assert!(matches!(**else_branch, Expression::Conditional { .. }));
    }

    #[test]
    fn non_measure_member_target_warns_but_lowers() {
        let (q, bag) = lower_src(
            "WITH MEMBER [Product].[Category].[Total] AS 1 \
             SELECT {[Measures].[X]} ON 0 FROM [C]",
        );
        assert_eq!(q.calculations.len(), 1);
        assert!(bag
            .iter()
            .any(|d| d.kind == crate::diag::DiagKind::UnsupportedConstruct));
    }
}
