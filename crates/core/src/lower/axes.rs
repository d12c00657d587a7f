//! Axis lowering: set walking, measure extraction, dimension building.

use crate::ast::{AxisSpec, MemberExpr, MemberOp, SetCallArg, SetExpr};
use crate::diag::DiagKind;
use crate::ir::{
    DescendantsMode, Dimension, HierarchyReference, LevelReference, Limit, LimitDirection,
    Measure, MemberSelection, NonEmptyFilter, OrderBy, Query, SortDirection,
};
use crate::lexer::Span;

use super::{level_depth, LowerCtx};

/// Nested brace depth at which the excessive-nesting warning fires.
const NESTING_WARN_DEPTH: usize = 3;

/// State accumulated while walking one axis set.
struct AxisState {
    measures: Vec<Measure>,
    dims: Vec<DimBuilder>,
    order_by: Vec<OrderBy>,
    limit: Option<Limit>,
    non_empty_measure: Option<Option<String>>,
    max_brace_depth: usize,
}

struct DimBuilder {
    hierarchy: HierarchyReference,
    level: LevelReference,
    members: MemberSelection,
    span: Span,
}

pub(crate) fn lower_axes(axes: &[AxisSpec], query: &mut Query, ctx: &mut LowerCtx) {
    let mut ordered: Vec<&AxisSpec> = axes.iter().collect();
    ordered.sort_by_key(|a| a.ordinal);

    let mut any_non_empty = false;
    for axis in ordered {
        let mut st = AxisState {
            measures: Vec::new(),
            dims: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            non_empty_measure: None,
            max_brace_depth: 0,
        };
        walk_set(&axis.set, 0, &mut st, ctx);

        if st.max_brace_depth >= NESTING_WARN_DEPTH {
            ctx.warn(
                DiagKind::ExcessiveNesting,
                format!(
                    "set on axis {} is nested {} levels deep",
                    axis.ordinal, st.max_brace_depth
                ),
                axis.span,
            );
        }
        if !st.measures.is_empty() && !st.dims.is_empty() {
            ctx.warn(
                DiagKind::MixedAxis,
                format!(
                    "axis {} mixes measures and dimension members; measures moved to the projection",
                    axis.ordinal
                ),
                axis.span,
            );
        }

        collapse_hierarchy_levels(&mut st.dims, ctx);

        query.measures.append(&mut st.measures);
        query
            .dimensions
            .extend(st.dims.into_iter().map(|b| Dimension {
                hierarchy: b.hierarchy,
                level: b.level,
                members: b.members,
                span: b.span,
            }));
        if !st.order_by.is_empty() {
            query.order_by.append(&mut st.order_by);
        }
        if let Some(limit) = st.limit {
            if query.limit.is_some() {
                ctx.warn(
                    DiagKind::NormalizationWarning,
                    "more than one TopCount/BottomCount; keeping the first",
                    axis.span,
                );
            } else {
                query.limit = Some(limit);
            }
        }

        if axis.non_empty || st.non_empty_measure.is_some() {
            any_non_empty = true;
        }
    }

    // NON EMPTY axes contribute a single deduplicated filter.
    if any_non_empty {
        query
            .filters
            .push(crate::ir::Filter::NonEmpty(NonEmptyFilter { measure: None }));
    }
}

fn walk_set(set: &SetExpr, brace_depth: usize, st: &mut AxisState, ctx: &mut LowerCtx) {
    match set {
        SetExpr::Braced { items, .. } => {
            let inner = brace_depth + 1;
            st.max_brace_depth = st.max_brace_depth.max(inner);
            let mut last_member: Option<&MemberExpr> = None;
            for item in items {
                // Deduplicate consecutive identical dimension members
                // early; the linter does the order-insensitive pass
                // later. Measures are left alone so the duplicate-
                // measure rule can warn about them by name.
                if let SetExpr::Member(m) = item {
                    if !m.is_measure() && last_member.is_some_and(|prev| same_member(prev, m)) {
                        continue;
                    }
                    last_member = Some(m);
                } else {
                    last_member = None;
                }
                walk_set(item, inner, st, ctx);
            }
        }
        SetExpr::Member(member) => {
            // A lone unqualified name may reference a WITH SET alias.
            // The alias is taken out of scope while its body expands, so
            // a self-referential set cannot recurse forever.
            if member.parts.len() == 1 && member.key.is_none() && member.op.is_none() {
                let alias = ctx
                    .named_sets
                    .keys()
                    .find(|k| k.eq_ignore_ascii_case(&member.parts[0]))
                    .cloned();
                if let Some(alias) = alias {
                    let body = ctx.named_sets.remove(&alias).expect("alias present");
                    walk_set(&body, brace_depth, st, ctx);
                    ctx.named_sets.insert(alias, body);
                    return;
                }
            }
            lower_member(member, st, ctx);
        }
        SetExpr::Tuple { members, .. } => {
            for member in members {
                lower_member(member, st, ctx);
            }
        }
        SetExpr::Range { from, to, span } => {
            lower_range(from, to, *span, st, ctx);
        }
        SetExpr::Product { left, right, .. } => {
            walk_set(left, brace_depth, st, ctx);
            walk_set(right, brace_depth, st, ctx);
        }
        SetExpr::Call { name, args, span } => {
            lower_set_call(name, args, *span, brace_depth, st, ctx);
        }
    }
}

fn same_member(a: &MemberExpr, b: &MemberExpr) -> bool {
    a.parts == b.parts && a.key == b.key && a.op == b.op
}

// ── Member classification ────────────────────────────────────────────

/// Where a member path points: table, level, and what it selects.
pub(crate) struct MemberTarget {
    pub table: String,
    pub hierarchy: String,
    pub level: String,
    pub member: Option<String>,
}

/// Resolve a member path to its table/level coordinates.
///
/// `[T]` selects everything at `T`; `[T].[L]` all members of level `L`;
/// `[T].[L].[M]` (or a `.&[key]` suffix) the specific member `M`.
pub(crate) fn classify_member(member: &MemberExpr) -> MemberTarget {
    let parts = &member.parts;
    let table = parts.first().cloned().unwrap_or_default();
    let hierarchy = parts.get(1).cloned().unwrap_or_else(|| table.clone());

    if let Some(key) = &member.key {
        let level = parts.last().cloned().unwrap_or_else(|| table.clone());
        return MemberTarget {
            table,
            hierarchy,
            level,
            member: Some(key.clone()),
        };
    }

    match member.op {
        Some(MemberOp::Members) | Some(MemberOp::AllMembers) => MemberTarget {
            table,
            hierarchy,
            level: parts.last().cloned().unwrap_or_default(),
            member: None,
        },
        _ => {
            if parts.len() >= 3 {
                MemberTarget {
                    table,
                    hierarchy,
                    level: parts[parts.len() - 2].clone(),
                    member: Some(parts[parts.len() - 1].clone()),
                }
            } else if member.op.is_some() {
                // `.Children` and friends on a short path: the leaf is
                // the navigated member.
                MemberTarget {
                    table,
                    hierarchy: hierarchy.clone(),
                    level: hierarchy.clone(),
                    member: parts.last().cloned(),
                }
            } else if parts.len() == 2 {
                // Bare `[T].[L]`: read as the whole level.
                MemberTarget {
                    table,
                    hierarchy: hierarchy.clone(),
                    level: hierarchy,
                    member: None,
                }
            } else {
                MemberTarget {
                    table: table.clone(),
                    hierarchy: table.clone(),
                    level: table.clone(),
                    member: None,
                }
            }
        }
    }
}

fn lower_member(member: &MemberExpr, st: &mut AxisState, ctx: &mut LowerCtx) {
    if member.is_measure() {
        let name = member
            .leaf()
            .map(str::to_string)
            .unwrap_or_else(|| "Measures".to_string());
        st.measures.push(Measure::simple(name, member.span));
        return;
    }

    let target = classify_member(member);
    let selection = match member.op {
        Some(MemberOp::Members) | Some(MemberOp::AllMembers) | None if target.member.is_none() => {
            MemberSelection::All
        }
        Some(MemberOp::Children) => MemberSelection::Children {
            parent: target.member.clone().unwrap_or_else(|| target.level.clone()),
        },
        Some(MemberOp::Parent)
        | Some(MemberOp::FirstChild)
        | Some(MemberOp::LastChild)
        | Some(MemberOp::Lead(_))
        | Some(MemberOp::Lag(_)) => {
            ctx.warn(
                DiagKind::UnsupportedConstruct,
                format!(
                    "member navigation '{:?}' is approximated by the navigated member",
                    member.op.as_ref().expect("checked above")
                ),
                member.span,
            );
            match &target.member {
                Some(name) => MemberSelection::Specific {
                    names: vec![name.clone()],
                },
                None => MemberSelection::All,
            }
        }
        _ => match &target.member {
            Some(name) => MemberSelection::Specific {
                names: vec![name.clone()],
            },
            None => MemberSelection::All,
        },
    };

    merge_dim(st, target, selection, member.span);
}

fn lower_range(
    from: &MemberExpr,
    to: &MemberExpr,
    span: Span,
    st: &mut AxisState,
    ctx: &mut LowerCtx,
) {
    let from_target = classify_member(from);
    let to_target = classify_member(to);
    if !from_target.table.eq_ignore_ascii_case(&to_target.table) {
        ctx.warn(
            DiagKind::UnsupportedConstruct,
            "member range endpoints are in different hierarchies",
            span,
        );
    }
    let selection = MemberSelection::Range {
        from: from_target.member.clone().unwrap_or_default(),
        to: to_target.member.clone().unwrap_or_default(),
    };
    merge_dim(st, from_target, selection, span);
}

/// Merge a classified selection into the axis dimension list.
/// Same (table, level): SPECIFIC lists append, ALL absorbs everything.
fn merge_dim(st: &mut AxisState, target: MemberTarget, selection: MemberSelection, span: Span) {
    let key = (
        target.table.to_ascii_lowercase(),
        target.level.to_ascii_lowercase(),
    );
    if let Some(existing) = st.dims.iter_mut().find(|d| {
        (
            d.hierarchy.table.to_ascii_lowercase(),
            d.level.name.to_ascii_lowercase(),
        ) == key
    }) {
        existing.members = merge_selection(existing.members.clone(), selection);
        return;
    }
    st.dims.push(DimBuilder {
        hierarchy: HierarchyReference {
            table: target.table,
            hierarchy: target.hierarchy,
        },
        level: LevelReference {
            depth: level_depth(&target.level),
            name: target.level,
        },
        members: selection,
        span,
    });
}

fn merge_selection(current: MemberSelection, incoming: MemberSelection) -> MemberSelection {
    match (current, incoming) {
        (MemberSelection::All, _) | (_, MemberSelection::All) => MemberSelection::All,
        (
            MemberSelection::Specific { mut names },
            MemberSelection::Specific { names: more },
        ) => {
            names.extend(more);
            MemberSelection::Specific { names }
        }
        // Heterogeneous selections on one level: the first one wins; the
        // linter reports leftover duplicates.
        (current, _) => current,
    }
}

/// §4.3 hierarchy collapse: several whole-level selections on the same
/// table keep only the deepest level.
fn collapse_hierarchy_levels(dims: &mut Vec<DimBuilder>, ctx: &mut LowerCtx) {
    let mut redundant: Vec<usize> = Vec::new();
    let tables: Vec<String> = dims
        .iter()
        .map(|d| d.hierarchy.table.to_ascii_lowercase())
        .collect();

    let mut reported = Vec::new();
    for (i, dim) in dims.iter().enumerate() {
        if !matches!(dim.members, MemberSelection::All) {
            continue;
        }
        let all_levels: Vec<usize> = dims
            .iter()
            .enumerate()
            .filter(|(j, d)| tables[*j] == tables[i] && matches!(d.members, MemberSelection::All))
            .map(|(j, _)| j)
            .collect();
        if all_levels.len() < 2 {
            continue;
        }
        // Deepest known depth wins; unknown depths lose to known ones,
        // and among unknowns the last listed wins.
        let keep = *all_levels
            .iter()
            .max_by_key(|&&j| (dims[j].level.depth.unwrap_or(0), j))
            .expect("non-empty");
        if i != keep && !redundant.contains(&i) {
            redundant.push(i);
            if !reported.contains(&tables[i]) {
                reported.push(tables[i].clone());
                ctx.warn(
                    DiagKind::RedundantHierarchyLevels,
                    format!(
                        "multiple levels of '{}' enumerated; keeping the deepest ('{}')",
                        dims[i].hierarchy.table, dims[keep].level.name
                    ),
                    dims[i].span,
                );
            }
        }
    }
    let mut index = 0;
    dims.retain(|_| {
        let drop = redundant.contains(&index);
        index += 1;
        !drop
    });
}

// ── Set-producing function calls ─────────────────────────────────────

fn lower_set_call(
    name: &str,
    args: &[SetCallArg],
    span: Span,
    brace_depth: usize,
    st: &mut AxisState,
    ctx: &mut LowerCtx,
) {
    match name {
        "CROSSJOIN" | "NONEMPTYCROSSJOIN" => {
            for arg in args {
                match arg {
                    SetCallArg::Set(set) => walk_set(set, brace_depth, st, ctx),
                    SetCallArg::Value(v) => ctx.warn(
                        DiagKind::UnsupportedConstruct,
                        "non-set argument to CROSSJOIN ignored",
                        v.span(),
                    ),
                }
            }
            if name == "NONEMPTYCROSSJOIN" {
                st.non_empty_measure = Some(None);
            }
        }
        "UNION" | "HIERARCHIZE" => {
            for arg in args {
                if let SetCallArg::Set(set) = arg {
                    walk_set(set, brace_depth, st, ctx);
                }
            }
        }
        "INTERSECT" | "EXCEPT" => {
            ctx.warn(
                DiagKind::UnsupportedConstruct,
                format!("{name} is approximated by its first operand"),
                span,
            );
            if let Some(SetCallArg::Set(set)) = args.first() {
                walk_set(set, brace_depth, st, ctx);
            }
        }
        "DESCENDANTS" => lower_descendants(args, span, st, ctx),
        "NONEMPTY" => {
            if let Some(SetCallArg::Set(set)) = args.first() {
                walk_set(set, brace_depth, st, ctx);
            }
            let measure = args.get(1).and_then(arg_measure_name);
            st.non_empty_measure = Some(measure);
        }
        "FILTER" => {
            ctx.warn(
                DiagKind::UnsupportedConstruct,
                "set-level FILTER predicate is not translated; the unfiltered set is used",
                span,
            );
            if let Some(SetCallArg::Set(set)) = args.first() {
                walk_set(set, brace_depth, st, ctx);
            }
        }
        "TOPCOUNT" | "BOTTOMCOUNT" | "HEAD" | "TAIL" => {
            lower_limit_call(name, args, span, brace_depth, st, ctx)
        }
        "ORDER" => lower_order(args, span, brace_depth, st, ctx),
        other => {
            ctx.warn(
                DiagKind::UnsupportedConstruct,
                format!("set function '{other}' is not translated; lowering its set arguments"),
                span,
            );
            for arg in args {
                if let SetCallArg::Set(set) = arg {
                    walk_set(set, brace_depth, st, ctx);
                }
            }
        }
    }
}

fn lower_descendants(args: &[SetCallArg], span: Span, st: &mut AxisState, ctx: &mut LowerCtx) {
    let Some(ancestor) = args.first().and_then(arg_member) else {
        ctx.error(
            DiagKind::SemanticError,
            "DESCENDANTS requires a member as its first argument",
            span,
        );
        return;
    };
    let target = classify_member(&ancestor);
    let ancestor_name = target
        .member
        .clone()
        .unwrap_or_else(|| target.level.clone());

    let leaf_level = args.get(1).and_then(arg_member).map(|m| {
        m.leaf().map(str::to_string).unwrap_or_default()
    });

    let mode = match args.get(2).and_then(arg_flag).as_deref() {
        None | Some("SELF") | Some("SELF_AND_AFTER") | Some("AFTER") => {
            DescendantsMode::SelfAndAfter
        }
        Some("SELF_AND_BEFORE") | Some("BEFORE") => DescendantsMode::SelfAndBefore,
        Some("LEAVES") => DescendantsMode::Leaves,
        Some(other) => {
            ctx.warn(
                DiagKind::UnsupportedConstruct,
                format!("DESCENDANTS flag '{other}' is not recognized; using SELF_AND_AFTER"),
                span,
            );
            DescendantsMode::SelfAndAfter
        }
    };

    let level_name = leaf_level.clone().unwrap_or_else(|| target.level.clone());
    st.dims.push(DimBuilder {
        hierarchy: HierarchyReference {
            table: target.table,
            hierarchy: target.hierarchy,
        },
        level: LevelReference {
            depth: level_depth(&level_name),
            name: level_name,
        },
        members: MemberSelection::Descendants {
            ancestor: ancestor_name,
            leaf_level,
            mode,
        },
        span,
    });
}

fn lower_limit_call(
    name: &str,
    args: &[SetCallArg],
    span: Span,
    brace_depth: usize,
    st: &mut AxisState,
    ctx: &mut LowerCtx,
) {
    if let Some(SetCallArg::Set(set)) = args.first() {
        walk_set(set, brace_depth, st, ctx);
    }
    let count = match args.get(1) {
        Some(SetCallArg::Value(crate::ast::ValueExpr::Number { text, .. })) => {
            text.parse::<u64>().ok()
        }
        _ => None,
    };
    let Some(count) = count else {
        ctx.error(
            DiagKind::SemanticError,
            format!("{name} requires a literal count as its second argument"),
            span,
        );
        return;
    };
    let direction = if name == "BOTTOMCOUNT" || name == "TAIL" {
        LimitDirection::Bottom
    } else {
        LimitDirection::Top
    };
    st.limit = Some(Limit { count, direction });

    if let Some(measure) = args.get(2).and_then(arg_measure_name) {
        st.order_by.push(OrderBy {
            column: measure,
            direction: if direction == LimitDirection::Bottom {
                SortDirection::Asc
            } else {
                SortDirection::Desc
            },
        });
    }
}

fn lower_order(
    args: &[SetCallArg],
    span: Span,
    brace_depth: usize,
    st: &mut AxisState,
    ctx: &mut LowerCtx,
) {
    if let Some(SetCallArg::Set(set)) = args.first() {
        walk_set(set, brace_depth, st, ctx);
    }
    let Some(column) = args.get(1).and_then(arg_measure_name) else {
        ctx.warn(
            DiagKind::UnsupportedConstruct,
            "ORDER sort key is not a measure reference; ordering dropped",
            span,
        );
        return;
    };
    let direction = match args.get(2).and_then(arg_flag).as_deref() {
        Some("DESC") | Some("BDESC") => SortDirection::Desc,
        _ => SortDirection::Asc,
    };
    st.order_by.push(OrderBy { column, direction });
}

// ── Argument helpers ─────────────────────────────────────────────────

fn arg_member(arg: &SetCallArg) -> Option<MemberExpr> {
    match arg {
        SetCallArg::Set(SetExpr::Member(m)) => Some(m.clone()),
        SetCallArg::Set(SetExpr::Braced { items, .. }) if items.len() == 1 => {
            arg_member(&SetCallArg::Set(items[0].clone()))
        }
        SetCallArg::Value(crate::ast::ValueExpr::Member(m)) => Some(m.clone()),
        _ => None,
    }
}

fn arg_measure_name(arg: &SetCallArg) -> Option<String> {
    let member = arg_member(arg)?;
    if member.is_measure() {
        member.leaf().map(str::to_string)
    } else {
        None
    }
}

/// A bare identifier used as a function flag (`SELF_AND_BEFORE`, `DESC`).
fn arg_flag(arg: &SetCallArg) -> Option<String> {
    let member = arg_member(arg)?;
    if member.parts.len() == 1 && member.key.is_none() && member.op.is_none() {
        Some(member.parts[0].to_ascii_uppercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::lower_src;
    use crate::diag::DiagKind;
    use crate::ir::{DescendantsMode, LimitDirection, MemberSelection, SortDirection};

    #[test]
    fn members_becomes_all_selection() {
        let (q, bag) = lower_src(
            "SELECT {[Measures].[Sales Amount]} ON 0, {[Product].[Category].Members} ON 1 FROM [C]",
        );
        assert!(bag.is_empty(), "diagnostics: {:?}", bag.as_slice());
        assert_eq!(q.dimensions.len(), 1);
        let d = &q.dimensions[0];
        assert_eq!(d.hierarchy.table, "Product");
        assert_eq!(d.level.name, "Category");
        assert_eq!(d.members, MemberSelection::All);
    }

    #[test]
    fn specific_members_merge_into_one_dimension() {
        let (q, _) = lower_src(
            "SELECT {[Measures].[X]} ON 0, \
             {[Product].[Category].[Bikes], [Product].[Category].[Accessories]} ON 1 FROM [C]",
        );
        assert_eq!(q.dimensions.len(), 1);
        assert_eq!(
            q.dimensions[0].members,
            MemberSelection::Specific {
                names: vec!["Bikes".to_string(), "Accessories".to_string()]
            }
        );
    }

    #[test]
    fn crossjoin_expands_to_multiple_dimensions() {
        let (q, _) = lower_src(
            "SELECT {[Measures].[X]} ON 0, \
             CROSSJOIN({[Product].[Category].Members}, {[Geography].[Country].Members}) ON 1 FROM [C]",
        );
        assert_eq!(q.dimensions.len(), 2);
        assert_eq!(q.dimensions[0].hierarchy.table, "Product");
        assert_eq!(q.dimensions[1].hierarchy.table, "Geography");
    }

    #[test]
    fn implicit_product_matches_crossjoin() {
        let (q, _) = lower_src(
            "SELECT {[Measures].[X]} ON 0, \
             {[Product].[Category].Members} * {[Geography].[Country].Members} ON 1 FROM [C]",
        );
        assert_eq!(q.dimensions.len(), 2);
    }

    #[test]
    fn redundant_levels_collapse_to_deepest() {
        let (q, bag) = lower_src(
            "SELECT {[Measures].[Sales Amount]} ON 0,\n\
             {[Geography].[Country].Members,\n [Geography].[State].Members,\n \
              [Geography].[City].Members,\n [Geography].[PostalCode].Members} ON 1\nFROM [C]",
        );
        assert_eq!(q.dimensions.len(), 1);
        assert_eq!(q.dimensions[0].level.name, "PostalCode");
        let warnings: Vec<_> = bag
            .iter()
            .filter(|d| d.kind == DiagKind::RedundantHierarchyLevels)
            .collect();
        assert_eq!(warnings.len(), 1, "exactly one collapse warning");
    }

    #[test]
    fn unknown_levels_keep_last_listed() {
        let (q, _) = lower_src(
            "SELECT {[Measures].[X]} ON 0, \
             {[Org].[Alpha].Members, [Org].[Beta].Members} ON 1 FROM [C]",
        );
        assert_eq!(q.dimensions.len(), 1);
        assert_eq!(q.dimensions[0].level.name, "Beta");
    }

    #[test]
    fn deep_nesting_warns_once_per_axis() {
        let (_, bag) = lower_src(
            "SELECT NON EMPTY {{[Measures].[Sales Amount]}} ON 0, \
             NON EMPTY {{{[Product].[Category].Members}}} ON 1 FROM [C]",
        );
        let nesting: Vec<_> = bag
            .iter()
            .filter(|d| d.kind == DiagKind::ExcessiveNesting)
            .collect();
        assert_eq!(nesting.len(), 1);
    }

    #[test]
    fn non_empty_yields_single_filter_across_axes() {
        let (q, _) = lower_src(
            "SELECT NON EMPTY {[Measures].[X]} ON 0, \
             NON EMPTY {[Product].[Category].Members} ON 1 FROM [C]",
        );
        let count = q
            .filters
            .iter()
            .filter(|f| matches!(f, crate::ir::Filter::NonEmpty(_)))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn mixed_axis_warns_and_splits() {
        let (q, bag) = lower_src(
            "SELECT {[Measures].[X], [Product].[Category].Members} ON 0 FROM [C]",
        );
        assert!(bag.iter().any(|d| d.kind == DiagKind::MixedAxis));
        assert_eq!(q.measures.len(), 1);
        assert_eq!(q.dimensions.len(), 1);
    }

    #[test]
    fn topcount_sets_limit_and_ordering() {
        let (q, _) = lower_src(
            "SELECT {[Measures].[Sales]} ON 0, \
             TOPCOUNT({[Product].[Category].Members}, 5, [Measures].[Sales]) ON 1 FROM [C]",
        );
        let limit = q.limit.expect("limit");
        assert_eq!(limit.count, 5);
        assert_eq!(limit.direction, LimitDirection::Top);
        assert_eq!(q.order_by.len(), 1);
        assert_eq!(q.order_by[0].column, "Sales");
        assert_eq!(q.order_by[0].direction, SortDirection::Desc);
    }

    #[test]
    fn descendants_with_flag() {
        let (q, _) = lower_src(
            "SELECT {[Measures].[X]} ON 0, \
             DESCENDANTS([Geography].[Country].[US], [Geography].[City], LEAVES) ON 1 FROM [C]",
        );
        assert_eq!(q.dimensions.len(), 1);
        let MemberSelection::Descendants {
            ancestor,
            leaf_level,
            mode,
        } = &q.dimensions[0].members
        else {
            panic!("expected descendants")
        };
        assert_eq!(ancestor, "US");
        assert_eq!(leaf_level.as_deref(), Some("City"));
        assert_eq!(*mode, DescendantsMode::Leaves);
    }

    #[test]
    fn member_range_lowering() {
        let (q, _) = lower_src(
            "SELECT {[Measures].[X]} ON 0, \
             {[Date].[Month].[Jan] : [Date].[Month].[Jun]} ON 1 FROM [C]",
        );
        assert_eq!(
            q.dimensions[0].members,
            MemberSelection::Range {
                from: "Jan".to_string(),
                to: "Jun".to_string()
            }
        );
    }

    #[test]
    fn named_set_reference_expands() {
        let (q, _) = lower_src(
            "WITH SET MySet AS {[Product].[Category].Members} \
             SELECT {[Measures].[X]} ON 0, {MySet} ON 1 FROM [C]",
        );
        assert_eq!(q.dimensions.len(), 1);
        assert_eq!(q.dimensions[0].hierarchy.table, "Product");
    }
}
