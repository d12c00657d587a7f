//! Parse-tree to IR lowering.
//!
//! One walk over the statement: WITH items become calculations and named
//! sets, axes become measures and dimensions, WHERE becomes filters. The
//! parse tree is owned exclusively here and dropped on return.
//!
//! Split by concern: `axes` (axis classification, set flattening,
//! crossjoin expansion, hierarchy collapse), `where_clause` (tuple and
//! logical filter distribution), `calculations` (WITH items and value
//! expression building).

mod axes;
mod calculations;
mod where_clause;

use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::{CubeSpec, SelectStatement, SetExpr};
use crate::config::Config;
use crate::diag::{DiagKind, Diagnostic, DiagnosticBag, Severity};
use crate::hints::Hint;
use crate::ir::{self, CubeReference, Query};
use crate::lexer::Span;

pub(crate) struct LowerCtx<'a> {
    pub src: &'a str,
    pub config: &'a Config,
    pub bag: &'a mut DiagnosticBag,
    pub named_sets: BTreeMap<String, SetExpr>,
}

impl<'a> LowerCtx<'a> {
    /// Emit a lowering warning; strict mode upgrades it to an error.
    pub fn warn(&mut self, kind: DiagKind, message: impl Into<String>, span: Span) {
        let severity = if self.config.parser.strict_mode {
            Severity::Error
        } else {
            Severity::Warning
        };
        self.bag
            .push(Diagnostic::new(severity, kind, message, span).with_snippet_from(self.src));
    }

    pub fn error(&mut self, kind: DiagKind, message: impl Into<String>, span: Span) {
        self.bag
            .push(Diagnostic::error(kind, message, span).with_snippet_from(self.src));
    }
}

/// Lower one parsed statement into IR. Diagnostics accumulate into `bag`;
/// the returned query is validated and marked accordingly.
pub fn lower(
    stmt: &SelectStatement,
    src: &str,
    hints: Vec<Hint>,
    config: &Config,
    bag: &mut DiagnosticBag,
) -> Query {
    let mut ctx = LowerCtx {
        src,
        config,
        bag,
        named_sets: BTreeMap::new(),
    };

    let cube = lower_cube(&stmt.cube, &mut ctx);
    let mut query = Query::new(cube);
    query.metadata.source_span = stmt.span;
    query.metadata.hints = normalize_hints(hints);

    calculations::lower_with_items(&stmt.with_items, &mut query, &mut ctx);
    axes::lower_axes(&stmt.axes, &mut query, &mut ctx);
    calculations::mark_calculated_measures(&mut query);
    where_clause::lower_where(stmt.where_clause.as_ref(), &mut query, &mut ctx);

    dedupe_measures(&mut query, &mut ctx);

    ir::validate::validate(&mut query, ctx.bag);
    debug!(
        measures = query.measures.len(),
        dimensions = query.dimensions.len(),
        filters = query.filters.len(),
        calculations = query.calculations.len(),
        valid = query.metadata.valid,
        "lowered query"
    );
    query
}

/// Subselects contribute only their innermost cube; the outer statement's
/// axes already carry the projection.
fn lower_cube(cube: &CubeSpec, ctx: &mut LowerCtx) -> CubeReference {
    match cube {
        CubeSpec::Named {
            name, database, ..
        } => CubeReference {
            name: name.clone(),
            database: database.clone(),
        },
        CubeSpec::Subselect(inner) => {
            ctx.warn(
                DiagKind::UnsupportedConstruct,
                "subselect in FROM: only the inner cube reference is used",
                inner.span,
            );
            lower_cube(&inner.cube, ctx)
        }
    }
}

/// Hints attach verbatim, ordered and deduplicated by (key, value).
fn normalize_hints(mut hints: Vec<Hint>) -> Vec<Hint> {
    hints.sort_by(|a, b| (&a.key, &a.value).cmp(&(&b.key, &b.value)));
    hints.dedup_by(|a, b| a.key == b.key && a.value == b.value);
    hints
}

/// Duplicate measures by name collapse to the first occurrence.
fn dedupe_measures(query: &mut Query, ctx: &mut LowerCtx) {
    let mut seen = Vec::new();
    let mut kept = Vec::with_capacity(query.measures.len());
    for measure in query.measures.drain(..) {
        if seen.contains(&measure.name) {
            ctx.warn(
                DiagKind::DuplicateMeasure,
                format!("measure '{}' appears more than once; keeping the first", measure.name),
                measure.span,
            );
            continue;
        }
        seen.push(measure.name.clone());
        kept.push(measure);
    }
    query.measures = kept;
}

/// Best-effort level depth table for hierarchy collapse. Unknown levels
/// return None and the last-listed level wins as the deterministic
/// tiebreak.
pub(crate) fn level_depth(level: &str) -> Option<u8> {
    let l = level.to_ascii_lowercase();
    let depth = match l.as_str() {
        "year" | "calendar year" | "fiscal year" => 1,
        "semester" | "calendar semester" => 2,
        "quarter" | "calendar quarter" | "fiscal quarter" => 3,
        "month" | "calendar month" => 4,
        "week" | "calendar week" => 5,
        "date" | "day" => 6,
        "country" | "country-region" => 1,
        "state" | "state-province" | "region" => 2,
        "city" => 3,
        "postalcode" | "postal code" | "zip" | "zip code" => 4,
        "category" => 1,
        "subcategory" => 2,
        "product" | "product name" => 3,
        "group" | "account group" => 1,
        "account" => 2,
        _ => return None,
    };
    Some(depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;
    use crate::parser;

    pub(crate) fn lower_src(src: &str) -> (Query, DiagnosticBag) {
        let config = Config::default();
        let mut bag = DiagnosticBag::new();
        let out = lexer::lex(src, &mut bag);
        let hints = crate::hints::extract(&out.comments);
        let stmt = parser::parse(&out.tokens, src, true, None, &mut bag).expect("tree");
        let query = lower(&stmt, src, hints, &config, &mut bag);
        (query, bag)
    }

    #[test]
    fn simple_measure_projection() {
        let (q, bag) = lower_src("SELECT {[Measures].[Sales Amount]} ON 0 FROM [Adventure Works]");
        assert!(bag.is_empty(), "diagnostics: {:?}", bag.as_slice());
        assert_eq!(q.cube.name, "Adventure Works");
        assert_eq!(q.measures.len(), 1);
        assert_eq!(q.measures[0].name, "Sales Amount");
        assert!(q.dimensions.is_empty());
    }

    #[test]
    fn duplicate_measures_keep_first_and_warn() {
        let (q, bag) = lower_src(
            "SELECT {[Measures].[Sales Amount], [Measures].[Sales Amount]} ON 0 FROM [C]",
        );
        assert_eq!(q.measures.len(), 1);
        assert!(bag.iter().any(|d| d.kind == DiagKind::DuplicateMeasure));
    }

    #[test]
    fn hints_are_attached_sorted_and_deduped() {
        let (q, _) = lower_src(
            "/* CACHE: on */ /* OPTIMIZER: fast */ /* CACHE: on */ \
             SELECT {[Measures].[X]} ON 0 FROM [C]",
        );
        let labels: Vec<String> = q.metadata.hints.iter().map(|h| h.label()).collect();
        assert_eq!(labels, vec!["CACHE: on", "OPTIMIZER: fast"]);
    }

    #[test]
    fn level_depth_knows_common_hierarchies() {
        assert!(level_depth("Country") < level_depth("PostalCode"));
        assert!(level_depth("Calendar Year") < level_depth("Month"));
        assert_eq!(level_depth("Widget Tier"), None);
    }
}
