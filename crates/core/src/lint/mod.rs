//! IR-to-IR normalization passes.
//!
//! Ordered, idempotent, semantics-preserving under the DAX emitter. Each
//! pass takes the previous IR by reference and returns a fresh one. After
//! every pass the validator reruns; a pass whose output fails validation
//! is reverted, keeping its diagnostics.

mod clean_calculations;
mod collapse_hierarchy;
mod dedupe_members;
mod flatten_sets;
mod inline_calculations;
mod merge_dimensions;
mod prune_filters;

use std::time::Instant;

use tracing::debug;

use crate::config::{Config, OptimizationLevel};
use crate::diag::{DiagKind, Diagnostic, DiagnosticBag};
use crate::ir::{self, Query};

/// Names accepted by `linter.disabled_rules`, in execution order.
pub const RULE_NAMES: &[&str] = &[
    "flatten_sets",
    "collapse_hierarchy",
    "dedupe_members",
    "prune_filters",
    "clean_calculations",
    "merge_dimensions",
    "inline_calculations",
];

pub(crate) struct LintCtx<'a> {
    pub config: &'a Config,
    pub bag: &'a mut DiagnosticBag,
}

type PassFn = fn(&Query, &mut LintCtx) -> Query;

fn passes_for(level: OptimizationLevel) -> Vec<(&'static str, PassFn)> {
    let mut passes: Vec<(&'static str, PassFn)> = vec![
        ("flatten_sets", flatten_sets::run),
        ("collapse_hierarchy", collapse_hierarchy::run),
        ("dedupe_members", dedupe_members::run),
        ("prune_filters", prune_filters::run),
    ];
    if matches!(
        level,
        OptimizationLevel::Moderate | OptimizationLevel::Aggressive
    ) {
        passes.push(("clean_calculations", clean_calculations::run));
        passes.push(("merge_dimensions", merge_dimensions::run));
    }
    if level == OptimizationLevel::Aggressive {
        passes.push(("inline_calculations", inline_calculations::run));
    }
    passes
}

/// Run the configured passes over `query` and return the normalized IR.
pub fn optimize(query: &Query, config: &Config, bag: &mut DiagnosticBag) -> Query {
    let started = Instant::now();
    let budget_ms = config.linter.max_processing_ms;
    let mut current = query.clone();

    for (name, pass) in passes_for(config.linter.optimization_level) {
        if config
            .linter
            .disabled_rules
            .iter()
            .any(|r| r.eq_ignore_ascii_case(name))
        {
            continue;
        }
        if budget_ms > 0 && started.elapsed().as_millis() as u64 >= budget_ms {
            bag.push(Diagnostic::warning(
                DiagKind::LinterTimeout,
                format!("linter time budget exhausted before pass '{name}'"),
                current.metadata.source_span,
            ));
            return current;
        }

        let mut ctx = LintCtx {
            config,
            bag: &mut *bag,
        };
        let mut candidate = pass(&current, &mut ctx);

        // Revert a pass that broke an invariant; its diagnostics stay.
        let errors_before = bag.error_count();
        let clean = ir::validate::validate(&mut candidate, bag);
        if !clean && bag.error_count() > errors_before {
            bag.push(Diagnostic::warning(
                DiagKind::NormalizationWarning,
                format!("pass '{name}' produced an invalid query and was reverted"),
                current.metadata.source_span,
            ));
            continue;
        }
        debug!(pass = name, "linter pass applied");
        current = candidate;
    }
    current
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;

    /// Lower + lint a source string at the given level.
    pub(crate) fn optimize_src(src: &str, level: OptimizationLevel) -> (Query, DiagnosticBag) {
        let mut config = Config::default();
        config.linter.optimization_level = level;
        let mut bag = DiagnosticBag::new();
        let out = crate::lexer::lex(src, &mut bag);
        let hints = crate::hints::extract(&out.comments);
        let stmt = crate::parser::parse(&out.tokens, src, true, None, &mut bag).expect("tree");
        let query = crate::lower::lower(&stmt, src, hints, &config, &mut bag);
        let optimized = optimize(&query, &config, &mut bag);
        (optimized, bag)
    }

    #[test]
    fn optimize_is_idempotent_at_every_level() {
        let src = "SELECT NON EMPTY {[Measures].[Sales Amount]} ON 0, \
                   {[Product].[Category].[Bikes], [Product].[Category].[Bikes], \
                    [Product].[Category].[Accessories]} ON 1 \
                   FROM [Adventure Works] WHERE ([Date].[Year].&[2023])";
        for level in [
            OptimizationLevel::None,
            OptimizationLevel::Conservative,
            OptimizationLevel::Moderate,
            OptimizationLevel::Aggressive,
        ] {
            let (once, _) = optimize_src(src, level);
            let config = {
                let mut c = Config::default();
                c.linter.optimization_level = level;
                c
            };
            let mut bag = DiagnosticBag::new();
            let twice = optimize(&once, &config, &mut bag);
            assert_eq!(once, twice, "level {level:?} not idempotent");
        }
    }

    #[test]
    fn disabled_rules_are_skipped() {
        let src = "SELECT {[Measures].[X]} ON 0, \
                   {[Product].[Category].[Bikes], [Product].[Category].[Bikes]} ON 1 FROM [C]";
        let mut config = Config::default();
        config.linter.disabled_rules = vec!["dedupe_members".to_string()];
        let mut bag = DiagnosticBag::new();
        let out = crate::lexer::lex(src, &mut bag);
        let stmt = crate::parser::parse(&out.tokens, src, true, None, &mut bag).expect("tree");
        let query = crate::lower::lower(&stmt, src, Vec::new(), &config, &mut bag);
        let linted = optimize(&query, &config, &mut bag);
        // Consecutive duplicates are already removed by the lowerer;
        // craft a non-consecutive duplicate to exercise the rule.
        let crate::ir::MemberSelection::Specific { names } = &linted.dimensions[0].members else {
            panic!("expected specific")
        };
        assert_eq!(names.len(), 1, "lowerer handles consecutive duplicates");

        let src2 = "SELECT {[Measures].[X]} ON 0, \
                    {[Product].[Category].[Bikes], [Product].[Category].[Accessories], \
                     [Product].[Category].[Bikes]} ON 1 FROM [C]";
        let mut bag2 = DiagnosticBag::new();
        let out2 = crate::lexer::lex(src2, &mut bag2);
        let stmt2 = crate::parser::parse(&out2.tokens, src2, true, None, &mut bag2).expect("tree");
        let query2 = crate::lower::lower(&stmt2, src2, Vec::new(), &config, &mut bag2);
        let linted2 = optimize(&query2, &config, &mut bag2);
        let crate::ir::MemberSelection::Specific { names } = &linted2.dimensions[0].members else {
            panic!("expected specific")
        };
        assert_eq!(names.len(), 3, "rule disabled, duplicate kept");
    }

    #[test]
    fn rule_names_match_pass_tables() {
        let all = passes_for(OptimizationLevel::Aggressive);
        assert_eq!(all.len(), RULE_NAMES.len());
        for ((name, _), expected) in all.iter().zip(RULE_NAMES) {
            assert_eq!(name, expected);
        }
    }
}
