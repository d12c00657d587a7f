//! Linter law tests: idempotence, preservation, level gating.

use unmdx_core::{
    generate_dax, mdx_to_dax, optimize_ir, parse_mdx, Config, OptimizationLevel, Query,
};

fn parse(src: &str) -> Query {
    parse_mdx(src, &Config::default()).query
}

fn config_at(level: OptimizationLevel) -> Config {
    let mut config = Config::default();
    config.linter.optimization_level = level;
    config
}

const LEVELS: [OptimizationLevel; 4] = [
    OptimizationLevel::None,
    OptimizationLevel::Conservative,
    OptimizationLevel::Moderate,
    OptimizationLevel::Aggressive,
];

const CORPUS: &[&str] = &[
    "SELECT {[Measures].[Sales Amount]} ON 0 FROM [Adventure Works]",
    "SELECT {[Measures].[A], [Measures].[B]} ON 0, {[Product].[Category].Members} ON 1 FROM [C]",
    "SELECT NON EMPTY {[Measures].[X]} ON 0, \
     {[Product].[Category].[Bikes], [Product].[Category].[Accessories], \
      [Product].[Category].[Bikes]} ON 1 FROM [C] WHERE ([Date].[Year].&[2023])",
    "WITH MEMBER [Measures].[Net] AS [Measures].[Sales] - [Measures].[Tax] \
     MEMBER [Measures].[Margin] AS [Measures].[Net] / [Measures].[Sales] \
     SELECT {[Measures].[Sales], [Measures].[Tax], [Measures].[Margin]} ON 0 FROM [C]",
    "SELECT {[Measures].[X]} ON 0, \
     CROSSJOIN({[Geography].[Country].Members}, {[Product].[Category].Members}) ON 1 \
     FROM [C] WHERE [Measures].[X] > 10 AND [Product].[Color].[Red]",
];

#[test]
fn optimize_is_idempotent_for_every_level_and_input() {
    for src in CORPUS {
        for level in LEVELS {
            let config = config_at(level);
            let query = parse(src);
            let (once, _) = optimize_ir(&query, &config);
            let (twice, _) = optimize_ir(&once, &config);
            assert_eq!(once, twice, "not idempotent at {level:?} for {src}");
        }
    }
}

#[test]
fn optimize_preserves_emitted_semantics_shape() {
    // The linter must preserve measures, dimensions (modulo the
    // duplicate-dimension rule) and the conjunction of filters, so the
    // DAX projection and filter predicates survive every level.
    for src in CORPUS {
        let baseline = parse(src);
        for level in LEVELS {
            let config = config_at(level);
            let (optimized, _) = optimize_ir(&baseline, &config);

            let names = |q: &Query| -> Vec<String> {
                q.measures.iter().map(|m| m.name.clone()).collect()
            };
            assert_eq!(names(&baseline), names(&optimized), "measures at {level:?}");

            let (dax, _) = generate_dax(&optimized, &config);
            for measure in &optimized.measures {
                assert!(
                    dax.contains(&format!("[{}]", measure.name)),
                    "measure {} missing from DAX at {level:?}: {dax}",
                    measure.name
                );
            }
        }
    }
}

#[test]
fn none_and_conservative_skip_expression_rewrites() {
    let src = "WITH MEMBER [Measures].[M] AS [Measures].[A] / [Measures].[B] \
               SELECT {[Measures].[A], [Measures].[B], [Measures].[M]} ON 0 FROM [C]";
    let query = parse(src);

    let (conservative, _) = optimize_ir(&query, &config_at(OptimizationLevel::Conservative));
    assert!(matches!(
        conservative.calculations[0].expression,
        unmdx_core::Expression::Binary { .. }
    ));

    let (moderate, _) = optimize_ir(&query, &config_at(OptimizationLevel::Moderate));
    assert!(matches!(
        &moderate.calculations[0].expression,
        unmdx_core::Expression::FunctionCall { name, .. } if name == "DIVIDE"
    ));
}

#[test]
fn expression_rewrites_do_not_change_dax() {
    // DIVIDE canonicalization happens either in the linter or in the
    // emitter; the output text must be identical both ways.
    let src = "WITH MEMBER [Measures].[M] AS [Measures].[A] / [Measures].[B] \
               SELECT {[Measures].[A], [Measures].[B], [Measures].[M]} ON 0 FROM [C]";
    let none = mdx_to_dax(src, &config_at(OptimizationLevel::None));
    let moderate = mdx_to_dax(src, &config_at(OptimizationLevel::Moderate));
    assert_eq!(none.dax, moderate.dax);
}

#[test]
fn linter_time_cap_returns_last_good_ir() {
    // With a 1ms budget the cap may trip between any two passes; the
    // contract is a usable query either way, never a panic or an empty
    // result.
    let mut config = Config::default();
    config.linter.max_processing_ms = 1;
    let query = parse(CORPUS[2]);
    let (optimized, _diags) = optimize_ir(&query, &config);
    assert_eq!(
        query.measures.len(),
        optimized.measures.len(),
        "time cap must not lose the projection"
    );
}

#[test]
fn disabled_rule_names_are_recognized() {
    for rule in unmdx_core::lint::RULE_NAMES {
        let mut config = Config::default();
        config.linter.optimization_level = OptimizationLevel::Aggressive;
        config.linter.disabled_rules = vec![rule.to_string()];
        let query = parse(CORPUS[2]);
        // Disabling any single rule must not break the pipeline.
        let (optimized, _) = optimize_ir(&query, &config);
        let (dax, _) = generate_dax(&optimized, &config);
        assert!(dax.contains("EVALUATE"));
    }
}
