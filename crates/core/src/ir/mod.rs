//! Semantic intermediate representation.
//!
//! Built once by the lowerer, rewritten into fresh values by each linter
//! pass, consumed read-only by the emitters. The whole tree serializes to
//! JSON for the json explanation format and debug snapshots.

pub mod expr;
pub mod validate;

use serde::{Deserialize, Serialize};

use crate::hints::Hint;
use crate::lexer::Span;

pub use expr::{BinaryOp, ComparisonOp, Constant, Expression, LogicalOp, UnaryOp};

/// The queried data source. Purely symbolic; never resolved against a
/// real catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeReference {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregation {
    Sum,
    Avg,
    Count,
    DistinctCount,
    Min,
    Max,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub name: String,
    pub aggregation: Aggregation,
    /// Defining expression; always present for CUSTOM aggregation,
    /// absent otherwise. The validator enforces it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<Expression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_string: Option<String>,
    #[serde(skip)]
    pub span: Span,
}

impl Measure {
    pub fn simple(name: impl Into<String>, span: Span) -> Self {
        Measure {
            name: name.into(),
            aggregation: Aggregation::Sum,
            expression: None,
            alias: None,
            format_string: None,
            span,
        }
    }

    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyReference {
    /// DAX-side table name.
    pub table: String,
    pub hierarchy: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelReference {
    pub name: String,
    /// Depth within the hierarchy when known; used by hierarchy collapse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u8>,
}

impl LevelReference {
    pub fn named(name: impl Into<String>) -> Self {
        LevelReference {
            name: name.into(),
            depth: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescendantsMode {
    SelfAndAfter,
    SelfAndBefore,
    Leaves,
}

/// How members are picked from a level. SPECIFIC is never empty; the
/// validator enforces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "selection", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberSelection {
    All,
    Specific { names: Vec<String> },
    Children { parent: String },
    Descendants {
        ancestor: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        leaf_level: Option<String>,
        mode: DescendantsMode,
    },
    Range { from: String, to: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub hierarchy: HierarchyReference,
    pub level: LevelReference,
    pub members: MemberSelection,
    #[serde(skip)]
    pub span: Span,
}

impl Dimension {
    /// Key identifying a grouping column regardless of selection.
    pub fn column_key(&self) -> (String, String) {
        (
            self.hierarchy.table.to_ascii_lowercase(),
            self.level.name.to_ascii_lowercase(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DimensionFilterOp {
    In,
    Equals,
    NotEquals,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionFilter {
    pub dimension: Dimension,
    pub operator: DimensionFilterOp,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureFilter {
    pub measure: String,
    pub operator: ComparisonOp,
    pub value: f64,
}

/// Measure absent means "any measure in the projection".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonEmptyFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filter", rename_all = "snake_case")]
pub enum Filter {
    Dimension(DimensionFilter),
    Measure(MeasureFilter),
    NonEmpty(NonEmptyFilter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationKind {
    Measure,
    Member,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub name: String,
    pub kind: CalculationKind,
    pub expression: Expression,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solve_order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_string: Option<String>,
    #[serde(skip)]
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Column or measure name.
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitDirection {
    Top,
    Bottom,
}

/// TopCount/BottomCount result cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    pub count: u64,
    pub direction: LimitDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QueryMetadata {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub hints: Vec<Hint>,
    /// Warning messages mirrored from the diagnostic bag.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
    /// Error messages mirrored from the diagnostic bag.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
    #[serde(skip)]
    pub source_span: Span,
    /// Cleared when validation finds structural problems; emitters still
    /// run best-effort.
    #[serde(default)]
    pub valid: bool,
}

/// Root IR node for one MDX statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub cube: CubeReference,
    pub measures: Vec<Measure>,
    pub dimensions: Vec<Dimension>,
    pub filters: Vec<Filter>,
    pub calculations: Vec<Calculation>,
    pub order_by: Vec<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<Limit>,
    pub metadata: QueryMetadata,
}

impl Query {
    pub fn new(cube: CubeReference) -> Self {
        Query {
            cube,
            measures: Vec::new(),
            dimensions: Vec::new(),
            filters: Vec::new(),
            calculations: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            metadata: QueryMetadata {
                valid: true,
                ..QueryMetadata::default()
            },
        }
    }

    pub fn calculation(&self, name: &str) -> Option<&Calculation> {
        self.calculations.iter().find(|c| c.name == name)
    }

    /// True when `name` resolves to a projected measure or calculation.
    pub fn resolves_measure(&self, name: &str) -> bool {
        self.measures.iter().any(|m| m.name == name)
            || self.calculations.iter().any(|c| c.name == name)
    }
}
