use serde::{Deserialize, Serialize};

use crate::plan::ScalarExpr;

/// One relational select node: sources, filter, ordering, projection
/// and pagination.
///
/// A plan with no table sources is a degenerate constant select; the
/// compiler simply skips the source stage for it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectPlan {
    /// Table sources in join order; the first is the pipeline head
    pub tables: Vec<TableSource>,
    /// Boolean-typed filter predicate
    pub predicate: Option<ScalarExpr>,
    /// Ordering keys, applied in sequence
    pub orderings: Vec<Ordering>,
    /// Output columns in projection order
    pub projections: Vec<Projection>,
    /// Rows to skip (KQL has no offset primitive; rewritten via row_number)
    pub offset: Option<ScalarExpr>,
    /// Rows to take
    pub limit: Option<ScalarExpr>,
}

impl SelectPlan {
    /// A bare scan of one table.
    pub fn table(name: impl Into<String>) -> Self {
        SelectPlan {
            tables: vec![TableSource::Table(name.into())],
            ..Default::default()
        }
    }
}

/// One table source inside a select node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableSource {
    /// Base table reference, emitted verbatim
    Table(String),
    /// Opaque passthrough text, emitted parenthesized
    Raw(String),
    /// Nested plan, inlined via recursive compilation
    Subquery(Box<SelectPlan>),
    /// Simple equality join, rendered as `join kind=leftouter`
    Join {
        inner: Box<TableSource>,
        /// Must be a single column == column equality
        on: ScalarExpr,
    },
    /// Lateral join with outer-apply semantics (unmatched outer rows
    /// survive); per-group top-N is rewritten through a partition hint
    OuterApply(Box<SelectPlan>),
    /// Lateral join with cross-apply semantics (outer row must match)
    CrossApply(Box<SelectPlan>),
}

/// One ordering key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ordering {
    pub expr: ScalarExpr,
    pub ascending: bool,
}

impl Ordering {
    pub fn asc(expr: ScalarExpr) -> Self {
        Ordering {
            expr,
            ascending: true,
        }
    }

    pub fn desc(expr: ScalarExpr) -> Self {
        Ordering {
            expr,
            ascending: false,
        }
    }
}

/// One projection entry: an expression and an optional output alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub expr: ScalarExpr,
    pub alias: Option<String>,
}

impl Projection {
    pub fn new(expr: ScalarExpr) -> Self {
        Projection { expr, alias: None }
    }

    pub fn aliased(expr: ScalarExpr, alias: impl Into<String>) -> Self {
        Projection {
            expr,
            alias: Some(alias.into()),
        }
    }
}
