use serde::{Deserialize, Serialize};

use crate::plan::{SelectPlan, Value};

/// KQL value-type classification for expressions.
///
/// String-typedness matters most: KQL defines no relational ordering
/// operator on text, so string comparisons are rewritten through
/// `strcmp` at translation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    Long,
    Real,
    Decimal,
    String,
    DateTime,
    Guid,
    Dynamic,
    /// Not statically known (nulls, subquery results)
    Unknown,
}

impl ValueType {
    pub fn is_string(self) -> bool {
        matches!(self, ValueType::String)
    }
}

/// Binary operators over scalar expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Equality (==)
    Eq,
    /// Inequality (!=)
    Ne,
    /// Greater than (>)
    Gt,
    /// Greater or equal (>=)
    Gte,
    /// Less than (<)
    Lt,
    /// Less or equal (<=)
    Lte,
    /// Logical conjunction
    And,
    /// Logical disjunction
    Or,
}

impl BinaryOp {
    /// Whether this operator combines boolean subtrees (and/or).
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// Whether this is a relational ordering comparison (>, >=, <, <=).
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinaryOp::Gt | BinaryOp::Gte | BinaryOp::Lt | BinaryOp::Lte
        )
    }
}

/// Unary tests over scalar expressions.
///
/// KQL spells the null tests as function calls, not operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// isnull(x)
    IsNull,
    /// isnotnull(x)
    IsNotNull,
    /// not(x)
    Not,
}

/// A scalar expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarExpr {
    /// A column reference with its declared type
    Column { name: String, value_type: ValueType },
    /// A typed constant
    Constant(Value),
    /// A named parameter with its bound value
    Parameter { name: String, value: Value },
    /// Unary test (is-null / is-not-null / logical not)
    Unary {
        op: UnaryOp,
        operand: Box<ScalarExpr>,
    },
    /// Binary operator (comparison, equality, and/or)
    Binary {
        op: BinaryOp,
        left: Box<ScalarExpr>,
        right: Box<ScalarExpr>,
    },
    /// Membership in an explicit value list: `item in (...)` / `item !in (...)`
    InList {
        item: Box<ScalarExpr>,
        values: Vec<ScalarExpr>,
        negated: bool,
    },
    /// Membership in a dynamic/parameterized collection; rewritten to
    /// `array_index_of(parse_json(collection), item) != -1`
    InCollection {
        item: Box<ScalarExpr>,
        collection: Box<ScalarExpr>,
    },
    /// Existence test: the subplan returns at least one row
    Exists(Box<SelectPlan>),
    /// Zero-based row-index marker, rendered as `row_number(0)`
    RowNumber,
}

impl ScalarExpr {
    /// Convenience constructor for a column of unknown type.
    pub fn column(name: impl Into<String>) -> Self {
        ScalarExpr::Column {
            name: name.into(),
            value_type: ValueType::Unknown,
        }
    }

    /// Convenience constructor for a string-typed column.
    pub fn string_column(name: impl Into<String>) -> Self {
        ScalarExpr::Column {
            name: name.into(),
            value_type: ValueType::String,
        }
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        ScalarExpr::Constant(value.into())
    }

    pub fn parameter(name: impl Into<String>, value: impl Into<Value>) -> Self {
        ScalarExpr::Parameter {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn binary(op: BinaryOp, left: ScalarExpr, right: ScalarExpr) -> Self {
        ScalarExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(left: ScalarExpr, right: ScalarExpr) -> Self {
        Self::binary(BinaryOp::Eq, left, right)
    }

    pub fn and(left: ScalarExpr, right: ScalarExpr) -> Self {
        Self::binary(BinaryOp::And, left, right)
    }

    pub fn or(left: ScalarExpr, right: ScalarExpr) -> Self {
        Self::binary(BinaryOp::Or, left, right)
    }

    /// The value-type classification of this expression.
    pub fn value_type(&self) -> ValueType {
        match self {
            ScalarExpr::Column { value_type, .. } => *value_type,
            ScalarExpr::Constant(v) => v.value_type(),
            ScalarExpr::Parameter { value, .. } => value.value_type(),
            ScalarExpr::Unary { .. } => ValueType::Bool,
            ScalarExpr::Binary { .. } => ValueType::Bool,
            ScalarExpr::InList { .. } => ValueType::Bool,
            ScalarExpr::InCollection { .. } => ValueType::Bool,
            ScalarExpr::Exists(_) => ValueType::Bool,
            ScalarExpr::RowNumber => ValueType::Long,
        }
    }

    /// Whether this expression yields a text value.
    pub fn is_string_typed(&self) -> bool {
        self.value_type().is_string()
    }
}
