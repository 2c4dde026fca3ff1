//! The relational plan model.
//!
//! Plans are built by an upstream planner and consumed by the compiler in
//! `crate::kql`; nothing here is mutated during compilation.

pub mod expr;
pub mod modification;
pub mod select;
pub mod values;

pub use self::expr::{BinaryOp, ScalarExpr, UnaryOp, ValueType};
pub use self::modification::{
    ColumnModification, EntityOp, ModificationBatch, ModificationCommand,
};
pub use self::select::{Ordering, Projection, SelectPlan, TableSource};
pub use self::values::Value;
