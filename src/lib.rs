//! kqlgen compiles relational query plans into Kusto Query Language text.
//!
//! The input is a pre-built relational plan (select nodes, table sources,
//! scalar expressions) plus batches of column-modification commands. The
//! output is KQL pipeline text for queries and control-command text for
//! bulk data modification. KQL has no string comparison operators, no
//! OFFSET, no row-level UPDATE and no correlated subqueries, so the
//! compiler carries a handful of non-trivial rewrites:
//!
//! - lateral (apply) joins → `join kind=leftouter` plus
//!   `partition hint.strategy=native by <key> (top N ...)`
//! - OFFSET → a synthetic `row_number(1)` projection and a filter on it
//! - string `<`/`>` comparisons → `strcmp(a, b) <op> 0`
//! - row-level UPDATE → a delete-then-append control command

pub mod error;
pub mod kql;
pub mod plan;

pub use error::{CompileError, CompileResult};
pub use kql::{CompiledQuery, ParameterMode, QueryOptions, compile, compile_with_options};

pub mod prelude {
    pub use crate::error::*;
    pub use crate::kql::{
        CompiledQuery, ParameterMode, QueryOptions, QueryParameter, compile, compile_batch,
        compile_with_options,
    };
    pub use crate::plan::*;
}
