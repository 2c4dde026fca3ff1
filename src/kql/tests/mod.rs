//! Compiler test modules.
//!
//! Tests are organized by area:
//! - `select`: pipeline stages, pagination, projection aliasing
//! - `joins`: lookup joins, lateral joins, partition rewrite
//! - `control`: ingest/delete/update control commands
//! - `literals`: literal formatting, round-trip properties

mod select;
