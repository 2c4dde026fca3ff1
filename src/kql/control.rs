//! Control-command generation for modification batches.
//!
//! The engine has no row-level DML: inserts become an inline JSON ingest,
//! deletes a predicate-scoped record purge, and updates a delete-then-
//! append replacement. One control command is emitted per batch, never
//! per row.

use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::plan::{ColumnModification, EntityOp, ModificationBatch, ModificationCommand, Value};

use super::literal::{format_literal, json_value};

/// Compile one modification batch into control-command text.
pub fn compile_batch(batch: &ModificationBatch) -> CompileResult<String> {
    debug!(
        table = batch.table(),
        op = batch.op().as_str(),
        commands = batch.len(),
        "compiling modification batch"
    );

    match batch.op() {
        EntityOp::Insert => build_ingest(batch),
        EntityOp::Delete => build_delete(batch),
        EntityOp::Update => build_update(batch),
    }
}

// ------------------------------------------------------------
// insert
// ------------------------------------------------------------

fn build_ingest(batch: &ModificationBatch) -> CompileResult<String> {
    let mut out = format!(
        ".ingest inline into table {} with (format='json') <|\n",
        batch.table()
    );

    for command in batch.commands() {
        out.push_str(&json_payload(command)?);
        out.push('\n');
    }

    Ok(out)
}

/// One flat JSON object per command, write-flagged non-null columns only.
fn json_payload(command: &ModificationCommand) -> CompileResult<String> {
    let writes: Vec<&ColumnModification> =
        command.columns.iter().filter(|c| c.is_write).collect();

    if writes.is_empty() {
        return Err(CompileError::EmptyWriteSet {
            table: command.table.clone(),
            operation: command.op.as_str(),
        });
    }

    let mut object = serde_json::Map::new();
    for column in writes {
        match &column.value {
            Some(value) if !value.is_null() => {
                object.insert(column.column.clone(), json_value(value));
            }
            _ => {}
        }
    }

    Ok(serde_json::Value::Object(object).to_string())
}

// ------------------------------------------------------------
// delete
// ------------------------------------------------------------

fn build_delete(batch: &ModificationBatch) -> CompileResult<String> {
    let predicate = batch_predicate(batch)?;
    Ok(format!(
        ".delete table {table} records <|\n    {table} | where {predicate}\n",
        table = batch.table(),
        predicate = predicate,
    ))
}

// ------------------------------------------------------------
// update
// ------------------------------------------------------------

/// No row-level update exists; replace matching rows wholesale. `D` is
/// the matched set, `A` the same rows re-extended with each command's new
/// values.
fn build_update(batch: &ModificationBatch) -> CompileResult<String> {
    let table = batch.table();
    let predicate = batch_predicate(batch)?;

    let mut out = format!(
        ".update table {table} delete D append A <|\nlet D = {table} | where {predicate};\n"
    );

    if batch.len() == 1 {
        let assignments = extend_clause(&batch.commands()[0])?;
        out.push_str(&format!("let A = D | extend {};\n", assignments));
        return Ok(out);
    }

    // each row keeps its own new values: re-filter D per command and
    // union the branches
    let mut branches = Vec::with_capacity(batch.len());
    for command in batch.commands() {
        let (predicate, _) = command_predicate(command)?;
        let assignments = extend_clause(command)?;
        branches.push(format!("(D | where {} | extend {})", predicate, assignments));
    }
    out.push_str(&format!("let A = union {};\n", branches.join(", ")));

    Ok(out)
}

fn extend_clause(command: &ModificationCommand) -> CompileResult<String> {
    let assignments: Vec<String> = command
        .columns
        .iter()
        .filter(|c| c.is_write)
        .map(|c| {
            format!(
                "{} = {}",
                c.column,
                format_literal(c.value.as_ref().unwrap_or(&Value::Null))
            )
        })
        .collect();

    if assignments.is_empty() {
        return Err(CompileError::EmptyWriteSet {
            table: command.table.clone(),
            operation: command.op.as_str(),
        });
    }

    Ok(assignments.join(", "))
}

// ------------------------------------------------------------
// predicates
// ------------------------------------------------------------

/// Per-command predicate: key columns matched by current-or-original
/// value, and-joined with non-key concurrency conditions matched by their
/// original value. Returns the text and the number of terms.
fn command_predicate(command: &ModificationCommand) -> CompileResult<(String, usize)> {
    let mut terms: Vec<String> = Vec::new();

    for column in command.columns.iter().filter(|c| c.is_key) {
        let value = column.value.as_ref().or(column.original_value.as_ref());
        terms.push(format!(
            "{} == {}",
            column.column,
            format_literal(value.unwrap_or(&Value::Null))
        ));
    }

    for column in command
        .columns
        .iter()
        .filter(|c| c.is_condition && !c.is_key)
    {
        terms.push(format!(
            "{} == {}",
            column.column,
            format_literal(column.original_value.as_ref().unwrap_or(&Value::Null))
        ));
    }

    if terms.is_empty() {
        return Err(CompileError::unsupported(format!(
            "{} command for table '{}' has no key or concurrency columns to match",
            command.op.as_str(),
            command.table,
        )));
    }

    let count = terms.len();
    Ok((terms.join(" and "), count))
}

/// Or-join the per-command predicates in input order, parenthesizing
/// multi-term commands so the disjunction keeps its shape.
fn batch_predicate(batch: &ModificationBatch) -> CompileResult<String> {
    let mut parts = Vec::with_capacity(batch.len());
    let parenthesize = batch.len() > 1;

    for command in batch.commands() {
        let (predicate, terms) = command_predicate(command)?;
        if parenthesize && terms > 1 {
            parts.push(format!("({})", predicate));
        } else {
            parts.push(predicate);
        }
    }

    Ok(parts.join(" or "))
}
