use serde::{Deserialize, Serialize};

use crate::plan::Value;

/// The entity operation a modification command performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityOp {
    Insert,
    Update,
    Delete,
}

impl EntityOp {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityOp::Insert => "insert",
            EntityOp::Update => "update",
            EntityOp::Delete => "delete",
        }
    }
}

/// One column touched by a modification command.
///
/// The flags are independent: a key column on an update is typically
/// `is_key` but not `is_write`; a concurrency token is `is_condition`
/// and compared against its original value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnModification {
    pub column: String,
    /// New value (writes, and key columns on insert)
    pub value: Option<Value>,
    /// Value the row held when it was read (keys and concurrency checks)
    pub original_value: Option<Value>,
    pub is_key: bool,
    pub is_condition: bool,
    pub is_write: bool,
}

impl ColumnModification {
    /// A primary-key column, matched by its current (or original) value.
    pub fn key(column: impl Into<String>, value: impl Into<Value>) -> Self {
        ColumnModification {
            column: column.into(),
            value: Some(value.into()),
            original_value: None,
            is_key: true,
            is_condition: false,
            is_write: false,
        }
    }

    /// A written column carrying its new value.
    pub fn write(column: impl Into<String>, value: impl Into<Value>) -> Self {
        ColumnModification {
            column: column.into(),
            value: Some(value.into()),
            original_value: None,
            is_key: false,
            is_condition: false,
            is_write: true,
        }
    }

    /// A concurrency-condition column, matched by its original value.
    pub fn condition(column: impl Into<String>, original: impl Into<Value>) -> Self {
        ColumnModification {
            column: column.into(),
            value: None,
            original_value: Some(original.into()),
            is_key: false,
            is_condition: true,
            is_write: false,
        }
    }
}

/// One row-level modification command against a single table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationCommand {
    pub table: String,
    pub op: EntityOp,
    /// Per-column modifications in declaration order
    pub columns: Vec<ColumnModification>,
}

impl ModificationCommand {
    pub fn new(table: impl Into<String>, op: EntityOp, columns: Vec<ColumnModification>) -> Self {
        ModificationCommand {
            table: table.into(),
            op,
            columns,
        }
    }
}

/// An accumulator of commands sharing one table and one operation kind.
///
/// The bulk command templates are table- and operation-specific, so a
/// batch never mixes either. `push` hands a non-matching command back to
/// the caller, which is the signal to close this batch and open a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationBatch {
    table: String,
    op: EntityOp,
    commands: Vec<ModificationCommand>,
}

impl ModificationBatch {
    pub fn new(first: ModificationCommand) -> Self {
        ModificationBatch {
            table: first.table.clone(),
            op: first.op,
            commands: vec![first],
        }
    }

    /// Add a command, or return it back if it belongs to a different
    /// table or operation kind.
    pub fn push(&mut self, command: ModificationCommand) -> Result<(), ModificationCommand> {
        if command.table != self.table || command.op != self.op {
            return Err(command);
        }
        self.commands.push(command);
        Ok(())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn op(&self) -> EntityOp {
        self.op
    }

    pub fn commands(&self) -> &[ModificationCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
