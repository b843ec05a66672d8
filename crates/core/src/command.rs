use serde::{Deserialize, Serialize};

use crate::domain::RecordId;
use crate::error::{Error, Result};
use crate::field::{Field, FieldKind, FieldValue};
use crate::store::RecordStore;

/// One field-level state change. `old` is the value before the owning
/// command applied, `new` the value after; undo restores `old`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub record_id: RecordId,
    pub field: Field,
    pub old: FieldValue,
    pub new: FieldValue,
}

/// Atomic, reversible bundle of deltas produced by one rule execution or one
/// batch selection. Deltas touch disjoint `(record, field)` pairs by
/// construction, so apply and undo are order-independent single passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub label: String,
    pub deltas: Vec<Delta>,
}

impl Command {
    pub fn new(label: impl Into<String>, deltas: Vec<Delta>) -> Self {
        Self {
            label: label.into(),
            deltas,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    fn apply(&self, store: &mut RecordStore) -> Result<()> {
        for delta in &self.deltas {
            store.apply_delta(delta.record_id, delta.field, &delta.new)?;
        }
        Ok(())
    }

    fn revert(&self, store: &mut RecordStore) -> Result<()> {
        for delta in &self.deltas {
            store.apply_delta(delta.record_id, delta.field, &delta.old)?;
        }
        Ok(())
    }

    /// Every delta must reference a live record, a mutable field, and
    /// boolean values before any of them is applied, keeping push
    /// all-or-nothing. The mutable fields are exactly the three flags, so
    /// any non-`Bool` value would fail `field::write` mid-pass otherwise.
    fn verify(&self, store: &RecordStore) -> Result<()> {
        for delta in &self.deltas {
            store.find(delta.record_id)?;
            if !delta.field.is_mutable() {
                return Err(Error::ReadOnlyField(delta.field));
            }
            for value in [&delta.old, &delta.new] {
                if !matches!(value, FieldValue::Bool(_)) {
                    return Err(Error::TypeMismatch {
                        field: delta.field,
                        operator: "write".to_string(),
                        kind: value.kind().unwrap_or(FieldKind::Bool),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Linear undo/redo stack. `cursor` counts applied commands; everything past
/// it is the redo suffix, discarded by the next push.
#[derive(Debug)]
pub struct History {
    commands: Vec<Command>,
    cursor: usize,
    limit: Option<usize>,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Unbounded history.
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            cursor: 0,
            limit: None,
        }
    }

    /// History capped at `limit` commands; the oldest are evicted first.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            commands: Vec::new(),
            cursor: 0,
            limit: Some(limit),
        }
    }

    /// Apply `command` to the store and append it at the cursor, discarding
    /// any redo-able suffix. Fails without side effects if the command
    /// references unknown records or read-only fields.
    pub fn push(&mut self, command: Command, store: &mut RecordStore) -> Result<()> {
        command.verify(store)?;
        self.commands.truncate(self.cursor);
        command.apply(store)?;
        self.commands.push(command);
        self.cursor += 1;

        if let Some(limit) = self.limit {
            while self.commands.len() > limit {
                self.commands.remove(0);
                self.cursor -= 1;
            }
        }
        Ok(())
    }

    /// Revert the most recent applied command. `NothingToUndo` leaves the
    /// store untouched.
    pub fn undo(&mut self, store: &mut RecordStore) -> Result<&Command> {
        if self.cursor == 0 {
            return Err(Error::NothingToUndo);
        }
        let command = &self.commands[self.cursor - 1];
        command.revert(store)?;
        self.cursor -= 1;
        Ok(&self.commands[self.cursor])
    }

    /// Re-apply the command just past the cursor.
    pub fn redo(&mut self, store: &mut RecordStore) -> Result<&Command> {
        if self.cursor == self.commands.len() {
            return Err(Error::NothingToRedo);
        }
        let command = &self.commands[self.cursor];
        command.apply(store)?;
        self.cursor += 1;
        Ok(&self.commands[self.cursor - 1])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.commands.len()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
