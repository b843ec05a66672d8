pub mod command;
pub mod csv_io;
pub mod delete_plan;
pub mod domain;
pub mod error;
pub mod field;
pub mod rules;
pub mod selection;
pub mod store;

use std::path::Path;

use command::{Command, History};
use delete_plan::DeletePlan;
use domain::*;
use error::Result;
use field::Field;
use rules::engine::{CancelFlag, RuleProgress};
use rules::Rule;
use store::RecordStore;

/// The main entry point for the dedup worklist library: one record store
/// plus its undo history, kept consistent by routing every mutation through
/// the command path.
#[derive(Debug)]
pub struct Worklist {
    store: RecordStore,
    history: History,
}

impl Worklist {
    /// Load a worklist from a CSV file.
    pub fn from_csv(path: &Path) -> Result<Self> {
        Ok(Self {
            store: csv_io::load(path)?,
            history: History::new(),
        })
    }

    /// Build a worklist from pre-imported records, in import order.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = PhotoRecord>,
    {
        Self {
            store: RecordStore::from_records(records),
            history: History::new(),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// All records in import order.
    pub fn records(&self) -> &[PhotoRecord] {
        self.store.get_all()
    }

    /// Groups in first-appearance order.
    pub fn groups(&self) -> &[PhotoGroup] {
        self.store.groups()
    }

    /// Summary counters over the whole worklist.
    pub fn status(&self) -> WorklistStats {
        self.store.stats()
    }

    /// Compile and execute a rule without applying it: a dry run. The
    /// returned command describes every change the rule would make.
    pub fn execute_rule(
        &self,
        rule: &Rule,
        cancel: Option<&CancelFlag>,
        progress: Option<&mut dyn FnMut(RuleProgress)>,
    ) -> Result<Command> {
        let compiled = rule.compile()?;
        rules::engine::execute(&self.store, &compiled, cancel, progress)
    }

    /// Apply a previously executed command and record it for undo. Empty
    /// commands are dropped without polluting the history; the return value
    /// says whether anything was pushed.
    pub fn apply(&mut self, command: Command) -> Result<bool> {
        if command.is_empty() {
            return Ok(false);
        }
        self.history.push(command, &mut self.store)?;
        Ok(true)
    }

    /// Execute a rule and apply its command in one step, returning the
    /// number of field changes made.
    pub fn run_rule(
        &mut self,
        rule: &Rule,
        cancel: Option<&CancelFlag>,
        progress: Option<&mut dyn FnMut(RuleProgress)>,
    ) -> Result<usize> {
        let command = self.execute_rule(rule, cancel, progress)?;
        let changes = command.len();
        self.apply(command)?;
        Ok(changes)
    }

    /// Select (or deselect) every record whose field matches the pattern,
    /// as one undoable step. Returns the number of records touched.
    pub fn select_by_field(&mut self, field: Field, pattern: &str, select: bool) -> Result<usize> {
        let command = selection::select_by_field(&self.store, field, pattern, select)?;
        let changes = command.len();
        self.apply(command)?;
        Ok(changes)
    }

    /// Revert the most recent command, returning its label.
    pub fn undo(&mut self) -> Result<String> {
        let command = self.history.undo(&mut self.store)?;
        Ok(command.label.clone())
    }

    /// Re-apply the most recently undone command, returning its label.
    pub fn redo(&mut self) -> Result<String> {
        let command = self.history.redo(&mut self.store)?;
        Ok(command.label.clone())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Plan deletion of the current selection. Read-only; never undoable.
    pub fn plan_delete(&self) -> DeletePlan {
        delete_plan::plan_delete(&self.store)
    }

    /// Export the current worklist state back to CSV.
    pub fn export_csv(&self, path: &Path) -> Result<()> {
        csv_io::save(path, &self.store)
    }
}
