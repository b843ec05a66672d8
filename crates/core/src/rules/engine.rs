use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::command::{Command, Delta};
use crate::domain::{PhotoRecord, RecordId};
use crate::error::{Error, Result};
use crate::field::{Field, FieldValue};
use crate::rules::{aggregate, CompiledAction, CompiledRule, Scope};
use crate::store::{FlagSnapshot, RecordStore};

/// Groups evaluated per parallel batch; cancellation is checked between
/// batches.
const GROUP_BATCH: usize = 512;

/// Shared cooperative cancellation flag. Cloning hands out another handle to
/// the same flag.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress reported while a rule runs over a large worklist.
#[derive(Debug, Clone, Copy)]
pub enum RuleProgress {
    Started { groups: usize },
    Evaluated { groups_done: usize, groups: usize },
    Completed { deltas: usize },
}

/// Run a compiled rule against the store and assemble the resulting command.
///
/// The store is never mutated here: evaluation reads flag state through one
/// snapshot taken at entry, and the returned command carries every delta.
/// The caller decides whether to push it, which makes dry runs free.
/// Cancellation between batches returns `Cancelled` with no command.
pub fn execute(
    store: &RecordStore,
    rule: &CompiledRule,
    cancel: Option<&CancelFlag>,
    mut progress: Option<&mut dyn FnMut(RuleProgress)>,
) -> Result<Command> {
    let snapshot = store.flag_snapshot();
    let groups = store.groups();
    if let Some(cb) = progress.as_deref_mut() {
        cb(RuleProgress::Started {
            groups: groups.len(),
        });
    }

    // Read-only phase: filter each group's members down to candidates.
    // Groups are disjoint, so batches parallelize cleanly.
    let mut candidates: Vec<Vec<RecordId>> = Vec::with_capacity(groups.len());
    for batch in groups.chunks(GROUP_BATCH) {
        check_cancelled(cancel)?;
        let mut filtered: Vec<Vec<RecordId>> = batch
            .par_iter()
            .map(|group| {
                group
                    .member_ids
                    .iter()
                    .copied()
                    .filter(|&id| {
                        let record = &store.get_all()[id as usize];
                        rule.conditions
                            .iter()
                            .all(|c| c.eval(&snapshot.read(record, c.field)))
                    })
                    .collect()
            })
            .collect();
        candidates.append(&mut filtered);
        if let Some(cb) = progress.as_deref_mut() {
            cb(RuleProgress::Evaluated {
                groups_done: candidates.len(),
                groups: groups.len(),
            });
        }
    }

    // Serialized phase: apply actions in declared order against the same
    // snapshot, coalescing deltas per (record, field).
    let mut acc = DeltaAcc::default();
    for action in &rule.actions {
        check_cancelled(cancel)?;
        apply_action(store, &snapshot, rule.scope, &candidates, action, &mut acc);
    }

    let deltas = acc.into_deltas();
    if let Some(cb) = progress.as_deref_mut() {
        cb(RuleProgress::Completed {
            deltas: deltas.len(),
        });
    }
    Ok(Command::new(rule.name.clone(), deltas))
}

fn check_cancelled(cancel: Option<&CancelFlag>) -> Result<()> {
    match cancel {
        Some(flag) if flag.is_cancelled() => Err(Error::Cancelled),
        _ => Ok(()),
    }
}

fn apply_action(
    store: &RecordStore,
    snapshot: &FlagSnapshot,
    scope: Scope,
    candidates: &[Vec<RecordId>],
    action: &CompiledAction,
    acc: &mut DeltaAcc,
) {
    match action {
        CompiledAction::Mark(value) => {
            for &id in candidates.iter().flatten() {
                set_flag(store, snapshot, acc, id, Field::IsMark, *value);
            }
        }
        CompiledAction::Lock(value) => {
            for &id in candidates.iter().flatten() {
                set_flag(store, snapshot, acc, id, Field::IsLocked, *value);
            }
        }
        CompiledAction::AggregateSelect {
            field,
            operator,
            mark,
        } => {
            let winner_of = |ids: &[RecordId]| {
                let members: Vec<&PhotoRecord> =
                    ids.iter().map(|&id| &store.get_all()[id as usize]).collect();
                aggregate::select(&members, *operator, *field)
            };
            let winners: Vec<RecordId> = match scope {
                Scope::PerGroup => candidates
                    .iter()
                    .filter_map(|ids| winner_of(ids))
                    .collect(),
                // One virtual group of every candidate, in import order
                Scope::Global => {
                    let mut all: Vec<RecordId> = candidates.iter().flatten().copied().collect();
                    all.sort_unstable();
                    winner_of(&all).into_iter().collect()
                }
            };
            for id in winners {
                set_flag(store, snapshot, acc, id, Field::IsSelected, true);
                set_flag(store, snapshot, acc, id, Field::IsMark, *mark);
            }
        }
        CompiledAction::SelectBySameFolder {
            path_field,
            regex,
            mark,
        } => {
            // Folder grouping replaces group_number here; BTreeMap keeps the
            // folder walk order deterministic.
            let mut by_folder: BTreeMap<String, Vec<RecordId>> = BTreeMap::new();
            for &id in candidates.iter().flatten() {
                let record = &store.get_all()[id as usize];
                by_folder
                    .entry(folder_of(record, *path_field))
                    .or_default()
                    .push(id);
            }
            for ids in by_folder.values() {
                for &id in ids {
                    let record = &store.get_all()[id as usize];
                    if let FieldValue::Str(path) = snapshot.read(record, *path_field) {
                        if regex.is_match(&path) {
                            set_flag(store, snapshot, acc, id, Field::IsSelected, *mark);
                            set_flag(store, snapshot, acc, id, Field::IsMark, *mark);
                        }
                    }
                }
            }
        }
    }
}

fn folder_of(record: &PhotoRecord, path_field: Field) -> String {
    if path_field == Field::FolderPath {
        return record.folder_path.clone();
    }
    Path::new(&record.file_path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn set_flag(
    store: &RecordStore,
    snapshot: &FlagSnapshot,
    acc: &mut DeltaAcc,
    id: RecordId,
    field: Field,
    value: bool,
) {
    let record = &store.get_all()[id as usize];
    let old = snapshot.read(record, field);
    acc.set(id, field, old, FieldValue::Bool(value));
}

/// Accumulates deltas with one slot per `(record, field)` pair. A later
/// action overwrites the pair's `new` value; `old` stays at the snapshot
/// value, so undo restores pre-rule state in one pass.
#[derive(Default)]
struct DeltaAcc {
    deltas: Vec<Delta>,
    index: HashMap<(RecordId, Field), usize>,
}

impl DeltaAcc {
    fn set(&mut self, record_id: RecordId, field: Field, old: FieldValue, new: FieldValue) {
        match self.index.entry((record_id, field)) {
            Entry::Occupied(slot) => {
                self.deltas[*slot.get()].new = new;
            }
            Entry::Vacant(slot) => {
                slot.insert(self.deltas.len());
                self.deltas.push(Delta {
                    record_id,
                    field,
                    old,
                    new,
                });
            }
        }
    }

    /// Drop pairs that ended where they started; the command carries only
    /// real changes.
    fn into_deltas(self) -> Vec<Delta> {
        self.deltas
            .into_iter()
            .filter(|d| d.old != d.new)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PhotoRecord;
    use crate::rules::Rule;

    fn store_three_groups() -> RecordStore {
        let mut records = Vec::new();
        for group in 1..=3 {
            for (i, size) in [500u64, 900, 100].into_iter().enumerate() {
                records.push(PhotoRecord::new(
                    group,
                    &format!("/photos/g{group}"),
                    &format!("/photos/g{group}/img_{i}.jpg"),
                    size,
                ));
            }
        }
        RecordStore::from_records(records)
    }

    fn run(store: &RecordStore, json: &str) -> Command {
        let rule = Rule::from_json(json).unwrap().compile().unwrap();
        execute(store, &rule, None, None).unwrap()
    }

    #[test]
    fn test_empty_conditions_make_every_record_a_candidate() {
        let store = store_three_groups();
        let cmd = run(
            &store,
            r#"{"scope": "global", "actions": [{"type": "mark", "value": true}]}"#,
        );
        assert_eq!(cmd.len(), 9);
    }

    #[test]
    fn test_per_group_max_marks_largest_in_each_group() {
        let store = store_three_groups();
        let cmd = run(
            &store,
            r#"{
                "scope": "perGroup",
                "actions": [{"type": "aggregateSelect", "field": "file_size_bytes", "operator": "max", "mark": true}]
            }"#,
        );
        // One winner per group, two flags each
        assert_eq!(cmd.len(), 6);
        let selected: Vec<RecordId> = cmd
            .deltas
            .iter()
            .filter(|d| d.field == Field::IsSelected)
            .map(|d| d.record_id)
            .collect();
        assert_eq!(selected, vec![1, 4, 7]);
    }

    #[test]
    fn test_global_aggregate_uses_one_virtual_group() {
        let store = store_three_groups();
        let cmd = run(
            &store,
            r#"{
                "scope": "global",
                "actions": [{"type": "aggregateSelect", "field": "file_size_bytes", "operator": "max", "mark": true}]
            }"#,
        );
        let selected: Vec<RecordId> = cmd
            .deltas
            .iter()
            .filter(|d| d.field == Field::IsSelected)
            .map(|d| d.record_id)
            .collect();
        // 900 appears three times; the earliest import index wins
        assert_eq!(selected, vec![1]);
    }

    #[test]
    fn test_conditions_narrow_candidates_before_aggregation() {
        let store = store_three_groups();
        let cmd = run(
            &store,
            r#"{
                "scope": "perGroup",
                "conditions": [{"field": "file_size_bytes", "operator": "lt", "value": 900}],
                "actions": [{"type": "aggregateSelect", "field": "file_size_bytes", "operator": "max", "mark": true}]
            }"#,
        );
        let selected: Vec<RecordId> = cmd
            .deltas
            .iter()
            .filter(|d| d.field == Field::IsSelected)
            .map(|d| d.record_id)
            .collect();
        // The 900-byte records are filtered out, so the 500-byte ones win
        assert_eq!(selected, vec![0, 3, 6]);
    }

    #[test]
    fn test_select_by_same_folder_scopes_to_matching_folder() {
        let store = RecordStore::from_records(vec![
            PhotoRecord::new(1, "/photos/x", "/photos/x/a.heic", 10),
            PhotoRecord::new(1, "/photos/x", "/photos/x/b.jpg", 10),
            PhotoRecord::new(2, "/photos/y", "/photos/y/c.heic", 10),
        ]);
        let cmd = run(
            &store,
            r#"{
                "scope": "global",
                "conditions": [{"field": "folder_path", "operator": "eq", "value": "/photos/x"}],
                "actions": [{"type": "selectBySameFolder", "pathField": "file_path", "regex": ".*\\.heic$", "mark": true}]
            }"#,
        );
        let touched: Vec<RecordId> = cmd.deltas.iter().map(|d| d.record_id).collect();
        // Only the .heic inside /photos/x; the one under /photos/y is out of scope
        assert_eq!(touched, vec![0, 0]);
    }

    #[test]
    fn test_noop_deltas_are_dropped() {
        let mut records = vec![PhotoRecord::new(1, "/p", "/p/a.jpg", 10)];
        records[0].is_mark = true;
        let store = RecordStore::from_records(records);
        let cmd = run(
            &store,
            r#"{"scope": "global", "actions": [{"type": "mark", "value": true}]}"#,
        );
        assert!(cmd.is_empty());
    }

    #[test]
    fn test_later_action_overwrites_new_keeps_old() {
        let store = RecordStore::from_records(vec![PhotoRecord::new(1, "/p", "/p/a.jpg", 10)]);
        let cmd = run(
            &store,
            r#"{
                "scope": "global",
                "actions": [
                    {"type": "mark", "value": true},
                    {"type": "mark", "value": false}
                ]
            }"#,
        );
        // mark=true then mark=false coalesces back to the starting value
        assert!(cmd.is_empty());
    }

    #[test]
    fn test_cancelled_flag_aborts_with_no_command() {
        let store = store_three_groups();
        let rule = Rule::from_json(
            r#"{"scope": "global", "actions": [{"type": "mark", "value": true}]}"#,
        )
        .unwrap()
        .compile()
        .unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();
        assert!(matches!(
            execute(&store, &rule, Some(&cancel), None).unwrap_err(),
            Error::Cancelled
        ));
    }

    #[test]
    fn test_progress_reports_start_and_completion() {
        let store = store_three_groups();
        let rule = Rule::from_json(
            r#"{"scope": "global", "actions": [{"type": "mark", "value": true}]}"#,
        )
        .unwrap()
        .compile()
        .unwrap();
        let mut events = Vec::new();
        let mut cb = |p: RuleProgress| events.push(p);
        execute(&store, &rule, None, Some(&mut cb)).unwrap();
        assert!(matches!(events.first(), Some(RuleProgress::Started { groups: 3 })));
        assert!(matches!(
            events.last(),
            Some(RuleProgress::Completed { deltas: 9 })
        ));
    }

    #[test]
    fn test_execute_never_mutates_the_store() {
        let store = store_three_groups();
        run(
            &store,
            r#"{"scope": "global", "actions": [{"type": "mark", "value": true}]}"#,
        );
        assert_eq!(store.stats().marked, 0);
    }
}
