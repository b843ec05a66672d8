use std::collections::HashMap;

use crate::domain::{PhotoGroup, PhotoRecord, RecordId, WorklistStats};
use crate::error::{Error, Result};
use crate::field::{self, Field, FieldValue};

/// In-memory ordered record collection, grouped by group number.
///
/// Records keep their import order globally and within groups; that order is
/// the tie-break for every aggregation, so it never changes after
/// construction. Mutation happens only through `apply_delta`.
#[derive(Debug)]
pub struct RecordStore {
    records: Vec<PhotoRecord>,
    path_index: HashMap<String, RecordId>,
    groups: Vec<PhotoGroup>,
    group_index: HashMap<i64, usize>,
}

impl RecordStore {
    /// Build a store from records in import order, assigning ids and the
    /// group index. Records with a duplicate `file_path` replace nothing;
    /// the first occurrence wins and later ones are dropped.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = PhotoRecord>,
    {
        let mut store = Self {
            records: Vec::new(),
            path_index: HashMap::new(),
            groups: Vec::new(),
            group_index: HashMap::new(),
        };
        for mut record in records {
            if store.path_index.contains_key(&record.file_path) {
                tracing::warn!(path = %record.file_path, "duplicate file path dropped");
                continue;
            }
            let id = store.records.len() as RecordId;
            record.id = id;
            store.path_index.insert(record.file_path.clone(), id);
            let group_pos = *store
                .group_index
                .entry(record.group_number)
                .or_insert_with(|| {
                    store.groups.push(PhotoGroup {
                        group_number: record.group_number,
                        member_ids: Vec::new(),
                    });
                    store.groups.len() - 1
                });
            store.groups[group_pos].member_ids.push(id);
            store.records.push(record);
        }
        store
    }

    /// All records in import order.
    pub fn get_all(&self) -> &[PhotoRecord] {
        &self.records
    }

    /// Groups in first-appearance order.
    pub fn groups(&self) -> &[PhotoGroup] {
        &self.groups
    }

    /// Member records of one group, in import order.
    pub fn get(&self, group_number: i64) -> Result<Vec<&PhotoRecord>> {
        let pos = self
            .group_index
            .get(&group_number)
            .ok_or(Error::GroupNotFound(group_number))?;
        Ok(self.groups[*pos]
            .member_ids
            .iter()
            .map(|&id| &self.records[id as usize])
            .collect())
    }

    pub fn find(&self, id: RecordId) -> Result<&PhotoRecord> {
        self.records
            .get(usize::try_from(id).map_err(|_| Error::RecordNotFound(id))?)
            .ok_or(Error::RecordNotFound(id))
    }

    pub fn find_by_path(&self, path: &str) -> Result<&PhotoRecord> {
        let id = self
            .path_index
            .get(path)
            .ok_or_else(|| Error::PathNotFound(path.to_string()))?;
        Ok(&self.records[*id as usize])
    }

    /// Write one field of one record. The only mutation path into the store;
    /// fails without touching anything if the record is unknown or the field
    /// read-only.
    pub fn apply_delta(&mut self, id: RecordId, field: Field, value: &FieldValue) -> Result<()> {
        let idx = usize::try_from(id).map_err(|_| Error::RecordNotFound(id))?;
        let record = self
            .records
            .get_mut(idx)
            .ok_or(Error::RecordNotFound(id))?;
        field::write(record, field, value)
    }

    /// Consistent copy of the three mutable flags for every record, taken at
    /// rule start so parallel evaluation never observes partial effects.
    pub fn flag_snapshot(&self) -> FlagSnapshot {
        FlagSnapshot {
            flags: self
                .records
                .iter()
                .map(|r| [r.is_mark, r.is_locked, r.is_selected])
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> WorklistStats {
        WorklistStats {
            total_groups: self.groups.len(),
            total_records: self.records.len(),
            marked: self.records.iter().filter(|r| r.is_mark).count(),
            locked: self.records.iter().filter(|r| r.is_locked).count(),
            selected: self.records.iter().filter(|r| r.is_selected).count(),
        }
    }
}

/// Immutable view of the flag fields captured at a point in time. Reads of
/// any other field pass through to the record, which is read-only anyway.
#[derive(Debug)]
pub struct FlagSnapshot {
    flags: Vec<[bool; 3]>,
}

impl FlagSnapshot {
    pub fn read(&self, record: &PhotoRecord, field: Field) -> FieldValue {
        let idx = record.id as usize;
        match (field, self.flags.get(idx)) {
            (Field::IsMark, Some(f)) => FieldValue::Bool(f[0]),
            (Field::IsLocked, Some(f)) => FieldValue::Bool(f[1]),
            (Field::IsSelected, Some(f)) => FieldValue::Bool(f[2]),
            _ => field::read(record, field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(records: Vec<PhotoRecord>) -> RecordStore {
        RecordStore::from_records(records)
    }

    fn rec(group: i64, path: &str, size: u64) -> PhotoRecord {
        PhotoRecord::new(group, "/photos", path, size)
    }

    #[test]
    fn test_from_records_assigns_import_order_ids() {
        let store = store_with(vec![
            rec(1, "/photos/a.jpg", 100),
            rec(2, "/photos/b.jpg", 200),
            rec(1, "/photos/c.jpg", 300),
        ]);
        let ids: Vec<RecordId> = store.get_all().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_groups_preserve_first_appearance_order() {
        let store = store_with(vec![
            rec(7, "/photos/a.jpg", 100),
            rec(2, "/photos/b.jpg", 200),
            rec(7, "/photos/c.jpg", 300),
        ]);
        let group_numbers: Vec<i64> = store.groups().iter().map(|g| g.group_number).collect();
        assert_eq!(group_numbers, vec![7, 2]);
        assert_eq!(store.get(7).unwrap().len(), 2);
        assert_eq!(store.get(2).unwrap().len(), 1);
    }

    #[test]
    fn test_get_unknown_group() {
        let store = store_with(vec![rec(1, "/photos/a.jpg", 100)]);
        assert!(matches!(
            store.get(99).unwrap_err(),
            Error::GroupNotFound(99)
        ));
    }

    #[test]
    fn test_find_and_find_by_path() {
        let store = store_with(vec![rec(1, "/photos/a.jpg", 100)]);
        assert_eq!(store.find(0).unwrap().file_path, "/photos/a.jpg");
        assert_eq!(store.find_by_path("/photos/a.jpg").unwrap().id, 0);
        assert!(matches!(
            store.find(5).unwrap_err(),
            Error::RecordNotFound(5)
        ));
        assert!(store.find_by_path("/nope").is_err());
    }

    #[test]
    fn test_apply_delta_mutates_flags_only() {
        let mut store = store_with(vec![rec(1, "/photos/a.jpg", 100)]);
        store
            .apply_delta(0, Field::IsMark, &FieldValue::Bool(true))
            .unwrap();
        assert!(store.find(0).unwrap().is_mark);

        let err = store
            .apply_delta(0, Field::FolderPath, &FieldValue::Bool(true))
            .unwrap_err();
        assert!(matches!(err, Error::ReadOnlyField(Field::FolderPath)));
    }

    #[test]
    fn test_apply_delta_unknown_record() {
        let mut store = store_with(vec![rec(1, "/photos/a.jpg", 100)]);
        assert!(store
            .apply_delta(42, Field::IsMark, &FieldValue::Bool(true))
            .is_err());
    }

    #[test]
    fn test_duplicate_path_first_wins() {
        let store = store_with(vec![
            rec(1, "/photos/a.jpg", 100),
            rec(2, "/photos/a.jpg", 999),
        ]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.find_by_path("/photos/a.jpg").unwrap().group_number, 1);
    }

    #[test]
    fn test_flag_snapshot_is_immutable_view() {
        let mut store = store_with(vec![rec(1, "/photos/a.jpg", 100)]);
        let snapshot = store.flag_snapshot();
        store
            .apply_delta(0, Field::IsMark, &FieldValue::Bool(true))
            .unwrap();

        let record = store.find(0).unwrap().clone();
        // Snapshot still sees the pre-mutation value; live read sees the new one
        assert_eq!(snapshot.read(&record, Field::IsMark), FieldValue::Bool(false));
        assert_eq!(field::read(&record, Field::IsMark), FieldValue::Bool(true));
    }

    #[test]
    fn test_stats_counts_flags() {
        let mut store = store_with(vec![
            rec(1, "/photos/a.jpg", 100),
            rec(1, "/photos/b.jpg", 100),
            rec(2, "/photos/c.jpg", 100),
        ]);
        store
            .apply_delta(0, Field::IsMark, &FieldValue::Bool(true))
            .unwrap();
        store
            .apply_delta(1, Field::IsLocked, &FieldValue::Bool(true))
            .unwrap();

        let stats = store.stats();
        assert_eq!(stats.total_groups, 2);
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.marked, 1);
        assert_eq!(stats.locked, 1);
        assert_eq!(stats.selected, 0);
    }
}
