use regex::Regex;

use crate::command::{Command, Delta};
use crate::error::{Error, Result};
use crate::field::{Field, FieldKind, FieldValue};
use crate::store::RecordStore;

/// Build a command that sets `is_selected` on every record whose `field`
/// value matches `pattern`. With `select` false the matches are deselected
/// instead.
///
/// String fields match on their value. `group_number` is special-cased: the
/// pattern matches against the decimal group number and selects the whole
/// group. Other fields are rejected with `TypeMismatch`. Records already in
/// the requested state produce no delta, so re-running is idempotent.
pub fn select_by_field(
    store: &RecordStore,
    field: Field,
    pattern: &str,
    select: bool,
) -> Result<Command> {
    let regex = Regex::new(pattern).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    if field != Field::GroupNumber && field.kind() != FieldKind::Str {
        return Err(Error::TypeMismatch {
            field,
            operator: "select".to_string(),
            kind: field.kind(),
        });
    }

    let label = if select {
        format!("select by {field}")
    } else {
        format!("deselect by {field}")
    };
    let mut deltas = Vec::new();
    for record in store.get_all() {
        let matched = match field {
            Field::GroupNumber => regex.is_match(&record.group_number.to_string()),
            Field::FolderPath => regex.is_match(&record.folder_path),
            Field::FilePath => regex.is_match(&record.file_path),
            _ => false,
        };
        if matched && record.is_selected != select {
            deltas.push(Delta {
                record_id: record.id,
                field: Field::IsSelected,
                old: FieldValue::Bool(record.is_selected),
                new: FieldValue::Bool(select),
            });
        }
    }
    Ok(Command::new(label, deltas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::History;
    use crate::domain::PhotoRecord;

    fn store() -> RecordStore {
        RecordStore::from_records(vec![
            PhotoRecord::new(1, "/photos/x", "/photos/x/a.heic", 10),
            PhotoRecord::new(1, "/photos/x", "/photos/x/b.jpg", 10),
            PhotoRecord::new(12, "/photos/y", "/photos/y/c.heic", 10),
        ])
    }

    #[test]
    fn test_select_by_file_path_regex() {
        let store = store();
        let cmd = select_by_field(&store, Field::FilePath, r".*\.heic$", true).unwrap();
        let ids: Vec<_> = cmd.deltas.iter().map(|d| d.record_id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn test_group_number_matches_whole_group() {
        let store = store();
        let cmd = select_by_field(&store, Field::GroupNumber, r"^1$", true).unwrap();
        let ids: Vec<_> = cmd.deltas.iter().map(|d| d.record_id).collect();
        // Anchored pattern keeps group 12 out
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_deselect_only_touches_selected_records() {
        let mut store = store();
        let mut history = History::new();
        let cmd = select_by_field(&store, Field::FilePath, r".*\.heic$", true).unwrap();
        history.push(cmd, &mut store).unwrap();

        let cmd = select_by_field(&store, Field::FilePath, ".*", false).unwrap();
        let ids: Vec<_> = cmd.deltas.iter().map(|d| d.record_id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn test_numeric_field_rejected() {
        let store = store();
        assert!(matches!(
            select_by_field(&store, Field::FileSizeBytes, ".*", true).unwrap_err(),
            Error::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let store = store();
        assert!(matches!(
            select_by_field(&store, Field::FilePath, "[", true).unwrap_err(),
            Error::InvalidPattern { .. }
        ));
    }

    #[test]
    fn test_idempotent_reselect_is_empty() {
        let mut store = store();
        let mut history = History::new();
        let cmd = select_by_field(&store, Field::FilePath, r".*\.heic$", true).unwrap();
        history.push(cmd, &mut store).unwrap();

        let again = select_by_field(&store, Field::FilePath, r".*\.heic$", true).unwrap();
        assert!(again.is_empty());
    }
}
