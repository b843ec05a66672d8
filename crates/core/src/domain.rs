use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Store-assigned identifier: a record's position in import order.
pub type RecordId = i64;

/// One photo row originating from a worklist CSV.
///
/// The three flags (`is_mark`, `is_locked`, `is_selected`) are the only
/// mutable state; they change exclusively through command apply/undo. All
/// other fields are fixed at import and read-only inputs to rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: RecordId,
    pub group_number: i64,
    pub is_mark: bool,
    pub is_locked: bool,
    pub is_selected: bool,
    pub folder_path: String,
    pub file_path: String,
    pub file_size_bytes: u64,
    pub capture_date: Option<NaiveDateTime>,
    pub modified_date: Option<NaiveDateTime>,
    pub creation_date: Option<NaiveDateTime>,
    pub shot_date: Option<NaiveDateTime>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub pixel_width: Option<i64>,
    pub pixel_height: Option<i64>,
    pub orientation: Option<i64>,
}

impl PhotoRecord {
    /// Minimal record with everything optional left empty. Flags start clear.
    pub fn new(group_number: i64, folder_path: &str, file_path: &str, size: u64) -> Self {
        Self {
            id: 0,
            group_number,
            is_mark: false,
            is_locked: false,
            is_selected: false,
            folder_path: folder_path.to_string(),
            file_path: file_path.to_string(),
            file_size_bytes: size,
            capture_date: None,
            modified_date: None,
            creation_date: None,
            shot_date: None,
            gps_latitude: None,
            gps_longitude: None,
            pixel_width: None,
            pixel_height: None,
            orientation: None,
        }
    }
}

/// Records sharing a `group_number`, in import order. Membership is fixed
/// after import; groups are never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoGroup {
    pub group_number: i64,
    pub member_ids: Vec<RecordId>,
}

/// Summary counters for the whole worklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorklistStats {
    pub total_groups: usize,
    pub total_records: usize,
    pub marked: usize,
    pub locked: usize,
    pub selected: usize,
}
