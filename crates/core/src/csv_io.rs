use std::fs;
use std::path::Path;

use crate::domain::PhotoRecord;
use crate::error::{Error, Result};
use crate::field::{self, DATETIME_FORMAT};
use crate::store::RecordStore;

/// Columns a worklist CSV must carry, in the order exports write them.
/// Imports tolerate extra columns and any column order.
pub const REQUIRED_HEADERS: [&str; 8] = [
    "GroupNumber",
    "IsMark",
    "IsLocked",
    "FolderPath",
    "FilePath",
    "Capture Date",
    "Modified Date",
    "FileSize",
];

const OPTIONAL_DATE_HEADERS: [&str; 2] = ["Creation Date", "Shot Date"];

struct Columns {
    group_number: usize,
    is_mark: usize,
    is_locked: usize,
    folder_path: usize,
    file_path: usize,
    capture_date: usize,
    modified_date: usize,
    file_size: usize,
    creation_date: Option<usize>,
    shot_date: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);
        let missing: Vec<String> = REQUIRED_HEADERS
            .iter()
            .filter(|name| position(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingHeaders(missing));
        }
        let required = |name: &str| position(name).unwrap_or_default();
        Ok(Self {
            group_number: required("GroupNumber"),
            is_mark: required("IsMark"),
            is_locked: required("IsLocked"),
            folder_path: required("FolderPath"),
            file_path: required("FilePath"),
            capture_date: required("Capture Date"),
            modified_date: required("Modified Date"),
            file_size: required("FileSize"),
            creation_date: position(OPTIONAL_DATE_HEADERS[0]),
            shot_date: position(OPTIONAL_DATE_HEADERS[1]),
        })
    }
}

/// Load a worklist CSV into a record store.
///
/// Rows that fail to parse are logged and skipped rather than failing the
/// whole import. `FileSize` is re-derived from the live file system when the
/// file exists; the CSV text (bytes or human-readable like `1.44MB`) is only
/// a fallback.
pub fn load(path: &Path) -> Result<RecordStore> {
    let mut reader = csv::Reader::from_path(path)?;
    let columns = Columns::resolve(reader.headers()?)?;

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!(line = line + 2, %err, "skipping unreadable CSV row");
                continue;
            }
        };
        match parse_row(&row, &columns) {
            Some(record) => records.push(record),
            None => tracing::warn!(line = line + 2, "skipping malformed CSV row"),
        }
    }
    tracing::debug!(records = records.len(), path = %path.display(), "worklist loaded");
    Ok(RecordStore::from_records(records))
}

fn parse_row(row: &csv::StringRecord, columns: &Columns) -> Option<PhotoRecord> {
    let cell = |idx: usize| row.get(idx).map(str::trim);
    let group_number: i64 = cell(columns.group_number)?.parse().ok()?;
    let is_mark = parse_bool(cell(columns.is_mark)?)?;
    let is_locked = parse_bool(cell(columns.is_locked)?)?;
    let folder_path = cell(columns.folder_path)?;
    let file_path = cell(columns.file_path)?;
    if file_path.is_empty() {
        return None;
    }

    let size = fs::metadata(file_path)
        .map(|meta| meta.len())
        .ok()
        .or_else(|| parse_size(cell(columns.file_size)?))
        .unwrap_or(0);

    let mut record = PhotoRecord::new(group_number, folder_path, file_path, size);
    record.is_mark = is_mark;
    record.is_locked = is_locked;
    record.capture_date = cell(columns.capture_date).and_then(field::parse_datetime);
    record.modified_date = cell(columns.modified_date).and_then(field::parse_datetime);
    record.creation_date = columns
        .creation_date
        .and_then(cell)
        .and_then(field::parse_datetime);
    record.shot_date = columns
        .shot_date
        .and_then(cell)
        .and_then(field::parse_datetime);
    Some(record)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" => Some(true),
        "0" => Some(false),
        _ => match text.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
    }
}

/// Parse `FileSize` text: plain bytes, or a human-readable form such as
/// `1.44MB` (1024-based units).
fn parse_size(text: &str) -> Option<u64> {
    if text.is_empty() {
        return None;
    }
    if let Ok(bytes) = text.parse::<u64>() {
        return Some(bytes);
    }
    let upper = text.to_ascii_uppercase();
    let (number, multiplier) = if let Some(n) = upper.strip_suffix("GB") {
        (n, 1024u64 * 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = upper.strip_suffix('B') {
        (n, 1)
    } else {
        return None;
    };
    let value: f64 = number.trim().parse().ok()?;
    if value < 0.0 {
        return None;
    }
    Some((value * multiplier as f64).round() as u64)
}

/// Write the store back out in group order with the fixed column layout.
/// Sizes are re-read from disk at export time; the stored value is only used
/// when the file is gone.
pub fn save(path: &Path, store: &RecordStore) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header: Vec<&str> = REQUIRED_HEADERS.to_vec();
    header.extend(OPTIONAL_DATE_HEADERS);
    writer.write_record(&header)?;

    for group in store.groups() {
        for record in store.get(group.group_number)? {
            let size = fs::metadata(&record.file_path)
                .map(|meta| meta.len())
                .unwrap_or(record.file_size_bytes);
            writer.write_record([
                record.group_number.to_string(),
                bool_cell(record.is_mark),
                bool_cell(record.is_locked),
                record.folder_path.clone(),
                record.file_path.clone(),
                date_cell(record.capture_date),
                date_cell(record.modified_date),
                size.to_string(),
                date_cell(record.creation_date),
                date_cell(record.shot_date),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn bool_cell(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

fn date_cell(value: Option<chrono::NaiveDateTime>) -> String {
    value
        .map(|d| d.format(DATETIME_FORMAT).to_string())
        .unwrap_or_default()
}
