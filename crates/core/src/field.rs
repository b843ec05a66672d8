use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::PhotoRecord;
use crate::error::{Error, Result};

/// Runtime type of a field, used to type-check operators at rule validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
    Bool,
    Str,
    Date,
}

/// The closed table of record fields rules can read. Only the three flag
/// fields are writable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    GroupNumber,
    IsMark,
    IsLocked,
    IsSelected,
    FolderPath,
    FilePath,
    CaptureDate,
    ModifiedDate,
    CreationDate,
    ShotDate,
    FileSizeBytes,
    GpsLatitude,
    GpsLongitude,
    PixelWidth,
    PixelHeight,
    Orientation,
}

impl Field {
    pub fn kind(self) -> FieldKind {
        match self {
            Field::GroupNumber | Field::FileSizeBytes => FieldKind::Int,
            Field::PixelWidth | Field::PixelHeight | Field::Orientation => FieldKind::Int,
            Field::GpsLatitude | Field::GpsLongitude => FieldKind::Float,
            Field::IsMark | Field::IsLocked | Field::IsSelected => FieldKind::Bool,
            Field::FolderPath | Field::FilePath => FieldKind::Str,
            Field::CaptureDate | Field::ModifiedDate | Field::CreationDate | Field::ShotDate => {
                FieldKind::Date
            }
        }
    }

    /// Writes are permitted only for the three flag fields.
    pub fn is_mutable(self) -> bool {
        matches!(self, Field::IsMark | Field::IsLocked | Field::IsSelected)
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::GroupNumber => "group_number",
            Field::IsMark => "is_mark",
            Field::IsLocked => "is_locked",
            Field::IsSelected => "is_selected",
            Field::FolderPath => "folder_path",
            Field::FilePath => "file_path",
            Field::CaptureDate => "capture_date",
            Field::ModifiedDate => "modified_date",
            Field::CreationDate => "creation_date",
            Field::ShotDate => "shot_date",
            Field::FileSizeBytes => "file_size_bytes",
            Field::GpsLatitude => "gps_latitude",
            Field::GpsLongitude => "gps_longitude",
            Field::PixelWidth => "pixel_width",
            Field::PixelHeight => "pixel_height",
            Field::Orientation => "orientation",
        }
    }

    /// Name-indexed lookup for callers outside the serde path (CLI flags).
    pub fn parse(name: &str) -> Result<Field> {
        const ALL: [Field; 16] = [
            Field::GroupNumber,
            Field::IsMark,
            Field::IsLocked,
            Field::IsSelected,
            Field::FolderPath,
            Field::FilePath,
            Field::CaptureDate,
            Field::ModifiedDate,
            Field::CreationDate,
            Field::ShotDate,
            Field::FileSizeBytes,
            Field::GpsLatitude,
            Field::GpsLongitude,
            Field::PixelWidth,
            Field::PixelHeight,
            Field::Orientation,
        ];
        ALL.iter()
            .copied()
            .find(|f| f.name() == name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tagged value union carried by conditions and command deltas.
/// `Missing` stands for an optional field with no value; conditions treat it
/// as a non-match, never as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Date(NaiveDateTime),
    Missing,
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            FieldValue::Int(_) => Some(FieldKind::Int),
            FieldValue::Float(_) => Some(FieldKind::Float),
            FieldValue::Bool(_) => Some(FieldKind::Bool),
            FieldValue::Str(_) => Some(FieldKind::Str),
            FieldValue::Date(_) => Some(FieldKind::Date),
            FieldValue::Missing => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Bool(v) => write!(f, "{}", if *v { 1 } else { 0 }),
            FieldValue::Str(v) => f.write_str(v),
            FieldValue::Date(v) => write!(f, "{}", v.format(DATETIME_FORMAT)),
            FieldValue::Missing => Ok(()),
        }
    }
}

/// Compare two values of the same kind. `None` for `Missing` or kind
/// mismatches, which callers treat as "no ordering" (condition false,
/// aggregation skip).
pub fn compare(a: &FieldValue, b: &FieldValue) -> Option<Ordering> {
    match (a, b) {
        (FieldValue::Int(x), FieldValue::Int(y)) => Some(x.cmp(y)),
        (FieldValue::Float(x), FieldValue::Float(y)) => x.partial_cmp(y),
        (FieldValue::Int(x), FieldValue::Float(y)) => (*x as f64).partial_cmp(y),
        (FieldValue::Float(x), FieldValue::Int(y)) => x.partial_cmp(&(*y as f64)),
        (FieldValue::Date(x), FieldValue::Date(y)) => Some(x.cmp(y)),
        (FieldValue::Str(x), FieldValue::Str(y)) => Some(x.cmp(y)),
        (FieldValue::Bool(x), FieldValue::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Canonical worklist timestamp format, shared by the CSV boundary and rule
/// condition values.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a timestamp as `%Y-%m-%d %H:%M:%S`, accepting a bare date as
/// midnight. Returns `None` for empty or unparseable input.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Typed read access. Optional fields without a value read as `Missing`.
pub fn read(record: &PhotoRecord, field: Field) -> FieldValue {
    fn date(v: Option<NaiveDateTime>) -> FieldValue {
        v.map(FieldValue::Date).unwrap_or(FieldValue::Missing)
    }
    fn int(v: Option<i64>) -> FieldValue {
        v.map(FieldValue::Int).unwrap_or(FieldValue::Missing)
    }
    fn float(v: Option<f64>) -> FieldValue {
        v.map(FieldValue::Float).unwrap_or(FieldValue::Missing)
    }

    match field {
        Field::GroupNumber => FieldValue::Int(record.group_number),
        Field::IsMark => FieldValue::Bool(record.is_mark),
        Field::IsLocked => FieldValue::Bool(record.is_locked),
        Field::IsSelected => FieldValue::Bool(record.is_selected),
        Field::FolderPath => FieldValue::Str(record.folder_path.clone()),
        Field::FilePath => FieldValue::Str(record.file_path.clone()),
        Field::CaptureDate => date(record.capture_date),
        Field::ModifiedDate => date(record.modified_date),
        Field::CreationDate => date(record.creation_date),
        Field::ShotDate => date(record.shot_date),
        Field::FileSizeBytes => FieldValue::Int(record.file_size_bytes as i64),
        Field::GpsLatitude => float(record.gps_latitude),
        Field::GpsLongitude => float(record.gps_longitude),
        Field::PixelWidth => int(record.pixel_width),
        Field::PixelHeight => int(record.pixel_height),
        Field::Orientation => int(record.orientation),
    }
}

/// Typed write access. Only the three flag fields accept writes; anything
/// else fails with `ReadOnlyField` before touching the record.
pub fn write(record: &mut PhotoRecord, field: Field, value: &FieldValue) -> Result<()> {
    if !field.is_mutable() {
        return Err(Error::ReadOnlyField(field));
    }
    let flag = match value {
        FieldValue::Bool(b) => *b,
        other => {
            return Err(Error::TypeMismatch {
                field,
                operator: "write".to_string(),
                kind: other.kind().unwrap_or(FieldKind::Bool),
            })
        }
    };
    match field {
        Field::IsMark => record.is_mark = flag,
        Field::IsLocked => record.is_locked = flag,
        Field::IsSelected => record.is_selected = flag,
        // is_mutable() limits us to the three arms above
        _ => unreachable!(),
    }
    Ok(())
}
