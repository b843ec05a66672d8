use crate::domain::{PhotoRecord, RecordId};
use crate::field::{self, Field, FieldValue};
use crate::rules::AggregateOp;

/// Pick one winner among `candidates`, which arrive in import order.
///
/// Ties always resolve to the earliest candidate: comparisons replace the
/// current winner only on a strict improvement. Records whose field value is
/// missing never win `min`/`max`. Returns `None` when no candidate qualifies.
pub fn select(
    candidates: &[&PhotoRecord],
    operator: AggregateOp,
    field: Option<Field>,
) -> Option<RecordId> {
    match operator {
        AggregateOp::First => candidates.first().map(|r| r.id),
        AggregateOp::Last => candidates.last().map(|r| r.id),
        AggregateOp::Min => select_ordered(candidates, field?, std::cmp::Ordering::Less),
        AggregateOp::Max => select_ordered(candidates, field?, std::cmp::Ordering::Greater),
        AggregateOp::Shortest => select_by_len(candidates, field?, |a, b| a < b),
        AggregateOp::Longest => select_by_len(candidates, field?, |a, b| a > b),
    }
}

fn select_ordered(
    candidates: &[&PhotoRecord],
    field: Field,
    wins: std::cmp::Ordering,
) -> Option<RecordId> {
    let mut best: Option<(RecordId, FieldValue)> = None;
    for record in candidates {
        let value = field::read(record, field);
        if value.is_missing() {
            continue;
        }
        match &best {
            Some((_, current)) if field::compare(&value, current) != Some(wins) => {}
            _ => best = Some((record.id, value)),
        }
    }
    best.map(|(id, _)| id)
}

fn select_by_len(
    candidates: &[&PhotoRecord],
    field: Field,
    wins: fn(usize, usize) -> bool,
) -> Option<RecordId> {
    let mut best: Option<(RecordId, usize)> = None;
    for record in candidates {
        let len = match field::read(record, field) {
            FieldValue::Str(s) => s.chars().count(),
            _ => continue,
        };
        match best {
            Some((_, current)) if !wins(len, current) => {}
            _ => best = Some((record.id, len)),
        }
    }
    best.map(|(id, _)| id)
}
