use serde::Serialize;

use crate::store::RecordStore;

/// What a deletion pass would remove. Planning is read-only and sits outside
/// the command history; actually removing files is a separate collaborator's
/// job and is never undoable here.
#[derive(Debug, Clone, Serialize)]
pub struct DeletePlan {
    pub delete_paths: Vec<String>,
    pub group_summaries: Vec<DeletePlanGroupSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletePlanGroupSummary {
    pub group_number: i64,
    pub selected_count: usize,
    pub total_count: usize,
    /// True when every member of the group would be deleted, which usually
    /// signals an over-broad selection worth a second look.
    pub is_full_delete: bool,
}

/// Plan deletion of every selected, unlocked record. Locked records never
/// reach `delete_paths`, but they still count toward `selected_count`, so a
/// fully selected group reports `is_full_delete` even when a lock will hold
/// some members back. Every group gets a summary, selection or not.
pub fn plan_delete(store: &RecordStore) -> DeletePlan {
    let mut delete_paths = Vec::new();
    let mut group_summaries = Vec::with_capacity(store.groups().len());

    for group in store.groups() {
        let mut selected = 0;
        let total = group.member_ids.len();
        for &id in &group.member_ids {
            let record = &store.get_all()[id as usize];
            if record.is_selected {
                selected += 1;
                if !record.is_locked {
                    delete_paths.push(record.file_path.clone());
                }
            }
        }
        group_summaries.push(DeletePlanGroupSummary {
            group_number: group.group_number,
            selected_count: selected,
            total_count: total,
            is_full_delete: selected == total,
        });
    }

    DeletePlan {
        delete_paths,
        group_summaries,
    }
}
