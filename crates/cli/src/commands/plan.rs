use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use dupecull_core::Worklist;

use super::status::format_size;

pub fn run(worklist: &Worklist, json: bool) -> Result<()> {
    let plan = worklist.plan_delete();

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    if plan.delete_paths.is_empty() {
        println!("Nothing selected for deletion.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Group"),
        Cell::new("Delete"),
        Cell::new("Of"),
        Cell::new(""),
    ]);
    // Summaries cover every group; only groups with a selection are worth a row
    for summary in plan.group_summaries.iter().filter(|s| s.selected_count > 0) {
        let mut row = vec![
            Cell::new(summary.group_number),
            Cell::new(summary.selected_count),
            Cell::new(summary.total_count),
        ];
        row.push(if summary.is_full_delete {
            Cell::new("entire group!").fg(Color::Red)
        } else {
            Cell::new("")
        });
        table.add_row(row);
    }
    println!("{table}");

    let bytes: u64 = plan
        .delete_paths
        .iter()
        .filter_map(|path| worklist.store().find_by_path(path).ok())
        .map(|r| r.file_size_bytes)
        .sum();
    println!(
        "{} files planned for deletion ({}).",
        plan.delete_paths.len(),
        format_size(bytes)
    );
    Ok(())
}
