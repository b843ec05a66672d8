use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use dupecull_core::Worklist;

pub fn run(worklist: &Worklist) -> Result<()> {
    let stats = worklist.status();
    let total_bytes: u64 = worklist.records().iter().map(|r| r.file_size_bytes).sum();

    println!();
    println!("  Dupecull Status");
    println!("  ===============");
    println!();
    println!(
        "   Groups:   {:>8}        Marked:    {:>8}",
        stats.total_groups, stats.marked
    );
    println!(
        "   Records:  {:>8}        Locked:    {:>8}",
        stats.total_records, stats.locked
    );
    println!(
        "   On disk:  {:>8}        Selected:  {:>8}",
        format_size(total_bytes),
        stats.selected
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Group"),
        Cell::new("Files"),
        Cell::new("Size"),
        Cell::new("Marked"),
        Cell::new("Selected"),
    ]);

    for group in worklist.groups().iter().take(20) {
        let members = worklist.store().get(group.group_number)?;
        let size: u64 = members.iter().map(|r| r.file_size_bytes).sum();
        let marked = members.iter().filter(|r| r.is_mark).count();
        let selected = members.iter().filter(|r| r.is_selected).count();

        let mut row = vec![
            Cell::new(group.group_number),
            Cell::new(members.len()),
            Cell::new(format_size(size)),
        ];
        row.push(if marked > 0 {
            Cell::new(marked).fg(Color::Yellow)
        } else {
            Cell::new("")
        });
        row.push(if selected > 0 {
            Cell::new(selected).fg(Color::Cyan)
        } else {
            Cell::new("")
        });
        table.add_row(row);
    }

    println!();
    println!("  Groups (first 20)");
    println!("  -----------------");
    println!("{table}");
    println!();

    Ok(())
}

pub(crate) fn format_size(bytes: u64) -> String {
    const SCALES: [(u64, &str); 3] = [(1 << 30, "GB"), (1 << 20, "MB"), (1 << 10, "KB")];
    for (scale, unit) in SCALES {
        if bytes >= scale {
            return format!("{:.1} {unit}", bytes as f64 / scale as f64);
        }
    }
    format!("{bytes} B")
}
