use std::path::Path;

use anyhow::{Context, Result};
use dupecull_core::Worklist;

pub fn run(worklist: &Worklist, output: &Path) -> Result<()> {
    worklist
        .export_csv(output)
        .with_context(|| format!("writing {}", output.display()))?;
    let stats = worklist.status();
    println!(
        "Exported {} records in {} groups to {}.",
        stats.total_records,
        stats.total_groups,
        output.display()
    );
    Ok(())
}
