use std::path::Path;

use anyhow::Result;
use dupecull_core::field::Field;
use dupecull_core::Worklist;

pub fn run(
    worklist: &mut Worklist,
    field: &str,
    pattern: &str,
    select: bool,
    output: &Path,
) -> Result<()> {
    let field = Field::parse(field)?;
    let touched = worklist.select_by_field(field, pattern, select)?;

    let verb = if select { "Selected" } else { "Deselected" };
    if touched == 0 {
        println!("{verb} nothing; worklist unchanged.");
        return Ok(());
    }

    worklist.export_csv(output)?;
    println!(
        "{verb} {touched} records, written to {}.",
        output.display()
    );
    Ok(())
}
