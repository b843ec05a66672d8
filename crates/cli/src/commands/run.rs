use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use dupecull_core::rules::engine::RuleProgress;
use dupecull_core::rules::Rule;
use dupecull_core::Worklist;
use indicatif::{ProgressBar, ProgressStyle};

pub fn run(worklist: &mut Worklist, rule_path: &Path, dry_run: bool, output: &Path) -> Result<()> {
    let text = fs::read_to_string(rule_path)
        .with_context(|| format!("reading rule file {}", rule_path.display()))?;
    let rule = Rule::from_json(&text)?;
    let name = rule.name.clone().unwrap_or_else(|| "unnamed rule".into());

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut progress = |event: RuleProgress| match event {
        RuleProgress::Started { groups } => {
            pb.set_length(groups as u64);
            pb.set_position(0);
            pb.set_message(format!("Evaluating {name}..."));
        }
        RuleProgress::Evaluated { groups_done, .. } => {
            pb.set_position(groups_done as u64);
        }
        RuleProgress::Completed { deltas } => {
            pb.finish_with_message(format!("{deltas} field changes"));
        }
    };

    if dry_run {
        let command = worklist.execute_rule(&rule, None, Some(&mut progress))?;
        println!(
            "Dry run: rule would change {} fields across {} records.",
            command.len(),
            touched_records(&command)
        );
        return Ok(());
    }

    let changes = worklist.run_rule(&rule, None, Some(&mut progress))?;
    if changes == 0 {
        println!("Rule matched nothing; worklist unchanged.");
        return Ok(());
    }

    worklist.export_csv(output)?;
    println!(
        "Applied rule: {changes} field changes, written to {}.",
        output.display()
    );
    Ok(())
}

fn touched_records(command: &dupecull_core::command::Command) -> usize {
    let mut ids: Vec<_> = command.deltas.iter().map(|d| d.record_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.len()
}
