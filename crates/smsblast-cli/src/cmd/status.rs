use crate::output::{print_json, Table};
use crate::settings::Settings;
use anyhow::Context;
use smsblast_core::DeliveryRegistry;
use std::path::Path;

pub fn run(settings: &Settings, state: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let path = settings.state_path(state)?;
    let registry = DeliveryRegistry::load(&path).context("failed to load state file")?;
    let summary = registry.summary();
    let pending = registry.pending();

    if json {
        #[derive(serde::Serialize)]
        struct StatusOutput<'a> {
            state_file: String,
            total: usize,
            sent: usize,
            pending: usize,
            pending_numbers: &'a [String],
        }
        return print_json(&StatusOutput {
            state_file: path.display().to_string(),
            total: summary.total,
            sent: summary.sent,
            pending: summary.pending,
            pending_numbers: &pending,
        });
    }

    println!("State file: {}", path.display());
    println!(
        "Numbers: {}  Sent: {}  Pending: {}",
        summary.total, summary.sent, summary.pending
    );

    if pending.is_empty() {
        println!("\nAll numbers delivered.");
        return Ok(());
    }

    println!();
    let mut table = Table::new(&["#", "PENDING"]);
    for (i, n) in pending.iter().enumerate() {
        table.row(vec![(i + 1).to_string(), n.clone()]);
    }
    table.print();
    Ok(())
}
