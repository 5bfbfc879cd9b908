//! Providers command handler.

use anyhow::Result;

use modelrelay_core::ProviderRecord;

use crate::config::directory_from_env;
use crate::presentation::print_separator;

/// Execute the providers command.
///
/// Keys are never printed, only whether one is set.
pub fn execute() -> Result<()> {
    let directory = directory_from_env()?;

    println!("{:<12} {:<8} {:<6} Base URL", "Provider", "Enabled", "Key");
    print_separator(72);
    for record in directory.snapshot_all() {
        println!("{}", format_row(&record));
    }

    Ok(())
}

fn format_row(record: &ProviderRecord) -> String {
    format!(
        "{:<12} {:<8} {:<6} {}",
        record.id,
        if record.enabled { "yes" } else { "no" },
        if record.has_api_key() { "set" } else { "--" },
        record.effective_base_url()
    )
}
