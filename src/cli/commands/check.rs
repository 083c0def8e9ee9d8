//! Engine availability check command.

use console::style;

use crate::config::Settings;
use crate::services::ExtractionService;

/// Report availability of both extraction engines.
pub fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    let service = ExtractionService::from_settings(settings);

    println!("{} Extraction engines:", style("→").cyan());
    for engine in service.engines() {
        let mark = if engine.is_available() {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!("  {} {}: {}", mark, engine.kind(), engine.availability_hint());
    }

    Ok(())
}
