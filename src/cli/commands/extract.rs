//! One-shot extraction command.

use std::path::Path;

use console::style;

use crate::config::Settings;
use crate::models::ExtractionResponse;
use crate::services::ExtractionService;

/// Extract text from a single image file and print it.
pub async fn cmd_extract(settings: Settings, file: &Path, as_json: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(file)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", file.display(), e))?;

    let source_file = file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    let service = ExtractionService::from_settings(&settings);

    match service.extract(&bytes, &source_file).await {
        Ok(result) => {
            if as_json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ExtractionResponse::ok(result))?
                );
            } else {
                let confidence = result
                    .confidence
                    .map(|c| format!(" ({}% confidence)", c))
                    .unwrap_or_default();
                println!(
                    "{} Extracted with the {} engine{}",
                    style("✓").green(),
                    result.ocr_engine,
                    confidence
                );
                if let Some(language) = &result.language {
                    println!("  Language: {}", language);
                }
                println!();
                println!("{}", result.content);
            }
            Ok(())
        }
        Err(e) => {
            if as_json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ExtractionResponse::err(e.to_string()))?
                );
                Ok(())
            } else {
                eprintln!("{} Extraction failed: {}", style("✗").red(), e);
                Err(e.into())
            }
        }
    }
}
