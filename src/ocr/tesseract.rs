//! Tesseract OCR fallback engine.
//!
//! Runs the tesseract binary on the enhanced image with a multi-language
//! model set, automatic page segmentation, and interword-spacing
//! preservation. Each invocation is a fresh session scoped to a
//! temporary directory that is released on every path, success or error.
//!
//! Recognition runs in TSV mode so a single pass yields both the text
//! and a mean word confidence.

use std::process::Command;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tempfile::TempDir;
use tracing::debug;

use super::{check_binary, EngineError, EngineOutput, TextEngine};
use crate::config::TesseractConfig;
use crate::models::EngineKind;

/// Local Tesseract OCR engine (the fallback engine).
pub struct TesseractEngine {
    config: TesseractConfig,
}

impl TesseractEngine {
    /// Create a new Tesseract engine with the given configuration.
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TextEngine for TesseractEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Tesseract
    }

    fn is_available(&self) -> bool {
        check_binary(&self.config.binary)
    }

    fn availability_hint(&self) -> String {
        if !check_binary(&self.config.binary) {
            "Tesseract not installed. Install with: apt install tesseract-ocr".to_string()
        } else {
            format!(
                "Tesseract is available (languages: {})",
                self.config.language_combination()
            )
        }
    }

    async fn extract(&self, image: &[u8]) -> Result<EngineOutput, EngineError> {
        let config = self.config.clone();
        let image = image.to_vec();

        // Recognition is CPU-bound subprocess work; keep it off the
        // async runtime so concurrent requests make progress.
        tokio::task::spawn_blocking(move || recognize(&config, &image))
            .await
            .map_err(|e| EngineError::RequestFailed(format!("ocr task panicked: {}", e)))?
    }
}

/// Run one scoped recognition session.
fn recognize(config: &TesseractConfig, image: &[u8]) -> Result<EngineOutput, EngineError> {
    // The temp dir scopes every session resource; dropping it releases
    // them unconditionally, including on the error paths below.
    let temp_dir = TempDir::new()?;
    let input_path = temp_dir.path().join("input.jpg");
    std::fs::write(&input_path, image)?;

    let output = Command::new(&config.binary)
        .arg(&input_path)
        .arg("stdout")
        .args(["-l", &config.language_combination()])
        .args(["--psm", "3"]) // fully automatic page segmentation
        .args(["-c", "preserve_interword_spaces=1"])
        .arg("tsv")
        .output();

    let raw = match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).to_string()
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::RequestFailed(format!(
                "tesseract failed: {}",
                stderr
            )));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EngineError::NotAvailable(
                "tesseract not found (install tesseract-ocr)".to_string(),
            ));
        }
        Err(e) => return Err(EngineError::Io(e)),
    };

    let (text, confidence) = parse_tsv(&raw);
    let cleaned = clean_output(&text);
    debug!(
        chars = cleaned.chars().count(),
        confidence, "tesseract recognition finished"
    );

    Ok(EngineOutput {
        text: cleaned,
        confidence,
    })
}

/// Rebuild text and mean word confidence from Tesseract TSV output.
///
/// Word rows (level 5) are joined with spaces; line changes emit a
/// newline, block or paragraph changes a blank line. Confidence is the
/// mean over word rows, rounded; rows with conf -1 are structural and
/// ignored.
fn parse_tsv(raw: &str) -> (String, Option<u8>) {
    let mut text = String::new();
    let mut confidences: Vec<f32> = Vec::new();
    let mut last_position: Option<(u32, u32, u32)> = None;

    for row in raw.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }
        let level: u32 = cols[0].parse().unwrap_or(0);
        if level != 5 {
            continue;
        }
        let word = cols[11];
        if word.trim().is_empty() {
            continue;
        }

        let block: u32 = cols[2].parse().unwrap_or(0);
        let paragraph: u32 = cols[3].parse().unwrap_or(0);
        let line: u32 = cols[4].parse().unwrap_or(0);

        if let Some((prev_block, prev_par, prev_line)) = last_position {
            if block != prev_block || paragraph != prev_par {
                text.push_str("\n\n");
            } else if line != prev_line {
                text.push('\n');
            } else {
                text.push(' ');
            }
        }
        text.push_str(word.trim());

        if let Ok(conf) = cols[10].parse::<f32>() {
            if conf >= 0.0 {
                confidences.push(conf);
            }
        }
        last_position = Some((block, paragraph, line));
    }

    let confidence = if confidences.is_empty() {
        None
    } else {
        let mean = confidences.iter().sum::<f32>() / confidences.len() as f32;
        Some(mean.round().clamp(0.0, 100.0) as u8)
    };

    (text, confidence)
}

/// Normalize raw recognition output: collapse 3+ consecutive line breaks
/// to exactly 2 and runs of horizontal whitespace to a single space.
fn clean_output(raw: &str) -> String {
    static NEWLINES: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();
    let newlines = NEWLINES.get_or_init(|| Regex::new(r"\n{3,}").expect("static regex"));
    let spaces = SPACES.get_or_init(|| Regex::new(r"[ \t]+").expect("static regex"));

    let collapsed = newlines.replace_all(raw.trim(), "\n\n");
    spaces.replace_all(&collapsed, " ").to_string()
}
