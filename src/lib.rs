//! textlift - document image text extraction service.
//!
//! Extracts text from uploaded document images using a vision-capable
//! language model, with adaptive image preprocessing and a local
//! Tesseract fallback for when the primary engine is unavailable or
//! unconvincing.

pub mod cli;
pub mod config;
pub mod models;
pub mod ocr;
pub mod preprocess;
pub mod server;
pub mod services;
