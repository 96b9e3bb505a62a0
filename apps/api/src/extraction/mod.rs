//! Resume file → plain text.
//!
//! Dispatches on the file extension, then collapses repeated lines so the
//! prompt sent to the model stays small. Text beyond [`MAX_DEDUP_CHARS`] is
//! dropped before de-duplication and documents above [`MAX_EXTRACTED_CHARS`]
//! are rejected, which keeps the blocking work per file bounded.

pub mod dedup;
mod docx;
mod pdf;

use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use dedup::{LineDeduper, DEFAULT_SIMILARITY_THRESHOLD};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "bmp"];

/// Documents whose extracted text is longer than this are not resumes.
pub const MAX_EXTRACTED_CHARS: usize = 1_000_000;

/// Characters scanned by the line de-duplication; the rest is discarded.
/// Comparison work is quadratic in this figure, never in the file size.
pub const MAX_DEDUP_CHARS: usize = 16_000;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Image files require OCR, which is not available")]
    OcrUnavailable,

    #[error("PDF extraction error: {0}")]
    Pdf(String),

    #[error("DOCX extraction error: {0}")]
    Docx(String),

    #[error("Extracted text too large ({0} characters)")]
    TooLarge(usize),

    #[error("Extraction task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Docx,
    Text,
}

impl FileKind {
    /// Classifies a file by its (case-insensitive) extension.
    pub fn from_filename(filename: &str) -> Result<Self, ExtractionError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "docx" => Ok(FileKind::Docx),
            "txt" => Ok(FileKind::Text),
            e if IMAGE_EXTENSIONS.contains(&e) => Err(ExtractionError::OcrUnavailable),
            "" => Err(ExtractionError::UnsupportedType("(none)".to_string())),
            e => Err(ExtractionError::UnsupportedType(format!(".{e}"))),
        }
    }
}

/// Extracts and de-duplicates the text of a resume file. CPU-bound.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<String, ExtractionError> {
    let raw = match FileKind::from_filename(filename)? {
        FileKind::Pdf => pdf::extract(bytes)?,
        FileKind::Docx => docx::extract(bytes)?,
        FileKind::Text => String::from_utf8_lossy(bytes).into_owned(),
    };

    let total_chars = raw.chars().count();
    if total_chars > MAX_EXTRACTED_CHARS {
        return Err(ExtractionError::TooLarge(total_chars));
    }

    let mut deduper = LineDeduper::new(DEFAULT_SIMILARITY_THRESHOLD);
    let mut unique: Vec<String> = Vec::new();
    let mut budget = MAX_DEDUP_CHARS;
    let mut total_lines = 0;

    for line in raw.lines() {
        total_lines += 1;
        let len = line.chars().count();
        let line: String = if len > budget {
            warn!("Truncating {filename} to {MAX_DEDUP_CHARS} characters of {total_chars}");
            line.chars().take(budget).collect()
        } else {
            line.to_string()
        };
        budget -= len.min(budget);

        if pdf::is_page_marker(line.trim()) {
            unique.push(line.trim().to_string());
        } else if let Some(kept) = deduper.admit(&line) {
            unique.push(kept.to_string());
        }

        if budget == 0 {
            break;
        }
    }

    info!(
        "Extracted {filename}: {total_lines} lines -> {} unique lines",
        unique.len()
    );
    Ok(unique.join("\n"))
}

/// Runs [`extract_text`] on the blocking pool.
pub async fn extract_text_blocking(
    bytes: bytes::Bytes,
    filename: String,
) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || extract_text(&bytes, &filename))
        .await
        .map_err(|e| ExtractionError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_by_extension() {
        assert_eq!(FileKind::from_filename("cv.PDF").unwrap(), FileKind::Pdf);
        assert_eq!(FileKind::from_filename("cv.docx").unwrap(), FileKind::Docx);
        assert_eq!(FileKind::from_filename("notes.txt").unwrap(), FileKind::Text);
    }

    #[test]
    fn test_images_need_ocr() {
        assert!(matches!(
            FileKind::from_filename("scan.JPG"),
            Err(ExtractionError::OcrUnavailable)
        ));
    }

    #[test]
    fn test_unsupported_extension_named_in_error() {
        let err = FileKind::from_filename("resume.doc").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file type: .doc");
        assert!(FileKind::from_filename("README").is_err());
    }

    #[test]
    fn test_text_extraction_dedups_lines() {
        let text = "Jane Roe\n\njane roe\nRust developer\n";
        let extracted = extract_text(text.as_bytes(), "jane.txt").unwrap();
        assert_eq!(extracted, "Jane Roe\nRust developer");
    }

    #[test]
    fn test_text_extraction_tolerates_invalid_utf8() {
        let bytes = b"Name: Ana\xff\nSkills: Go";
        let extracted = extract_text(bytes, "ana.txt").unwrap();
        assert!(extracted.contains("Skills: Go"));
    }

    #[test]
    fn test_oversized_text_rejected() {
        let text = "a\n".repeat(MAX_EXTRACTED_CHARS);
        assert!(matches!(
            extract_text(text.as_bytes(), "huge.txt"),
            Err(ExtractionError::TooLarge(_))
        ));
    }

    #[test]
    fn test_many_distinct_lines_finish_quickly() {
        // Letter soup lines: no two are near-duplicates, so every pair needs the full comparison
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut text = String::new();
        for _ in 0..3000 {
            for _ in 0..60 {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                text.push((b'a' + ((seed >> 33) % 26) as u8) as char);
            }
            text.push('\n');
        }

        let started = std::time::Instant::now();
        let extracted = extract_text(text.as_bytes(), "soup.txt").unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(30));

        let kept_chars = extracted.chars().filter(|c| *c != '\n').count();
        assert!(kept_chars <= MAX_DEDUP_CHARS);
        assert!(kept_chars > MAX_DEDUP_CHARS / 2);
    }

    #[test]
    fn test_long_single_line_is_cut_not_dropped() {
        let text = "x".repeat(MAX_DEDUP_CHARS * 2);
        let extracted = extract_text(text.as_bytes(), "one-line.txt").unwrap();
        assert_eq!(extracted.len(), MAX_DEDUP_CHARS);
    }

    #[test]
    fn test_page_markers_survive_dedup() {
        let text = "--- Page 1 ---\nJane Doe\n--- Page 2 ---\nJane Doe\nRust";
        let extracted = extract_text(text.as_bytes(), "pages.txt").unwrap();
        assert_eq!(extracted, "--- Page 1 ---\nJane Doe\n--- Page 2 ---\nRust");
    }

    #[test]
    fn test_invalid_pdf_is_an_error() {
        assert!(extract_text(b"not a pdf", "broken.pdf").is_err());
    }

    #[tokio::test]
    async fn test_blocking_wrapper() {
        let text = extract_text_blocking(bytes::Bytes::from_static(b"hello world"), "a.txt".into())
            .await
            .unwrap();
        assert_eq!(text, "hello world");
    }
}
