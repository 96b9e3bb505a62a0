use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

use super::ExtractionError;

const PAGE_MARKER_PREFIX: &str = "--- Page ";
const PAGE_MARKER_SUFFIX: &str = " ---";

/// Extracts the text layer of a PDF, each page headed by `--- Page N ---`.
/// Scanned pages without a text layer yield only their marker.
pub(super) fn extract(bytes: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    let result = catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| ExtractionError::Pdf("document could not be decoded".to_string()))?;

    let pages = result.map_err(|e| ExtractionError::Pdf(e.to_string()))?;
    if pages.iter().all(|page| page.trim().is_empty()) {
        warn!("PDF has no text layer; OCR is not available");
    }
    Ok(join_pages(&pages))
}

fn join_pages(pages: &[String]) -> String {
    let mut text = String::new();
    for (i, page) in pages.iter().enumerate() {
        text.push('\n');
        text.push_str(&page_marker(i + 1));
        text.push('\n');
        text.push_str(page);
    }
    text
}

fn page_marker(page: usize) -> String {
    format!("{PAGE_MARKER_PREFIX}{page}{PAGE_MARKER_SUFFIX}")
}

/// True for the trimmed page headers written by [`extract`].
pub(super) fn is_page_marker(line: &str) -> bool {
    line.strip_prefix(PAGE_MARKER_PREFIX)
        .and_then(|rest| rest.strip_suffix(PAGE_MARKER_SUFFIX))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}
