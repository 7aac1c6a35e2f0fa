//! PDF text extraction via pdfium.
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and does CPU-bound work: callers run [`PdfTextReader::read_pages`]
//! inside `tokio::task::spawn_blocking`.
//!
//! [`PdfTextReader`] is the only part of full-text extraction that needs the
//! native library; the download, join and cleanup logic around it does not.

use crate::error::PodcastError;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Reads the text of the first pages of a PDF.
pub trait PdfTextReader: Send + Sync {
    /// Return one entry per page read, in page order, for at most
    /// `max_pages` pages. `None` marks a page whose text could not be read.
    ///
    /// # Errors
    /// [`PodcastError::ExtractionFailed`] when the document itself cannot
    /// be opened.
    fn read_pages(&self, pdf_path: &Path, max_pages: usize)
        -> Result<Vec<Option<String>>, PodcastError>;
}

/// [`PdfTextReader`] backed by pdfium, downloaded on first use by
/// `pdfium-auto` (or taken from `PDFIUM_LIB_PATH`).
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumTextReader;

impl PdfTextReader for PdfiumTextReader {
    fn read_pages(
        &self,
        pdf_path: &Path,
        max_pages: usize,
    ) -> Result<Vec<Option<String>>, PodcastError> {
        let pdfium = pdfium_auto::bind_pdfium_silent().map_err(|e| {
            PodcastError::Internal(format!(
                "Failed to bind to pdfium library: {e}\n\
                 Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy."
            ))
        })?;

        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| PodcastError::ExtractionFailed {
                url: pdf_path.display().to_string(),
                reason: format!("PDF is corrupt or encrypted: {e:?}"),
            })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        let to_read = total_pages.min(max_pages);
        info!("PDF loaded: {} pages, reading {}", total_pages, to_read);

        let mut texts = Vec::with_capacity(to_read);
        for idx in 0..to_read {
            match page_text(pages, idx as u16) {
                Ok(t) => {
                    debug!("Page {} → {} chars", idx + 1, t.len());
                    texts.push(Some(t));
                }
                Err(e) => {
                    warn!("Page {}: text unreadable, treating as empty ({:?})", idx + 1, e);
                    texts.push(None);
                }
            }
        }

        Ok(texts)
    }
}

fn page_text(pages: &PdfPages<'_>, idx: u16) -> Result<String, PdfiumError> {
    let page = pages.get(idx)?;
    let text = page.text()?;
    Ok(text.all())
}

/// Concatenate page texts in page order, unreadable pages as empty text.
///
/// Returns `None` when no page yielded any non-whitespace text.
pub fn join_pages(pages: &[Option<String>]) -> Option<String> {
    let joined = pages
        .iter()
        .map(|p| p.as_deref().unwrap_or(""))
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    if joined.trim().is_empty() {
        None
    } else {
        Some(joined)
    }
}
