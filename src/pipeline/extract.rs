//! Content extraction: locator in, [`SourceDocument`] out.
//!
//! Two strategies sit behind the [`ContentExtractor`] trait:
//!
//! * [`PdfExtractor`] downloads `{pdf_base_url}/{paper_id}` into the download
//!   directory, reads the first `max_pages` pages and deletes the file again,
//!   whatever the outcome.
//! * [`AbstractExtractor`] fetches `{abs_base_url}/{paper_id}` and scrapes the
//!   abstract from the landing page.
//!
//! Both build the fetch URL from the paper ID rather than from the caller's
//! URL, so a PDF link works in abstract mode and an abstract link works in
//! full-text mode.

use crate::config::{ExtractionMode, PodcastConfig};
use crate::error::PodcastError;
use crate::model::{SourceDocument, SourceKind};
use crate::pipeline::abstract_page::parse_abstract_page;
use crate::pipeline::decode::clean_text;
use crate::pipeline::input::{download_pdf, fetch_error, http_client, DownloadRequest};
use crate::pipeline::locator::Locator;
use crate::pipeline::pdf_text::{join_pages, PdfTextReader, PdfiumTextReader};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// One extraction job.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub locator: Locator,
    /// Scopes transient files to the run that created them.
    pub run_id: Uuid,
}

/// Turns a validated locator into plain text.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// # Errors
    /// [`PodcastError::ExtractionFailed`] or
    /// [`PodcastError::ExtractionTimeout`]; never an empty document.
    async fn extract(&self, request: &ExtractionRequest) -> Result<SourceDocument, PodcastError>;
}

/// Build the extractor selected by `config.extraction`.
pub fn extractor_from_config(
    config: &PodcastConfig,
) -> Result<Arc<dyn ContentExtractor>, PodcastError> {
    let client = http_client(config.download_timeout_secs)?;
    let extractor: Arc<dyn ContentExtractor> = match config.extraction {
        ExtractionMode::FullText => Arc::new(PdfExtractor::new(
            client,
            config,
            Arc::new(PdfiumTextReader),
        )),
        ExtractionMode::Abstract => Arc::new(AbstractExtractor::new(client, config)),
    };
    Ok(extractor)
}

// ── Full text ────────────────────────────────────────────────────────────

/// Extracts the text of a paper's first pages from its PDF.
pub struct PdfExtractor {
    client: reqwest::Client,
    pdf_base_url: String,
    download_dir: PathBuf,
    max_pages: usize,
    max_bytes: u64,
    timeout_secs: u64,
    reader: Arc<dyn PdfTextReader>,
}

impl PdfExtractor {
    pub fn new(
        client: reqwest::Client,
        config: &PodcastConfig,
        reader: Arc<dyn PdfTextReader>,
    ) -> Self {
        Self {
            client,
            pdf_base_url: config.pdf_base_url.clone(),
            download_dir: config.download_dir.clone(),
            max_pages: config.max_pages,
            max_bytes: config.max_download_bytes,
            timeout_secs: config.download_timeout_secs,
            reader,
        }
    }
}

#[async_trait]
impl ContentExtractor for PdfExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<SourceDocument, PodcastError> {
        let paper_id = request.locator.paper_id();
        let url = format!("{}/{}", self.pdf_base_url, paper_id);

        let pdf = download_pdf(
            &self.client,
            &DownloadRequest {
                url: &url,
                paper_id,
                run_id: request.run_id,
                download_dir: &self.download_dir,
                max_bytes: self.max_bytes,
                timeout_secs: self.timeout_secs,
            },
        )
        .await?;

        // pdfium is blocking; `pdf` stays alive (and on disk) until the read is done.
        let reader = Arc::clone(&self.reader);
        let path = pdf.path().to_path_buf();
        let max_pages = self.max_pages;
        let pages = tokio::task::spawn_blocking(move || reader.read_pages(&path, max_pages))
            .await
            .map_err(|e| PodcastError::Internal(format!("PDF reader task failed: {e}")))??;

        pdf.cleanup();

        let pages_read = pages.len();
        let content = join_pages(&pages)
            .map(|text| clean_text(&text))
            .filter(|text| !text.is_empty())
            .ok_or_else(|| PodcastError::ExtractionFailed {
                url: url.clone(),
                reason: format!("no text found in the first {pages_read} page(s)"),
            })?;

        info!(
            "Extracted {} chars from {} page(s) of {}",
            content.len(),
            pages_read,
            paper_id
        );
        Ok(SourceDocument {
            locator: request.locator.to_string(),
            paper_id: paper_id.to_string(),
            title: None,
            kind: SourceKind::FullText { pages_read },
            content,
        })
    }
}

// ── Abstract ─────────────────────────────────────────────────────────────

/// Scrapes a paper's abstract from its landing page.
pub struct AbstractExtractor {
    client: reqwest::Client,
    abs_base_url: String,
    timeout_secs: u64,
}

impl AbstractExtractor {
    pub fn new(client: reqwest::Client, config: &PodcastConfig) -> Self {
        Self {
            client,
            abs_base_url: config.abs_base_url.clone(),
            timeout_secs: config.download_timeout_secs,
        }
    }
}

#[async_trait]
impl ContentExtractor for AbstractExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<SourceDocument, PodcastError> {
        let paper_id = request.locator.paper_id();
        let url = format!("{}/{}", self.abs_base_url, paper_id);
        info!("Fetching abstract page: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| fetch_error(&url, self.timeout_secs, e))?;
        if !response.status().is_success() {
            return Err(PodcastError::ExtractionFailed {
                url,
                reason: format!("HTTP {}", response.status()),
            });
        }
        let html = response
            .text()
            .await
            .map_err(|e| fetch_error(&url, self.timeout_secs, e))?;
        debug!("Abstract page: {} bytes", html.len());

        let page = parse_abstract_page(&html).map_err(|reason| PodcastError::ExtractionFailed {
            url: url.clone(),
            reason,
        })?;

        Ok(SourceDocument {
            locator: request.locator.to_string(),
            paper_id: paper_id.to_string(),
            title: page.title,
            kind: SourceKind::Abstract,
            content: clean_text(&page.abstract_text),
        })
    }
}
