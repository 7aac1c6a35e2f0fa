//! Paper download: fetch a PDF into a scoped file in the download directory.
//!
//! ## File lifetime
//!
//! pdfium requires a file-system path; it cannot read from a byte buffer.
//! Each download lands in the shared download directory under a name that
//! embeds the paper ID and the run ID plus a random suffix, so concurrent
//! requests for the same paper never collide. The file is owned by a
//! [`DownloadedPdf`] guard: it is deleted when the guard is dropped, on the
//! success path, on every `?` early return and on panic unwind.

use crate::error::PodcastError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A downloaded PDF whose file is removed when this value is dropped.
#[derive(Debug)]
pub struct DownloadedPdf {
    file: NamedTempFile,
    bytes: u64,
}

impl DownloadedPdf {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> u64 {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    /// Delete the file now, logging (not failing on) a removal error.
    ///
    /// Dropping the guard also deletes the file; this variant exists so the
    /// happy path can report a cleanup problem.
    pub fn cleanup(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => debug!("Removed download {}", path.display()),
            Err(e) => warn!("Failed to remove download {}: {}", path.display(), e),
        }
    }
}

/// Build the HTTP client used for paper downloads.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client, PodcastError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("paper2podcast/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PodcastError::Internal(format!("Failed to build HTTP client: {e}")))
}

/// Map a reqwest error to the extraction error taxonomy.
pub(crate) fn fetch_error(url: &str, timeout_secs: u64, e: reqwest::Error) -> PodcastError {
    if e.is_timeout() {
        PodcastError::ExtractionTimeout {
            url: url.to_string(),
            secs: timeout_secs,
        }
    } else {
        PodcastError::ExtractionFailed {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Parameters for one PDF download.
#[derive(Debug, Clone)]
pub struct DownloadRequest<'a> {
    pub url: &'a str,
    pub paper_id: &'a str,
    pub run_id: Uuid,
    pub download_dir: &'a Path,
    pub max_bytes: u64,
    pub timeout_secs: u64,
}

/// Download `request.url` into the download directory.
///
/// # Errors
/// - [`PodcastError::ExtractionTimeout`] when the request times out
/// - [`PodcastError::ExtractionFailed`] on network errors, non-2xx status,
///   bodies larger than `max_bytes`, or bodies that are not a PDF
pub async fn download_pdf(
    client: &reqwest::Client,
    request: &DownloadRequest<'_>,
) -> Result<DownloadedPdf, PodcastError> {
    let url = request.url;
    info!("Downloading PDF from: {}", url);

    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| fetch_error(url, request.timeout_secs, e))?;

    if !response.status().is_success() {
        return Err(PodcastError::ExtractionFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    if let Some(len) = response.content_length() {
        if len > request.max_bytes {
            return Err(too_large(url, request.max_bytes));
        }
    }

    let mut file = scoped_file(request.download_dir, request.paper_id, request.run_id).await?;
    let mut written: u64 = 0;
    let mut magic: Vec<u8> = Vec::with_capacity(4);

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| fetch_error(url, request.timeout_secs, e))?
    {
        written += chunk.len() as u64;
        if written > request.max_bytes {
            return Err(too_large(url, request.max_bytes));
        }
        if magic.len() < 4 {
            let take = (4 - magic.len()).min(chunk.len());
            magic.extend_from_slice(&chunk[..take]);
        }
        file.write_all(&chunk)
            .map_err(|e| PodcastError::Internal(format!("Failed to write download: {e}")))?;
    }
    file.flush()
        .map_err(|e| PodcastError::Internal(format!("Failed to write download: {e}")))?;

    // Verify PDF magic bytes
    if magic.as_slice() != b"%PDF" {
        return Err(PodcastError::ExtractionFailed {
            url: url.to_string(),
            reason: format!("response is not a PDF (first bytes: {magic:?})"),
        });
    }

    info!("Downloaded {} bytes to: {}", written, file.path().display());
    Ok(DownloadedPdf {
        file,
        bytes: written,
    })
}

/// Create the per-run file inside `dir`, creating `dir` if needed.
async fn scoped_file(dir: &Path, paper_id: &str, run_id: Uuid) -> Result<NamedTempFile, PodcastError> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        PodcastError::Internal(format!(
            "Failed to create download directory '{}': {e}",
            dir.display()
        ))
    })?;

    let prefix = format!("{}-{}-", sanitise(paper_id), run_id.simple());
    tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".pdf")
        .tempfile_in(dir)
        .map_err(|e| PodcastError::Internal(format!("Failed to create download file: {e}")))
}

fn too_large(url: &str, max_bytes: u64) -> PodcastError {
    PodcastError::ExtractionFailed {
        url: url.to_string(),
        reason: format!("PDF is larger than {max_bytes} bytes"),
    }
}

/// Keep only characters that are safe in a file name.
fn sanitise(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
        .collect()
}

/// List the files currently in `dir` (empty if it does not exist).
pub fn list_downloads(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect()
        })
        .unwrap_or_default()
}
