//! Locator validation: turn the caller's URL into an arXiv paper ID.
//!
//! Only the URL's path and query are searched for the ID. The host is
//! skipped so that a URL like `http://127.0.0.1:8080/abs/2301.00001` yields
//! `2301.00001` rather than `127.0`.

use crate::error::PodcastError;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::fmt;

static RE_PAPER_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\.\d+)").unwrap());

/// A validated paper locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    url: Url,
    paper_id: String,
}

impl Locator {
    /// Parse and validate a locator.
    ///
    /// # Errors
    /// [`PodcastError::InvalidLocator`] when the input is not an http(s) URL
    /// or carries no `\d+\.\d+` paper ID.
    pub fn parse(input: &str) -> Result<Self, PodcastError> {
        let input = input.trim();
        let invalid = |reason: &str| PodcastError::InvalidLocator {
            locator: input.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(input).map_err(|e| invalid(&format!("not a URL ({e})")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("only http and https URLs are supported"));
        }

        let haystack = match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        };
        let paper_id = RE_PAPER_ID
            .captures(&haystack)
            .map(|c| c[1].to_string())
            .ok_or_else(|| invalid("no arXiv paper ID (e.g. 2301.00001) found in the URL"))?;

        Ok(Self { url, paper_id })
    }

    pub fn paper_id(&self) -> &str {
        &self.paper_id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}
