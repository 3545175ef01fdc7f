//! # Upload Sources
//!
//! An upload names its content by a source string:
//!
//! | Form | Resolved by |
//! |------|-------------|
//! | `data:[<media>][;base64],<payload>` | decoded in place |
//! | `base64://<payload>` | decoded in place |
//! | `http://…`, `https://…` | [`HttpFetcher`] download |
//!
//! Anything else is rejected with [`SourceError::Unsupported`] before any
//! work is done.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use url::Url;

use crate::retry::retry_send;

/// Errors from parsing or resolving a source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("unsupported source: {0}")]
    Unsupported(String),

    #[error("invalid inline payload: {0}")]
    InvalidInline(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("fetching {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// A parsed upload source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Content carried in the source string itself.
    Inline {
        media_type: Option<String>,
        bytes: Vec<u8>,
    },
    /// Content to download.
    Remote(Url),
}

impl AssetSource {
    /// Parse a source string.
    pub fn parse(source: &str) -> Result<Self, SourceError> {
        let source = source.trim();
        if let Some(rest) = strip_prefix_ignore_case(source, "data:") {
            return parse_data_url(rest);
        }
        if let Some(payload) = strip_prefix_ignore_case(source, "base64://") {
            return Ok(Self::Inline {
                media_type: None,
                bytes: decode_base64(payload)?,
            });
        }
        let url = Url::parse(source).map_err(|_| SourceError::Unsupported(redact(source)))?;
        match url.scheme() {
            "http" | "https" => Ok(Self::Remote(url)),
            other => Err(SourceError::Unsupported(format!("scheme {other:?}"))),
        }
    }
}

/// Downloaded or decoded content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContent {
    pub bytes: Vec<u8>,
    /// Declared media type, used to name content the sniffer cannot place.
    pub media_type: Option<String>,
}

/// HTTP client for remote sources.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gitcas/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SourceError::Client)?;
        Ok(Self { client })
    }

    /// Download `url` and return its body byte-for-byte.
    pub async fn fetch(&self, url: &Url) -> Result<SourceContent, SourceError> {
        let resp = retry_send(|| self.client.get(url.clone()).send())
            .await
            .map_err(|source| SourceError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let media_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(essence);
        let bytes = resp.bytes().await.map_err(|source| SourceError::Http {
            url: url.to_string(),
            source,
        })?;
        tracing::debug!(url = %url, size = bytes.len(), "fetched remote source");

        Ok(SourceContent {
            bytes: bytes.to_vec(),
            media_type,
        })
    }

    /// Produce the content a source refers to.
    pub async fn resolve(&self, source: AssetSource) -> Result<SourceContent, SourceError> {
        match source {
            AssetSource::Inline { media_type, bytes } => Ok(SourceContent { bytes, media_type }),
            AssetSource::Remote(url) => self.fetch(&url).await,
        }
    }
}

fn parse_data_url(rest: &str) -> Result<AssetSource, SourceError> {
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| SourceError::InvalidInline("data URL has no ',' separator".into()))?;

    let mut params = header.split(';');
    let media_type = params.next().and_then(essence);
    let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        decode_base64(payload)?
    } else {
        urlencoding::decode_binary(payload.as_bytes()).into_owned()
    };
    Ok(AssetSource::Inline { media_type, bytes })
}

fn decode_base64(payload: &str) -> Result<Vec<u8>, SourceError> {
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| SourceError::InvalidInline(e.to_string()))
}

/// `type/subtype` without parameters, lowercased. `None` if malformed.
fn essence(media_type: &str) -> Option<String> {
    let essence = media_type.split(';').next()?.trim().to_ascii_lowercase();
    let (ty, sub) = essence.split_once('/')?;
    if ty.is_empty() || sub.is_empty() {
        return None;
    }
    Some(essence)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

fn redact(source: &str) -> String {
    const MAX: usize = 64;
    match source.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &source[..idx]),
        None => source.to_string(),
    }
}
