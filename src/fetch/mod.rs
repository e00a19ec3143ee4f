//! Retrieval of raw dataset text from HTTP(S) URLs or local files.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use bytes::Bytes;
use tracing::debug;

use crate::error::FetchError;

/// Character encoding of a dataset resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// ISO-8859-1; every byte is a valid code point, so decoding never fails.
    #[default]
    Latin1,
    Utf8,
}

impl TextEncoding {
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Utf8 => "UTF-8",
        }
    }
}

impl std::str::FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latin-1" | "latin1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            other => Err(format!("unknown encoding '{other}'")),
        }
    }
}

/// Issues a GET for `url` and returns the body of a 2xx response.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes, FetchError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client
        .execute(req)
        .await
        .map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    resp.bytes().await.map_err(|source| FetchError::Body {
        url: url.to_string(),
        source,
    })
}

/// Loads a resource from a local file path or fetches it over HTTP.
#[tracing::instrument(skip(client), fields(source = %source))]
pub async fn fetch_source<C: HttpClient>(client: &C, source: &str) -> Result<Bytes, FetchError> {
    let bytes = if is_remote(source) {
        fetch_bytes(client, source).await?
    } else {
        tokio::fs::read(source)
            .await
            .map(Bytes::from)
            .map_err(|e| FetchError::Io {
                path: source.to_string(),
                source: e,
            })?
    };
    debug!(bytes = bytes.len(), "Resource loaded");
    Ok(bytes)
}

/// `http://` and `https://` sources are fetched; anything else is a local path.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Decodes a fetched body into text, stripping a leading UTF-8 byte order mark.
pub fn decode_text(
    bytes: &[u8],
    encoding: TextEncoding,
    source_name: &str,
) -> Result<String, FetchError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match encoding {
        TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        TextEncoding::Utf8 => {
            String::from_utf8(bytes.to_vec()).map_err(|_| FetchError::Decode {
                source_name: source_name.to_string(),
                encoding: encoding.name(),
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use super::HttpClient;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every request with the same canned status and body.
    pub struct StubClient {
        status: u16,
        body: Vec<u8>,
        calls: AtomicUsize,
    }

    impl StubClient {
        pub fn ok(body: &[u8]) -> Self {
            Self::with_status(200, body)
        }

        pub fn with_status(status: u16, body: &[u8]) -> Self {
            Self {
                status,
                body: body.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpClient for StubClient {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let resp = axum::http::Response::builder()
                .status(self.status)
                .body(self.body.clone())
                .unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }
}
