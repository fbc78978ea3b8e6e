//! Set of blocked origin addresses, loadable from a local file and
//! refreshable from an HTTP(S) URL with ETag-based conditional requests.
//! `Wash` consults this on every pass; the pool's blocklist task refreshes
//! it on a randomized 60-120s interval.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{Request, StatusCode};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use txpool_types::Address;

#[derive(Debug, Error)]
pub enum BlocklistError {
    #[error("invalid length")]
    InvalidLength,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http error: {0}")]
    Http(String),
}

/// Outcome of an HTTP refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    NotModified,
    Updated { count: usize },
}

pub struct Blocklist {
    inner: parking_lot::RwLock<Inner>,
}

struct Inner {
    addresses: HashSet<Address>,
    etag: Option<String>,
}

impl Default for Blocklist {
    fn default() -> Self {
        Blocklist {
            inner: parking_lot::RwLock::new(Inner {
                addresses: HashSet::new(),
                etag: None,
            }),
        }
    }
}

impl Blocklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_file(path: &Path) -> Result<Self, BlocklistError> {
        let text = fs::read_to_string(path)?;
        let addresses = parse(&text)?;
        Ok(Blocklist {
            inner: parking_lot::RwLock::new(Inner {
                addresses,
                etag: None,
            }),
        })
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.inner.read().addresses.contains(address)
    }

    pub fn len(&self) -> usize {
        self.inner.read().addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds a single address without going through a file or HTTP refresh.
    pub fn insert(&self, address: Address) {
        self.inner.write().addresses.insert(address);
    }

    /// Fetches `url`, sending `If-None-Match` when an etag is cached.
    /// Honours `304 Not Modified` (no update) and any `2xx` (replace the
    /// list, update the etag, persist to `cache_path` when given).
    pub async fn refresh_from_url(
        &self,
        url: &str,
        cache_path: Option<&PathBuf>,
    ) -> Result<RefreshOutcome, BlocklistError> {
        let uri: hyper::Uri = url.parse().map_err(|e| BlocklistError::Http(format!("{e}")))?;
        let cached_etag = self.inner.read().etag.clone();

        let mut builder = Request::get(uri).header("user-agent", "txpool-blocklist-fetcher/1");
        if let Some(ref etag) = cached_etag {
            builder = builder.header("If-None-Match", etag.as_str());
        }
        let request = builder
            .body(Empty::<Bytes>::new())
            .map_err(|e| BlocklistError::Http(format!("{e}")))?;

        let https = HttpsConnector::new();
        let client: Client<_, Empty<Bytes>> = Client::builder(TokioExecutor::new()).build(https);
        let response = client
            .request(request)
            .await
            .map_err(|e| BlocklistError::Http(format!("{e}")))?;

        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(RefreshOutcome::NotModified);
        }
        if !response.status().is_success() {
            return Err(BlocklistError::Http(format!("status {}", response.status())));
        }

        let new_etag = response
            .headers()
            .get(hyper::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| BlocklistError::Http(format!("{e}")))?
            .to_bytes();
        let text = String::from_utf8_lossy(&body).into_owned();
        let addresses = parse(&text)?;
        let count = addresses.len();

        {
            let mut inner = self.inner.write();
            inner.addresses = addresses;
            inner.etag = new_etag;
        }

        if let Some(path) = cache_path {
            fs::write(path, &text)?;
        }

        Ok(RefreshOutcome::Updated { count })
    }
}

fn parse(text: &str) -> Result<HashSet<Address>, BlocklistError> {
    let mut addresses = HashSet::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let hex_str = line.strip_prefix("0x").unwrap_or(line);
        let mut raw = [0u8; 20];
        faster_hex::hex_decode(hex_str.as_bytes(), &mut raw)
            .map_err(|_| BlocklistError::InvalidLength)?;
        addresses.insert(Address::from(raw));
    }
    Ok(addresses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_addresses_with_and_without_prefix_and_ignores_blank_lines() {
        let text = "0x25Df024637d4e56c1aE9563987Bf3e92C9f534c0\n\n  d6ae8250b8348c94847280928c79fb3b63ca453e\n";
        let addresses = parse(text).unwrap();
        assert_eq!(addresses.len(), 2);
    }

    #[test]
    fn rejects_malformed_lines() {
        let text = "0x1234\n";
        assert!(matches!(parse(text), Err(BlocklistError::InvalidLength)));
    }

    #[test]
    fn load_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocklist.txt");
        fs::write(&path, "0x25Df024637d4e56c1aE9563987Bf3e92C9f534c0\n").unwrap();
        let blocklist = Blocklist::load_file(&path).unwrap();
        assert_eq!(blocklist.len(), 1);
    }
}
