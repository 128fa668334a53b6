use std::{collections::HashMap, sync::Arc};

use bevy::prelude::*;
use bytes::Bytes;
use futures_util::StreamExt;
use sealevel_jobs::AsyncReturn;

use crate::error::FetchError;

/// Where tileset and terrain bytes come from.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> AsyncReturn<Result<Bytes, FetchError>>;
}

#[derive(Resource, Clone)]
pub struct FetcherResource(pub Arc<dyn Fetcher>);

impl Default for FetcherResource {
    fn default() -> Self {
        Self(Arc::new(HttpFetcher))
    }
}

/// `http(s)` urls go through reqwest, anything else is read from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> AsyncReturn<Result<Bytes, FetchError>> {
        let url = url.to_string();
        Box::pin(async move {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                let path = url.strip_prefix("file://").unwrap_or(&url);
                return Ok(Bytes::from(std::fs::read(path)?));
            }
            let fetch = async {
                let response = reqwest::get(url.as_str()).await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        url: url.clone(),
                        status: status.as_u16(),
                    });
                }
                let total_size = response.content_length().unwrap_or(0);
                let mut bytes_stream = response.bytes_stream();
                let mut bytes = Vec::<u8>::with_capacity(total_size as usize);
                while let Some(bytes_chunk) = bytes_stream.next().await {
                    bytes.extend_from_slice(&bytes_chunk?);
                }
                debug!("Fetched {} bytes from {}", bytes.len(), url);
                Ok(Bytes::from(bytes))
            };
            #[cfg(not(target_arch = "wasm32"))]
            {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;
                runtime.block_on(fetch)
            }
            #[cfg(target_arch = "wasm32")]
            {
                fetch.await
            }
        })
    }
}

/// Serves bytes registered up front; unknown urls are [`FetchError::NotFound`].
#[derive(Debug, Default, Clone)]
pub struct MemoryFetcher {
    resources: HashMap<String, Bytes>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: impl Into<Bytes>) -> &mut Self {
        self.resources.insert(url.into(), bytes.into());
        self
    }

    pub fn with(mut self, url: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        self.insert(url, bytes);
        self
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> AsyncReturn<Result<Bytes, FetchError>> {
        let result = self
            .resources
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()));
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fetcher_serves_registered_urls() {
        let fetcher = MemoryFetcher::new().with("mem://a", &b"hello"[..]);
        let bytes = pollster::block_on(fetcher.fetch("mem://a")).expect("registered");
        assert_eq!(&bytes[..], b"hello");
        let missing = pollster::block_on(fetcher.fetch("mem://b"));
        assert!(matches!(missing, Err(FetchError::NotFound(url)) if url == "mem://b"));
    }

    #[test]
    fn http_fetcher_reads_local_paths() {
        let path = std::env::temp_dir().join("sealevel-fetch-test.json");
        std::fs::write(&path, b"{}").expect("temp file");
        let url = format!("file://{}", path.display());
        let bytes = pollster::block_on(HttpFetcher.fetch(&url)).expect("readable");
        assert_eq!(&bytes[..], b"{}");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn http_fetcher_reports_missing_files() {
        let result = pollster::block_on(HttpFetcher.fetch("/no/such/sealevel/file"));
        assert!(matches!(result, Err(FetchError::Io(_))));
    }
}
