use crate::error_utils::create_http_client_with_context;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, warn};

/// Raw result of downloading a photo from its source URL
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FetchedMedia {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }
}

/// Downloads photo bytes from wherever the photo source hosts them
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia>;
}

/// Plain HTTP downloader for VK CDN URLs
pub struct HttpMediaFetcher {
    client: Client,
}

impl HttpMediaFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: create_http_client_with_context()?,
        })
    }
}

/// Build a properly configured HTTP request for a photo download
fn build_media_request(client: &Client, download_url: &str) -> reqwest::RequestBuilder {
    client
        .get(download_url)
        .header(
            header::USER_AGENT,
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
        )
        .header(
            header::ACCEPT,
            "image/jpeg,image/png,image/webp,image/avif,image/*;q=0.8,*/*;q=0.5",
        )
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia> {
        debug!("Downloading photo from {url}");

        let response = build_media_request(&self.client, url)
            .send()
            .await
            .with_context(|| format!("Failed to download photo from {url}"))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            warn!("Failed photo download. Status: {status}. URL: {url}");
            return Ok(FetchedMedia {
                status,
                content_type,
                bytes: Vec::new(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read photo body from {url}"))?
            .to_vec();

        debug!("Downloaded {size} bytes from {url}", size = bytes.len());

        Ok(FetchedMedia {
            status,
            content_type,
            bytes,
        })
    }
}
