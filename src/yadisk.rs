use crate::error_utils::{create_http_client_with_context, parse_http_response_json};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

pub const YANDEX_DISK_API_BASE: &str = "https://cloud-api.yandex.net/v1/disk/resources";

/// Status and body of a Disk API call the caller interprets itself
#[derive(Debug, Clone)]
pub struct ApiReply {
    pub status: StatusCode,
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct UploadLink {
    href: Option<String>,
}

/// The cloud storage operations the uploader needs
#[async_trait]
pub trait DiskApi: Send + Sync {
    /// Create a folder; 201 means created and 409 means it already exists
    async fn create_folder(&self, path: &str) -> Result<ApiReply>;

    /// Ask for a pre-signed URL the file bytes can be PUT to
    async fn request_upload_url(&self, path: &str) -> Result<String>;

    /// PUT raw bytes to a pre-signed URL and return the response status
    async fn put_bytes(
        &self,
        href: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<StatusCode>;
}

/// Yandex Disk REST API client using an OAuth token
pub struct YandexDiskClient {
    client: Client,
    oauth_token: String,
    api_base: String,
}

impl YandexDiskClient {
    /// Create a client talking to `api_base`, normally [`YANDEX_DISK_API_BASE`]
    pub fn with_base_url(oauth_token: &str, api_base: &str) -> Result<Self> {
        Ok(Self {
            client: create_http_client_with_context()?,
            oauth_token: oauth_token.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn authorization(&self) -> String {
        format!("OAuth {token}", token = self.oauth_token)
    }
}

#[async_trait]
impl DiskApi for YandexDiskClient {
    async fn create_folder(&self, path: &str) -> Result<ApiReply> {
        debug!("Creating folder {path} on Yandex Disk");

        let response = self
            .client
            .put(&self.api_base)
            .header(header::AUTHORIZATION, self.authorization())
            .query(&[("path", path), ("overwrite", "true")])
            .send()
            .await
            .with_context(|| format!("Failed to send folder creation request for {path}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read folder creation response")?;

        Ok(ApiReply { status, body })
    }

    async fn request_upload_url(&self, path: &str) -> Result<String> {
        let url = format!("{base}/upload", base = self.api_base);
        debug!("Requesting upload URL for {path}");

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, self.authorization())
            .query(&[("path", path), ("overwrite", "true")])
            .send()
            .await
            .with_context(|| format!("Failed to request upload URL for {path}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Upload URL request for {path} failed with status {status}: {body}");
        }

        let link: UploadLink = parse_http_response_json(response, "upload link").await?;
        link.href
            .filter(|href| !href.is_empty())
            .with_context(|| format!("Upload link response for {path} has no href"))
    }

    async fn put_bytes(
        &self,
        href: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<StatusCode> {
        debug!("Uploading {size} bytes", size = bytes.len());
        let content_type = content_type
            .map(str::to_string)
            .unwrap_or_else(|| mime::IMAGE_JPEG.to_string());

        let response = self
            .client
            .put(href)
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .context("Failed to upload bytes to Yandex Disk")?;

        Ok(response.status())
    }
}
