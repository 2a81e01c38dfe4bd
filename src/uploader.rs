use crate::media::MediaFetcher;
use crate::yadisk::DiskApi;
use reqwest::StatusCode;
use tracing::{info, warn};

/// Result of preparing the destination folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderStatus {
    Created,
    AlreadyExists,
    /// Creation failed; the run carries on and individual uploads may still work
    Failed { reason: String },
}

impl FolderStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, FolderStatus::Created | FolderStatus::AlreadyExists)
    }
}

/// Result of copying one photo to the disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    Failed { reason: String },
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded)
    }
}

/// Join a disk folder and a file name into a destination path
pub fn destination_path(folder: &str, file_name: &str) -> String {
    let folder = folder.trim_end_matches('/');
    if folder.is_empty() {
        file_name.to_string()
    } else {
        format!("{folder}/{file_name}")
    }
}

/// Copies photos from their source URLs into cloud storage.
///
/// Every remote failure is turned into a status value here; nothing
/// propagates to the caller as an error.
pub struct Uploader<D, M> {
    disk: D,
    fetcher: M,
}

impl<D: DiskApi, M: MediaFetcher> Uploader<D, M> {
    pub fn new(disk: D, fetcher: M) -> Self {
        Self { disk, fetcher }
    }

    /// Create the destination folder, treating "already exists" as success
    pub async fn ensure_folder(&self, path: &str) -> FolderStatus {
        let reply = match self.disk.create_folder(path).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Failed to create folder {path}: {e:#}");
                return FolderStatus::Failed {
                    reason: format!("{e:#}"),
                };
            }
        };

        match reply.status {
            StatusCode::CREATED => {
                info!("Folder {path} created");
                FolderStatus::Created
            }
            StatusCode::CONFLICT => {
                info!("Folder {path} already exists");
                FolderStatus::AlreadyExists
            }
            status => {
                warn!(
                    "Error while creating folder {path}: status {status}, body {body}",
                    body = reply.body
                );
                FolderStatus::Failed {
                    reason: format!("status {status}: {body}", body = reply.body),
                }
            }
        }
    }

    /// Copy the photo at `source_url` to `destination_path` on the disk.
    ///
    /// Requests a pre-signed upload URL, downloads the source (must answer
    /// 200), then PUTs the bytes (must answer 201).
    pub async fn upload_file(&self, source_url: &str, destination_path: &str) -> UploadOutcome {
        let failed = |reason: String| {
            warn!("Failed to upload {destination_path}: {reason}");
            UploadOutcome::Failed { reason }
        };

        let href = match self.disk.request_upload_url(destination_path).await {
            Ok(href) => href,
            Err(e) => return failed(format!("no upload URL: {e:#}")),
        };

        let media = match self.fetcher.fetch(source_url).await {
            Ok(media) => media,
            Err(e) => return failed(format!("download error: {e:#}")),
        };
        if !media.is_ok() {
            return failed(format!(
                "download of {source_url} answered {status}",
                status = media.status
            ));
        }

        match self
            .disk
            .put_bytes(&href, media.bytes, media.content_type.as_deref())
            .await
        {
            Ok(StatusCode::CREATED) => {
                info!("File {destination_path} uploaded to Yandex Disk");
                UploadOutcome::Uploaded
            }
            Ok(status) => failed(format!("upload answered {status}")),
            Err(e) => failed(format!("upload error: {e:#}")),
        }
    }
}
