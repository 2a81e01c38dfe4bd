use crate::config::Config;
use crate::datetime_utils::now_local;
use crate::manifest::{build_manifest_entry, persist_manifest, UploadRecord};
use crate::media::{HttpMediaFetcher, MediaFetcher};
use crate::naming::{derive_file_name, SeenLikes};
use crate::uploader::{destination_path, UploadOutcome, Uploader};
use crate::vk::{parse_user_identifier, Photo, PhotoSource, VkClient};
use crate::yadisk::{DiskApi, YandexDiskClient};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{info, warn};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Photos were processed and the manifest was written
    Completed {
        manifest_path: PathBuf,
        records: Vec<UploadRecord>,
        photo_count: usize,
    },
    /// The handle or ID could not be resolved; nothing was written
    UserNotFound { identifier: String },
    /// The photo listing was unavailable; nothing was written
    PhotosUnavailable { user_id: u64 },
}

/// Progress bar over the photo loop, advanced once per photo
pub fn upload_progress_bar(photo_count: u64) -> Result<ProgressBar> {
    let progress_bar = ProgressBar::new(photo_count);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );
    progress_bar.set_message("Uploading photos");
    Ok(progress_bar)
}

/// Runs the backup: resolve the user, list photos, upload each, write the manifest
pub struct Orchestrator<P, D, M> {
    config: Config,
    source: P,
    uploader: Uploader<D, M>,
}

impl Orchestrator<VkClient, YandexDiskClient, HttpMediaFetcher> {
    /// Build an orchestrator wired to the real VK and Yandex Disk APIs
    pub fn from_config(config: Config) -> Result<Self> {
        let source = VkClient::with_base_url(&config.vk_token, &config.vk_api_base)
            .context("Failed to initialize VK client")?;
        let disk = YandexDiskClient::with_base_url(&config.disk_token, &config.disk_api_base)
            .context("Failed to initialize Yandex Disk client")?;
        let fetcher = HttpMediaFetcher::new().context("Failed to initialize photo downloader")?;

        Ok(Self::new(config, source, Uploader::new(disk, fetcher)))
    }
}

impl<P: PhotoSource, D: DiskApi, M: MediaFetcher> Orchestrator<P, D, M> {
    pub fn new(config: Config, source: P, uploader: Uploader<D, M>) -> Self {
        Self {
            config,
            source,
            uploader,
        }
    }

    /// Back up the profile photos of the user named by `user_input`.
    ///
    /// Only a manifest write failure is returned as an error; lookup and
    /// listing failures end the run through [`RunOutcome`].
    pub async fn run(&self, user_input: &str) -> Result<RunOutcome> {
        let identifier = match parse_user_identifier(user_input) {
            Ok(identifier) => identifier,
            Err(e) => {
                warn!("{e:#}");
                return Ok(RunOutcome::UserNotFound {
                    identifier: user_input.trim().to_string(),
                });
            }
        };

        let user_id = match self.source.resolve_user_id(&identifier).await {
            Ok(user_id) => user_id,
            Err(e) => {
                warn!("{e}");
                return Ok(RunOutcome::UserNotFound { identifier });
            }
        };

        let photos = match self
            .source
            .fetch_profile_photos(user_id, self.config.photo_count)
            .await
        {
            Ok(photos) => photos,
            Err(e) => {
                warn!("{e}");
                return Ok(RunOutcome::PhotosUnavailable { user_id });
            }
        };

        if photos.is_empty() {
            info!("User {user_id} has no profile photos");
        }

        let progress_bar = upload_progress_bar(photos.len() as u64)?;
        let records = self.upload_photos(&photos, &progress_bar).await;

        persist_manifest(&records, &self.config.manifest_path)?;

        Ok(RunOutcome::Completed {
            manifest_path: self.config.manifest_path.clone(),
            records,
            photo_count: photos.len(),
        })
    }

    /// Upload each photo in order and return records for the ones that made it.
    ///
    /// A failed upload is logged and skipped. `progress_bar` advances for
    /// every photo, skipped ones included, and is finished afterwards.
    pub async fn upload_photos(
        &self,
        photos: &[Photo],
        progress_bar: &ProgressBar,
    ) -> Vec<UploadRecord> {
        let folder = &self.config.folder;
        if !self.uploader.ensure_folder(folder).await.is_ready() {
            progress_bar.suspend(|| warn!("Folder {folder} is not available, uploads may fail"));
        }

        let mut seen = SeenLikes::new();
        let mut records = Vec::new();

        for photo in photos {
            let Some(size) = photo.largest_size() else {
                progress_bar.suspend(|| {
                    warn!("Photo {id:?} has no size variants, skipping", id = photo.id)
                });
                progress_bar.inc(1);
                continue;
            };

            let likes = photo.like_count();
            let file_name = derive_file_name(likes, &mut seen, &now_local());
            progress_bar.suspend(|| {
                info!(
                    "Processing photo: {file_name}, URL: {url}, Likes: {likes}",
                    url = size.url
                )
            });

            let destination = destination_path(folder, &file_name);
            match self.uploader.upload_file(&size.url, &destination).await {
                UploadOutcome::Uploaded => {
                    records.push(build_manifest_entry(&file_name, &size.size_type));
                }
                UploadOutcome::Failed { reason } => {
                    progress_bar.suspend(|| warn!("Skipping {file_name}: {reason}"));
                }
            }
            progress_bar.inc(1);
        }

        let summary = format!(
            "Uploaded {uploaded} of {total} photos",
            uploaded = records.len(),
            total = photos.len()
        );
        progress_bar.finish_with_message(summary.clone());
        info!("{summary}");

        records
    }
}
