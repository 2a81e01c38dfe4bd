use crate::error_utils::get_optional_env_var;
use crate::manifest::DEFAULT_MANIFEST_FILE;
use crate::vk::VK_API_BASE;
use crate::yadisk::YANDEX_DISK_API_BASE;
use std::fmt;
use std::path::PathBuf;

/// Number of profile photos requested per run
pub const DEFAULT_PHOTO_COUNT: u32 = 5;

/// Disk folder photos are uploaded into
pub const DEFAULT_FOLDER: &str = "VK_photos";

/// Overrides for the API endpoints, mostly useful against mock servers
pub const VK_API_BASE_ENV: &str = "VK_API_BASE";
pub const YANDEX_DISK_API_BASE_ENV: &str = "YANDEX_DISK_API_BASE";

/// Everything a run needs, read once at startup
#[derive(Clone)]
pub struct Config {
    pub vk_token: String,
    pub disk_token: String,
    pub photo_count: u32,
    pub folder: String,
    pub manifest_path: PathBuf,
    pub vk_api_base: String,
    pub disk_api_base: String,
}

impl Config {
    /// Configuration with default settings and the public API endpoints
    pub fn new(vk_token: &str, disk_token: &str) -> Self {
        Self {
            vk_token: vk_token.to_string(),
            disk_token: disk_token.to_string(),
            photo_count: DEFAULT_PHOTO_COUNT,
            folder: DEFAULT_FOLDER.to_string(),
            manifest_path: PathBuf::from(DEFAULT_MANIFEST_FILE),
            vk_api_base: VK_API_BASE.to_string(),
            disk_api_base: YANDEX_DISK_API_BASE.to_string(),
        }
    }

    /// Apply `VK_API_BASE` / `YANDEX_DISK_API_BASE` when they are set
    pub fn with_api_overrides_from_env(mut self) -> Self {
        if let Some(base) = get_optional_env_var(VK_API_BASE_ENV) {
            self.vk_api_base = base;
        }
        if let Some(base) = get_optional_env_var(YANDEX_DISK_API_BASE_ENV) {
            self.disk_api_base = base;
        }
        self
    }
}

// Tokens stay out of debug output
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("vk_token", &"<redacted>")
            .field("disk_token", &"<redacted>")
            .field("photo_count", &self.photo_count)
            .field("folder", &self.folder)
            .field("manifest_path", &self.manifest_path)
            .field("vk_api_base", &self.vk_api_base)
            .field("disk_api_base", &self.disk_api_base)
            .finish()
    }
}
