use crate::datetime_utils::format_for_filename;
use chrono::{DateTime, TimeZone};
use std::collections::HashSet;
use std::fmt::Display;

/// Extension used for every uploaded photo
pub const PHOTO_EXTENSION: &str = "jpg";

/// Like counts and file names already handed out during one run.
///
/// Owned by the orchestrator and updated for every processed photo,
/// whether or not its upload later succeeds.
#[derive(Debug, Default)]
pub struct SeenLikes {
    likes: HashSet<u64>,
    assigned: HashSet<String>,
}

impl SeenLikes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a photo with this like count was already named in this run
    pub fn contains(&self, likes: u64) -> bool {
        self.likes.contains(&likes)
    }

    fn is_assigned(&self, file_name: &str) -> bool {
        self.assigned.contains(file_name)
    }

    fn record(&mut self, likes: u64, file_name: &str) {
        self.assigned.insert(file_name.to_string());
        self.likes.insert(likes);
    }
}

/// Generate the plain filename for a like count
/// Format: likes.jpg
pub fn base_file_name(likes: u64) -> String {
    format!("{likes}.{PHOTO_EXTENSION}")
}

/// Generate a filename for a photo and remember it in `seen`.
///
/// Format: `likes.jpg` the first time a like count appears, then
/// `likes_YYYYMMDD_HHMMSS.jpg` with the wall-clock time of `now`. Two
/// repeats within the same second get an extra `_N` counter so names never
/// repeat within a run.
pub fn derive_file_name<Tz: TimeZone>(
    likes: u64,
    seen: &mut SeenLikes,
    now: &DateTime<Tz>,
) -> String
where
    Tz::Offset: Display,
{
    let stem = if seen.contains(likes) {
        format!("{likes}_{stamp}", stamp = format_for_filename(now))
    } else {
        likes.to_string()
    };

    let mut file_name = format!("{stem}.{PHOTO_EXTENSION}");
    let mut counter = 2u32;
    while seen.is_assigned(&file_name) {
        file_name = format!("{stem}_{counter}.{PHOTO_EXTENSION}");
        counter += 1;
    }

    seen.record(likes, &file_name);
    file_name
}
