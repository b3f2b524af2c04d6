//! Process configuration, resolved once at startup and passed down explicitly.

use std::path::{Path, PathBuf};
use time::UtcOffset;

/// Environment variable holding the Unsplash access key.
pub const UNSPLASH_ACCESS_KEY_ENV: &str = "UNSPLASH_ACCESS_KEY";
/// Environment variable holding the Google Maps API key.
pub const GOOGLE_MAPS_API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";
/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "GLIMPSE_DATA_DIR";
/// Data directory used when none is configured, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone)]
/// Everything a command needs from the environment.
pub struct Config {
    /// Root of the on-disk data; sessions live in `<data_dir>/sessions`.
    pub data_dir: PathBuf,
    /// Unsplash access key, if provided.
    pub unsplash_access_key: Option<String>,
    /// Google Maps API key, if provided.
    pub google_maps_api_key: Option<String>,
    /// Offset used when displaying timestamps.
    pub display_offset: UtcOffset,
}

impl Config {
    /// Configuration with no credentials, displaying times in UTC.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            unsplash_access_key: None,
            google_maps_api_key: None,
            display_offset: UtcOffset::UTC,
        }
    }

    /// Attach provider credentials. Empty strings count as missing.
    #[must_use]
    pub fn with_credentials(
        mut self,
        unsplash_access_key: Option<String>,
        google_maps_api_key: Option<String>,
    ) -> Self {
        self.unsplash_access_key = unsplash_access_key.filter(|k| !k.trim().is_empty());
        self.google_maps_api_key = google_maps_api_key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Use the machine's local offset for display, falling back to UTC.
    ///
    /// Must be called before any other thread is spawned.
    #[must_use]
    pub fn with_local_offset(mut self) -> Self {
        self.display_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
        self
    }

    /// Borrow the data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
