//! Remote image providers.
//!
//! Each provider implements [`ImageSource`]. [`from_config`] picks one and hands
//! it its credential from [`Config`]; nothing here reads the environment.

mod streetview;
mod unsplash;

pub use streetview::GoogleStreetViewSource;
pub use unsplash::UnsplashSource;

use crate::config::{Config, GOOGLE_MAPS_API_KEY_ENV, UNSPLASH_ACCESS_KEY_ENV};
use clap::builder::PossibleValue;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One randomly selected image.
pub struct ImageInfo {
    /// Direct image URL (or interactive panorama URL for Street View).
    pub url: String,
    /// Human-readable description.
    pub description: String,
    /// Provider page for the image.
    pub source_url: String,
    /// Map pin for the image location.
    pub location_url: Option<String>,
    /// Capture date in `YYYY-MM` form.
    pub capture_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Supported image providers.
pub enum ImageSourceKind {
    /// Random photos from Unsplash.
    Unsplash,
    /// Random Street View panoramas from Google Maps.
    GoogleStreetview,
}

impl ImageSourceKind {
    /// Tag written to a target's `targetSource`.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Unsplash => "unsplash",
            Self::GoogleStreetview => "google_streetview",
        }
    }

    /// Parse a stored `targetSource` tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        tag.parse().ok()
    }

    /// Name of the environment variable holding this provider's credential.
    #[must_use]
    pub const fn credential_env(self) -> &'static str {
        match self {
            Self::Unsplash => UNSPLASH_ACCESS_KEY_ENV,
            Self::GoogleStreetview => GOOGLE_MAPS_API_KEY_ENV,
        }
    }
}

impl std::fmt::Display for ImageSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl ValueEnum for ImageSourceKind {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Unsplash, Self::GoogleStreetview]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        let pv = match self {
            Self::Unsplash => PossibleValue::new("unsplash").help("Random Unsplash photo"),
            Self::GoogleStreetview => {
                PossibleValue::new("google_streetview").help("Random Street View panorama")
            }
        };
        Some(pv)
    }
}

impl std::str::FromStr for ImageSourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s.eq_ignore_ascii_case("unsplash") => Ok(Self::Unsplash),
            s if s.eq_ignore_ascii_case("google_streetview") => Ok(Self::GoogleStreetview),
            _ => Err(anyhow::anyhow!("Unknown image source: {s}")),
        }
    }
}

/// A provider of random images.
pub trait ImageSource {
    /// Which provider this is.
    fn kind(&self) -> ImageSourceKind;

    /// Fetch one random image.
    ///
    /// # Errors
    /// Returns an error when the provider cannot be reached or rejects the request.
    fn fetch_random_image(&self) -> anyhow::Result<ImageInfo>;

    /// Whether the provider answers with the configured credential.
    fn test_connection(&self) -> bool;
}

/// Build the provider for `kind` from the credentials in `cfg`.
///
/// # Errors
/// Returns an error naming the missing environment variable when the
/// credential is absent, or if the HTTP client cannot be built.
pub fn from_config(kind: ImageSourceKind, cfg: &Config) -> anyhow::Result<Box<dyn ImageSource>> {
    match kind {
        ImageSourceKind::Unsplash => {
            let key = cfg.unsplash_access_key.clone().ok_or_else(|| {
                anyhow::anyhow!(
                    "{} not found in environment.\n\
                     Please set it in your environment or shell profile.\n\
                     Get your key at: https://unsplash.com/developers",
                    kind.credential_env()
                )
            })?;
            Ok(Box::new(UnsplashSource::new(key)?))
        }
        ImageSourceKind::GoogleStreetview => {
            let key = cfg.google_maps_api_key.clone().ok_or_else(|| {
                anyhow::anyhow!(
                    "{} not found in environment.\n\
                     Please set it in your environment or shell profile.\n\
                     Get your key at: https://console.cloud.google.com/\n\
                     Enable \"Street View Static API\" for your project.",
                    kind.credential_env()
                )
            })?;
            Ok(Box::new(GoogleStreetViewSource::new(key)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::ensure;

    #[test]
    fn tags_round_trip_through_from_str() -> anyhow::Result<()> {
        for kind in ImageSourceKind::value_variants() {
            ensure!(ImageSourceKind::from_tag(kind.tag()) == Some(*kind));
        }
        ensure!(
            ImageSourceKind::from_tag("GOOGLE_STREETVIEW")
                == Some(ImageSourceKind::GoogleStreetview)
        );
        ensure!(ImageSourceKind::from_tag("flickr").is_none());
        Ok(())
    }

    #[test]
    fn missing_credential_names_the_variable() -> anyhow::Result<()> {
        let cfg = Config::new("data");
        let Err(err) = from_config(ImageSourceKind::Unsplash, &cfg) else {
            anyhow::bail!("expected missing credential error");
        };
        ensure!(err.to_string().contains(UNSPLASH_ACCESS_KEY_ENV));

        let Err(err) = from_config(ImageSourceKind::GoogleStreetview, &cfg) else {
            anyhow::bail!("expected missing credential error");
        };
        ensure!(err.to_string().contains(GOOGLE_MAPS_API_KEY_ENV));
        Ok(())
    }

    #[test]
    fn configured_credential_builds_the_provider() -> anyhow::Result<()> {
        let cfg = Config::new("data").with_credentials(Some("key".to_string()), None);
        let source = from_config(ImageSourceKind::Unsplash, &cfg)?;
        ensure!(source.kind() == ImageSourceKind::Unsplash);
        Ok(())
    }
}
