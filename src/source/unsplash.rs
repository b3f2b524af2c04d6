use super::{ImageInfo, ImageSource, ImageSourceKind};
use anyhow::Context;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::time::Duration;

const BASE_URL: &str = "https://api.unsplash.com";
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const NO_DESCRIPTION: &str = "No description available";

#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
    links: PhotoLinks,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    alt_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

#[derive(Debug, Deserialize)]
struct PhotoLinks {
    html: String,
}

impl From<Photo> for ImageInfo {
    fn from(photo: Photo) -> Self {
        let description = photo
            .description
            .filter(|d| !d.trim().is_empty())
            .or_else(|| photo.alt_description.filter(|d| !d.trim().is_empty()))
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());
        Self {
            url: photo.urls.regular,
            description,
            source_url: photo.links.html,
            location_url: None,
            capture_date: None,
        }
    }
}

/// Random landscape photos from the Unsplash API.
pub struct UnsplashSource {
    client: Client,
    access_key: String,
}

impl UnsplashSource {
    /// Create a source authenticating with `access_key`.
    ///
    /// # Errors
    /// Returns an error if the key is empty or the HTTP client cannot be built.
    pub fn new(access_key: String) -> anyhow::Result<Self> {
        if access_key.trim().is_empty() {
            return Err(anyhow::anyhow!("Unsplash access key is required"));
        }
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, access_key })
    }

    fn random_photo_request(&self) -> reqwest::blocking::RequestBuilder {
        self.client
            .get(format!("{BASE_URL}/photos/random"))
            .header(AUTHORIZATION, format!("Client-ID {}", self.access_key))
    }
}

impl ImageSource for UnsplashSource {
    fn kind(&self) -> ImageSourceKind {
        ImageSourceKind::Unsplash
    }

    fn fetch_random_image(&self) -> anyhow::Result<ImageInfo> {
        tracing::debug!("requesting random photo from Unsplash");
        let photo: Photo = self
            .random_photo_request()
            .query(&[("orientation", "landscape")])
            .timeout(FETCH_TIMEOUT)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::json)
            .map_err(|err| anyhow::anyhow!("Failed to fetch image from Unsplash: {err}"))?;
        Ok(photo.into())
    }

    fn test_connection(&self) -> bool {
        match self
            .random_photo_request()
            .timeout(CHECK_TIMEOUT)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
        {
            Ok(_) => true,
            Err(err) => {
                tracing::info!(error = %err, "Unsplash connectivity check failed");
                false
            }
        }
    }
}
