use super::{ImageInfo, ImageSource, ImageSourceKind};
use anyhow::Context;
use rand::Rng;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

const METADATA_URL: &str = "https://maps.googleapis.com/maps/api/streetview/metadata";
const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: usize = 20;
/// Metadata search radius, and the farthest a returned panorama may sit from
/// the requested point.
const SEARCH_RADIUS_M: f64 = 50_000.0;
const EARTH_RADIUS_M: f64 = 6_371_000.0;
/// Times Square, NYC.
const KNOWN_LOCATION: &str = "40.758896,-73.985130";

const WATER_WORDS: &[&str] = &[
    "ocean",
    "sea",
    "mediterranean",
    "atlantic",
    "pacific",
    "indian ocean",
];
const LAND_TYPES: &[&str] = &[
    "street_address",
    "route",
    "premise",
    "locality",
    "sublocality",
    "postal_code",
    "administrative_area",
    "political",
    "country",
];

#[derive(Debug, Deserialize)]
struct Metadata {
    status: String,
    #[serde(default)]
    location: Option<LatLng>,
    #[serde(default)]
    pano_id: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    formatted_address: String,
}

/// Great-circle distance in meters.
fn haversine_m(a: LatLng, b: LatLng) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Cheap rejection of points that are almost certainly open water.
#[allow(clippy::float_cmp)]
fn plausible_coordinates(p: LatLng) -> bool {
    if p.lat.abs() < 0.1 && p.lng.abs() < 0.1 {
        return false;
    }
    p.lat != 0.0 && p.lng != 0.0
}

/// Judge reverse-geocoding results. No results means a remote area, which is allowed.
fn geocode_says_land(resp: &GeocodeResponse) -> bool {
    if resp.status != "OK" || resp.results.is_empty() {
        return true;
    }
    for result in &resp.results {
        let address = result.formatted_address.to_lowercase();
        if WATER_WORDS.iter().any(|w| address.contains(w)) {
            return false;
        }
        if result
            .types
            .iter()
            .any(|t| LAND_TYPES.contains(&t.as_str()))
        {
            return true;
        }
    }
    true
}

fn panorama_url(at: LatLng, pano_id: Option<&str>, heading: u16) -> String {
    match pano_id.filter(|p| !p.is_empty()) {
        Some(pano) => format!(
            "https://www.google.com/maps/@?api=1&map_action=pano&pano={pano}&heading={heading}&pitch=0&fov=90"
        ),
        None => format!(
            "https://www.google.com/maps/@{},{},3a,75y,{heading}h,90t/data=!3m6!1e1",
            at.lat, at.lng
        ),
    }
}

fn image_from_metadata(at: LatLng, meta: Metadata, heading: u16) -> ImageInfo {
    let url = panorama_url(at, meta.pano_id.as_deref(), heading);
    ImageInfo {
        source_url: url.clone(),
        url,
        description: format!("Street View at coordinates {:.6}, {:.6}", at.lat, at.lng),
        location_url: Some(format!("https://www.google.com/maps?q={},{}", at.lat, at.lng)),
        capture_date: meta.date.filter(|d| !d.is_empty()),
    }
}

/// Random Street View panoramas found by sampling coordinates.
pub struct GoogleStreetViewSource {
    client: Client,
    api_key: String,
}

impl GoogleStreetViewSource {
    /// Create a source authenticating with `api_key`.
    ///
    /// # Errors
    /// Returns an error if the key is empty or the HTTP client cannot be built.
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        if api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("Google Maps API key is required"));
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, api_key })
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> reqwest::Result<T> {
        self.client
            .get(url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()?
            .error_for_status()?
            .json()
    }

    fn on_land(&self, p: LatLng) -> bool {
        if !plausible_coordinates(p) {
            return false;
        }
        let params = [("latlng", format!("{},{}", p.lat, p.lng))];
        match self.get_json::<GeocodeResponse>(GEOCODE_URL, &params) {
            Ok(resp) => geocode_says_land(&resp),
            // Lookup failures are not held against the location.
            Err(err) => {
                tracing::debug!(error = %err, "reverse geocoding failed");
                true
            }
        }
    }

    /// Metadata for a usable panorama near `requested`, if there is one.
    fn panorama_near(&self, requested: LatLng) -> Option<(LatLng, Metadata)> {
        let params = [
            ("location", format!("{},{}", requested.lat, requested.lng)),
            ("radius", format!("{SEARCH_RADIUS_M:.0}")),
        ];
        let meta = match self.get_json::<Metadata>(METADATA_URL, &params) {
            Ok(meta) => meta,
            Err(err) => {
                tracing::debug!(error = %err, "Street View metadata request failed");
                return None;
            }
        };
        if meta.status != "OK" {
            return None;
        }
        let actual = meta.location?;
        if !self.on_land(actual) {
            return None;
        }
        if haversine_m(requested, actual) > SEARCH_RADIUS_M {
            return None;
        }
        Some((actual, meta))
    }
}

impl ImageSource for GoogleStreetViewSource {
    fn kind(&self) -> ImageSourceKind {
        ImageSourceKind::GoogleStreetview
    }

    fn fetch_random_image(&self) -> anyhow::Result<ImageInfo> {
        let mut rng = rand::thread_rng();
        for attempt in 1..=MAX_ATTEMPTS {
            let requested = LatLng {
                lat: rng.gen_range(-85.0..=85.0),
                lng: rng.gen_range(-180.0..=180.0),
            };
            tracing::debug!(
                attempt,
                lat = requested.lat,
                lng = requested.lng,
                "probing for Street View"
            );
            if let Some((actual, meta)) = self.panorama_near(requested) {
                let heading: u16 = rng.gen_range(0..360);
                tracing::info!(
                    attempt,
                    lat = actual.lat,
                    lng = actual.lng,
                    "found Street View location"
                );
                return Ok(image_from_metadata(actual, meta, heading));
            }
        }
        Err(anyhow::anyhow!(
            "Failed to find a valid Street View location after {MAX_ATTEMPTS} attempts. \
             Try again or check your API key and quota."
        ))
    }

    fn test_connection(&self) -> bool {
        let params = [("location", KNOWN_LOCATION.to_string())];
        match self.get_json::<Metadata>(METADATA_URL, &params) {
            Ok(meta) => meta.status == "OK",
            Err(err) => {
                tracing::info!(error = %err, "Street View connectivity check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::ensure;

    #[test]
    fn haversine_matches_known_distances() -> anyhow::Result<()> {
        let paris = LatLng { lat: 48.8566, lng: 2.3522 };
        let london = LatLng { lat: 51.5074, lng: -0.1278 };
        let d = haversine_m(paris, london);
        ensure!((340_000.0..345_000.0).contains(&d), "got {d}");
        ensure!(haversine_m(paris, paris) < 1e-6);
        Ok(())
    }

    #[test]
    fn null_island_and_axes_are_implausible() -> anyhow::Result<()> {
        ensure!(!plausible_coordinates(LatLng { lat: 0.05, lng: -0.05 }));
        ensure!(!plausible_coordinates(LatLng { lat: 0.0, lng: 12.0 }));
        ensure!(!plausible_coordinates(LatLng { lat: 45.0, lng: 0.0 }));
        ensure!(plausible_coordinates(LatLng { lat: 45.0, lng: 7.5 }));
        Ok(())
    }

    #[test]
    fn geocode_rejects_water_and_accepts_places() -> anyhow::Result<()> {
        let water: GeocodeResponse = serde_json::from_str(
            r#"{"status":"OK","results":[{"types":["natural_feature"],"formatted_address":"North Pacific Ocean"}]}"#,
        )?;
        ensure!(!geocode_says_land(&water));

        let town: GeocodeResponse = serde_json::from_str(
            r#"{"status":"OK","results":[{"types":["locality","political"],"formatted_address":"Bergen, Norway"}]}"#,
        )?;
        ensure!(geocode_says_land(&town));

        let nothing: GeocodeResponse = serde_json::from_str(r#"{"status":"ZERO_RESULTS"}"#)?;
        ensure!(geocode_says_land(&nothing));
        Ok(())
    }

    #[test]
    fn metadata_becomes_panorama_image() -> anyhow::Result<()> {
        let meta: Metadata = serde_json::from_str(
            r#"{"status":"OK","location":{"lat":60.39299,"lng":5.32415},"pano_id":"abc123","date":"2019-06"}"#,
        )?;
        let at = meta.location.ok_or_else(|| anyhow::anyhow!("missing location"))?;
        let info = image_from_metadata(at, meta, 90);
        ensure!(info.url.contains("pano=abc123"));
        ensure!(info.url.contains("heading=90"));
        ensure!(info.description == "Street View at coordinates 60.392990, 5.324150");
        ensure!(
            info.location_url.as_deref() == Some("https://www.google.com/maps?q=60.39299,5.32415")
        );
        ensure!(info.capture_date.as_deref() == Some("2019-06"));

        let fallback = panorama_url(at, None, 45);
        ensure!(fallback.starts_with("https://www.google.com/maps/@60.39299,5.32415,3a,75y,45h"));
        Ok(())
    }
}
