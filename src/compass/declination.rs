//! Magnetic declination sources
//!
//! The compass asks the active [`DeclinationProvider`] synchronously and never
//! waits on the network. The remote variant is refreshed by the host on its own
//! schedule (`RemoteDeclination::refresh`) and answers from its cache; whenever
//! the cache is empty or too far from the query point it answers with the
//! offline approximation instead.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;

use crate::geodesy;
use crate::types::GeoPoint;

const NOAA_DECLINATION_URL: &str = "https://www.ngdc.noaa.gov/geomag-web/calculators/calculateDeclination";

/// Remote lookup failures; callers fall back to the offline approximation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeclinationError {
    #[error("Network timeout")]
    NetworkTimeout,

    #[error("HTTP error: {0}")]
    HttpError(u16),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("No declination in response")]
    NoData,

    #[error("Unknown error: {0}")]
    UnknownError(String),
}

/// Deterministic offline approximation (degrees, east positive)
pub fn offline_declination(latitude: f64, longitude: f64) -> f64 {
    0.2 * (longitude - 100.0) - 0.02 * latitude
}

#[derive(Deserialize)]
struct GeomagResponse {
    result: Vec<GeomagResult>,
}

#[derive(Deserialize)]
struct GeomagResult {
    declination: Option<f64>,
}

/// Extract the declination from a geomag calculator JSON body
pub fn parse_response(body: &str) -> Result<f64, DeclinationError> {
    let response: GeomagResponse =
        serde_json::from_str(body).map_err(|e| DeclinationError::ParseError(e.to_string()))?;
    response
        .result
        .first()
        .and_then(|r| r.declination)
        .filter(|d| d.is_finite())
        .ok_or(DeclinationError::NoData)
}

#[derive(Clone, Debug)]
struct CachedDeclination {
    position: GeoPoint,
    declination_deg: f64,
    fetched_at: String,
}

/// World Magnetic Model lookup over HTTP with a location-keyed cache
#[derive(Clone)]
pub struct RemoteDeclination {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    cache_radius_m: f64,
    cached: Option<CachedDeclination>,
}

impl RemoteDeclination {
    pub fn new(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("plume-tracker/0.1.0")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        RemoteDeclination {
            client,
            base_url: NOAA_DECLINATION_URL.to_string(),
            api_key,
            cache_radius_m: 50_000.0,
            cached: None,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_cache_radius(mut self, radius_m: f64) -> Self {
        self.cache_radius_m = radius_m;
        self
    }

    /// Fetch the declination for a location and cache it
    pub async fn refresh(&mut self, latitude: f64, longitude: f64) -> Result<f64, DeclinationError> {
        let mut query = vec![
            ("lat1", latitude.to_string()),
            ("lon1", longitude.to_string()),
            ("resultFormat", "json".to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("key", key.clone()));
        }

        let response = match self.client.get(&self.base_url).query(&query).send().await {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_timeout() {
                    return Err(DeclinationError::NetworkTimeout);
                }
                return Err(DeclinationError::UnknownError(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(DeclinationError::HttpError(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DeclinationError::UnknownError(format!("Failed to read response: {}", e)))?;
        let declination = parse_response(&body)?;

        log::info!(
            "Declination at ({:.4}, {:.4}) is {:.2} deg (remote)",
            latitude,
            longitude,
            declination
        );
        self.remember(latitude, longitude, declination);
        Ok(declination)
    }

    /// Store a declination obtained for a location
    pub fn remember(&mut self, latitude: f64, longitude: f64, declination_deg: f64) {
        self.cached = Some(CachedDeclination {
            position: GeoPoint::new_unchecked(latitude, longitude),
            declination_deg,
            fetched_at: Utc::now().to_rfc3339(),
        });
    }

    /// Cached value if it was fetched close enough to this location
    pub fn cached_for(&self, latitude: f64, longitude: f64) -> Option<f64> {
        let cached = self.cached.as_ref()?;
        let here = GeoPoint::new_unchecked(latitude, longitude);
        if geodesy::distance(&cached.position, &here) <= self.cache_radius_m {
            Some(cached.declination_deg)
        } else {
            None
        }
    }

    /// RFC 3339 time of the cached lookup
    pub fn fetched_at(&self) -> Option<&str> {
        self.cached.as_ref().map(|c| c.fetched_at.as_str())
    }
}

/// Declination capability selected by the host
#[derive(Clone)]
pub enum DeclinationProvider {
    Remote(RemoteDeclination),
    OfflineApproximation,
}

impl DeclinationProvider {
    /// Declination in degrees; never blocks
    pub fn declination_deg(&self, latitude: f64, longitude: f64) -> f64 {
        match self {
            DeclinationProvider::Remote(remote) => match remote.cached_for(latitude, longitude) {
                Some(deg) => deg,
                None => {
                    log::warn!(
                        "No remote declination near ({:.4}, {:.4}), using offline approximation",
                        latitude,
                        longitude
                    );
                    offline_declination(latitude, longitude)
                }
            },
            DeclinationProvider::OfflineApproximation => offline_declination(latitude, longitude),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeclinationProvider::Remote(_) => "remote",
            DeclinationProvider::OfflineApproximation => "offline",
        }
    }
}
