use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use common::GeocodingConfig;

/// A user location: coordinates plus whatever reverse geocoding could resolve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationData {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
}

impl LocationData {
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Default::default()
        }
    }

    pub fn from_city(city: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
            ..Default::default()
        }
    }

    /// Parse the stored preference string: "lat,lng" gives coordinates, anything else is
    /// read as "City[, Region[, Country]]".
    pub fn parse(value: &str) -> Option<LocationData> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Some((lat, lng)) = value.split_once(',') {
            if let (Ok(lat), Ok(lng)) = (lat.trim().parse::<f64>(), lng.trim().parse::<f64>()) {
                if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) {
                    return Some(LocationData::from_coordinates(lat, lng));
                }
                return None;
            }
        }

        let mut parts = value.split(',').map(str::trim).filter(|p| !p.is_empty());
        let city = parts.next()?.to_string();
        Some(LocationData {
            city: Some(city),
            region: parts.next().map(str::to_string),
            country: parts.next().map(str::to_string),
            formatted_address: Some(value.to_string()),
            ..Default::default()
        })
    }

    /// True when only coordinates are known.
    pub fn needs_lookup(&self) -> bool {
        self.city.is_none() && self.region.is_none()
    }

    /// Best human-readable place name for queries and relevance text.
    pub fn place_name(&self) -> Option<&str> {
        self.city
            .as_deref()
            .or(self.region.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    /// "City, Region, Country" when names are known, "lat,lng" otherwise.
    pub fn formatted(&self) -> String {
        let names: Vec<&str> = [&self.city, &self.region, &self.country]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.trim().is_empty())
            .collect();
        if names.is_empty() {
            format!("{:.4},{:.4}", self.latitude, self.longitude)
        } else {
            names.join(", ")
        }
    }
}

/// Reverse geocoding client for Nominatim-compatible APIs
pub struct ReverseGeocoder {
    base_url: String,
    client: Client,
}

impl ReverseGeocoder {
    pub fn new(base_url: impl Into<String>, user_agent: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &GeocodingConfig) -> Result<Self> {
        Self::new(
            config.api_url(),
            config.user_agent(),
            config.timeout_seconds(),
        )
    }

    /// Translate coordinates into city/region/country.
    pub async fn reverse(&self, latitude: f64, longitude: f64) -> Result<LocationData> {
        let url = format!("{}/reverse", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("zoom", "10".to_string()),
            ])
            .send()
            .await
            .context("reverse geocoding request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("reverse geocoding error {}: {}", status, body);
        }

        let body: NominatimResponse = response
            .json()
            .await
            .context("failed to parse reverse geocoding response")?;

        if let Some(error) = body.error {
            anyhow::bail!("reverse geocoding error: {}", error);
        }

        let address = body.address.unwrap_or_default();
        let city = address.city.or(address.town).or(address.village).or(address.county);
        debug!(latitude, longitude, city = ?city, "reverse geocoded location");

        Ok(LocationData {
            latitude,
            longitude,
            city,
            region: address.state,
            country: address.country,
            formatted_address: body.display_name,
        })
    }

    /// Fill in names for a coordinates-only location. Keeps the bare coordinates on failure.
    pub async fn resolve(&self, location: LocationData) -> LocationData {
        if !location.needs_lookup() {
            return location;
        }
        match self.reverse(location.latitude, location.longitude).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!("reverse geocoding failed, keeping coordinates: {}", e);
                location
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    display_name: Option<String>,
    address: Option<NominatimAddress>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    county: Option<String>,
    state: Option<String>,
    country: Option<String>,
}
