//! Location resolver
//!
//! Turns a device position into a region name through reverse geocoding.
//! The last region resolved this way is remembered so that asking again
//! while that region is still selected costs neither a position prompt nor a
//! network call.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::config::ClientConfig;
use crate::core::error::{MawaqitError, Result};
use crate::core::models::{GeoPosition, Region};
use crate::core::transport::Transport;

#[cfg(test)]
use mockall::automock;

/// Source of the device position
///
/// Denial, lack of support and timeouts are all reported as
/// `MawaqitError::NotAvailable`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PositionProvider: Send + Sync {
    async fn current_position(&self) -> Result<GeoPosition>;
}

/// A position known up front, e.g. given on the command line
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub GeoPosition);

#[async_trait]
impl PositionProvider for FixedPosition {
    async fn current_position(&self) -> Result<GeoPosition> {
        Ok(self.0)
    }
}

/// No position source at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPosition;

#[async_trait]
impl PositionProvider for NoPosition {
    async fn current_position(&self) -> Result<GeoPosition> {
        Err(MawaqitError::not_available("no position source configured"))
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    #[serde(default)]
    state: Option<String>,
}

/// Nominatim-style reverse geocoder
pub struct ReverseGeocoder {
    transport: Arc<dyn Transport>,
    url: String,
    language: String,
}

impl ReverseGeocoder {
    pub fn new(transport: Arc<dyn Transport>, url: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            language: language.into(),
        }
    }

    pub fn from_config(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        Self::new(transport, config.geocode_url.clone(), config.geocode_language.clone())
    }

    /// Administrative region containing a position, verbatim
    pub async fn region_at(&self, position: GeoPosition) -> Result<Region> {
        let query = vec![
            ("lat".to_string(), position.latitude.to_string()),
            ("lon".to_string(), position.longitude.to_string()),
            ("format".to_string(), "json".to_string()),
            ("accept-language".to_string(), self.language.clone()),
        ];

        let response = self
            .transport
            .get(&self.url, &query)
            .await
            .map_err(|e| MawaqitError::geocode(e.to_string()))?;

        if !response.is_success() {
            return Err(MawaqitError::geocode(format!(
                "geocoder answered with status {}",
                response.status
            )));
        }

        parse_region(&response.body)
    }
}

/// Extract `address.state` from a reverse geocoding body
pub fn parse_region(body: &str) -> Result<Region> {
    let parsed: ReverseResponse = serde_json::from_str(body)
        .map_err(|e| MawaqitError::geocode(format!("unreadable geocoder answer: {}", e)))?;

    parsed
        .address
        .and_then(|a| a.state)
        .filter(|s| !s.trim().is_empty())
        .map(Region::new)
        .ok_or_else(|| MawaqitError::geocode("geocoder answer has no address.state"))
}

/// Outcome of a resolution request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The selected region already came from the device; nothing was asked
    Skipped,
    /// A region was resolved from the device position
    Resolved(Region),
}

/// Device position to region, with change suppression
pub struct LocationResolver {
    positions: Arc<dyn PositionProvider>,
    geocoder: ReverseGeocoder,
    position_timeout: Option<Duration>,
    last_resolved: Mutex<Option<Region>>,
}

impl LocationResolver {
    pub fn new(positions: Arc<dyn PositionProvider>, geocoder: ReverseGeocoder) -> Self {
        Self {
            positions,
            geocoder,
            position_timeout: None,
            last_resolved: Mutex::new(None),
        }
    }

    /// Give up on the position provider after `timeout`
    pub fn with_position_timeout(mut self, timeout: Duration) -> Self {
        self.position_timeout = Some(timeout);
        self
    }

    /// Region last resolved from the device, if any
    pub fn last_resolved(&self) -> Option<Region> {
        self.last_resolved.lock().ok().and_then(|guard| guard.clone())
    }

    /// Resolve the device region unless `current` already is that region
    pub async fn resolve(&self, current: &Region) -> Result<Resolution> {
        if self.last_resolved().as_ref() == Some(current) {
            tracing::debug!(region = %current, "region already resolved from device");
            return Ok(Resolution::Skipped);
        }

        let position = self.position().await?;
        let region = self.geocoder.region_at(position).await?;

        if let Ok(mut guard) = self.last_resolved.lock() {
            *guard = Some(region.clone());
        }
        tracing::info!(%region, "resolved region from device position");
        Ok(Resolution::Resolved(region))
    }

    async fn position(&self) -> Result<GeoPosition> {
        let request = self.positions.current_position();
        let outcome = match self.position_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| MawaqitError::not_available("position request timed out"))?,
            None => request.await,
        };

        outcome.map_err(|e| match e.root() {
            MawaqitError::NotAvailable { .. } => e,
            _ => MawaqitError::not_available(e.to_string()),
        })
    }
}
