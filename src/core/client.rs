//! Prayer data client
//!
//! Two queries against the schedule listing: the full row for a region and
//! date, and the "next" selector naming the upcoming prayer. Responses are
//! validated here, at the boundary, into [`PrayerRow`] and
//! [`NextPrayerMarker`].

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::core::config::ClientConfig;
use crate::core::error::{MawaqitError, Result};
use crate::core::models::{NextPrayerMarker, PrayerLabels, PrayerRow, Region, ScheduleDate};
use crate::core::time::parse_time_of_day;
use crate::core::transport::Transport;

/// Query parameter carrying the region
pub const PARAM_REGION: &str = "wilayas";

/// Query parameter carrying the date
pub const PARAM_DATE: &str = "days";

/// Query parameter carrying the prayer selector
pub const PARAM_SELECTOR: &str = "salawat";

/// Selector value asking for the upcoming prayer only
pub const NEXT_SELECTOR: &str = "next";

type RawRow = Map<String, Value>;

/// Client for the schedule endpoint
pub struct PrayerClient {
    transport: Arc<dyn Transport>,
    endpoint: String,
    labels: PrayerLabels,
}

impl PrayerClient {
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>, labels: PrayerLabels) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            labels,
        }
    }

    pub fn from_config(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        Self::new(transport, config.schedule_url(), config.labels.clone())
    }

    /// Schedule row for a region and date
    pub async fn fetch_schedule(&self, region: &Region, date: &ScheduleDate) -> Result<PrayerRow> {
        let query = vec![
            (PARAM_REGION.to_string(), region.to_string()),
            (PARAM_DATE.to_string(), date.to_string()),
        ];
        let rows = self.query(&query).await?;
        let first = rows.first().ok_or_else(|| MawaqitError::EmptyResult {
            region: region.to_string(),
            date: date.to_string(),
        })?;
        decode_schedule_row(first, &self.labels)
    }

    /// Upcoming prayer for a region, `None` when the server's answer is ambiguous
    pub async fn fetch_next_prayer(&self, region: &Region) -> Result<NextPrayerMarker> {
        let query = vec![
            (PARAM_REGION.to_string(), region.to_string()),
            (PARAM_SELECTOR.to_string(), NEXT_SELECTOR.to_string()),
        ];
        let rows = self.query(&query).await?;
        match rows.first() {
            Some(row) => Ok(next_prayer_marker(row, &self.labels)),
            None => {
                tracing::debug!(%region, "no next prayer row");
                Ok(None)
            }
        }
    }

    async fn query(&self, query: &[(String, String)]) -> Result<Vec<RawRow>> {
        let response = self.transport.get(&self.endpoint, query).await?;
        if !response.is_success() {
            return Err(MawaqitError::network(format!(
                "{} answered with status {}",
                self.endpoint, response.status
            )));
        }
        decode_rows(&response.body)
    }
}

/// Parse a body into a sequence of row objects
pub fn decode_rows(body: &str) -> Result<Vec<RawRow>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| MawaqitError::decode(format!("schedule body is not JSON: {}", e)))?;

    let Value::Array(items) = value else {
        return Err(MawaqitError::decode("schedule body is not an array"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(row) => Ok(row),
            other => Err(MawaqitError::decode(format!(
                "row {} is not an object: {}",
                i, other
            ))),
        })
        .collect()
}

/// Validate a raw row into a [`PrayerRow`]
///
/// All six prayer labels must carry `HH:MM` strings. The date and region
/// labels are optional; a present date must be canonical.
pub fn decode_schedule_row(row: &RawRow, labels: &PrayerLabels) -> Result<PrayerRow> {
    let mut times: [String; 6] = Default::default();
    for (slot, prayer) in times.iter_mut().zip(crate::core::models::Prayer::ALL) {
        let label = labels.label(prayer);
        let value = row
            .get(label)
            .and_then(Value::as_str)
            .ok_or_else(|| MawaqitError::decode(format!("missing time for {} ({})", prayer, label)))?;
        parse_time_of_day(value)?;
        *slot = value.to_string();
    }

    let mut parsed = PrayerRow::new(times);

    match row.get(&labels.date) {
        None | Some(Value::Null) => {}
        Some(Value::String(raw)) => {
            let date = ScheduleDate::parse(raw)
                .map_err(|_| MawaqitError::decode(format!("bad row date {:?}", raw)))?;
            parsed = parsed.with_date(date);
        }
        Some(other) => return Err(MawaqitError::decode(format!("bad row date {}", other))),
    }

    if let Some(region) = row.get(&labels.region).and_then(Value::as_str) {
        parsed = parsed.with_region(Region::new(region));
    }

    Ok(parsed)
}

/// The single prayer left once the auxiliary labels are stripped
pub fn next_prayer_marker(row: &RawRow, labels: &PrayerLabels) -> NextPrayerMarker {
    let candidates: Vec<&String> = row.keys().filter(|k| !labels.is_auxiliary(k)).collect();

    match candidates.as_slice() {
        [only] => {
            let marker = labels.prayer_for(only);
            if marker.is_none() {
                tracing::warn!(label = %only, "next prayer label is not a known prayer");
            }
            marker
        }
        _ => {
            tracing::debug!(count = candidates.len(), "ambiguous next prayer answer");
            None
        }
    }
}
