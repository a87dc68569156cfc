//! Core data models for the mawaqit client
//!
//! This module contains the value types shared by every component:
//! regions, canonical dates, query parameters and prayer rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::{MawaqitError, Result};

/// Canonical textual form of a schedule date
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// An administrative region (wilaya), used verbatim as a query key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    /// Create a region from its display name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The region name as sent on the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Region {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Region {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A calendar date, always rendered as `YYYY-MM-DD`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScheduleDate(NaiveDate);

impl ScheduleDate {
    /// Wrap a calendar date
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse the canonical `YYYY-MM-DD` form
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        // chrono accepts unpadded fields; the wire form is fixed width
        if trimmed.len() != 10 {
            return Err(MawaqitError::InvalidDate {
                value: value.to_string(),
            });
        }
        NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .map(Self)
            .map_err(|_| MawaqitError::InvalidDate {
                value: value.to_string(),
            })
    }

    /// The underlying calendar date
    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for ScheduleDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl Serialize for ScheduleDate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScheduleDate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ScheduleDate::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// The tuple that fully determines a schedule request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryParams {
    pub region: Region,
    pub date: ScheduleDate,
}

impl QueryParams {
    pub fn new(region: Region, date: ScheduleDate) -> Self {
        Self { region, date }
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.region, self.date)
    }
}

/// The six daily prayers, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prayer {
    Fajr,
    Chorok,
    Dhohr,
    Asr,
    Maghrib,
    Icha,
}

impl Prayer {
    /// All prayers in fixed daily order
    pub const ALL: [Prayer; 6] = [
        Prayer::Fajr,
        Prayer::Chorok,
        Prayer::Dhohr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Icha,
    ];

    /// Canonical identifier, also the name of the prayer's UI slot
    pub fn id(&self) -> &'static str {
        match self {
            Prayer::Fajr => "fajr",
            Prayer::Chorok => "chorok",
            Prayer::Dhohr => "dhohr",
            Prayer::Asr => "asr",
            Prayer::Maghrib => "maghrib",
            Prayer::Icha => "icha",
        }
    }

    /// Arabic display name
    pub fn arabic_name(&self) -> &'static str {
        match self {
            Prayer::Fajr => "الفجر",
            Prayer::Chorok => "الشروق",
            Prayer::Dhohr => "الظهر",
            Prayer::Asr => "العصر",
            Prayer::Maghrib => "المغرب",
            Prayer::Icha => "العشاء",
        }
    }

    /// Parse a canonical identifier
    pub fn parse(id: &str) -> Option<Self> {
        Prayer::ALL.into_iter().find(|p| p.id() == id)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// The upcoming prayer as decided by the server, if unambiguous
pub type NextPrayerMarker = Option<Prayer>;

/// Wire labels used by the schedule endpoint
///
/// The server keys its rows by Arabic labels; the English variant is served
/// under `/en` and can be configured instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrayerLabels {
    pub fajr: String,
    pub chorok: String,
    pub dhohr: String,
    pub asr: String,
    pub maghrib: String,
    pub icha: String,
    /// Auxiliary label carrying the observed date
    pub date: String,
    /// Auxiliary label carrying the region name
    pub region: String,
}

impl Default for PrayerLabels {
    fn default() -> Self {
        Self {
            fajr: Prayer::Fajr.arabic_name().to_string(),
            chorok: Prayer::Chorok.arabic_name().to_string(),
            dhohr: Prayer::Dhohr.arabic_name().to_string(),
            asr: Prayer::Asr.arabic_name().to_string(),
            maghrib: Prayer::Maghrib.arabic_name().to_string(),
            icha: Prayer::Icha.arabic_name().to_string(),
            date: "التاريخ".to_string(),
            region: "الولاية".to_string(),
        }
    }
}

impl PrayerLabels {
    /// English labels, as served by the `/en` listing
    pub fn english() -> Self {
        Self {
            fajr: "fajr".to_string(),
            chorok: "chorok".to_string(),
            dhohr: "dhohr".to_string(),
            asr: "asr".to_string(),
            maghrib: "maghrib".to_string(),
            icha: "icha".to_string(),
            date: "date".to_string(),
            region: "wilaya".to_string(),
        }
    }

    /// Wire label for a prayer
    pub fn label(&self, prayer: Prayer) -> &str {
        match prayer {
            Prayer::Fajr => &self.fajr,
            Prayer::Chorok => &self.chorok,
            Prayer::Dhohr => &self.dhohr,
            Prayer::Asr => &self.asr,
            Prayer::Maghrib => &self.maghrib,
            Prayer::Icha => &self.icha,
        }
    }

    /// Reverse lookup from a wire label
    pub fn prayer_for(&self, label: &str) -> Option<Prayer> {
        Prayer::ALL.into_iter().find(|p| self.label(*p) == label)
    }

    /// Whether the label is one of the two auxiliary fields
    pub fn is_auxiliary(&self, label: &str) -> bool {
        label == self.date || label == self.region
    }
}

/// One day of prayer times for one region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrayerRow {
    times: [String; 6],
    /// Date the server reported for this row
    pub date: Option<ScheduleDate>,
    /// Region the server reported for this row
    pub region: Option<Region>,
}

impl PrayerRow {
    /// Create a row from times in [`Prayer::ALL`] order
    pub fn new(times: [String; 6]) -> Self {
        Self {
            times,
            date: None,
            region: None,
        }
    }

    pub fn with_date(mut self, date: ScheduleDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// `HH:MM` time of a prayer
    pub fn time(&self, prayer: Prayer) -> &str {
        &self.times[prayer.index()]
    }

    /// Prayers paired with their times, in display order
    pub fn iter(&self) -> impl Iterator<Item = (Prayer, &str)> + '_ {
        Prayer::ALL.into_iter().map(move |p| (p, self.time(p)))
    }
}

/// A device position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}
