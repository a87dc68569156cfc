//! Core module for the Mawaqit client
//!
//! # Architecture
//!
//! - `models`: Core data structures (Region, ScheduleDate, PrayerRow, Prayer)
//! - `error`: Error types using thiserror
//! - `time`: Date formatting, countdown labels and the Clock seam
//! - `transport`: HTTP GET behind the Transport trait
//! - `config`: ClientConfig discovery and validation
//! - `client`: Schedule and next-prayer queries
//! - `locator`: Device position to region resolution
//! - `presenter`: DisplaySurface writes with the next-prayer countdown
//! - `coordinator`: Refresh deduplication and stale-result suppression
//! - `persistence`: Server-side region save
//! - `store`: Saved region recall between runs
//! - `session`: Trigger wiring for one page session

pub mod models;
pub mod error;
pub mod time;
pub mod transport;
pub mod config;
pub mod client;
pub mod locator;
pub mod presenter;
pub mod coordinator;
pub mod persistence;
pub mod store;
pub mod session;

// Re-export commonly used types
pub use models::{
    GeoPosition, NextPrayerMarker, Prayer, PrayerLabels, PrayerRow, QueryParams, Region,
    ScheduleDate, DATE_FORMAT,
};
pub use error::{MawaqitError, Result, ResultExt};
pub use time::{duration, format_date, local_now, time_of, Clock, DurationLabel, FixedClock, SystemClock};
pub use transport::{HttpResponse, Transport};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use config::{ClientConfig, CONFIG_FILE, ENV_BASE_URL, ENV_REGION};
pub use client::PrayerClient;
pub use locator::{
    FixedPosition, LocationResolver, NoPosition, PositionProvider, Resolution, ReverseGeocoder,
};
pub use presenter::{DisplaySurface, MemorySurface, Presenter};
pub use coordinator::{RefreshCoordinator, RefreshOutcome};
pub use persistence::{Ack, RegionSaver};
pub use store::SavedRegion;
pub use session::{MawaqitSession, SessionParts};
