//! mawaqit - Daily prayer times client
//!
//! Fetches the six daily prayer times for an Algerian region (wilaya) from a
//! Mawaqit server, marks the upcoming prayer with a countdown, resolves the
//! region from the device position and saves the chosen region server-side.
//!
//! # Architecture
//!
//! This crate follows the "Library-First" pattern:
//! - **lib.rs** (this file): Pure logic, no CLI concerns
//! - **bin/mawaqit.rs**: Thin wrapper that calls the library
//!
//! The UI, the network and the clock are reached only through traits
//! ([`core::DisplaySurface`], [`core::Transport`], [`core::Clock`]), so every
//! component can be driven in tests without a browser or a server.

pub mod core;

pub use crate::core::{
    ClientConfig, MawaqitError, MawaqitSession, NextPrayerMarker, Prayer, PrayerRow, QueryParams,
    Region, RefreshOutcome, Result, ScheduleDate, SessionParts,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_matches_manifest() {
        assert_eq!(VERSION, "0.3.0");
    }
}
