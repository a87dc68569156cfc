//! Page session
//!
//! Owns the current selection and routes every UI trigger (initial load,
//! region change, date change, device location, save, periodic tick) into
//! the coordinator, resolver and saver.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::core::client::PrayerClient;
use crate::core::config::ClientConfig;
use crate::core::coordinator::{RefreshCoordinator, RefreshOutcome};
use crate::core::error::Result;
use crate::core::locator::{LocationResolver, PositionProvider, Resolution, ReverseGeocoder};
use crate::core::models::{QueryParams, Region, ScheduleDate};
use crate::core::persistence::{Ack, RegionSaver};
use crate::core::presenter::{DisplaySurface, Presenter};
use crate::core::store::SavedRegion;
use crate::core::time::{format_date, Clock};
use crate::core::transport::Transport;

/// External collaborators a session is built from
pub struct SessionParts {
    pub transport: Arc<dyn Transport>,
    pub surface: Arc<dyn DisplaySurface>,
    pub positions: Arc<dyn PositionProvider>,
    pub clock: Arc<dyn Clock>,
}

/// One page session: selection state plus the components it drives
pub struct MawaqitSession {
    coordinator: RefreshCoordinator,
    resolver: LocationResolver,
    saver: RegionSaver,
    clock: Arc<dyn Clock>,
    selection: Mutex<QueryParams>,
    today: Mutex<ScheduleDate>,
    state_file: Option<PathBuf>,
}

impl MawaqitSession {
    /// Build a session selecting `region` and today's date
    pub fn new(config: &ClientConfig, parts: SessionParts, region: Region) -> Self {
        let today = format_date(&parts.clock.now());

        let client = PrayerClient::from_config(parts.transport.clone(), config);
        let presenter = Presenter::new(parts.surface.clone(), parts.clock.clone(), config.utc_offset_minutes);
        let geocoder = ReverseGeocoder::from_config(parts.transport.clone(), config);
        let resolver = LocationResolver::new(parts.positions, geocoder)
            .with_position_timeout(Duration::from_secs(config.timeout_seconds));
        let saver = RegionSaver::from_config(parts.transport, config, parts.surface);

        Self {
            coordinator: RefreshCoordinator::new(client, presenter),
            resolver,
            saver,
            clock: parts.clock,
            selection: Mutex::new(QueryParams::new(region, today)),
            today: Mutex::new(today),
            state_file: None,
        }
    }

    /// Remember acknowledged saves in `path`
    pub fn with_state_file(mut self, path: PathBuf) -> Self {
        self.state_file = Some(path);
        self
    }

    /// Start on `date` instead of today, without fetching
    pub fn with_date(self, date: ScheduleDate) -> Self {
        lock(&self.selection).date = date;
        self
    }

    /// Region to start with: the last saved one, else the configured default
    pub fn initial_region(config: &ClientConfig, state_file: Option<&Path>) -> Region {
        state_file
            .and_then(SavedRegion::load_from_file)
            .map(|saved| saved.region)
            .unwrap_or_else(|| config.default_region.clone())
    }

    /// Current (region, date) selection
    pub fn selection(&self) -> QueryParams {
        lock(&self.selection).clone()
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Initial load with the current selection
    pub async fn load(&self) -> Result<RefreshOutcome> {
        self.coordinator.refresh(self.selection()).await
    }

    /// Region control changed
    pub async fn select_region(&self, region: Region) -> Result<RefreshOutcome> {
        let params = {
            let mut selection = lock(&self.selection);
            selection.region = region;
            selection.clone()
        };
        self.coordinator.refresh(params).await
    }

    /// Date control changed
    pub async fn select_date(&self, date: ScheduleDate) -> Result<RefreshOutcome> {
        let params = {
            let mut selection = lock(&self.selection);
            selection.date = date;
            selection.clone()
        };
        self.coordinator.refresh(params).await
    }

    /// Locate button: select the device's region and refresh for it
    pub async fn locate(&self) -> Result<Resolution> {
        let current = self.selection().region;
        let resolution = match self.resolver.resolve(&current).await {
            Ok(resolution) => resolution,
            Err(e) => {
                tracing::warn!(error = %e, "device location failed");
                return Err(e);
            }
        };

        if let Resolution::Resolved(region) = &resolution {
            self.select_region(region.clone()).await?;
        }
        Ok(resolution)
    }

    /// Save button: persist the selected region
    pub async fn save(&self) -> Result<Ack> {
        let region = self.selection().region;
        let ack = self.saver.save_region(&region).await?;

        if let Some(path) = &self.state_file {
            if let Err(e) = SavedRegion::new(region).save_to_file(path) {
                tracing::warn!(path = %path.display(), error = %e, "could not remember saved region");
            }
        }
        Ok(ack)
    }

    /// Periodic tick for a live display
    ///
    /// Moves a selection that tracks today onto the new date after midnight
    /// (UTC), otherwise redraws the countdown. Retries the load when nothing
    /// has been displayed yet.
    pub async fn tick(&self) -> Result<RefreshOutcome> {
        let today = format_date(&self.clock.now());
        let previous = std::mem::replace(&mut *lock(&self.today), today);

        if today != previous && self.selection().date == previous {
            tracing::info!(%today, "date rolled over");
            return self.select_date(today).await;
        }

        if self.coordinator.redraw() {
            Ok(RefreshOutcome::Unchanged)
        } else {
            self.load().await
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
