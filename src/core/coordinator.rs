//! Refresh coordinator
//!
//! Decides whether a (region, date) pair needs new data, fetches the schedule
//! and the next-prayer marker together, and hands both to the presenter.
//!
//! # Invariants
//!
//! - A pair equal to the last applied pair never reaches the network.
//! - A pair equal to the request already in flight is not sent twice.
//! - `last_applied` only advances after both fetches succeed and the results
//!   have been presented, so a failed pair is retried on the next trigger.
//! - Results of a refresh overtaken by a newer one are dropped; in-flight
//!   requests are never cancelled.
//! - Re-selecting the displayed pair while another pair is in flight
//!   overtakes that request without touching the network.
//! - The in-flight marker is cleared even when a refresh future is dropped.

use std::sync::{Mutex, MutexGuard};

use crate::core::client::PrayerClient;
use crate::core::error::Result;
use crate::core::models::{NextPrayerMarker, PrayerRow, QueryParams};
use crate::core::presenter::Presenter;

/// What a call to [`RefreshCoordinator::refresh`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Fresh data was fetched and presented
    Applied,
    /// The pair matches what is already displayed
    Unchanged,
    /// The same pair is already being fetched
    Pending,
    /// Data arrived after a newer refresh started and was dropped
    Superseded,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    last_applied: Option<QueryParams>,
    in_flight: Option<(u64, QueryParams)>,
    generation: u64,
    displayed: Option<(PrayerRow, NextPrayerMarker)>,
}

/// Owner of the refresh state for one session
pub struct RefreshCoordinator {
    client: PrayerClient,
    presenter: Presenter,
    state: Mutex<CoordinatorState>,
}

impl RefreshCoordinator {
    pub fn new(client: PrayerClient, presenter: Presenter) -> Self {
        Self {
            client,
            presenter,
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    /// Pair behind what the UI currently shows
    pub fn last_applied(&self) -> Option<QueryParams> {
        self.lock().last_applied.clone()
    }

    /// Fetch and present data for `params` unless it is already shown
    pub async fn refresh(&self, params: QueryParams) -> Result<RefreshOutcome> {
        let ticket = {
            let mut state = self.lock();
            if state.last_applied.as_ref() == Some(&params) {
                if state.in_flight.take().is_some() {
                    state.generation += 1;
                }
                tracing::debug!(%params, "already displayed");
                return Ok(RefreshOutcome::Unchanged);
            }
            if matches!(&state.in_flight, Some((_, pending)) if pending == &params) {
                tracing::debug!(%params, "already in flight");
                return Ok(RefreshOutcome::Pending);
            }
            state.generation += 1;
            state.in_flight = Some((state.generation, params.clone()));
            state.generation
        };
        let in_flight = InFlight {
            state: &self.state,
            ticket,
        };

        tracing::debug!(%params, ticket, "refreshing");
        let (schedule, marker) = tokio::join!(
            self.client.fetch_schedule(&params.region, &params.date),
            self.client.fetch_next_prayer(&params.region),
        );
        drop(in_flight);

        let mut state = self.lock();
        let current = state.generation == ticket;

        let (schedule, marker) = match (schedule, marker) {
            (Ok(schedule), Ok(marker)) => (schedule, marker),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(%params, error = %e, "refresh failed, keeping previous data");
                return Err(e);
            }
        };

        if !current {
            tracing::debug!(%params, ticket, "dropping superseded result");
            return Ok(RefreshOutcome::Superseded);
        }

        self.presenter.apply(&schedule, marker);
        state.last_applied = Some(params.clone());
        state.displayed = Some((schedule, marker));
        tracing::info!(%params, next = ?marker, "schedule applied");
        Ok(RefreshOutcome::Applied)
    }

    /// Re-present the displayed data with a fresh countdown
    ///
    /// Returns `false` when nothing has been applied yet.
    pub fn redraw(&self) -> bool {
        let state = self.lock();
        match &state.displayed {
            Some((schedule, marker)) => {
                self.presenter.apply(schedule, *marker);
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        lock(&self.state)
    }
}

/// Clears the in-flight marker of a ticket when its refresh ends or is dropped
struct InFlight<'a> {
    state: &'a Mutex<CoordinatorState>,
    ticket: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        if matches!(&state.in_flight, Some((ticket, _)) if *ticket == self.ticket) {
            state.in_flight = None;
        }
    }
}

fn lock(state: &Mutex<CoordinatorState>) -> MutexGuard<'_, CoordinatorState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
