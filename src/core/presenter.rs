//! Presentation adapter
//!
//! Writes the six prayer times onto named UI slots, appending a countdown to
//! the upcoming prayer. The UI is reached only through [`DisplaySurface`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset};

use crate::core::models::{NextPrayerMarker, Prayer, PrayerRow};
use crate::core::time::{duration, format_date, local_now, time_of, Clock};

/// Minimal UI capability: named text slots and a transient notification
pub trait DisplaySurface: Send + Sync {
    /// Replace the text of a named slot
    fn set_text(&self, slot: &str, text: &str);

    /// Show a short-lived message
    fn notify(&self, message: &str);
}

/// In-memory surface that records what was written
#[derive(Debug, Default)]
pub struct MemorySurface {
    slots: Mutex<BTreeMap<String, String>>,
    notifications: Mutex<Vec<String>>,
    writes: AtomicUsize,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text of a slot
    pub fn text(&self, slot: &str) -> Option<String> {
        self.slots.lock().ok().and_then(|s| s.get(slot).cloned())
    }

    /// Every notification shown so far, oldest first
    pub fn notifications(&self) -> Vec<String> {
        self.notifications.lock().map(|n| n.clone()).unwrap_or_default()
    }

    /// Total number of slot writes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl DisplaySurface for MemorySurface {
    fn set_text(&self, slot: &str, text: &str) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.insert(slot.to_string(), text.to_string());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn notify(&self, message: &str) {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push(message.to_string());
        }
    }
}

/// Maps a schedule and marker onto the display slots
pub struct Presenter {
    surface: Arc<dyn DisplaySurface>,
    clock: Arc<dyn Clock>,
    utc_offset_minutes: i32,
}

impl Presenter {
    pub fn new(surface: Arc<dyn DisplaySurface>, clock: Arc<dyn Clock>, utc_offset_minutes: i32) -> Self {
        Self {
            surface,
            clock,
            utc_offset_minutes,
        }
    }

    /// The surface this presenter writes to
    pub fn surface(&self) -> &Arc<dyn DisplaySurface> {
        &self.surface
    }

    /// Write one slot per prayer, in display order
    pub fn apply(&self, schedule: &PrayerRow, marker: NextPrayerMarker) {
        let now = local_now(self.clock.as_ref(), self.utc_offset_minutes);
        for (prayer, time) in schedule.iter() {
            let text = slot_text(prayer, time, schedule, marker, &now);
            self.surface.set_text(prayer.id(), &text);
        }
    }
}

/// Text for one prayer slot
///
/// The marked prayer gets ` (<countdown>)` appended, but only when the row
/// is for today (or carries no date at all). Today is the UTC date, the same
/// one a session selects by default and rolls over on.
pub fn slot_text(
    prayer: Prayer,
    time: &str,
    schedule: &PrayerRow,
    marker: NextPrayerMarker,
    now: &DateTime<FixedOffset>,
) -> String {
    if marker != Some(prayer) {
        return time.to_string();
    }

    let is_today = schedule.date.map_or(true, |d| d == format_date(now));
    if !is_today {
        return time.to_string();
    }

    match time_of(time, now) {
        Ok(at) => format!("{} ({})", time, duration(now, &at)),
        Err(e) => {
            tracing::warn!(%prayer, error = %e, "cannot compute countdown");
            time.to_string()
        }
    }
}
