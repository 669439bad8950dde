//! Thunderstorm detection over a forecast document.
//!
//! Two independent signals are produced here:
//!
//! - [`ThunderScanner::scan`] walks the hourly forecast and returns every hour
//!   with a thunderstorm condition code inside the danger window
//!   `(now, now + window_hours]`.
//! - [`ThunderScanner::has_severe_alert`] checks the provider's own advisory
//!   list for a thunderstorm event.
//!
//! They read different parts of the document and are never folded into one
//! status. Both are pure: the same document and `now` always give the same
//! answer.

use std::collections::BTreeSet;

use chrono::{Duration, Local, NaiveDateTime};
use stormwatch_models::{AlertRecord, ForecastDocument, HourSnapshot};
use tracing::{debug, trace};

use crate::config::AlertSettings;

/// Provider condition codes that indicate thunderstorm activity.
pub const DEFAULT_THUNDERSTORM_CODES: [u16; 5] = [1087, 1273, 1276, 1279, 1282];

/// The `now` to scan a document against.
///
/// Hour timestamps are location-local, so the provider's reported local time
/// is preferred over the host clock.
pub fn reference_now(document: &ForecastDocument) -> NaiveDateTime {
    document
        .local_time()
        .unwrap_or_else(|| Local::now().naive_local())
}

/// Extracts danger windows and advisory matches from forecasts.
#[derive(Debug, Clone)]
pub struct ThunderScanner {
    codes: BTreeSet<u16>,
    window_hours: u32,
    advisory_keywords: Vec<String>,
}

impl ThunderScanner {
    pub fn new(settings: &AlertSettings) -> Self {
        Self {
            codes: settings.thunderstorm_codes.iter().copied().collect(),
            window_hours: settings.window_hours,
            advisory_keywords: settings
                .advisory_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }

    /// Length of the danger window in hours.
    pub fn window_hours(&self) -> u32 {
        self.window_hours
    }

    /// Whether a condition code counts as a thunderstorm.
    pub fn is_thunder_code(&self, code: u16) -> bool {
        self.codes.contains(&code)
    }

    /// Collect every thunderstorm hour in `(now, now + window_hours]`.
    ///
    /// Records come out in forecast order. A document without a forecast
    /// yields nothing; an hour that cannot be decoded is skipped on its own.
    pub fn scan(&self, document: &ForecastDocument, now: NaiveDateTime) -> Vec<AlertRecord> {
        let window_end = now
            .checked_add_signed(Duration::hours(i64::from(self.window_hours)))
            .unwrap_or(NaiveDateTime::MAX);
        let mut alerts = Vec::new();

        for day in document.days() {
            for raw in &day.hour {
                let hour = match HourSnapshot::from_value(raw) {
                    Ok(hour) => hour,
                    Err(e) => {
                        debug!(date = %day.date, error = %e, "Skipping undecodable forecast hour");
                        continue;
                    }
                };

                if !self.is_thunder_code(hour.condition.code) {
                    continue;
                }

                let Some(time) = hour.parse_time() else {
                    debug!(date = %day.date, time = %hour.time, "Skipping forecast hour with bad timestamp");
                    continue;
                };

                if now < time && time <= window_end {
                    trace!(time = %time, code = hour.condition.code, "Thunderstorm hour in window");
                    alerts.push(AlertRecord::from_snapshot(&hour, time));
                }
            }
        }

        alerts
    }

    /// Whether the provider's advisory list carries a thunderstorm event.
    pub fn has_severe_alert(&self, document: &ForecastDocument) -> bool {
        document.advisories().iter().any(|advisory| {
            let event = advisory.event.to_lowercase();
            self.advisory_keywords.iter().any(|k| event.contains(k.as_str()))
        })
    }
}

impl Default for ThunderScanner {
    fn default() -> Self {
        Self::new(&AlertSettings::default())
    }
}
