//! Derived thunderstorm alerts.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::forecast::HourSnapshot;

/// One forecast hour inside the danger window.
///
/// Records are recomputed on every scan and never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    /// Location-local time of the hour.
    pub time: NaiveDateTime,
    pub condition: String,
    /// Thunder probability, percent.
    pub chance_of_thunder: u8,
    /// Precipitation, mm per hour.
    pub precip_mm: f64,
    pub wind_kph: f64,
}

impl AlertRecord {
    pub fn from_snapshot(hour: &HourSnapshot, time: NaiveDateTime) -> Self {
        Self {
            time,
            condition: hour.condition.text.clone(),
            chance_of_thunder: hour.chance_of_thunder,
            precip_mm: hour.precip_mm,
            wind_kph: hour.wind_kph,
        }
    }

    /// Short `HH:MM dd.mm` stamp used in notices.
    pub fn time_label(&self) -> String {
        self.time.format("%H:%M %d.%m").to_string()
    }
}
