//! Forecast document returned by the weather provider.
//!
//! Every field is optional or defaulted: the provider omits fields freely,
//! and consumers render placeholders rather than reject the document. Hourly
//! entries are kept as raw JSON so that one malformed hour cannot poison the
//! rest of the forecast; [`HourSnapshot`] is the strict view a consumer
//! decodes each entry into.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp format used by the provider for `localtime` and hour `time`.
pub const PROVIDER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// The full provider response for one location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastDocument {
    pub location: Option<LocationInfo>,
    pub current: Option<CurrentConditions>,
    pub forecast: Option<Forecast>,
    pub alerts: Option<AdvisoryList>,
}

impl ForecastDocument {
    /// Forecast days in provider order (empty when `forecast` is missing).
    pub fn days(&self) -> &[ForecastDay] {
        self.forecast
            .as_ref()
            .map(|f| f.forecastday.as_slice())
            .unwrap_or_default()
    }

    /// The `index`-th forecast day, if present.
    pub fn day(&self, index: usize) -> Option<&ForecastDay> {
        self.days().get(index)
    }

    /// Location-local time at which the provider produced the document.
    pub fn local_time(&self) -> Option<NaiveDateTime> {
        let localtime = self.location.as_ref()?.localtime.as_deref()?;
        NaiveDateTime::parse_from_str(localtime, PROVIDER_TIME_FORMAT).ok()
    }

    /// Provider-issued advisories (empty when none were returned).
    pub fn advisories(&self) -> &[Advisory] {
        self.alerts
            .as_ref()
            .map(|a| a.alert.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationInfo {
    pub name: Option<String>,
    pub localtime: Option<String>,
}

/// Current snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentConditions {
    pub temp_c: Option<f64>,
    pub feelslike_c: Option<f64>,
    pub condition: Condition,
    pub wind_kph: Option<f64>,
    pub wind_dir: Option<String>,
    pub humidity: Option<f64>,
    pub precip_mm: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Condition {
    pub text: String,
    pub code: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Forecast {
    pub forecastday: Vec<ForecastDay>,
}

/// One forecast day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastDay {
    pub date: String,
    pub day: Option<DaySummary>,
    pub hour: Vec<serde_json::Value>,
}

/// Whole-day aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaySummary {
    pub maxtemp_c: Option<f64>,
    pub mintemp_c: Option<f64>,
    pub avgtemp_c: Option<f64>,
    pub totalprecip_mm: Option<f64>,
    pub daily_chance_of_rain: Option<f64>,
    pub uv: Option<f64>,
    pub condition: Condition,
}

/// Strict view of one hourly entry.
///
/// Decoding fails when any of the fields the alert scan needs is missing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HourSnapshot {
    pub time: String,
    pub condition: HourCondition,
    pub chance_of_thunder: u8,
    pub precip_mm: f64,
    pub wind_kph: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HourCondition {
    pub code: u16,
    pub text: String,
}

impl HourSnapshot {
    /// Decode a raw hourly entry.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        HourSnapshot::deserialize(value)
    }

    /// Parse the hour's location-local timestamp.
    pub fn parse_time(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.time, PROVIDER_TIME_FORMAT).ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryList {
    pub alert: Vec<Advisory>,
}

/// A provider-issued advisory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Advisory {
    pub event: String,
    pub headline: Option<String>,
    pub severity: Option<String>,
}
