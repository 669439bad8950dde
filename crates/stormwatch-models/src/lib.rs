//! Core data models for Stormwatch.
//!
//! This crate provides the plain data types shared by every Stormwatch
//! component: the sector/point registry, the weather provider's forecast
//! document, and the derived thunderstorm alert records.

pub mod alert;
pub mod forecast;
pub mod location;

// Re-export main types
pub use alert::AlertRecord;
pub use forecast::{
    Advisory, AdvisoryList, Condition, CurrentConditions, DaySummary, Forecast, ForecastDay,
    ForecastDocument, HourCondition, HourSnapshot, LocationInfo, PROVIDER_TIME_FORMAT,
};
pub use location::{Location, LocationBook, Registry, RegistryError, Sector, MAX_POINT_NAME_BYTES};
