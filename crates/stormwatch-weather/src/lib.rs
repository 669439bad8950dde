//! Weather provider gateway.
//!
//! A single async client for the provider's `forecast.json` endpoint. It owns
//! one pooled HTTP client shared by every caller and turns every transport or
//! decoding failure into a [`GatewayError`], which callers treat as "data
//! currently unavailable".

pub mod client;
pub mod error;

pub use client::{ForecastSource, GatewayConfig, WeatherGateway};
pub use error::{GatewayError, Result};
