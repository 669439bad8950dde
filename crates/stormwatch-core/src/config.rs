//! Shared configuration for Stormwatch.
//!
//! Configuration comes from two places:
//!
//! - environment variables (optionally loaded from a `.env` file), read by
//!   [`StormwatchConfig::from_env`];
//! - an optional TOML locations file, read by [`load_locations`].
//!
//! # Storage Structure
//!
//! ```text
//! ~/.stormwatch/
//! ├── .env             # Credentials and tuning variables
//! └── locations.toml   # Sector/point registry (optional)
//! ```
//!
//! # Environment Variables
//!
//! Required:
//! - `WEATHER_API_KEY`: weather provider key
//! - `TELEGRAM_BOT_TOKEN`: bot token from @BotFather
//!
//! Optional:
//! - `CHANNEL_ID`: broadcast channel (numeric id or `@username`); broadcast is
//!   disabled when unset
//! - `WEATHER_API_BASE_URL`: provider base URL
//! - `ALERT_WINDOW_HOURS`: danger window length, 1 to 72 (default: 3)
//! - `THUNDERSTORM_CODES`: comma-separated condition codes
//! - `THUNDER_REFERENCE_LOCATION`: location for the quick thunder check
//!   (default: Minsk)
//! - `BROADCAST_INTERVAL_SECS`: broadcast sweep interval, 1 s to one day
//!   (default: 1800)
//! - `BROADCAST_DELAY_MS`: pause between locations in a sweep (default: 500)
//! - `STORMWATCH_LOCATIONS`: path to the locations file
//! - `STORMWATCH_HOME`: override the base directory

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use stormwatch_models::{Location, LocationBook};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};
use crate::scanner::DEFAULT_THUNDERSTORM_CODES;

/// Environment variable for a custom base directory.
pub const HOME_DIR_ENV: &str = "STORMWATCH_HOME";

/// Default base directory name under home.
const DEFAULT_HOME_DIR: &str = ".stormwatch";

const ENV_FILE: &str = ".env";
const LOCATIONS_FILE: &str = "locations.toml";

const DEFAULT_WINDOW_HOURS: u32 = 3;
const WINDOW_HOURS_RANGE: RangeInclusive<u32> = 1..=72;
const BROADCAST_INTERVAL_RANGE: RangeInclusive<u64> = 1..=24 * 60 * 60;
const DEFAULT_REFERENCE_LOCATION: &str = "Minsk";
const DEFAULT_BROADCAST_INTERVAL_SECS: u64 = 30 * 60;
const DEFAULT_BROADCAST_DELAY_MS: u64 = 500;

/// Get the Stormwatch base directory.
///
/// 1. `STORMWATCH_HOME` if set
/// 2. `~/.stormwatch` if the home directory is available
/// 3. `.stormwatch` in the current directory
pub fn state_dir() -> PathBuf {
    std::env::var(HOME_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(DEFAULT_HOME_DIR))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_HOME_DIR))
        })
}

/// Path of the `.env` file under the base directory.
pub fn env_file() -> PathBuf {
    state_dir().join(ENV_FILE)
}

/// Default path of the locations file.
pub fn locations_file() -> PathBuf {
    state_dir().join(LOCATIONS_FILE)
}

/// Thunderstorm detection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSettings {
    /// Condition codes that count as thunderstorms.
    pub thunderstorm_codes: Vec<u16>,
    /// Danger window length in hours.
    pub window_hours: u32,
    /// Substrings that mark a provider advisory as a thunderstorm.
    pub advisory_keywords: Vec<String>,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            thunderstorm_codes: DEFAULT_THUNDERSTORM_CODES.to_vec(),
            window_hours: DEFAULT_WINDOW_HOURS,
            advisory_keywords: vec!["гроза".to_string(), "thunder".to_string()],
        }
    }
}

/// Process configuration.
#[derive(Debug, Clone)]
pub struct StormwatchConfig {
    pub weather_api_key: String,
    pub weather_base_url: Option<String>,
    pub telegram_token: Option<String>,
    pub channel_id: Option<String>,
    pub alerts: AlertSettings,
    pub reference_location: String,
    pub broadcast_interval: Duration,
    pub broadcast_delay: Duration,
    pub locations_path: Option<PathBuf>,
}

impl StormwatchConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let weather_api_key = var("WEATHER_API_KEY").ok_or(ConfigError::MissingVar("WEATHER_API_KEY"))?;

        let mut alerts = AlertSettings::default();
        if let Some(hours) = var("ALERT_WINDOW_HOURS") {
            alerts.window_hours = parse_bounded("ALERT_WINDOW_HOURS", &hours, WINDOW_HOURS_RANGE)?;
        }
        if let Some(codes) = var("THUNDERSTORM_CODES") {
            alerts.thunderstorm_codes = parse_codes(&codes)?;
        }

        let broadcast_interval = match var("BROADCAST_INTERVAL_SECS") {
            Some(v) => Duration::from_secs(parse_bounded(
                "BROADCAST_INTERVAL_SECS",
                &v,
                BROADCAST_INTERVAL_RANGE,
            )?),
            None => Duration::from_secs(DEFAULT_BROADCAST_INTERVAL_SECS),
        };
        let broadcast_delay = match var("BROADCAST_DELAY_MS") {
            Some(v) => Duration::from_millis(parse_var("BROADCAST_DELAY_MS", &v)?),
            None => Duration::from_millis(DEFAULT_BROADCAST_DELAY_MS),
        };

        Ok(Self {
            weather_api_key,
            weather_base_url: var("WEATHER_API_BASE_URL"),
            telegram_token: var("TELEGRAM_BOT_TOKEN"),
            channel_id: var("CHANNEL_ID"),
            alerts,
            reference_location: var("THUNDER_REFERENCE_LOCATION")
                .unwrap_or_else(|| DEFAULT_REFERENCE_LOCATION.to_string()),
            broadcast_interval,
            broadcast_delay,
            locations_path: var("STORMWATCH_LOCATIONS").map(PathBuf::from),
        })
    }

    /// Load the location book this configuration points at.
    ///
    /// An explicit path must exist; the default path falls back to the
    /// built-in book when missing.
    pub fn location_book(&self) -> Result<LocationBook> {
        match &self.locations_path {
            Some(path) => load_locations(path),
            None => {
                let default_path = locations_file();
                if default_path.exists() {
                    load_locations(&default_path)
                } else {
                    debug!(path = %default_path.display(), "No locations file, using built-in points");
                    Ok(LocationBook::builtin())
                }
            }
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        })
}

fn parse_bounded<T>(name: &'static str, value: &str, range: RangeInclusive<T>) -> Result<T>
where
    T: FromStr + PartialOrd,
{
    let parsed = parse_var(name, value)?;
    if !range.contains(&parsed) {
        return Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        });
    }
    Ok(parsed)
}

fn parse_codes(value: &str) -> Result<Vec<u16>> {
    let codes = value
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| parse_var("THUNDERSTORM_CODES", c))
        .collect::<Result<Vec<u16>>>()?;

    if codes.is_empty() {
        return Err(ConfigError::InvalidValue {
            name: "THUNDERSTORM_CODES",
            value: value.to_string(),
        });
    }
    Ok(codes)
}

/// On-disk shape of the locations file.
#[derive(Debug, Deserialize)]
struct LocationsFile {
    #[serde(default)]
    central: Vec<Location>,
    #[serde(default)]
    east: Vec<Location>,
}

/// Parse a location book from TOML text.
pub fn parse_locations(content: &str) -> Result<LocationBook> {
    let file: LocationsFile = toml::from_str(content)?;
    Ok(LocationBook::new(file.central, file.east)?)
}

/// Load a location book from a TOML file.
pub fn load_locations(path: &Path) -> Result<LocationBook> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let book = parse_locations(&content)?;
    info!(path = %path.display(), count = book.all().len(), "Loaded locations");
    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use stormwatch_models::{RegistryError, Sector};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StormwatchConfig::from_lookup(lookup(&[("WEATHER_API_KEY", "k")])).unwrap();

        assert_eq!(config.weather_api_key, "k");
        assert_eq!(config.alerts, AlertSettings::default());
        assert_eq!(config.alerts.window_hours, 3);
        assert_eq!(config.reference_location, "Minsk");
        assert_eq!(config.broadcast_interval, Duration::from_secs(1800));
        assert_eq!(config.broadcast_delay, Duration::from_millis(500));
        assert!(config.channel_id.is_none());
        assert!(config.telegram_token.is_none());
    }

    #[test]
    fn test_missing_api_key() {
        let err = StormwatchConfig::from_lookup(lookup(&[("WEATHER_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("WEATHER_API_KEY")));
    }

    #[test]
    fn test_overrides() {
        let config = StormwatchConfig::from_lookup(lookup(&[
            ("WEATHER_API_KEY", "k"),
            ("ALERT_WINDOW_HOURS", "6"),
            ("THUNDERSTORM_CODES", "1087, 1276"),
            ("CHANNEL_ID", "@storms"),
            ("BROADCAST_INTERVAL_SECS", "60"),
            ("BROADCAST_DELAY_MS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.alerts.window_hours, 6);
        assert_eq!(config.alerts.thunderstorm_codes, vec![1087, 1276]);
        assert_eq!(config.channel_id.as_deref(), Some("@storms"));
        assert_eq!(config.broadcast_interval, Duration::from_secs(60));
        assert_eq!(config.broadcast_delay, Duration::ZERO);
    }

    #[test]
    fn test_invalid_values() {
        let err = StormwatchConfig::from_lookup(lookup(&[
            ("WEATHER_API_KEY", "k"),
            ("ALERT_WINDOW_HOURS", "three"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { name: "ALERT_WINDOW_HOURS", .. }
        ));

        let err = StormwatchConfig::from_lookup(lookup(&[
            ("WEATHER_API_KEY", "k"),
            ("THUNDERSTORM_CODES", ","),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { name: "THUNDERSTORM_CODES", .. }
        ));
    }

    #[test]
    fn test_out_of_range_values() {
        for (name, value) in [
            ("ALERT_WINDOW_HOURS", "0"),
            ("ALERT_WINDOW_HOURS", "73"),
            ("ALERT_WINDOW_HOURS", "4000000000"),
            ("BROADCAST_INTERVAL_SECS", "0"),
            ("BROADCAST_INTERVAL_SECS", "86401"),
        ] {
            let err = StormwatchConfig::from_lookup(lookup(&[("WEATHER_API_KEY", "k"), (name, value)]))
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { name: n, .. } if n == name),
                "{name}={value} should be rejected"
            );
        }

        let config = StormwatchConfig::from_lookup(lookup(&[
            ("WEATHER_API_KEY", "k"),
            ("ALERT_WINDOW_HOURS", "72"),
            ("BROADCAST_INTERVAL_SECS", "1"),
        ]))
        .unwrap();
        assert_eq!(config.alerts.window_hours, 72);
        assert_eq!(config.broadcast_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_load_locations_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locations.toml");
        std::fs::write(
            &path,
            r#"
[[central]]
name = "Alpha"
coordinates = "53.9,27.5"

[[east]]
name = "Beta"
coordinates = "53.1,30.3"
"#,
        )
        .unwrap();

        let book = load_locations(&path).unwrap();
        assert_eq!(book.registry_for(Sector::Central).len(), 1);
        assert_eq!(book.resolve(Sector::All, "Beta").unwrap().coordinates, "53.1,30.3");

        let config = StormwatchConfig::from_lookup(lookup(&[
            ("WEATHER_API_KEY", "k"),
            ("STORMWATCH_LOCATIONS", path.to_str().unwrap()),
        ]))
        .unwrap();
        assert_eq!(config.location_book().unwrap(), book);
    }

    #[test]
    fn test_locations_file_errors() {
        let overlap = r#"
[[central]]
name = "Alpha"
coordinates = "1,1"

[[east]]
name = "Alpha"
coordinates = "1,1"
"#;
        assert!(matches!(
            parse_locations(overlap),
            Err(ConfigError::Registry(RegistryError::OverlappingSectors(_)))
        ));
        assert!(matches!(parse_locations("central = 5"), Err(ConfigError::Toml(_))));

        let long = format!("[[east]]\nname = \"{}\"\ncoordinates = \"1,1\"\n", "Ё".repeat(40));
        assert!(matches!(
            parse_locations(&long),
            Err(ConfigError::Registry(RegistryError::NameTooLong(_)))
        ));

        let missing = Path::new("/nonexistent/stormwatch/locations.toml");
        assert!(matches!(load_locations(missing), Err(ConfigError::Io { .. })));
    }
}
