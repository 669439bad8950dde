//! Sectors, points, and the registries that group them.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest point name in bytes.
///
/// Point buttons carry `point:<name>` as callback data, which Telegram caps
/// at 64 bytes.
pub const MAX_POINT_NAME_BYTES: usize = 58;

/// Errors raised while assembling a registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two points in one registry share a name.
    #[error("Duplicate point name: {0}")]
    DuplicateName(String),

    /// A point name appears in more than one sector.
    #[error("Point {0} is listed in more than one sector")]
    OverlappingSectors(String),

    /// A point name does not fit in a button payload.
    #[error("Point name is longer than {MAX_POINT_NAME_BYTES} bytes: {0}")]
    NameTooLong(String),

    /// A sector token did not match any known sector.
    #[error("Unknown sector: {0}")]
    UnknownSector(String),
}

/// A named partition of the point registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sector {
    /// Central sector.
    Central,
    /// East sector.
    East,
    /// Synthetic view spanning every sector.
    All,
}

impl Sector {
    /// Sectors in main-menu order.
    pub const ALL_SECTORS: [Sector; 3] = [Sector::Central, Sector::East, Sector::All];

    /// Token used in button payloads and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Central => "central",
            Sector::East => "east",
            Sector::All => "all",
        }
    }

    /// Menu caption.
    pub fn label(&self) -> &'static str {
        match self {
            Sector::Central => "Central sector",
            Sector::East => "East sector",
            Sector::All => "All points",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sector {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "central" => Ok(Sector::Central),
            "east" => Ok(Sector::East),
            "all" => Ok(Sector::All),
            other => Err(RegistryError::UnknownSector(other.to_string())),
        }
    }
}

/// A point the user can ask about.
///
/// `coordinates` is passed to the weather provider untouched; it may be a
/// `lat,lon` pair or a place name the provider understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub coordinates: String,
}

impl Location {
    pub fn new(name: impl Into<String>, coordinates: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coordinates: coordinates.into(),
        }
    }
}

/// An ordered set of points with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    locations: Vec<Location>,
}

impl Registry {
    /// Build a registry, rejecting duplicate and oversized names.
    pub fn new(locations: Vec<Location>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for location in &locations {
            if location.name.len() > MAX_POINT_NAME_BYTES {
                return Err(RegistryError::NameTooLong(location.name.clone()));
            }
            if !seen.insert(location.name.as_str()) {
                return Err(RegistryError::DuplicateName(location.name.clone()));
            }
        }
        Ok(Self { locations })
    }

    /// Look up a point by name.
    pub fn get(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.locations.iter().map(|l| l.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Every configured point, grouped by sector.
///
/// The `all` registry is derived from the sectors and never configured
/// directly, so a name resolves to the same coordinates in every view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationBook {
    central: Registry,
    east: Registry,
    all: Registry,
}

impl LocationBook {
    /// Assemble a book from the two sectors.
    ///
    /// Sectors must be disjoint by name.
    pub fn new(central: Vec<Location>, east: Vec<Location>) -> Result<Self, RegistryError> {
        let central = Registry::new(central)?;
        let east = Registry::new(east)?;

        if let Some(shared) = east.names().find(|name| central.get(name).is_some()) {
            return Err(RegistryError::OverlappingSectors(shared.to_string()));
        }

        let all = Registry::new(central.iter().chain(east.iter()).cloned().collect())?;
        Ok(Self { central, east, all })
    }

    /// The default point set.
    pub fn builtin() -> Self {
        let central = vec![
            Location::new("Minsk", "53.9006,27.5590"),
            Location::new("Dzerzhinsk", "53.6832,27.1380"),
            Location::new("Borisov", "54.2279,28.5050"),
            Location::new("Maryina Gorka", "53.5090,28.1470"),
        ];
        let east = vec![
            Location::new("Mogilev", "53.9168,30.3449"),
            Location::new("Gomel", "52.4345,30.9754"),
            Location::new("Vitebsk", "55.1904,30.2049"),
            Location::new("Bobruisk", "53.1384,29.2214"),
        ];
        Self {
            all: Registry {
                locations: central.iter().chain(east.iter()).cloned().collect(),
            },
            central: Registry { locations: central },
            east: Registry { locations: east },
        }
    }

    /// The registry a sector selection refers to.
    pub fn registry_for(&self, sector: Sector) -> &Registry {
        match sector {
            Sector::Central => &self.central,
            Sector::East => &self.east,
            Sector::All => &self.all,
        }
    }

    /// Resolve a point name within a sector's registry.
    pub fn resolve(&self, sector: Sector, name: &str) -> Option<&Location> {
        self.registry_for(sector).get(name)
    }

    /// Every point across all sectors.
    pub fn all(&self) -> &Registry {
        &self.all
    }
}

impl Default for LocationBook {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_tokens() {
        for sector in Sector::ALL_SECTORS {
            assert_eq!(sector.as_str().parse::<Sector>(), Ok(sector));
        }
        assert_eq!(
            "west".parse::<Sector>(),
            Err(RegistryError::UnknownSector("west".to_string()))
        );
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let result = Registry::new(vec![
            Location::new("A", "1,1"),
            Location::new("A", "2,2"),
        ]);
        assert_eq!(result, Err(RegistryError::DuplicateName("A".to_string())));
    }

    #[test]
    fn test_registry_rejects_long_names() {
        // 29 two-byte characters fit exactly, one more does not.
        let fits = "Ж".repeat(29);
        assert!(Registry::new(vec![Location::new(fits, "1,1")]).is_ok());

        let long = "Ж".repeat(30);
        let result = LocationBook::new(vec![Location::new(long.clone(), "1,1")], vec![]);
        assert_eq!(result, Err(RegistryError::NameTooLong(long)));
    }

    #[test]
    fn test_book_rejects_overlap() {
        let result = LocationBook::new(
            vec![Location::new("A", "1,1")],
            vec![Location::new("A", "1,1")],
        );
        assert_eq!(
            result,
            Err(RegistryError::OverlappingSectors("A".to_string()))
        );
    }

    #[test]
    fn test_all_registry_is_ordered_union() {
        let book = LocationBook::new(
            vec![Location::new("A", "1,1"), Location::new("B", "2,2")],
            vec![Location::new("C", "3,3")],
        )
        .unwrap();

        let names: Vec<_> = book.registry_for(Sector::All).names().collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(book.resolve(Sector::All, "C").unwrap().coordinates, "3,3");
        assert!(book.resolve(Sector::Central, "C").is_none());
    }

    #[test]
    fn test_builtin_book_is_consistent() {
        let builtin = LocationBook::builtin();
        let rebuilt = LocationBook::new(
            builtin.registry_for(Sector::Central).iter().cloned().collect(),
            builtin.registry_for(Sector::East).iter().cloned().collect(),
        )
        .unwrap();
        assert_eq!(builtin, rebuilt);
        assert!(builtin.all().get("Minsk").is_some());
    }
}
