//! Per-conversation session state.

use std::time::{Duration, Instant};

use stormwatch_models::Sector;

/// How long a thunder check result is reused.
pub const THUNDER_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Which view a conversation is currently looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewState {
    /// Main menu: choose a sector or run the quick thunder check.
    SelectingSector,
    /// Point list of the selected sector.
    SelectingPoint,
    /// Current weather for the selected point.
    ShowingWeather,
    /// Tomorrow's forecast; a sub-view of the weather view.
    ShowingTomorrow,
    /// Danger-window alert list; a sub-view of the weather view.
    ShowingAlerts,
    /// The conversation was cancelled and its context dropped.
    Cancelled,
}

impl ViewState {
    /// The weather view or one of its sub-views.
    pub fn is_weather_view(&self) -> bool {
        matches!(
            self,
            ViewState::ShowingWeather | ViewState::ShowingTomorrow | ViewState::ShowingAlerts
        )
    }
}

/// Outcome of the quick thunder check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThunderStatus {
    Detected,
    Clear,
}

/// A thunder check result with its expiry.
#[derive(Debug, Clone, Copy)]
pub struct ThunderCache {
    pub status: ThunderStatus,
    pub expires_at: Instant,
}

impl ThunderCache {
    /// Cache a status checked at `checked_at`.
    pub fn new(status: ThunderStatus, checked_at: Instant) -> Self {
        Self {
            status,
            expires_at: checked_at + THUNDER_CACHE_TTL,
        }
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// A conversation's context.
///
/// Created on first interaction, reset on return to the main menu, and
/// dropped on cancel. Nothing here outlives the process.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Selected sector, if any.
    pub sector: Option<Sector>,
    /// Selected point name. Always resolvable in the active sector's registry.
    pub point: Option<String>,
    /// Current view.
    pub state: ViewState,
    /// Throttle for the quick thunder check.
    pub thunder: Option<ThunderCache>,
}

impl SessionContext {
    /// Create a fresh context at the main menu.
    pub fn new() -> Self {
        Self {
            sector: None,
            point: None,
            state: ViewState::SelectingSector,
            thunder: None,
        }
    }

    /// Return to the main menu, forgetting every selection.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// The sector whose registry resolves point names.
    ///
    /// Without a selection every point is reachable.
    pub fn active_sector(&self) -> Sector {
        self.sector.unwrap_or(Sector::All)
    }

    /// Select a sector, dropping any point chosen under the previous one.
    pub fn select_sector(&mut self, sector: Sector) {
        self.sector = Some(sector);
        self.point = None;
    }

    pub fn clear_point(&mut self) {
        self.point = None;
    }

    /// Cached thunder status, if still fresh at `now`.
    pub fn cached_thunder(&self, now: Instant) -> Option<ThunderStatus> {
        self.thunder
            .filter(|cache| cache.is_fresh(now))
            .map(|cache| cache.status)
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let session = SessionContext::new();
        assert_eq!(session.state, ViewState::SelectingSector);
        assert_eq!(session.active_sector(), Sector::All);
        assert!(session.point.is_none());
        assert!(session.thunder.is_none());
    }

    #[test]
    fn test_sector_change_drops_point() {
        let mut session = SessionContext::new();
        session.select_sector(Sector::Central);
        session.point = Some("Minsk".to_string());

        session.select_sector(Sector::East);
        assert_eq!(session.active_sector(), Sector::East);
        assert!(session.point.is_none());
    }

    #[test]
    fn test_reset() {
        let mut session = SessionContext::new();
        session.select_sector(Sector::East);
        session.point = Some("Gomel".to_string());
        session.state = ViewState::ShowingAlerts;
        session.thunder = Some(ThunderCache::new(ThunderStatus::Clear, Instant::now()));

        session.reset();
        assert_eq!(session.state, ViewState::SelectingSector);
        assert!(session.sector.is_none());
        assert!(session.point.is_none());
        assert!(session.thunder.is_none());
    }

    #[test]
    fn test_thunder_cache_expiry() {
        let checked_at = Instant::now();
        let mut session = SessionContext::new();
        session.thunder = Some(ThunderCache::new(ThunderStatus::Detected, checked_at));

        assert_eq!(
            session.cached_thunder(checked_at + Duration::from_secs(60)),
            Some(ThunderStatus::Detected)
        );
        assert_eq!(session.cached_thunder(checked_at + THUNDER_CACHE_TTL), None);
    }

    #[test]
    fn test_weather_views() {
        assert!(ViewState::ShowingWeather.is_weather_view());
        assert!(ViewState::ShowingTomorrow.is_weather_view());
        assert!(ViewState::ShowingAlerts.is_weather_view());
        assert!(!ViewState::SelectingPoint.is_weather_view());
        assert!(!ViewState::Cancelled.is_weather_view());
    }
}
