//! Session state machine shared by all chats.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use stormwatch_core::{reference_now, ThunderScanner};
use stormwatch_models::{Location, LocationBook, Sector};
use stormwatch_weather::ForecastSource;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::error::SessionError;
use crate::event::Event;
use crate::session::{SessionContext, ThunderCache, ThunderStatus, ViewState};
use crate::transport::Conversation;
use crate::views;

/// Days fetched for the weather views (today, tomorrow, spillover).
pub const FORECAST_DAYS: u8 = 3;

/// Days fetched for the quick thunder check.
pub const THUNDER_CHECK_DAYS: u8 = 1;

type Transition = std::result::Result<ViewState, SessionError>;

/// Per-chat conversation controller.
///
/// Contexts are keyed by chat id and live only in memory. The session lock
/// is taken for short reads and writes and never held across a fetch or a
/// reply.
pub struct SessionMachine {
    sessions: RwLock<HashMap<i64, SessionContext>>,
    book: Arc<LocationBook>,
    source: Arc<dyn ForecastSource>,
    scanner: ThunderScanner,
    reference: Location,
}

impl SessionMachine {
    pub fn new(
        book: Arc<LocationBook>,
        source: Arc<dyn ForecastSource>,
        scanner: ThunderScanner,
        reference: Location,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            book,
            source,
            scanner,
            reference,
        }
    }

    pub fn book(&self) -> &LocationBook {
        &self.book
    }

    /// Location used by the quick thunder check.
    pub fn reference(&self) -> &Location {
        &self.reference
    }

    /// Current view of a chat, `None` if it has no conversation.
    pub async fn state(&self, chat_id: i64) -> Option<ViewState> {
        self.sessions.read().await.get(&chat_id).map(|ctx| ctx.state)
    }

    /// Snapshot of a chat's context.
    pub async fn context(&self, chat_id: i64) -> Option<SessionContext> {
        self.sessions.read().await.get(&chat_id).cloned()
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Run one event through the machine and return the resulting state.
    ///
    /// The event is acknowledged first. Events the current state does not
    /// accept get a "menu no longer active" reply and change nothing.
    /// `Cancelled` is returned when the chat has no conversation afterwards.
    #[instrument(skip_all, fields(chat_id = %chat_id, event = event.name()))]
    pub async fn handle(
        &self,
        chat_id: i64,
        event: Event,
        conversation: &mut dyn Conversation,
    ) -> ViewState {
        if let Err(e) = conversation.acknowledge().await {
            warn!(error = %e, "Failed to acknowledge event");
        }

        let current = self.state(chat_id).await;
        if !event.is_accepted_in(current) {
            info!(state = ?current, "Event not valid in current state");
            if let Err(e) = conversation.render(views::stale_menu()).await {
                warn!(error = %e, "Failed to send stale menu notice");
            }
            return current.unwrap_or(ViewState::Cancelled);
        }

        let outcome = match &event {
            Event::Start | Event::BackToMain => self.show_main(chat_id, conversation).await,
            Event::Cancel => self.cancel(chat_id, conversation).await,
            Event::SelectSector(sector) => {
                self.select_sector(chat_id, *sector, conversation).await
            }
            Event::SelectPoint(name) => self.select_point(chat_id, name, conversation).await,
            Event::RequestTomorrow => self.show_tomorrow(chat_id, conversation).await,
            Event::RequestAlerts => self.show_alerts(chat_id, conversation).await,
            Event::CheckThunder => self.check_thunder(chat_id, conversation).await,
            Event::BackToPoints => self.back_to_points(chat_id, conversation).await,
            Event::BackToWeather => self.show_weather(chat_id, conversation).await,
        };

        let state = match outcome {
            Ok(state) => state,
            Err(error) => self.recover(chat_id, &event, error, conversation).await,
        };
        self.set_state(chat_id, state).await;
        debug!(state = ?state, "Transition complete");
        state
    }

    async fn update<F>(&self, chat_id: i64, f: F)
    where
        F: FnOnce(&mut SessionContext),
    {
        let mut sessions = self.sessions.write().await;
        f(sessions.entry(chat_id).or_default());
    }

    async fn set_state(&self, chat_id: i64, state: ViewState) {
        if state == ViewState::Cancelled {
            self.sessions.write().await.remove(&chat_id);
        } else {
            self.update(chat_id, |ctx| ctx.state = state).await;
        }
    }

    /// Resolve the session's point in its active registry.
    async fn selected_point(&self, chat_id: i64) -> std::result::Result<Location, SessionError> {
        let ctx = self.context(chat_id).await.unwrap_or_default();
        let name = ctx.point.ok_or(SessionError::NoPointSelected)?;
        self.book
            .resolve(ctx.sector.unwrap_or(Sector::All), &name)
            .cloned()
            .ok_or(SessionError::UnknownPoint(name))
    }

    async fn show_main(&self, chat_id: i64, conversation: &mut dyn Conversation) -> Transition {
        self.update(chat_id, SessionContext::reset).await;
        conversation.render(views::sector_menu()).await?;
        Ok(ViewState::SelectingSector)
    }

    async fn cancel(&self, chat_id: i64, conversation: &mut dyn Conversation) -> Transition {
        self.sessions.write().await.remove(&chat_id);
        conversation.render(views::cancelled()).await?;
        info!("Conversation cancelled");
        Ok(ViewState::Cancelled)
    }

    async fn select_sector(
        &self,
        chat_id: i64,
        sector: Sector,
        conversation: &mut dyn Conversation,
    ) -> Transition {
        self.update(chat_id, |ctx| ctx.select_sector(sector)).await;
        conversation
            .render(views::points(self.book.registry_for(sector)))
            .await?;
        Ok(ViewState::SelectingPoint)
    }

    async fn select_point(
        &self,
        chat_id: i64,
        name: &str,
        conversation: &mut dyn Conversation,
    ) -> Transition {
        let sector = self
            .context(chat_id)
            .await
            .map_or(Sector::All, |ctx| ctx.active_sector());
        let location = self
            .book
            .resolve(sector, name)
            .cloned()
            .ok_or_else(|| SessionError::UnknownPoint(name.to_string()))?;

        conversation.render(views::loading(views::LOADING_WEATHER)).await?;
        let document = self.source.fetch(&location, FORECAST_DAYS).await?;
        let alerts = self.scanner.scan(&document, reference_now(&document));

        self.update(chat_id, |ctx| ctx.point = Some(location.name.clone()))
            .await;
        conversation
            .render(views::weather(&location.name, &document, &alerts))
            .await?;
        info!(point = %location.name, alerts = alerts.len(), "Weather shown");
        Ok(ViewState::ShowingWeather)
    }

    async fn show_weather(&self, chat_id: i64, conversation: &mut dyn Conversation) -> Transition {
        let location = self.selected_point(chat_id).await?;

        conversation.render(views::loading(views::LOADING_WEATHER)).await?;
        let document = self.source.fetch(&location, FORECAST_DAYS).await?;
        let alerts = self.scanner.scan(&document, reference_now(&document));

        conversation
            .render(views::weather(&location.name, &document, &alerts))
            .await?;
        Ok(ViewState::ShowingWeather)
    }

    async fn show_tomorrow(&self, chat_id: i64, conversation: &mut dyn Conversation) -> Transition {
        let location = self.selected_point(chat_id).await?;

        conversation.render(views::loading(views::LOADING_TOMORROW)).await?;
        let document = self.source.fetch(&location, FORECAST_DAYS).await?;

        match document.day(1) {
            Some(day) => {
                conversation.render(views::tomorrow(&location.name, day)).await?;
                Ok(ViewState::ShowingTomorrow)
            }
            None => {
                warn!(point = %location.name, days = document.days().len(), "Forecast has no second day");
                conversation
                    .render(views::weather_notice(views::TOMORROW_UNAVAILABLE))
                    .await?;
                Ok(ViewState::ShowingWeather)
            }
        }
    }

    async fn show_alerts(&self, chat_id: i64, conversation: &mut dyn Conversation) -> Transition {
        let location = self.selected_point(chat_id).await?;

        conversation.render(views::loading(views::LOADING_ALERTS)).await?;
        let document = self.source.fetch(&location, FORECAST_DAYS).await?;
        let alerts = self.scanner.scan(&document, reference_now(&document));
        let advisory = self.scanner.has_severe_alert(&document);

        conversation
            .render(views::alerts(
                &location.name,
                &alerts,
                advisory,
                self.scanner.window_hours(),
            ))
            .await?;
        Ok(ViewState::ShowingAlerts)
    }

    /// Quick thunder status for the reference location.
    ///
    /// Only the provider's advisory list is consulted. A fresh cached status
    /// is reused without a fetch. Failed checks are reported but not cached.
    async fn check_thunder(&self, chat_id: i64, conversation: &mut dyn Conversation) -> Transition {
        let now = Instant::now();
        let cached = self
            .context(chat_id)
            .await
            .and_then(|ctx| ctx.cached_thunder(now));
        if let Some(status) = cached {
            debug!(status = ?status, "Using cached thunder status");
            conversation
                .render(views::thunder_status(&self.reference.name, status))
                .await?;
            return Ok(ViewState::SelectingSector);
        }

        conversation.render(views::loading(views::LOADING_THUNDER)).await?;
        let view = match self.source.fetch(&self.reference, THUNDER_CHECK_DAYS).await {
            Ok(document) => {
                let status = if self.scanner.has_severe_alert(&document) {
                    ThunderStatus::Detected
                } else {
                    ThunderStatus::Clear
                };
                self.update(chat_id, |ctx| ctx.thunder = Some(ThunderCache::new(status, now)))
                    .await;
                views::thunder_status(&self.reference.name, status)
            }
            Err(e) => {
                warn!(error = %e, location = %self.reference.name, "Thunder check failed");
                views::thunder_failed(&self.reference.name)
            }
        };

        conversation.render(view).await?;
        Ok(ViewState::SelectingSector)
    }

    async fn back_to_points(&self, chat_id: i64, conversation: &mut dyn Conversation) -> Transition {
        let sector = self
            .context(chat_id)
            .await
            .map_or(Sector::All, |ctx| ctx.active_sector());
        self.update(chat_id, SessionContext::clear_point).await;
        conversation
            .render(views::points(self.book.registry_for(sector)))
            .await?;
        Ok(ViewState::SelectingPoint)
    }

    /// Map a failed transition to its fallback view and state.
    async fn recover(
        &self,
        chat_id: i64,
        event: &Event,
        error: SessionError,
        conversation: &mut dyn Conversation,
    ) -> ViewState {
        // The context is already gone; a failed goodbye must not revive it.
        if matches!(event, Event::Cancel) {
            warn!(error = %error, "Failed to confirm cancel");
            return ViewState::Cancelled;
        }

        let (view, state) = match &error {
            SessionError::UnknownPoint(_) => (
                views::notice_with_sector_menu(views::POINT_NOT_FOUND),
                ViewState::SelectingSector,
            ),
            SessionError::NoPointSelected => (
                views::notice_with_sector_menu(views::NO_POINT_SELECTED),
                ViewState::SelectingSector,
            ),
            SessionError::DataUnavailable(_) if matches!(event, Event::SelectPoint(_)) => (
                views::notice_with_sector_menu(views::WEATHER_UNAVAILABLE),
                ViewState::SelectingSector,
            ),
            SessionError::DataUnavailable(_) => {
                let notice = match event {
                    Event::RequestTomorrow => views::TOMORROW_UNAVAILABLE,
                    _ => views::WEATHER_UNAVAILABLE,
                };
                (views::weather_notice(notice), ViewState::ShowingWeather)
            }
            SessionError::Transport(_) => (
                views::notice_with_sector_menu(views::GENERIC_ERROR),
                ViewState::SelectingSector,
            ),
        };

        warn!(error = %error, fallback = ?state, "Transition failed");

        if state == ViewState::SelectingSector {
            self.update(chat_id, SessionContext::reset).await;
        }
        if let Err(e) = conversation.render(view).await {
            warn!(error = %e, "Failed to send fallback notice");
        }
        state
    }
}
