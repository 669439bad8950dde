//! Periodic thunderstorm broadcast to a fixed channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stormwatch_core::{reference_now, ThunderScanner};
use stormwatch_models::LocationBook;
use stormwatch_weather::ForecastSource;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, Recipient};
use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{Result, TelegramError};
use crate::views;

/// Shortest accepted sweep interval.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Poller timing.
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Time between sweeps.
    pub interval: Duration,
    /// Pause between two locations of one sweep.
    pub item_delay: Duration,
    /// Forecast days fetched per location.
    pub days: u8,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30 * 60),
            item_delay: Duration::from_millis(500),
            days: 2,
        }
    }
}

impl BroadcastConfig {
    /// Set the sweep interval, never shorter than [`MIN_INTERVAL`].
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_INTERVAL);
        self
    }

    pub fn with_item_delay(mut self, item_delay: Duration) -> Self {
        self.item_delay = item_delay;
        self
    }

    pub fn with_days(mut self, days: u8) -> Self {
        self.days = days;
        self
    }
}

/// Destination of broadcast notices.
#[async_trait]
pub trait BroadcastSink: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<()>;
}

/// Parse a channel id: a numeric chat id or an `@username`.
pub fn parse_recipient(channel: &str) -> Result<Recipient> {
    let channel = channel.trim();
    if channel.starts_with('@') && channel.len() > 1 {
        return Ok(Recipient::ChannelUsername(channel.to_string()));
    }
    channel
        .parse::<i64>()
        .map(|id| Recipient::Id(ChatId(id)))
        .map_err(|_| TelegramError::NoBroadcastChannel)
}

/// A Telegram channel as a [`BroadcastSink`].
pub struct TelegramChannel {
    bot: Bot,
    recipient: Recipient,
}

impl TelegramChannel {
    pub fn new(bot: Bot, channel: &str) -> Result<Self> {
        Ok(Self {
            bot,
            recipient: parse_recipient(channel)?,
        })
    }
}

#[async_trait]
impl BroadcastSink for TelegramChannel {
    async fn send_text(&self, text: &str) -> Result<()> {
        self.bot
            .send_message(self.recipient.clone(), text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Locations whose forecast was scanned.
    pub checked: usize,
    /// Locations a notice was pushed for.
    pub alerted: usize,
    /// Locations whose fetch or push failed.
    pub failed: usize,
}

/// Sweeps every known location on a fixed interval.
pub struct BroadcastPoller {
    book: Arc<LocationBook>,
    source: Arc<dyn ForecastSource>,
    scanner: ThunderScanner,
    sink: Arc<dyn BroadcastSink>,
    config: BroadcastConfig,
    shutdown: watch::Receiver<bool>,
}

impl BroadcastPoller {
    pub fn new(
        book: Arc<LocationBook>,
        source: Arc<dyn ForecastSource>,
        scanner: ThunderScanner,
        sink: Arc<dyn BroadcastSink>,
        config: BroadcastConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            book,
            source,
            scanner,
            sink,
            config,
            shutdown,
        }
    }

    /// Sweep on every tick until shutdown is signalled.
    pub async fn run(&mut self) {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.config.interval.as_secs(),
            locations = self.book.all().len(),
            "Starting broadcast poller"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.sweep().await;
                    info!(
                        checked = report.checked,
                        alerted = report.alerted,
                        failed = report.failed,
                        "Broadcast sweep finished"
                    );
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        debug!("Broadcast poller received shutdown signal");
                        break;
                    }
                }
            }
        }

        info!("Broadcast poller stopped");
    }

    /// One pass over the full registry.
    ///
    /// A failing location is logged and counted; the rest are still checked.
    /// A shutdown signal ends the sweep at the next pause.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let mut shutdown = self.shutdown.clone();

        for (index, location) in self.book.all().iter().enumerate() {
            if index > 0 && !self.config.item_delay.is_zero() {
                tokio::select! {
                    _ = sleep(self.config.item_delay) => {}
                    _ = shutdown.wait_for(|stop| *stop) => {
                        debug!(remaining = self.book.all().len() - index, "Sweep interrupted by shutdown");
                        break;
                    }
                }
            }

            let document = match self.source.fetch(location, self.config.days).await {
                Ok(document) => document,
                Err(e) => {
                    warn!(location = %location.name, error = %e, "Broadcast fetch failed");
                    report.failed += 1;
                    continue;
                }
            };
            report.checked += 1;

            let alerts = self.scanner.scan(&document, reference_now(&document));
            if alerts.is_empty() {
                debug!(location = %location.name, "No thunderstorms in window");
                continue;
            }

            let text = views::broadcast_text(&location.name, &alerts);
            match self.sink.send_text(&text).await {
                Ok(()) => {
                    info!(location = %location.name, alerts = alerts.len(), "Thunderstorm notice sent");
                    report.alerted += 1;
                }
                Err(e) => {
                    warn!(location = %location.name, error = %e, "Failed to send thunderstorm notice");
                    report.failed += 1;
                }
            }
        }

        report
    }
}
