//! Telegram interface for Stormwatch.
//!
//! This crate provides the interactive weather bot and the periodic
//! thunderstorm broadcaster.
//!
//! # Features
//!
//! - Sector and point menus with current weather, tomorrow's forecast and
//!   a danger-window alert view
//! - Quick thunderstorm check for a reference location, throttled per chat
//! - Periodic sweep of every point with notices pushed to a channel
//!
//! # Environment Variables
//!
//! Required:
//! - `WEATHER_API_KEY`: weather provider key
//! - `TELEGRAM_BOT_TOKEN`: bot token from @BotFather
//!
//! Optional:
//! - `CHANNEL_ID`: broadcast channel (numeric id or `@username`)
//! - `ALERT_WINDOW_HOURS`, `THUNDERSTORM_CODES`, `THUNDER_REFERENCE_LOCATION`
//! - `BROADCAST_INTERVAL_SECS`, `BROADCAST_DELAY_MS`
//! - `STORMWATCH_LOCATIONS`: TOML file with `[[central]]` and `[[east]]` points
//!
//! # Example
//!
//! ```no_run
//! use stormwatch_core::StormwatchConfig;
//! use stormwatch_telegram::StormwatchBot;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StormwatchConfig::from_env()?;
//!     let book = config.location_book()?;
//!     let bot = StormwatchBot::new(&config, book, true)?;
//!     bot.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Commands
//!
//! - `/start` - Open the main menu
//! - `/cancel` - End the conversation
//! - `/help` - Show available commands

pub mod bot;
pub mod broadcast;
pub mod error;
pub mod event;
pub mod handlers;
pub mod session;
pub mod state;
pub mod transport;
pub mod views;

pub use bot::StormwatchBot;
pub use broadcast::{BroadcastConfig, BroadcastPoller, BroadcastSink, SweepReport, TelegramChannel};
pub use error::{Result, SessionError, TelegramError};
pub use event::Event;
pub use session::{SessionContext, ThunderStatus, ViewState};
pub use state::SessionMachine;
pub use transport::{Conversation, TelegramConversation};
pub use views::{Button, View};
