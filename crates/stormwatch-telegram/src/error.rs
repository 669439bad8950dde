//! Error types for the Telegram bot.

use stormwatch_core::ConfigError;
use stormwatch_weather::GatewayError;
use thiserror::Error;

/// Errors that can occur in the Telegram bot.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bot token not provided.
    #[error("Telegram bot token not set. Set TELEGRAM_BOT_TOKEN environment variable.")]
    NoToken,

    /// Broadcast requested without a destination.
    #[error("Broadcast channel not set. Set CHANNEL_ID environment variable.")]
    NoBroadcastChannel,

    /// Failed to start the bot.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// Telegram API request failed.
    #[error("Telegram request failed: {0}")]
    Transport(String),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Weather gateway could not be created.
    #[error("Weather gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;

impl From<teloxide::RequestError> for TelegramError {
    fn from(e: teloxide::RequestError) -> Self {
        TelegramError::Transport(e.to_string())
    }
}

/// Why a transition could not complete.
///
/// The session machine maps every kind to a fallback view; none of them
/// end the conversation.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The point is not in the active sector's registry.
    #[error("Point not found: {0}")]
    UnknownPoint(String),

    /// A weather view was requested before any point was chosen.
    #[error("No point selected")]
    NoPointSelected,

    /// The gateway returned no usable data.
    #[error("Weather data unavailable: {0}")]
    DataUnavailable(#[from] GatewayError),

    /// A reply could not be delivered.
    #[error("Reply failed: {0}")]
    Transport(String),
}

impl From<TelegramError> for SessionError {
    fn from(e: TelegramError) -> Self {
        SessionError::Transport(e.to_string())
    }
}
