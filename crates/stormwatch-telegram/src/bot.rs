//! Main Telegram bot implementation.

use std::sync::Arc;

use stormwatch_core::{StormwatchConfig, ThunderScanner};
use stormwatch_models::{Location, LocationBook};
use stormwatch_weather::{GatewayConfig, WeatherGateway};
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::broadcast::{BroadcastConfig, BroadcastPoller, SweepReport, TelegramChannel};
use crate::error::{Result, TelegramError};
use crate::handlers::{handle_callback, handle_command, Command};
use crate::state::SessionMachine;

/// The Stormwatch Telegram bot.
pub struct StormwatchBot {
    /// The teloxide bot instance.
    bot: Bot,
    /// Conversation state shared across handlers.
    machine: Arc<SessionMachine>,
    /// Weather gateway shared by conversations and the broadcaster.
    gateway: Arc<WeatherGateway>,
    book: Arc<LocationBook>,
    scanner: ThunderScanner,
    /// Broadcast destination, if broadcasting is enabled.
    channel: Option<Arc<TelegramChannel>>,
    broadcast: BroadcastConfig,
}

impl StormwatchBot {
    /// Create a bot from configuration.
    ///
    /// Requires `TELEGRAM_BOT_TOKEN`. Broadcasting also needs `CHANNEL_ID`;
    /// without it the bot runs interactive-only.
    pub fn new(config: &StormwatchConfig, book: LocationBook, broadcast_enabled: bool) -> Result<Self> {
        let token = config.telegram_token.clone().ok_or(TelegramError::NoToken)?;
        let bot = Bot::new(token);

        let mut gateway_config = GatewayConfig::new(config.weather_api_key.clone());
        if let Some(base_url) = &config.weather_base_url {
            gateway_config = gateway_config.with_base_url(base_url.clone());
        }
        let gateway = Arc::new(WeatherGateway::new(gateway_config)?);

        let book = Arc::new(book);
        let scanner = ThunderScanner::new(&config.alerts);

        let reference = match book.all().get(&config.reference_location) {
            Some(location) => location.clone(),
            None => {
                warn!(
                    location = %config.reference_location,
                    "Thunder reference is not a known point, querying it by name"
                );
                Location::new(&config.reference_location, &config.reference_location)
            }
        };

        let machine = Arc::new(SessionMachine::new(
            Arc::clone(&book),
            gateway.clone(),
            scanner.clone(),
            reference,
        ));

        let channel = match (&config.channel_id, broadcast_enabled) {
            (Some(channel_id), true) => Some(Arc::new(TelegramChannel::new(bot.clone(), channel_id)?)),
            (None, true) => {
                warn!("CHANNEL_ID not set, thunderstorm broadcast disabled");
                None
            }
            (_, false) => None,
        };

        let broadcast = BroadcastConfig::default()
            .with_interval(config.broadcast_interval)
            .with_item_delay(config.broadcast_delay);

        Ok(Self {
            bot,
            machine,
            gateway,
            book,
            scanner,
            channel,
            broadcast,
        })
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    pub fn machine(&self) -> Arc<SessionMachine> {
        Arc::clone(&self.machine)
    }

    pub fn broadcast_enabled(&self) -> bool {
        self.channel.is_some()
    }

    fn poller(&self, shutdown: watch::Receiver<bool>) -> Option<BroadcastPoller> {
        let channel = self.channel.as_ref()?;
        Some(BroadcastPoller::new(
            Arc::clone(&self.book),
            self.gateway.clone(),
            self.scanner.clone(),
            channel.clone(),
            self.broadcast.clone(),
            shutdown,
        ))
    }

    /// Run one broadcast sweep and release the gateway.
    pub async fn sweep_once(&self) -> Result<SweepReport> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let poller = self
            .poller(shutdown_rx)
            .ok_or(TelegramError::NoBroadcastChannel)?;

        let report = poller.sweep().await;
        self.gateway.close().await;
        Ok(report)
    }

    /// Start the bot in polling mode until Ctrl+C.
    pub async fn run(&self) -> Result<()> {
        info!("Starting Telegram bot in polling mode...");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poller_task = self.poller(shutdown_rx).map(|mut poller| {
            tokio::spawn(async move {
                poller.run().await;
            })
        });

        let machine_for_commands = Arc::clone(&self.machine);
        let machine_for_callbacks = Arc::clone(&self.machine);

        let handler = dptree::entry()
            .branch(
                Update::filter_callback_query()
                    .endpoint(move |bot: Bot, q: CallbackQuery| {
                        let machine = Arc::clone(&machine_for_callbacks);
                        async move { handle_callback(bot, q, machine).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let machine = Arc::clone(&machine_for_commands);
                        info!(chat_id = %msg.chat.id, "Command matched: {:?}", cmd);
                        async move { handle_command(bot, msg, cmd, machine).await }
                    }),
            );

        info!("Bot is running! Send /start to begin.");

        Dispatcher::builder(self.bot.clone(), handler)
            .default_handler(|upd| async move {
                debug!("Unhandled update: {:?}", upd);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        if shutdown_tx.send(true).is_err() {
            debug!("Broadcast poller already stopped");
        }
        if let Some(task) = poller_task {
            if let Err(e) = task.await {
                warn!(error = %e, "Broadcast poller task failed");
            }
        }
        self.gateway.close().await;

        info!("Bot stopped");
        Ok(())
    }
}
