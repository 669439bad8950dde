//! Stormwatch bot binary.
//!
//! Start the bot with:
//! ```bash
//! WEATHER_API_KEY=xxx TELEGRAM_BOT_TOKEN=xxx cargo run -p stormwatch-telegram
//! ```

use std::path::PathBuf;

use clap::Parser;
use stormwatch_core::{config, StormwatchConfig};
use stormwatch_telegram::StormwatchBot;
use tracing_subscriber::EnvFilter;

/// Stormwatch - weather and thunderstorm alerts in Telegram
#[derive(Parser, Debug)]
#[command(name = "stormwatch")]
#[command(about = "Telegram weather bot with thunderstorm alerts")]
struct Args {
    /// Locations file (TOML with [[central]] and [[east]] points)
    #[arg(short, long, env = "STORMWATCH_LOCATIONS")]
    locations: Option<PathBuf>,

    /// Do not broadcast thunderstorm notices to the channel
    #[arg(long)]
    no_broadcast: bool,

    /// Run one broadcast sweep and exit
    #[arg(long, conflicts_with = "no_broadcast")]
    sweep_once: bool,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from the state directory first
    let env_path = config::env_file();
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    }
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = match args.verbose {
        0 => "stormwatch_telegram=info,stormwatch_weather=info,stormwatch_core=info,teloxide=warn",
        1 => "stormwatch_telegram=debug,stormwatch_weather=debug,stormwatch_core=debug,teloxide=info",
        2 => "stormwatch_telegram=trace,stormwatch_weather=trace,stormwatch_core=trace,teloxide=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut settings = StormwatchConfig::from_env()?;
    if let Some(path) = args.locations {
        settings.locations_path = Some(path);
    }
    let book = settings.location_book()?;

    let bot = StormwatchBot::new(&settings, book, !args.no_broadcast)?;

    if args.sweep_once {
        let report = bot.sweep_once().await?;
        tracing::info!(
            checked = report.checked,
            alerted = report.alerted,
            failed = report.failed,
            "Sweep complete"
        );
        return Ok(());
    }

    match bot.get_me().await {
        Ok(username) => {
            tracing::info!(username = %username, "Bot initialized successfully");
            println!("\nStormwatch");
            println!("   Bot: @{}", username);
            println!(
                "   Broadcast: {}",
                if bot.broadcast_enabled() { "on" } else { "off" }
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to get bot info");
            return Err(e.into());
        }
    }

    println!("\nOpen Telegram and send /start to begin");
    println!("   Press Ctrl+C to stop\n");

    bot.run().await?;

    Ok(())
}
