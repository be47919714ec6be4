use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use dexscreener_monitor::config::{AppConfig, CONFIG_PATH, TelegramConfig};
use dexscreener_monitor::monitor::Monitor;
use dexscreener_monitor::{ADS_PATH, BOOSTS_PATH, PROFILES_PATH};

#[derive(Parser)]
#[command(name = "dexmonitor", about = "DexScreener ads, profiles, boosts and orders monitor")]
struct Args {
    /// Settings file. Missing default file means built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the sleep between poll cycles, in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Print alerts to the console only, even if Telegram is configured
    #[arg(long)]
    console_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_or_default(&PathBuf::from(CONFIG_PATH))?,
    };
    if let Some(ms) = args.poll_interval_ms {
        config.settings.poll_interval_ms = ms;
    }

    let telegram = if args.console_only {
        None
    } else {
        TelegramConfig::from_env()
    };

    println!("\n🤖 DexScreener Monitor Bot");
    println!("{}", "=".repeat(70));
    println!("📊 Monitoring:");
    println!("   • Banner Ads ({ADS_PATH})");
    println!("   • Token Profiles ({PROFILES_PATH})");
    println!("   • Token Boosts ({BOOSTS_PATH})");
    println!("   • Paid Orders (/orders/v1)");
    println!("🌐 All chains supported");
    println!("🔄 Poll interval: {}ms", config.settings.poll_interval_ms);
    match &telegram {
        Some(tg) => println!("📱 Telegram: Connected (Chat ID: {})", tg.chat_id),
        None => println!("📱 Telegram: Not configured"),
    }
    println!("{}", "=".repeat(70));

    let mut monitor = Monitor::new(config.settings, telegram.as_ref())?;
    info!(
        "Starting monitor (telegram: {})",
        if monitor.telegram_enabled() { "on" } else { "off" }
    );
    monitor.send_startup_message().await;
    monitor.initialize().await;

    println!("\n⏳ Monitoring for new events...\n");
    monitor.run().await;
    Ok(())
}
