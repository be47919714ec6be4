//! setup-telegram: find the chat ID for the alert bot.
//!
//! Send any message to your bot first, then run this. Reads the latest update,
//! prints the chat it came from and optionally saves `TELEGRAM_CHAT_ID` to
//! `.env` and sends a confirmation message there.
//!
//! The bot token comes from `--bot-token`, then `TELEGRAM_BOT_TOKEN`, then a
//! hidden prompt.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

use dexscreener_monitor::TELEGRAM_API_BASE;
use dexscreener_monitor::config::{BOT_TOKEN_VAR, CHAT_ID_VAR, TelegramConfig, write_env_var};
use dexscreener_monitor::telegram::TelegramClient;

const TEST_MESSAGE: &str = "✅ <b>Bot setup complete!</b>\n\n\
    I will now monitor DexScreener for:\n\
    • Banner ads\n\
    • Token profiles\n\
    • Token boosts\n\
    • Paid orders\n\n\
    You'll receive alerts here when new events are detected.";

#[derive(Parser)]
#[command(
    name = "setup-telegram",
    about = "Discover the Telegram chat ID and optionally save it to .env"
)]
struct Cli {
    /// Bot token. If omitted, uses TELEGRAM_BOT_TOKEN or prompts (hidden input).
    #[arg(long)]
    bot_token: Option<String>,

    /// Write TELEGRAM_CHAT_ID to the env file
    #[arg(long)]
    write_env: bool,

    /// Env file to update with --write-env
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Send a test message to the discovered chat
    #[arg(long)]
    send_test: bool,
}

fn client(bot_token: &str, chat_id: &str) -> Result<TelegramClient> {
    let config = TelegramConfig {
        bot_token: bot_token.to_string(),
        chat_id: chat_id.to_string(),
    };
    TelegramClient::new(
        &config,
        TELEGRAM_API_BASE,
        Duration::from_secs(10),
        Duration::from_secs(10),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    println!("=== DexScreener Monitor: Telegram Setup ===\n");

    // ── Step 1: Read bot token ─────────────────────────────────────
    let bot_token = match cli.bot_token.or_else(|| std::env::var(BOT_TOKEN_VAR).ok()) {
        Some(token) if !token.trim().is_empty() => token.trim().to_string(),
        _ => {
            let token = rpassword::prompt_password("Enter bot token: ")
                .context("failed to read bot token")?;
            if token.trim().is_empty() {
                bail!("bot token cannot be empty");
            }
            token.trim().to_string()
        }
    };

    // ── Step 2: Fetch latest update ────────────────────────────────
    println!("Checking for Telegram messages...");
    let updates = client(&bot_token, "")?
        .get_updates(None)
        .await
        .context("getUpdates failed, check your bot token")?;
    let Some(message) = updates.iter().rev().find_map(|u| u.message.as_ref()) else {
        println!("  No messages found.");
        println!();
        println!("Please:");
        println!("  1. Open Telegram and search for your bot");
        println!("  2. Send it any message (e.g. 'hi')");
        println!("  3. Run this again");
        bail!("no messages found for this bot");
    };

    let chat = &message.chat;
    let chat_id = chat.id.to_string();
    let username = chat
        .username
        .as_deref()
        .or_else(|| message.from.as_ref().and_then(|u| u.username.as_deref()))
        .unwrap_or("N/A");
    let first_name = chat
        .first_name
        .as_deref()
        .or_else(|| message.from.as_ref().and_then(|u| u.first_name.as_deref()))
        .unwrap_or("N/A");
    println!("  Chat ID:    {chat_id}");
    println!("  Chat type:  {}", chat.kind.as_deref().unwrap_or("unknown"));
    if let Some(title) = &chat.title {
        println!("  Title:      {title}");
    }
    println!("  Username:   {username}");
    println!("  First name: {first_name}");
    println!();

    // ── Step 3: Save chat ID ───────────────────────────────────────
    if cli.write_env {
        println!("Updating {}...", cli.env_file.display());
        write_env_var(&cli.env_file, CHAT_ID_VAR, &chat_id)?;
        println!("  {CHAT_ID_VAR} saved");
        println!();
    }

    // ── Step 4: Send test message ──────────────────────────────────
    if cli.send_test {
        println!("Sending test message...");
        client(&bot_token, &chat_id)?
            .send_message(TEST_MESSAGE)
            .await
            .context("failed to send test message")?;
        println!("  Test message sent");
        println!();
    }

    // ── Summary ────────────────────────────────────────────────────
    println!("=== Setup Complete ===");
    if !cli.write_env {
        println!();
        println!("Add this to your .env file:");
        println!("  {CHAT_ID_VAR}={chat_id}");
    }
    println!();
    println!("Next steps:");
    println!("  cargo run --bin dexmonitor");

    Ok(())
}
