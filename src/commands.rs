//! Telegram command handling: `/start` and `/status`.

use chrono::{DateTime, Utc};

use crate::state::RunStats;
use crate::telegram::{TelegramClient, Update};

const RULE: &str = "━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Status,
}

/// Recognize a command by prefix, so `/start@MyBot` and `/status now` match.
pub fn parse_command(text: &str) -> Option<BotCommand> {
    let text = text.trim_start();
    if text.starts_with("/start") {
        Some(BotCommand::Start)
    } else if text.starts_with("/status") {
        Some(BotCommand::Status)
    } else {
        None
    }
}

pub fn welcome_text() -> String {
    format!(
        "<b>🤖 DexScreener Monitor Bot Active!</b>\n\n\
         {RULE}\n\
         📊 <b>Currently Monitoring:</b>\n\
         • Banner Ads\n\
         • Token Profiles\n\
         • Token Boosts\n\
         • Paid Orders\n\n\
         🌐 <b>All chains supported</b>\n\n\
         ⚡ <b>Features:</b>\n\
         • Real-time alerts with charts\n\
         • Tap-to-copy contract addresses\n\
         • Direct DexScreener links\n\n\
         ✅ <b>Bot is running and will alert you when new events are detected!</b>\n\
         {RULE}"
    )
}

pub fn status_text(stats: &RunStats, now: DateTime<Utc>) -> String {
    format!(
        "<b>📊 Bot Status</b>\n\n\
         ⏱️ Runtime: {}s\n\
         📢 Ads Detected: {}\n\
         📝 Profiles Detected: {}\n\
         🚀 Boosts Detected: {}\n\
         💰 Orders Detected: {}\n\
         📊 Total Polls: {}\n\n\
         ✅ Bot is active and monitoring!",
        stats.runtime_secs(now),
        stats.ads_detected,
        stats.profiles_detected,
        stats.boosts_detected,
        stats.orders_detected,
        stats.polls,
    )
}

/// Canned replies for a batch of updates, in update order.
pub fn replies_for(updates: &[Update], stats: &RunStats, now: DateTime<Utc>) -> Vec<String> {
    updates
        .iter()
        .filter_map(|u| u.message.as_ref()?.text.as_deref())
        .filter_map(parse_command)
        .map(|cmd| match cmd {
            BotCommand::Start => welcome_text(),
            BotCommand::Status => status_text(stats, now),
        })
        .collect()
}

/// Offset that acknowledges every update in the batch.
pub fn next_offset(updates: &[Update]) -> Option<i64> {
    updates.iter().map(|u| u.update_id).max().map(|id| id + 1)
}

/// Tracks the update offset between polls.
///
/// Replies always go to the configured chat, whoever sent the command.
#[derive(Debug, Default)]
pub struct CommandListener {
    next_offset: Option<i64>,
}

impl CommandListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> Option<i64> {
        self.next_offset
    }

    /// Answer any pending commands. Failures are ignored entirely so the
    /// monitor loop never sees them.
    pub async fn poll(&mut self, telegram: &TelegramClient, stats: &RunStats) {
        let Ok(updates) = telegram.get_updates(self.next_offset).await else {
            return;
        };
        for reply in replies_for(&updates, stats, Utc::now()) {
            let _ = telegram.send_message(&reply).await;
        }
        if let Some(offset) = next_offset(&updates) {
            self.next_offset = Some(offset);
            let _ = telegram.acknowledge(offset).await;
        }
    }
}
