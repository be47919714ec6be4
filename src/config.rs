use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{DEX_API_BASE, TELEGRAM_API_BASE};

/// Default settings file path. Optional: all settings have defaults.
pub const CONFIG_PATH: &str = "config.toml";

pub const BOT_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
pub const CHAT_ID_VAR: &str = "TELEGRAM_CHAT_ID";

/// Top-level application config deserialized from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// Runtime settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsConfig {
    /// Sleep between poll cycles, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Check Telegram commands every N cycles.
    #[serde(default = "default_commands_every")]
    pub commands_every: u64,
    /// Poll per-token orders every N cycles.
    #[serde(default = "default_orders_every")]
    pub orders_every: u64,
    /// Print the status line every N cycles.
    #[serde(default = "default_status_every")]
    pub status_every: u64,
    /// Timeout for DexScreener and outbound Telegram requests.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Timeout for Telegram `getUpdates` calls.
    #[serde(default = "default_updates_timeout_secs")]
    pub updates_timeout_secs: u64,
    #[serde(default = "default_dex_api_base")]
    pub dex_api_base: String,
    #[serde(default = "default_telegram_api_base")]
    pub telegram_api_base: String,
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_commands_every() -> u64 {
    3
}

fn default_orders_every() -> u64 {
    5
}

fn default_status_every() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_updates_timeout_secs() -> u64 {
    5
}

fn default_dex_api_base() -> String {
    DEX_API_BASE.to_string()
}

fn default_telegram_api_base() -> String {
    TELEGRAM_API_BASE.to_string()
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            commands_every: default_commands_every(),
            orders_every: default_orders_every(),
            status_every: default_status_every(),
            request_timeout_secs: default_request_timeout_secs(),
            updates_timeout_secs: default_updates_timeout_secs(),
            dex_api_base: default_dex_api_base(),
            telegram_api_base: default_telegram_api_base(),
        }
    }
}

impl AppConfig {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(contents)?;
        config.settings.normalize();
        Ok(config)
    }
}

impl SettingsConfig {
    /// Cadences of zero would divide by zero in the cycle schedule.
    fn normalize(&mut self) {
        for every in [
            &mut self.commands_every,
            &mut self.orders_every,
            &mut self.status_every,
        ] {
            *every = (*every).max(1);
        }
    }
}

/// Telegram credentials. Outbound messaging is enabled only when both are set.
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl TelegramConfig {
    /// Read `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`.
    pub fn from_env() -> Option<Self> {
        Self::from_values(
            std::env::var(BOT_TOKEN_VAR).ok(),
            std::env::var(CHAT_ID_VAR).ok(),
        )
    }

    pub fn from_values(bot_token: Option<String>, chat_id: Option<String>) -> Option<Self> {
        let bot_token = bot_token?.trim().to_string();
        let chat_id = chat_id?.trim().to_string();
        if bot_token.is_empty() || chat_id.is_empty() {
            return None;
        }
        Some(Self { bot_token, chat_id })
    }
}

/// Replace every `NAME=...` line in dotenv `contents`, or append one if none
/// exists. Other lines are kept verbatim.
pub fn upsert_env_var(contents: &str, name: &str, value: &str) -> String {
    let prefix = format!("{name}=");
    let mut found = false;
    let mut out: Vec<String> = contents
        .lines()
        .map(|line| {
            if line.trim_start().starts_with(&prefix) {
                found = true;
                format!("{name}={value}")
            } else {
                line.to_string()
            }
        })
        .collect();
    if !found {
        out.push(format!("{name}={value}"));
    }
    let mut joined = out.join("\n");
    joined.push('\n');
    joined
}

/// Set `name=value` in the dotenv file at `path`, creating it if needed.
pub fn write_env_var(path: &Path, name: &str, value: &str) -> Result<()> {
    let contents = if path.exists() {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    } else {
        String::new()
    };
    std::fs::write(path, upsert_env_var(&contents, name, value))
        .with_context(|| format!("failed to write {}", path.display()))
}
