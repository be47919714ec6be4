pub mod api;
pub mod commands;
pub mod config;
pub mod detector;
pub mod format;
pub mod monitor;
pub mod reporter;
pub mod state;
pub mod telegram;
pub mod types;

#[cfg(test)]
mod test_server;

/// DexScreener public API base URL (no auth required)
pub const DEX_API_BASE: &str = "https://api.dexscreener.com";

/// DexScreener web front-end, used for deep links in alerts
pub const DEX_WEB_BASE: &str = "https://dexscreener.com";

/// Static image host for low-resolution token thumbnails
pub const DEX_IMAGE_BASE: &str = "https://dd.dexscreener.com/ds-data/tokens";

/// Telegram Bot API base URL
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

pub const ADS_PATH: &str = "/ads/latest/v1";
pub const PROFILES_PATH: &str = "/token-profiles/latest/v1";
pub const BOOSTS_PATH: &str = "/token-boosts/latest/v1";
