use std::io::Write;

use chrono::Utc;

use crate::format::{
    format_amount, format_market_cap, format_paid_at, format_price, token_title, truncate_chars,
};
use crate::state::RunStats;
use crate::types::{MarketEvent, TokenInfo};

/// Description characters shown on the console.
const CONSOLE_DESCRIPTION_CHARS: usize = 100;

/// A framed console alert: emoji, title, and `Label: value` lines.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleAlert {
    pub emoji: &'static str,
    pub title: String,
    pub lines: Vec<String>,
}

impl ConsoleAlert {
    pub fn render(&self) -> String {
        let rule = "=".repeat(70);
        let mut out = format!("\n{rule}\n{0} {1} {0}\n{rule}\n", self.emoji, self.title);
        for line in &self.lines {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&rule);
        out.push('\n');
        out
    }
}

/// Build the console view of an event.
pub fn console_alert(event: &MarketEvent, token: &TokenInfo) -> ConsoleAlert {
    let key = event.key();
    let (name, symbol) = token_title(token);
    let token_line = match symbol {
        Some(s) => format!("Token: {name} ({s})"),
        None => format!("Token: {name}"),
    };
    let price = format!("Price: ${}", format_price(token.price_usd));
    let market_cap = format!("Market Cap: ${}", format_market_cap(token.market_cap));

    let (type_line, title) = match event {
        MarketEvent::Ad(_) => ("BANNER AD".to_string(), "NEW AD".to_string()),
        MarketEvent::Profile(_) => ("TOKEN PROFILE".to_string(), "NEW TOKEN PROFILE".to_string()),
        MarketEvent::Boost(_) => ("TOKEN BOOST".to_string(), "NEW BOOST".to_string()),
        MarketEvent::Order(o) => {
            let upper = o.order_type.to_uppercase();
            (format!("PAID ORDER - {upper}"), format!("NEW ORDER - {upper}"))
        }
    };

    let mut lines = vec![
        format!("Type: {type_line}"),
        format!("Chain: {}", key.chain_id),
        token_line,
        format!("Address: {}", key.token_address),
    ];

    match event {
        MarketEvent::Ad(ad) => {
            lines.push(format!("Started: {}", ad.date.as_deref().unwrap_or("N/A")));
            lines.push(format!("Duration: {} hours", ad.duration_hours.as_deref().unwrap_or("N/A")));
            lines.push(price);
            lines.push(market_cap);
            if let Some(url) = &ad.url {
                lines.push(format!("URL: {url}"));
            }
        }
        MarketEvent::Profile(profile) => {
            lines.push(price);
            lines.push(market_cap);
            if let Some(description) = &profile.description {
                lines.push(format!(
                    "Description: {}...",
                    truncate_chars(description, CONSOLE_DESCRIPTION_CHARS)
                ));
            }
            if let Some(url) = &profile.url {
                lines.push(format!("URL: {url}"));
            }
        }
        MarketEvent::Boost(boost) => {
            let amount = boost.amount.map(format_amount).unwrap_or_else(|| "N/A".to_string());
            lines.push(format!("New Boost: {amount} (Total: {})", format_amount(boost.total)));
            if boost.previous > 0.0 {
                lines.push(format!(
                    "Previous: {} (+{})",
                    format_amount(boost.previous),
                    format_amount(boost.delta())
                ));
            }
            lines.push(price);
            lines.push(market_cap);
        }
        MarketEvent::Order(order) => {
            lines.push(format!("Order Type: {}", order.order_type));
            lines.push(format!("Status: {}", order.status));
            lines.push(format!("Paid At: {}", format_paid_at(order.paid_at_ms)));
            if order.previous_paid_at_ms > 0 {
                lines.push(format!("Previous Order: {}", format_paid_at(order.previous_paid_at_ms)));
            }
            lines.push(price);
            lines.push(market_cap);
        }
    }

    ConsoleAlert {
        emoji: event.kind().emoji(),
        title,
        lines,
    }
}

/// Print an alert block to stdout.
pub fn report_alert(event: &MarketEvent, token: &TokenInfo) {
    println!("{}", console_alert(event, token).render());
}

pub fn status_line(stats: &RunStats, runtime_secs: i64) -> String {
    format!(
        "⏱️ {runtime_secs}s | 📊 Polls: {} | 📢 Ads: {} | 📝 Profiles: {} | 🚀 Boosts: {} | 💰 Orders: {} | ⚠️ Errors: {}",
        stats.polls,
        stats.ads_detected,
        stats.profiles_detected,
        stats.boosts_detected,
        stats.orders_detected,
        stats.errors,
    )
}

/// Overwrite the current terminal line with running counters.
pub fn report_status(stats: &RunStats) {
    let line = status_line(stats, stats.runtime_secs(Utc::now()));
    print!("\r{line}");
    let _ = std::io::stdout().flush();
}

/// Print final counters on shutdown.
pub fn report_exit_summary(stats: &RunStats) {
    println!("\n\n✅ Bot stopped!");
    println!(
        "Final stats: Polls: {}, Ads: {}, Profiles: {}, Boosts: {}, Orders: {}, Errors: {}",
        stats.polls,
        stats.ads_detected,
        stats.profiles_detected,
        stats.boosts_detected,
        stats.orders_detected,
        stats.errors,
    );
}
