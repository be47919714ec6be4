//! Human-readable rendering of detected events.

use chrono::DateTime;
use url::Url;

use crate::types::{EventKind, MarketEvent, ProfileMeta, SocialLink, TokenInfo, TokenKey};
use crate::{DEX_API_BASE, DEX_IMAGE_BASE, DEX_WEB_BASE};

const RULE: &str = "━━━━━━━━━━━━━━━━━";

/// Social links shown per alert.
const MAX_SOCIAL_LINKS: usize = 5;

/// Description characters kept in a Telegram caption.
const MAX_DESCRIPTION_CHARS: usize = 200;

const CHART_WIDTH: u32 = 800;
const CHART_HEIGHT: u32 = 450;

/// A rendered alert ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// HTML-formatted message body.
    pub caption: String,
    pub image_url: String,
}

// ── Numbers ────────────────────────────────────────────────────────

/// Insert `,` every three digits of an unsigned digit string.
fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Group the integer part of a plain decimal string, keeping sign and
/// fraction as they are.
fn group_decimal(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    match unsigned.split_once('.') {
        Some((int, frac)) => format!("{sign}{}.{frac}", group_digits(int)),
        None => format!("{sign}{}", group_digits(unsigned)),
    }
}

/// Format a USD price.
///
/// Prices of 1 or more get two decimals with thousands separators. Smaller
/// prices are rounded to 8 decimals and trailing zeros are trimmed.
pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(p) if p.is_finite() => {
            if p >= 1.0 {
                group_decimal(&format!("{p:.2}"))
            } else {
                let fixed = format!("{p:.8}");
                fixed.trim_end_matches('0').trim_end_matches('.').to_string()
            }
        }
        _ => "N/A".to_string(),
    }
}

/// Format a market cap as a grouped whole number, truncating any fraction.
pub fn format_market_cap(market_cap: Option<f64>) -> String {
    match market_cap {
        Some(mc) if mc.is_finite() => group_decimal(&format!("{:.0}", mc.trunc() + 0.0)),
        _ => "N/A".to_string(),
    }
}

/// Format a boost quantity, dropping the fraction for whole numbers.
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{amount:.0}")
    } else {
        format!("{amount}")
    }
}

/// Render a millisecond timestamp as `YYYY-MM-DD HH:MM:SS UTC`, or the raw
/// number if it is out of range.
pub fn format_paid_at(paid_at_ms: i64) -> String {
    match DateTime::from_timestamp_millis(paid_at_ms) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => paid_at_ms.to_string(),
    }
}

// ── Text ───────────────────────────────────────────────────────────

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// First `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Title-case a single word, e.g. `twitter` → `Twitter`.
fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn social_icon(kind: &str) -> &'static str {
    match kind.to_lowercase().as_str() {
        "twitter" => "𝕏",
        "telegram" => "✈️",
        "discord" => "💬",
        "website" => "🌐",
        "reddit" => "🔴",
        _ => "🔗",
    }
}

/// Display name and optional symbol for an enriched token.
pub fn token_title(token: &TokenInfo) -> (String, Option<String>) {
    let name = token.name.clone().unwrap_or_else(|| "Unknown".to_string());
    (name, token.symbol.clone().filter(|s| !s.is_empty()))
}

// ── Links and images ───────────────────────────────────────────────

pub fn dexscreener_url(key: &TokenKey) -> String {
    format!("{DEX_WEB_BASE}/{}/{}", key.chain_id, key.token_address)
}

/// Full-size chart image with explicit dimensions.
pub fn chart_image_url(key: &TokenKey) -> Option<String> {
    let base = format!(
        "{DEX_API_BASE}/token-chart-img/{}/{}",
        key.chain_id, key.token_address
    );
    Url::parse_with_params(
        &base,
        &[("w", CHART_WIDTH.to_string()), ("h", CHART_HEIGHT.to_string())],
    )
    .ok()
    .map(String::from)
}

/// Low-resolution token thumbnail.
pub fn thumbnail_url(key: &TokenKey) -> String {
    format!("{DEX_IMAGE_BASE}/{}/{}.png", key.chain_id, key.token_address)
}

/// Pick the alert image: cached profile image, then chart, then thumbnail.
///
/// The chart URL is built for every well-formed key, so the thumbnail is only
/// reached when the key cannot form a URL at all.
pub fn select_image(key: &TokenKey, profile: Option<&ProfileMeta>) -> String {
    profile
        .and_then(|p| p.image_url.clone())
        .or_else(|| chart_image_url(key))
        .unwrap_or_else(|| thumbnail_url(key))
}

// ── Alerts ─────────────────────────────────────────────────────────

fn push_kind_fields(lines: &mut Vec<String>, event: &MarketEvent) {
    match event {
        MarketEvent::Ad(ad) => {
            if let Some(duration) = &ad.duration_hours {
                lines.push(format!("⏱️ Duration: <b>{} hours</b>", escape_html(duration)));
            }
            if let Some(date) = &ad.date {
                lines.push(format!("📅 Started: {}", escape_html(date)));
            }
        }
        MarketEvent::Boost(boost) => {
            if let Some(amount) = boost.amount {
                lines.push(format!("⚡ New Boost: <b>{}</b>", format_amount(amount)));
            }
            lines.push(format!("📈 Total Boosts: <b>{}</b>", format_amount(boost.total)));
        }
        MarketEvent::Order(order) => {
            lines.push(format!("📋 Order Type: <b>{}</b>", escape_html(&order.order_type)));
            lines.push(format!("✅ Status: <b>{}</b>", escape_html(&order.status)));
            lines.push(format!("🕐 Paid: {}", format_paid_at(order.paid_at_ms)));
        }
        MarketEvent::Profile(profile) => {
            if let Some(description) = &profile.description {
                lines.push(String::new());
                lines.push(format!(
                    "📄 Description: {}",
                    escape_html(&truncate_chars(description, MAX_DESCRIPTION_CHARS))
                ));
            }
        }
    }
}

fn push_social_links(lines: &mut Vec<String>, links: &[SocialLink]) {
    let rendered: Vec<String> = links
        .iter()
        .filter_map(|link| {
            let url = link.url.as_deref().filter(|u| !u.is_empty())?;
            let kind = link.kind.as_deref().unwrap_or("link");
            let label = link.label.clone().unwrap_or_else(|| title_case(kind));
            Some(format!(
                "  {} <a href='{}'>{}</a>",
                social_icon(kind),
                escape_html(url),
                escape_html(&label)
            ))
        })
        .take(MAX_SOCIAL_LINKS)
        .collect();
    if rendered.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push("🔗 <b>Socials:</b>".to_string());
    lines.extend(rendered);
}

/// Render an event as a Telegram HTML caption plus the image to attach.
pub fn render_alert(event: &MarketEvent, token: &TokenInfo, profile: Option<&ProfileMeta>) -> Alert {
    let kind: EventKind = event.kind();
    let key = event.key();
    let (name, symbol) = token_title(token);

    let mut lines = vec![
        format!("<b>{} {} ALERT</b>", kind.emoji(), kind.label()),
        String::new(),
        RULE.to_string(),
    ];

    let symbol_part = symbol
        .map(|s| format!(" ({})", escape_html(&s)))
        .unwrap_or_default();
    lines.push(format!("💎 <b>{}</b>{symbol_part}", escape_html(&name)));
    lines.push(format!("⛓️ Chain: <b>{}</b>", escape_html(&key.chain_id.to_uppercase())));
    if token.price_usd.is_some() {
        lines.push(format!("💰 Price: <b>${}</b>", format_price(token.price_usd)));
    }
    if token.market_cap.is_some_and(|mc| mc != 0.0) {
        lines.push(format!("📊 Market Cap: <b>${}</b>", format_market_cap(token.market_cap)));
    }
    lines.push(String::new());

    push_kind_fields(&mut lines, event);
    if let Some(meta) = profile {
        push_social_links(&mut lines, &meta.links);
    }

    lines.push(String::new());
    lines.push("📍 <b>Contract (tap to copy):</b>".to_string());
    lines.push(format!("<code>{}</code>", escape_html(&key.token_address)));
    lines.push(String::new());
    lines.push(format!(
        "🔗 <a href='{}'>View on DexScreener</a>",
        escape_html(&dexscreener_url(key))
    ));
    lines.push(RULE.to_string());

    Alert {
        caption: lines.join("\n"),
        image_url: select_image(key, profile),
    }
}
