use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Identity of a token on a specific chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenKey {
    pub chain_id: String,
    pub token_address: String,
}

impl TokenKey {
    pub fn new(chain_id: impl Into<String>, token_address: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            token_address: token_address.into(),
        }
    }

    /// Build a key from optional feed fields. Empty strings count as missing.
    pub fn from_fields(chain_id: Option<&str>, token_address: Option<&str>) -> Option<Self> {
        match (chain_id, token_address) {
            (Some(chain), Some(token)) if !chain.is_empty() && !token.is_empty() => {
                Some(Self::new(chain, token))
            }
            _ => None,
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.token_address, self.chain_id)
    }
}

// ── Feed records ───────────────────────────────────────────────────
//
// Every field is optional and decoded on its own: a field of the wrong type
// reads as absent instead of rejecting the record. Records missing their
// identity are skipped by the detector.

fn lenient<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(de)?;
    Ok(T::deserialize(value).ok())
}

fn lenient_text<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(value_text(&Value::deserialize(de)?))
}

fn lenient_number<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    Ok(as_number(&Value::deserialize(de)?))
}

/// Millisecond timestamp from an integer, float or numeric string; 0 if unusable.
fn lenient_millis<'de, D: Deserializer<'de>>(de: D) -> Result<i64, D::Error> {
    Ok(as_number(&Value::deserialize(de)?)
        .filter(|n| n.is_finite())
        .map(|n| n.trunc() as i64)
        .unwrap_or(0))
}

/// One entry of `/ads/latest/v1`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub chain_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub token_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub duration_hours: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
}

/// One entry of `/token-profiles/latest/v1`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub chain_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub token_address: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub header: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub open_graph: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub links: Option<Vec<Value>>,
}

impl ProfileRecord {
    /// Best available image: openGraph, then header, then icon.
    pub fn best_image(&self) -> Option<&str> {
        [&self.open_graph, &self.header, &self.icon]
            .into_iter()
            .filter_map(|img| img.as_deref())
            .find(|img| !img.is_empty())
    }

    /// Social links that decode cleanly and carry a URL.
    pub fn social_links(&self) -> Vec<SocialLink> {
        self.links
            .iter()
            .flatten()
            .filter_map(|v| SocialLink::deserialize(v).ok())
            .filter(|link| link.url.as_deref().is_some_and(|u| !u.is_empty()))
            .collect()
    }
}

/// One entry of `/token-boosts/latest/v1`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub chain_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub token_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_amount: Option<f64>,
}

/// Body of `/orders/v1/{chain}/{token}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrdersResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub orders: Option<Vec<Value>>,
}

/// One paid order for a token.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub order_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub payment_timestamp: i64,
}

/// A social link attached to a token profile.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SocialLink {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
}

/// Cached per-token profile metadata used to decorate alerts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileMeta {
    pub image_url: Option<String>,
    pub links: Vec<SocialLink>,
}

// ── Enrichment ─────────────────────────────────────────────────────

/// Current market data for a token, taken from its first trading pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenInfo {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub price_usd: Option<f64>,
    pub market_cap: Option<f64>,
}

impl TokenInfo {
    /// Parse a `/tokens/v1/{chain}/{token}` response.
    ///
    /// Anything other than a non-empty array of pair objects yields an empty
    /// record. Market cap falls back to FDV when missing or zero.
    pub fn from_pairs(body: &Value, token_address: &str) -> Self {
        let Some(pair) = body.as_array().and_then(|pairs| pairs.first()) else {
            return Self::default();
        };
        let base = pair.get("baseToken");
        let text = |field: &str| {
            base.and_then(|b| b.get(field))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let name = text("name").unwrap_or_else(|| short_address(token_address));
        let market_cap = pair
            .get("marketCap")
            .and_then(as_number)
            .filter(|mc| *mc != 0.0)
            .or_else(|| pair.get("fdv").and_then(as_number));

        Self {
            name: Some(name),
            symbol: text("symbol"),
            price_usd: pair.get("priceUsd").and_then(as_number),
            market_cap,
        }
    }
}

/// Read a JSON number or a numeric string as `f64`.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Render a JSON scalar for display. Null, arrays and objects have no text.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First 8 characters of an address followed by an ellipsis.
pub fn short_address(address: &str) -> String {
    let head: String = address.chars().take(8).collect();
    format!("{head}...")
}

// ── Events ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Ad,
    Profile,
    Boost,
    Order,
}

impl EventKind {
    pub fn label(self) -> &'static str {
        match self {
            EventKind::Ad => "AD",
            EventKind::Profile => "PROFILE",
            EventKind::Boost => "BOOST",
            EventKind::Order => "ORDER",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            EventKind::Ad => "📢",
            EventKind::Profile => "📝",
            EventKind::Boost => "🚀",
            EventKind::Order => "💰",
        }
    }
}

/// A banner ad seen for the first time.
#[derive(Debug, Clone, PartialEq)]
pub struct AdEvent {
    pub key: TokenKey,
    pub date: Option<String>,
    pub duration_hours: Option<String>,
    pub url: Option<String>,
}

/// A token profile seen for the first time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileEvent {
    pub key: TokenKey,
    pub description: Option<String>,
    pub url: Option<String>,
}

/// A boost total that rose above the previously stored total.
#[derive(Debug, Clone, PartialEq)]
pub struct BoostEvent {
    pub key: TokenKey,
    /// Size of the latest individual boost, as reported by the feed.
    pub amount: Option<f64>,
    pub total: f64,
    /// Stored total before this event (0 when the token was unseen).
    pub previous: f64,
}

impl BoostEvent {
    pub fn delta(&self) -> f64 {
        self.total - self.previous
    }
}

/// A paid order newer than both process start and the last reported order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvent {
    pub key: TokenKey,
    pub order_type: String,
    pub status: String,
    pub paid_at_ms: i64,
    /// Last reported payment timestamp for the token (0 when none).
    pub previous_paid_at_ms: i64,
}

/// A change detected in one of the polled feeds.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketEvent {
    Ad(AdEvent),
    Profile(ProfileEvent),
    Boost(BoostEvent),
    Order(OrderEvent),
}

impl MarketEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MarketEvent::Ad(_) => EventKind::Ad,
            MarketEvent::Profile(_) => EventKind::Profile,
            MarketEvent::Boost(_) => EventKind::Boost,
            MarketEvent::Order(_) => EventKind::Order,
        }
    }

    pub fn key(&self) -> &TokenKey {
        match self {
            MarketEvent::Ad(e) => &e.key,
            MarketEvent::Profile(e) => &e.key,
            MarketEvent::Boost(e) => &e.key,
            MarketEvent::Order(e) => &e.key,
        }
    }
}
