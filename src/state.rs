use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::types::{ProfileMeta, SocialLink, TokenKey};

/// Counters for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct RunStats {
    pub started_at: DateTime<Utc>,
    pub polls: u64,
    pub ads_detected: u64,
    pub profiles_detected: u64,
    pub boosts_detected: u64,
    pub orders_detected: u64,
    pub errors: u64,
}

impl RunStats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            polls: 0,
            ads_detected: 0,
            profiles_detected: 0,
            boosts_detected: 0,
            orders_detected: 0,
            errors: 0,
        }
    }

    /// Whole seconds elapsed since `started_at`.
    pub fn runtime_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds().max(0)
    }
}

/// Everything the monitor remembers between polls.
///
/// All dedup state lives here and is lost on restart. The accessors are the
/// only way to mutate it and they enforce the monotonic rules: seen sets and
/// `known_tokens` only grow, boost totals and order timestamps only rise.
pub struct MonitorState {
    pub stats: RunStats,
    seen_ads: HashSet<TokenKey>,
    seen_profiles: HashSet<TokenKey>,
    /// Token address → highest boost total observed.
    seen_boosts: HashMap<String, f64>,
    /// Token address → latest payment timestamp (ms) reported.
    seen_orders: HashMap<String, i64>,
    known_tokens: BTreeSet<TokenKey>,
    profiles: HashMap<TokenKey, ProfileMeta>,
}

impl MonitorState {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            stats: RunStats::new(started_at),
            seen_ads: HashSet::new(),
            seen_profiles: HashSet::new(),
            seen_boosts: HashMap::new(),
            seen_orders: HashMap::new(),
            known_tokens: BTreeSet::new(),
            profiles: HashMap::new(),
        }
    }

    /// Process start in milliseconds since the epoch.
    pub fn started_at_ms(&self) -> i64 {
        self.stats.started_at.timestamp_millis()
    }

    // ── Known tokens ───────────────────────────────────────────────

    /// Register a token for order polling. Never removed afterwards.
    pub fn track_token(&mut self, key: &TokenKey) {
        if !self.known_tokens.contains(key) {
            self.known_tokens.insert(key.clone());
        }
    }

    pub fn is_tracked(&self, key: &TokenKey) -> bool {
        self.known_tokens.contains(key)
    }

    pub fn known_token_count(&self) -> usize {
        self.known_tokens.len()
    }

    /// Owned copy of the known-token set, safe to iterate while the state is
    /// mutated.
    pub fn known_tokens_snapshot(&self) -> Vec<TokenKey> {
        self.known_tokens.iter().cloned().collect()
    }

    // ── Ads and profiles ───────────────────────────────────────────

    /// Mark an ad as seen. Returns `true` the first time a key is seen.
    pub fn mark_ad_seen(&mut self, key: &TokenKey) -> bool {
        self.seen_ads.insert(key.clone())
    }

    pub fn seen_ad_count(&self) -> usize {
        self.seen_ads.len()
    }

    /// Mark a profile as seen. Returns `true` the first time a key is seen.
    pub fn mark_profile_seen(&mut self, key: &TokenKey) -> bool {
        self.seen_profiles.insert(key.clone())
    }

    pub fn seen_profile_count(&self) -> usize {
        self.seen_profiles.len()
    }

    /// Refresh cached profile metadata. Each field present in the new
    /// observation replaces the cached one; absent fields leave it untouched.
    pub fn update_profile_meta(
        &mut self,
        key: &TokenKey,
        image_url: Option<&str>,
        links: Vec<SocialLink>,
    ) {
        if image_url.is_none() && links.is_empty() {
            return;
        }
        let meta = self.profiles.entry(key.clone()).or_default();
        if let Some(url) = image_url {
            meta.image_url = Some(url.to_string());
        }
        if !links.is_empty() {
            meta.links = links;
        }
    }

    pub fn profile_meta(&self, key: &TokenKey) -> Option<&ProfileMeta> {
        self.profiles.get(key)
    }

    // ── Boosts ─────────────────────────────────────────────────────

    /// Raise the stored boost total for a token.
    ///
    /// Returns the previous total (0 when unseen) if `total` is strictly
    /// greater than it, otherwise `None` and the state is unchanged.
    pub fn raise_boost(&mut self, token_address: &str, total: f64) -> Option<f64> {
        let previous = self.boost_total(token_address);
        if total <= previous {
            return None;
        }
        self.seen_boosts.insert(token_address.to_string(), total);
        Some(previous)
    }

    pub fn boost_total(&self, token_address: &str) -> f64 {
        self.seen_boosts.get(token_address).copied().unwrap_or(0.0)
    }

    pub fn boosted_token_count(&self) -> usize {
        self.seen_boosts.len()
    }

    // ── Orders ─────────────────────────────────────────────────────

    /// Advance the last reported order timestamp for a token.
    ///
    /// Orders paid before process start never qualify. Returns the previously
    /// reported timestamp (0 when none) if `paid_at_ms` is newer, otherwise
    /// `None`.
    pub fn advance_order(&mut self, token_address: &str, paid_at_ms: i64) -> Option<i64> {
        if paid_at_ms < self.started_at_ms() {
            return None;
        }
        let previous = self.last_order_ms(token_address);
        if paid_at_ms <= previous {
            return None;
        }
        self.seen_orders.insert(token_address.to_string(), paid_at_ms);
        Some(previous)
    }

    /// Record a pre-existing order timestamp without the start-time rule.
    /// Used only while seeding at startup.
    pub fn seed_order(&mut self, token_address: &str, paid_at_ms: i64) {
        let entry = self.seen_orders.entry(token_address.to_string()).or_insert(0);
        *entry = (*entry).max(paid_at_ms);
    }

    pub fn last_order_ms(&self, token_address: &str) -> i64 {
        self.seen_orders.get(token_address).copied().unwrap_or(0)
    }
}
