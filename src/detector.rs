//! Snapshot-vs-state change detection.
//!
//! Every function here is pure with respect to I/O: it takes a decoded feed
//! payload and the monitor state, updates the state, and returns the events
//! that should be announced. Fetching, enrichment and delivery live elsewhere.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::state::MonitorState;
use crate::types::{
    AdEvent, AdRecord, BoostEvent, BoostRecord, MarketEvent, OrderEvent, OrderRecord,
    OrdersResponse, ProfileEvent, ProfileRecord, TokenKey,
};

/// Decode each element of a JSON array payload, skipping elements that do not
/// fit `T`. Non-array payloads yield nothing.
fn records<T: DeserializeOwned>(feed: &Value) -> impl Iterator<Item = T> + '_ {
    feed.as_array()
        .into_iter()
        .flatten()
        .filter_map(|v| T::deserialize(v).ok())
}

/// Orders listed in a `{"orders": [...]}` payload, in payload order.
fn order_records(body: &Value) -> Vec<OrderRecord> {
    let Ok(resp) = OrdersResponse::deserialize(body) else {
        return Vec::new();
    };
    resp.orders
        .iter()
        .flatten()
        .filter_map(|v| OrderRecord::deserialize(v).ok())
        .collect()
}

fn key_of(chain_id: &Option<String>, token_address: &Option<String>) -> Option<TokenKey> {
    TokenKey::from_fields(chain_id.as_deref(), token_address.as_deref())
}

/// Cache the profile's best image and social links, last write wins.
fn refresh_profile(state: &mut MonitorState, key: &TokenKey, profile: &ProfileRecord) {
    state.update_profile_meta(key, profile.best_image(), profile.social_links());
}

// ── Live detection ─────────────────────────────────────────────────

/// Banner ads from `/ads/latest/v1`. An ad fires once per (chain, token).
pub fn detect_ads(state: &mut MonitorState, feed: &Value) -> Vec<MarketEvent> {
    let mut events = Vec::new();
    for ad in records::<AdRecord>(feed) {
        let Some(key) = key_of(&ad.chain_id, &ad.token_address) else {
            continue;
        };
        state.track_token(&key);
        if !state.mark_ad_seen(&key) {
            continue;
        }
        state.stats.ads_detected += 1;
        info!("New ad: {key}");
        events.push(MarketEvent::Ad(AdEvent {
            key,
            date: ad.date,
            duration_hours: ad.duration_hours,
            url: ad.url,
        }));
    }
    events
}

/// Token profiles from `/token-profiles/latest/v1`.
///
/// Profile metadata is refreshed for every valid record, including ones that
/// were already announced.
pub fn detect_profiles(state: &mut MonitorState, feed: &Value) -> Vec<MarketEvent> {
    let mut events = Vec::new();
    for profile in records::<ProfileRecord>(feed) {
        let Some(key) = key_of(&profile.chain_id, &profile.token_address) else {
            continue;
        };
        state.track_token(&key);
        refresh_profile(state, &key, &profile);
        if !state.mark_profile_seen(&key) {
            continue;
        }
        state.stats.profiles_detected += 1;
        info!("New profile: {key}");
        events.push(MarketEvent::Profile(ProfileEvent {
            key,
            description: profile.description.filter(|d| !d.is_empty()),
            url: profile.url,
        }));
    }
    events
}

/// Token boosts from `/token-boosts/latest/v1`. Fires whenever a token's
/// total strictly exceeds the stored total.
pub fn detect_boosts(state: &mut MonitorState, feed: &Value) -> Vec<MarketEvent> {
    let mut events = Vec::new();
    for boost in records::<BoostRecord>(feed) {
        let (Some(key), Some(total)) = (key_of(&boost.chain_id, &boost.token_address), boost.total_amount)
        else {
            continue;
        };
        state.track_token(&key);
        let Some(previous) = state.raise_boost(&key.token_address, total) else {
            continue;
        };
        state.stats.boosts_detected += 1;
        info!("New boost: {key} - total {total} (previous {previous})");
        events.push(MarketEvent::Boost(BoostEvent {
            key,
            amount: boost.amount,
            total,
            previous,
        }));
    }
    events
}

/// Paid orders for one token from `/orders/v1/{chain}/{token}`.
///
/// Orders are evaluated in payload order. An order fires only if it was paid
/// at or after process start and after the last reported order for the token.
pub fn detect_orders(state: &mut MonitorState, key: &TokenKey, body: &Value) -> Vec<MarketEvent> {
    let mut events = Vec::new();
    for order in order_records(body) {
        let Some(previous) = state.advance_order(&key.token_address, order.payment_timestamp)
        else {
            continue;
        };
        state.stats.orders_detected += 1;
        let order_type = order.order_type.unwrap_or_else(|| "unknown".to_string());
        info!("New order: {key} - type {order_type}");
        events.push(MarketEvent::Order(OrderEvent {
            key: key.clone(),
            order_type,
            status: order.status.unwrap_or_else(|| "unknown".to_string()),
            paid_at_ms: order.payment_timestamp,
            previous_paid_at_ms: previous,
        }));
    }
    events
}

// ── Startup seeding ────────────────────────────────────────────────
//
// Seeding records whatever is already live as seen so that only changes
// after startup are announced. Returns the number of valid records.

pub fn seed_ads(state: &mut MonitorState, feed: &Value) -> usize {
    let mut count = 0;
    for ad in records::<AdRecord>(feed) {
        if let Some(key) = key_of(&ad.chain_id, &ad.token_address) {
            state.mark_ad_seen(&key);
            state.track_token(&key);
            count += 1;
        }
    }
    count
}

pub fn seed_profiles(state: &mut MonitorState, feed: &Value) -> usize {
    let mut count = 0;
    for profile in records::<ProfileRecord>(feed) {
        if let Some(key) = key_of(&profile.chain_id, &profile.token_address) {
            state.mark_profile_seen(&key);
            state.track_token(&key);
            refresh_profile(state, &key, &profile);
            count += 1;
        }
    }
    count
}

/// Zero totals are not recorded, matching the "unseen" default of 0.
pub fn seed_boosts(state: &mut MonitorState, feed: &Value) -> usize {
    let mut count = 0;
    for boost in records::<BoostRecord>(feed) {
        let (Some(key), Some(total)) = (key_of(&boost.chain_id, &boost.token_address), boost.total_amount)
        else {
            continue;
        };
        if total == 0.0 {
            continue;
        }
        state.raise_boost(&key.token_address, total);
        state.track_token(&key);
        count += 1;
    }
    count
}

/// Record the newest existing payment timestamp for a token, including orders
/// paid before startup, without emitting events.
pub fn seed_orders(state: &mut MonitorState, key: &TokenKey, body: &Value) {
    let newest = order_records(body)
        .iter()
        .map(|o| o.payment_timestamp)
        .filter(|ts| *ts != 0)
        .max();
    if let Some(ts) = newest {
        debug!("Seeded latest order for {key} at {ts}");
        state.seed_order(&key.token_address, ts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn new_state() -> MonitorState {
        MonitorState::new(start())
    }

    fn boosts_feed(token: &str, amount: f64, total: f64) -> Value {
        json!([{
            "chainId": "solana",
            "tokenAddress": token,
            "amount": amount,
            "totalAmount": total
        }])
    }

    fn orders_body(timestamps: &[i64]) -> Value {
        let orders: Vec<Value> = timestamps
            .iter()
            .map(|ts| {
                json!({
                    "type": "tokenProfile",
                    "status": "approved",
                    "paymentTimestamp": ts
                })
            })
            .collect();
        json!({ "orders": orders })
    }

    // ── ads ────────────────────────────────────────────────────────

    #[test]
    fn ad_fires_on_first_occurrence_only() {
        let mut state = new_state();
        let feed = json!([{
            "chainId": "solana",
            "tokenAddress": "abc",
            "date": "2026-03-01T12:00:00Z",
            "durationHours": 24,
            "url": "https://dexscreener.com/solana/abc"
        }]);

        let first = detect_ads(&mut state, &feed);
        assert_eq!(first.len(), 1);
        match &first[0] {
            MarketEvent::Ad(ad) => {
                assert_eq!(ad.key, TokenKey::new("solana", "abc"));
                assert_eq!(ad.duration_hours.as_deref(), Some("24"));
                assert_eq!(ad.date.as_deref(), Some("2026-03-01T12:00:00Z"));
            }
            other => panic!("expected ad event, got {other:?}"),
        }

        assert!(detect_ads(&mut state, &feed).is_empty());
        assert_eq!(state.stats.ads_detected, 1);
    }

    #[test]
    fn ad_identity_includes_chain() {
        let mut state = new_state();
        let feed = json!([
            {"chainId": "solana", "tokenAddress": "abc"},
            {"chainId": "bsc", "tokenAddress": "abc"}
        ]);
        assert_eq!(detect_ads(&mut state, &feed).len(), 2);
    }

    #[test]
    fn records_missing_identity_are_skipped() {
        let mut state = new_state();
        let feed = json!([
            {"chainId": "solana"},
            {"tokenAddress": "abc"},
            {"chainId": "", "tokenAddress": "abc"},
            {"chainId": 7, "tokenAddress": "abc"},
            {"chainId": "solana", "tokenAddress": "good"}
        ]);
        let events = detect_ads(&mut state, &feed);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key().token_address, "good");
        assert_eq!(state.known_token_count(), 1);
    }

    #[test]
    fn non_array_payload_is_a_no_op() {
        let mut state = new_state();
        assert!(detect_ads(&mut state, &json!({"error": "rate limited"})).is_empty());
        assert!(detect_profiles(&mut state, &Value::Null).is_empty());
        assert!(detect_boosts(&mut state, &json!("oops")).is_empty());
        assert_eq!(state.known_token_count(), 0);
    }

    #[test]
    fn failed_fetch_matches_empty_list() {
        let mut failed = new_state();
        let mut empty = new_state();
        // A failed fetch is handed to detectors as no payload at all.
        let failed_events = detect_ads(&mut failed, &Value::Null);
        let empty_events = detect_ads(&mut empty, &json!([]));
        assert_eq!(failed_events, empty_events);
        assert_eq!(failed.known_token_count(), empty.known_token_count());
    }

    // ── profiles ───────────────────────────────────────────────────

    #[test]
    fn profile_fires_once_but_metadata_refreshes() {
        let mut state = new_state();
        let key = TokenKey::new("solana", "abc");
        let first = json!([{
            "chainId": "solana",
            "tokenAddress": "abc",
            "description": "A token",
            "header": "https://img/header-1.png",
            "links": [{"type": "twitter", "url": "https://x.com/abc"}]
        }]);
        let second = json!([{
            "chainId": "solana",
            "tokenAddress": "abc",
            "header": "https://img/header-2.png"
        }]);

        let events = detect_profiles(&mut state, &first);
        assert_eq!(events.len(), 1);
        assert_eq!(
            state.profile_meta(&key).and_then(|m| m.image_url.as_deref()),
            Some("https://img/header-1.png")
        );

        assert!(detect_profiles(&mut state, &second).is_empty());
        let meta = state.profile_meta(&key).unwrap();
        assert_eq!(meta.image_url.as_deref(), Some("https://img/header-2.png"));
        assert_eq!(meta.links.len(), 1);
        assert_eq!(state.stats.profiles_detected, 1);
        assert_eq!(state.stats.orders_detected, 0);
    }

    #[test]
    fn profile_registers_known_token() {
        let mut state = new_state();
        let feed = json!([{"chainId": "base", "tokenAddress": "0x1"}]);
        seed_profiles(&mut state, &feed);
        assert!(detect_profiles(&mut state, &feed).is_empty());
        assert!(state.is_tracked(&TokenKey::new("base", "0x1")));
    }

    // ── boosts ─────────────────────────────────────────────────────

    #[test]
    fn boost_sequence_fires_on_increases() {
        let mut state = new_state();
        let totals = [5.0, 5.0, 12.0, 12.0, 20.0];
        let mut fired = Vec::new();
        for (i, total) in totals.iter().enumerate() {
            for event in detect_boosts(&mut state, &boosts_feed("abc", 1.0, *total)) {
                match event {
                    MarketEvent::Boost(b) => fired.push((i, b.total, b.previous, b.delta())),
                    other => panic!("expected boost event, got {other:?}"),
                }
            }
        }
        assert_eq!(
            fired,
            vec![
                (0, 5.0, 0.0, 5.0),
                (2, 12.0, 5.0, 7.0),
                (4, 20.0, 12.0, 8.0),
            ]
        );
        assert_eq!(state.stats.boosts_detected, 3);
    }

    #[test]
    fn boost_decrease_is_ignored_but_token_tracked() {
        let mut state = new_state();
        seed_boosts(&mut state, &boosts_feed("abc", 10.0, 50.0));
        assert!(detect_boosts(&mut state, &boosts_feed("abc", 10.0, 40.0)).is_empty());
        assert_eq!(state.boost_total("abc"), 50.0);
        assert!(state.is_tracked(&TokenKey::new("solana", "abc")));
    }

    #[test]
    fn boost_without_total_is_skipped() {
        let mut state = new_state();
        let feed = json!([{"chainId": "solana", "tokenAddress": "abc", "amount": 10}]);
        assert!(detect_boosts(&mut state, &feed).is_empty());
        assert_eq!(state.known_token_count(), 0);
    }

    // ── orders ─────────────────────────────────────────────────────

    #[test]
    fn order_before_start_never_fires() {
        let mut state = new_state();
        let key = TokenKey::new("solana", "abc");
        let before = state.started_at_ms() - 60_000;
        assert!(detect_orders(&mut state, &key, &orders_body(&[before])).is_empty());
        assert!(detect_orders(&mut state, &key, &orders_body(&[before])).is_empty());
    }

    #[test]
    fn two_orders_after_start_fire_in_sequence() {
        let mut state = new_state();
        let key = TokenKey::new("solana", "abc");
        let t1 = state.started_at_ms() + 1_000;
        let t2 = t1 + 5_000;

        let events = detect_orders(&mut state, &key, &orders_body(&[t1, t2]));
        assert_eq!(events.len(), 2);
        match (&events[0], &events[1]) {
            (MarketEvent::Order(first), MarketEvent::Order(second)) => {
                assert_eq!(first.paid_at_ms, t1);
                assert_eq!(first.previous_paid_at_ms, 0);
                assert_eq!(second.paid_at_ms, t2);
                assert_eq!(second.previous_paid_at_ms, t1);
                assert_eq!(second.order_type, "tokenProfile");
                assert_eq!(second.status, "approved");
            }
            other => panic!("expected two order events, got {other:?}"),
        }

        assert!(detect_orders(&mut state, &key, &orders_body(&[t1, t2])).is_empty());
        assert_eq!(state.stats.orders_detected, 2);
    }

    #[test]
    fn seeded_orders_do_not_fire() {
        let mut state = new_state();
        let key = TokenKey::new("solana", "abc");
        let existing = state.started_at_ms() + 10;
        seed_orders(&mut state, &key, &orders_body(&[existing - 20, existing]));
        assert_eq!(state.last_order_ms("abc"), existing);
        assert!(detect_orders(&mut state, &key, &orders_body(&[existing])).is_empty());
    }

    #[test]
    fn orders_missing_fields_default() {
        let mut state = new_state();
        let key = TokenKey::new("solana", "abc");
        let ts = state.started_at_ms() + 1;
        let body = json!({"orders": [{"paymentTimestamp": ts}, {"type": "x"}]});
        let events = detect_orders(&mut state, &key, &body);
        assert_eq!(events.len(), 1);
        match &events[0] {
            MarketEvent::Order(o) => {
                assert_eq!(o.order_type, "unknown");
                assert_eq!(o.status, "unknown");
            }
            other => panic!("expected order event, got {other:?}"),
        }
    }

    #[test]
    fn orders_body_not_an_object() {
        let mut state = new_state();
        let key = TokenKey::new("solana", "abc");
        assert!(detect_orders(&mut state, &key, &json!([1, 2, 3])).is_empty());
        seed_orders(&mut state, &key, &Value::Null);
        assert_eq!(state.last_order_ms("abc"), 0);
    }

    // ── loosely typed fields ───────────────────────────────────────

    #[test]
    fn wrong_typed_fields_do_not_drop_records() {
        let mut state = new_state();

        let ads = json!([{"chainId": "bsc", "tokenAddress": "0xad", "date": 1767225600, "url": 7}]);
        let events = detect_ads(&mut state, &ads);
        assert_eq!(events.len(), 1);
        match &events[0] {
            MarketEvent::Ad(ad) => {
                assert_eq!(ad.date.as_deref(), Some("1767225600"));
                assert_eq!(ad.url, None);
            }
            other => panic!("expected ad event, got {other:?}"),
        }

        let profiles = json!([{
            "chainId": "solana",
            "tokenAddress": "prof",
            "links": {"twitter": "https://x.com/prof"},
            "header": false,
            "description": "real"
        }]);
        assert_eq!(detect_profiles(&mut state, &profiles).len(), 1);
        assert!(state.is_tracked(&TokenKey::new("solana", "prof")));

        let boosts = json!([{"chainId": "base", "tokenAddress": "0xbo", "amount": "10", "totalAmount": "50"}]);
        let events = detect_boosts(&mut state, &boosts);
        assert_eq!(events.len(), 1);
        match &events[0] {
            MarketEvent::Boost(b) => {
                assert_eq!(b.amount, Some(10.0));
                assert_eq!(b.total, 50.0);
            }
            other => panic!("expected boost event, got {other:?}"),
        }
        assert!(state.is_tracked(&TokenKey::new("base", "0xbo")));

        let key = TokenKey::new("base", "0xbo");
        let paid = state.started_at_ms() as f64 + 1_500.5;
        let body = json!({"orders": [{"type": 3, "status": null, "paymentTimestamp": paid}]});
        let events = detect_orders(&mut state, &key, &body);
        assert_eq!(events.len(), 1);
        match &events[0] {
            MarketEvent::Order(o) => {
                assert_eq!(o.paid_at_ms, state.started_at_ms() + 1_500);
                assert_eq!(o.order_type, "3");
                assert_eq!(o.status, "unknown");
            }
            other => panic!("expected order event, got {other:?}"),
        }
    }

    // ── seeding ────────────────────────────────────────────────────

    #[test]
    fn seeding_suppresses_existing_records() {
        let mut state = new_state();
        let ads = json!([{"chainId": "solana", "tokenAddress": "a"}]);
        let profiles = json!([{"chainId": "solana", "tokenAddress": "p", "icon": "i.png"}]);
        let boosts = boosts_feed("b", 10.0, 10.0);

        assert_eq!(seed_ads(&mut state, &ads), 1);
        assert_eq!(seed_profiles(&mut state, &profiles), 1);
        assert_eq!(seed_boosts(&mut state, &boosts), 1);
        assert_eq!(state.known_token_count(), 3);

        assert!(detect_ads(&mut state, &ads).is_empty());
        assert!(detect_profiles(&mut state, &profiles).is_empty());
        assert!(detect_boosts(&mut state, &boosts).is_empty());
        assert_eq!(
            state
                .profile_meta(&TokenKey::new("solana", "p"))
                .and_then(|m| m.image_url.as_deref()),
            Some("i.png")
        );
    }

    #[test]
    fn seeding_skips_zero_boost_totals() {
        let mut state = new_state();
        assert_eq!(seed_boosts(&mut state, &boosts_feed("b", 0.0, 0.0)), 0);
        assert_eq!(state.boosted_token_count(), 0);
        assert!(!state.is_tracked(&TokenKey::new("solana", "b")));
    }
}
