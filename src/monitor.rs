//! The polling driver: fetch → detect → enrich → notify, once per cycle.

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use crate::api::{DexClient, FetchOutcome};
use crate::commands::CommandListener;
use crate::config::{SettingsConfig, TelegramConfig};
use crate::detector::{
    detect_ads, detect_boosts, detect_orders, detect_profiles, seed_ads, seed_boosts,
    seed_orders, seed_profiles,
};
use crate::format::render_alert;
use crate::reporter::{report_alert, report_exit_summary, report_status};
use crate::state::MonitorState;
use crate::telegram::{Delivery, TelegramClient};
use crate::types::MarketEvent;

const STARTUP_MESSAGE: &str =
    "🟢 <b>Bot Started!</b>\n\nDexScreener Monitor is now active and watching for new events.";

/// Which periodic tasks run on a given poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclePlan {
    pub commands: bool,
    pub orders: bool,
    pub status: bool,
}

impl CyclePlan {
    /// `poll` is the 1-based cycle number after incrementing.
    pub fn for_poll(poll: u64, settings: &SettingsConfig) -> Self {
        let due = |every: u64| every > 0 && poll % every == 0;
        Self {
            commands: due(settings.commands_every),
            orders: due(settings.orders_every),
            status: due(settings.status_every),
        }
    }
}

pub struct Monitor {
    dex: DexClient,
    telegram: Option<TelegramClient>,
    listener: CommandListener,
    state: MonitorState,
    settings: SettingsConfig,
}

impl Monitor {
    /// Build the monitor. Telegram is disabled when `telegram` is `None`.
    pub fn new(settings: SettingsConfig, telegram: Option<&TelegramConfig>) -> Result<Self> {
        let request_timeout = Duration::from_secs(settings.request_timeout_secs);
        let dex = DexClient::new(&settings.dex_api_base, request_timeout)?;
        let telegram = telegram
            .map(|cfg| {
                TelegramClient::new(
                    cfg,
                    &settings.telegram_api_base,
                    request_timeout,
                    Duration::from_secs(settings.updates_timeout_secs),
                )
            })
            .transpose()?;
        Ok(Self {
            dex,
            telegram,
            listener: CommandListener::new(),
            state: MonitorState::new(Utc::now()),
            settings,
        })
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn telegram_enabled(&self) -> bool {
        self.telegram.is_some()
    }

    /// Count a failed fetch and hand back the payload, if any.
    fn record(&mut self, outcome: FetchOutcome) -> Option<Value> {
        if outcome.is_failed() {
            self.state.stats.errors += 1;
        }
        outcome.into_data()
    }

    pub async fn send_startup_message(&self) {
        if let Some(telegram) = &self.telegram {
            telegram.send_text(STARTUP_MESSAGE).await;
        }
    }

    // ── Startup ────────────────────────────────────────────────────

    /// Record everything currently live as already seen, so only changes
    /// from here on are announced.
    pub async fn initialize(&mut self) {
        println!("\n🔄 Initializing...");

        let outcome = self.dex.fetch_ads().await;
        if let Some(ads) = self.record(outcome) {
            let n = seed_ads(&mut self.state, &ads);
            println!("✅ Found {n} active ads");
        }

        let outcome = self.dex.fetch_profiles().await;
        if let Some(profiles) = self.record(outcome) {
            let n = seed_profiles(&mut self.state, &profiles);
            println!("✅ Found {n} token profiles");
        }

        let outcome = self.dex.fetch_boosts().await;
        if let Some(boosts) = self.record(outcome) {
            seed_boosts(&mut self.state, &boosts);
            println!("✅ Found {} tokens with boosts", self.state.boosted_token_count());
        }

        println!("✅ Tracking {} tokens for new orders", self.state.known_token_count());
        for key in self.state.known_tokens_snapshot() {
            let outcome = self.dex.fetch_orders(&key).await;
            if let Some(body) = self.record(outcome) {
                seed_orders(&mut self.state, &key, &body);
            }
        }
        info!(
            "Initialized: {} ads, {} profiles, {} boosted, {} tokens tracked",
            self.state.seen_ad_count(),
            self.state.seen_profile_count(),
            self.state.boosted_token_count(),
            self.state.known_token_count()
        );
    }

    // ── Polling ────────────────────────────────────────────────────

    /// One full poll. Never fails: fetch errors are counted and the feed is
    /// treated as unchanged for this cycle.
    pub async fn run_cycle(&mut self) {
        self.state.stats.polls += 1;
        let plan = CyclePlan::for_poll(self.state.stats.polls, &self.settings);

        if plan.commands {
            if let Some(telegram) = &self.telegram {
                self.listener.poll(telegram, &self.state.stats).await;
            }
        }

        let outcome = self.dex.fetch_ads().await;
        if let Some(ads) = self.record(outcome) {
            let events = detect_ads(&mut self.state, &ads);
            self.announce_all(events).await;
        }

        let outcome = self.dex.fetch_profiles().await;
        if let Some(profiles) = self.record(outcome) {
            let events = detect_profiles(&mut self.state, &profiles);
            self.announce_all(events).await;
        }

        let outcome = self.dex.fetch_boosts().await;
        if let Some(boosts) = self.record(outcome) {
            let events = detect_boosts(&mut self.state, &boosts);
            self.announce_all(events).await;
        }

        if plan.orders {
            self.check_orders().await;
        }

        if plan.status {
            report_status(&self.state.stats);
        }
    }

    async fn check_orders(&mut self) {
        let tokens = self.state.known_tokens_snapshot();
        debug!("Checking orders for {} tokens", tokens.len());
        for key in tokens {
            let outcome = self.dex.fetch_orders(&key).await;
            if let Some(body) = self.record(outcome) {
                let events = detect_orders(&mut self.state, &key, &body);
                self.announce_all(events).await;
            }
        }
    }

    async fn announce_all(&mut self, events: Vec<MarketEvent>) {
        for event in events {
            self.announce(&event).await;
        }
    }

    /// Enrich an event, print it and deliver it to Telegram if configured.
    async fn announce(&mut self, event: &MarketEvent) -> Option<Delivery> {
        let (token, outcome) = self.dex.fetch_token_info(event.key()).await;
        self.record(outcome);

        report_alert(event, &token);

        let telegram = self.telegram.as_ref()?;
        let alert = render_alert(event, &token, self.state.profile_meta(event.key()));
        let delivery = telegram.deliver(&alert).await;
        debug!("{} alert for {} delivered as {delivery:?}", event.kind().label(), event.key());
        Some(delivery)
    }

    /// Poll until interrupted, then print the final counters.
    pub async fn run(&mut self) {
        self.run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    }

    /// Poll until `shutdown` resolves, then print the final counters.
    ///
    /// `shutdown` lives across all cycles and is checked at the sleep point,
    /// so a signal that arrives mid-cycle stops the loop right after it.
    pub async fn run_until(&mut self, shutdown: impl Future<Output = ()>) {
        let interval = Duration::from_millis(self.settings.poll_interval_ms);
        info!(
            "Entering polling loop (interval: {}ms). Press Ctrl+C to stop.",
            self.settings.poll_interval_ms
        );
        tokio::pin!(shutdown);

        // First poll registers the signal listener before any cycle runs.
        let mut stop = tokio::select! {
            biased;
            _ = &mut shutdown => true,
            _ = std::future::ready(()) => false,
        };
        while !stop {
            self.run_cycle().await;
            stop = tokio::select! {
                _ = &mut shutdown => true,
                _ = tokio::time::sleep(interval) => false,
            };
        }
        info!("Shutdown signal received");
        report_exit_summary(&self.state.stats);
    }
}
