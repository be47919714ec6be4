//! Probe: DexScreener public feeds
//!
//! Hits each latest-feed endpoint once and documents:
//! - HTTP status and latency
//! - Record count and a sample record
//! - Field names present on the sample
//!
//! Then probes the per-token orders and pairs endpoints for the first token
//! seen, printing the parsed market data.

use std::time::{Duration, Instant};

use anyhow::Result;
use serde_json::Value;

use dexscreener_monitor::api::DexClient;
use dexscreener_monitor::types::{TokenInfo, TokenKey};
use dexscreener_monitor::{ADS_PATH, BOOSTS_PATH, DEX_API_BASE, PROFILES_PATH};

async fn probe(client: &reqwest::Client, url: &str) -> Result<Option<Value>> {
    let start = Instant::now();
    let resp = client.get(url).send().await?;
    let latency = start.elapsed();
    let status = resp.status();
    println!("Status: {status}");
    println!("Latency: {latency:?}");
    if !status.is_success() {
        return Ok(None);
    }
    let body: Value = resp.json().await?;
    Ok(Some(body))
}

fn describe(body: &Value) -> Result<()> {
    let sample = match body.as_array() {
        Some(arr) => {
            println!("Record count: {}", arr.len());
            arr.first()
        }
        None => {
            println!("Response is not an array");
            Some(body)
        }
    };
    if let Some(sample) = sample {
        println!("\nSample record:");
        println!("{}", serde_json::to_string_pretty(sample)?);
        if let Some(obj) = sample.as_object() {
            println!("\nFields present:");
            for key in obj.keys() {
                println!("  - {key}");
            }
        }
    }
    Ok(())
}

fn first_token(body: &Value) -> Option<TokenKey> {
    body.as_array()?.iter().find_map(|r| {
        TokenKey::from_fields(
            r.get("chainId").and_then(Value::as_str),
            r.get("tokenAddress").and_then(Value::as_str),
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    println!("=== Probe: DexScreener feeds ===");
    println!("Base: {DEX_API_BASE}");
    println!();

    let mut token = None;
    for (i, (name, path)) in [("Ads", ADS_PATH), ("Token profiles", PROFILES_PATH), ("Token boosts", BOOSTS_PATH)]
        .into_iter()
        .enumerate()
    {
        println!("--- {}. {name} ({path}) ---", i + 1);
        if let Some(body) = probe(&client, &format!("{DEX_API_BASE}{path}")).await? {
            describe(&body)?;
            if token.is_none() {
                token = first_token(&body);
            }
        }
        println!();
    }

    let Some(key) = token else {
        println!("No token found in any feed; skipping per-token probes");
        return Ok(());
    };

    let dex = DexClient::new(DEX_API_BASE, Duration::from_secs(10))?;

    println!("--- 4. Orders for {key} ---");
    if let Some(body) = probe(&client, &dex.orders_url(&key)).await? {
        println!("{}", serde_json::to_string_pretty(&body)?);
    }
    println!();

    println!("--- 5. Pairs for {key} ---");
    if let Some(body) = probe(&client, &dex.token_pairs_url(&key)).await? {
        let count = body.as_array().map(|a| a.len()).unwrap_or(0);
        println!("Pair count: {count}");
        let info = TokenInfo::from_pairs(&body, &key.token_address);
        println!("Parsed: {info:?}");
    }

    println!();
    println!("=== Probe complete ===");
    Ok(())
}
