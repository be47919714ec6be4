//! Telegram Bot API client: alert delivery and inbound updates.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::TelegramConfig;
use crate::format::Alert;

/// How an alert reached the chat, if it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Sent as a photo with caption.
    Photo,
    /// Sent as a plain text message (directly or after a photo failure).
    Text,
    /// Both attempts failed; the alert was dropped.
    Dropped,
}

/// Envelope returned by every Bot API method.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub text: Option<String>,
    pub chat: Chat,
    pub from: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub username: Option<String>,
    pub first_name: Option<String>,
}

pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
    updates_timeout: Duration,
}

impl TelegramClient {
    pub fn new(
        config: &TelegramConfig,
        api_base: &str,
        request_timeout: Duration,
        updates_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            updates_timeout,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    async fn post(&self, method: &str, payload: serde_json::Value) -> Result<()> {
        let resp = self.http.post(self.method_url(method)).json(&payload).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let description = resp
            .json::<ApiResponse<serde_json::Value>>()
            .await
            .ok()
            .and_then(|r| r.description)
            .unwrap_or_default();
        Err(anyhow!("{method} returned {status} {description}"))
    }

    /// Send a photo by URL with an HTML caption.
    pub async fn send_photo(&self, photo_url: &str, caption: &str) -> Result<()> {
        self.post(
            "sendPhoto",
            json!({
                "chat_id": self.chat_id,
                "photo": photo_url,
                "caption": caption,
                "parse_mode": "HTML",
            }),
        )
        .await
    }

    /// Send an HTML text message.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        self.post(
            "sendMessage",
            json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": false,
            }),
        )
        .await
    }

    /// Send a text message, logging instead of returning failures.
    pub async fn send_text(&self, text: &str) -> Delivery {
        match self.send_message(text).await {
            Ok(()) => Delivery::Text,
            Err(e) => {
                warn!("Telegram send failed: {e:#}");
                Delivery::Dropped
            }
        }
    }

    /// Deliver an alert as photo + caption, falling back once to text.
    pub async fn deliver(&self, alert: &Alert) -> Delivery {
        match self.send_photo(&alert.image_url, &alert.caption).await {
            Ok(()) => Delivery::Photo,
            Err(e) => {
                debug!("Telegram photo send failed, falling back to text: {e:#}");
                self.send_text(&alert.caption).await
            }
        }
    }

    /// Fetch pending updates starting at `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        let mut req = self
            .http
            .get(self.method_url("getUpdates"))
            .timeout(self.updates_timeout);
        if let Some(offset) = offset {
            req = req.query(&[("offset", offset)]);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("getUpdates returned {status}"));
        }
        let body: ApiResponse<Vec<Update>> = resp.json().await?;
        if !body.ok {
            return Err(anyhow!(
                "getUpdates not ok: {}",
                body.description.unwrap_or_default()
            ));
        }
        Ok(body.result.unwrap_or_default())
    }

    /// Confirm every update below `offset` as consumed.
    pub async fn acknowledge(&self, offset: i64) -> Result<()> {
        let resp = self
            .http
            .get(self.method_url("getUpdates"))
            .timeout(self.updates_timeout)
            .query(&[("offset", offset)])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("getUpdates ack returned {status}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::FakeServer;

    const TOKEN: &str = "123:abc";

    async fn client(server: &FakeServer) -> TelegramClient {
        let config = TelegramConfig::from_values(Some(TOKEN.into()), Some("-1001".into())).unwrap();
        TelegramClient::new(
            &config,
            &server.base_url,
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn alert() -> Alert {
        Alert {
            caption: "<b>🚀 BOOST ALERT</b>".to_string(),
            image_url: "https://img/chart.png".to_string(),
        }
    }

    fn ok() -> String {
        r#"{"ok":true,"result":{}}"#.to_string()
    }

    #[tokio::test]
    async fn photo_delivery_succeeds() {
        let server = FakeServer::start(vec![("/bot123:abc/sendPhoto", 200, ok())]).await;
        let tg = client(&server).await;
        assert_eq!(tg.deliver(&alert()).await, Delivery::Photo);

        let reqs = server.requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].method, "POST");
        let body: serde_json::Value = serde_json::from_str(&reqs[0].body).unwrap();
        assert_eq!(body["chat_id"], "-1001");
        assert_eq!(body["photo"], "https://img/chart.png");
        assert_eq!(body["parse_mode"], "HTML");
    }

    #[tokio::test]
    async fn photo_failure_falls_back_to_text_once() {
        let server = FakeServer::start(vec![
            (
                "/bot123:abc/sendPhoto",
                400,
                r#"{"ok":false,"description":"Bad Request: wrong file identifier"}"#.to_string(),
            ),
            ("/bot123:abc/sendMessage", 200, ok()),
        ])
        .await;
        let tg = client(&server).await;
        assert_eq!(tg.deliver(&alert()).await, Delivery::Text);
        assert_eq!(server.count("/bot123:abc/sendPhoto"), 1);
        assert_eq!(server.count("/bot123:abc/sendMessage"), 1);

        let text_req = server
            .requests()
            .into_iter()
            .find(|r| r.path.ends_with("sendMessage"))
            .unwrap();
        let body: serde_json::Value = serde_json::from_str(&text_req.body).unwrap();
        assert_eq!(body["text"], "<b>🚀 BOOST ALERT</b>");
    }

    #[tokio::test]
    async fn both_failures_drop_the_alert() {
        let server = FakeServer::start(vec![]).await;
        let tg = client(&server).await;
        assert_eq!(tg.deliver(&alert()).await, Delivery::Dropped);
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn updates_are_decoded() {
        let body = r#"{"ok":true,"result":[
            {"update_id":10,"message":{"text":"/status","chat":{"id":42,"type":"private","first_name":"Ann"}}},
            {"update_id":11}
        ]}"#;
        let server = FakeServer::start(vec![("/bot123:abc/getUpdates", 200, body.to_string())]).await;
        let tg = client(&server).await;
        let updates = tg.get_updates(Some(5)).await.unwrap();
        assert_eq!(updates.len(), 2);
        let msg = updates[0].message.as_ref().unwrap();
        assert_eq!(msg.text.as_deref(), Some("/status"));
        assert_eq!(msg.chat.id, 42);
        assert!(updates[1].message.is_none());
        let reqs = server.requests();
        assert_eq!(reqs[0].method, "GET");
        assert_eq!(reqs[0].query, "offset=5");
    }

    #[tokio::test]
    async fn updates_not_ok_is_an_error() {
        let body = r#"{"ok":false,"description":"Unauthorized"}"#;
        let server = FakeServer::start(vec![("/bot123:abc/getUpdates", 200, body.to_string())]).await;
        let tg = client(&server).await;
        assert!(tg.get_updates(None).await.is_err());
    }
}
