use async_trait::async_trait;
use notify_core::{DeliveryResult, PushMessage};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::PushConfig;
use crate::error::HostError;

/// Hands one message to one device token. Failures are reported in the
/// result, never retried.
#[async_trait]
pub trait PushRelay: Send + Sync {
    async fn deliver(&self, message: PushMessage) -> DeliveryResult;
}

/// First characters of a device token, for logs.
pub fn token_preview(token: &str) -> String {
    let head: String = token.chars().take(10).collect();
    if head.len() < token.len() {
        format!("{head}...")
    } else {
        head
    }
}

/// Expo push service client.
pub struct ExpoPushRelay {
    client: Client,
    config: PushConfig,
}

impl ExpoPushRelay {
    pub fn new(config: PushConfig) -> Result<Self, HostError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| HostError::Push(format!("build push client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PushConfig {
        &self.config
    }

    fn valid_token(&self, token: &str) -> bool {
        !token.is_empty() && token.starts_with(&self.config.token_prefix)
    }

    fn prepare(&self, mut message: PushMessage) -> PushMessage {
        message
            .priority
            .get_or_insert_with(|| self.config.priority.clone());
        message
            .channel_id
            .get_or_insert_with(|| self.config.channel_id.clone());
        if message.data.is_null() {
            message.data = Value::Object(Default::default());
        }
        message
    }
}

#[derive(Debug, Deserialize)]
struct ExpoResponse {
    #[serde(default)]
    data: Option<ExpoTicket>,
    #[serde(default)]
    errors: Vec<ExpoError>,
}

#[derive(Debug, Deserialize)]
struct ExpoTicket {
    status: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExpoError {
    #[serde(default)]
    message: String,
}

#[async_trait]
impl PushRelay for ExpoPushRelay {
    async fn deliver(&self, message: PushMessage) -> DeliveryResult {
        let token = message.to.clone();
        if !self.valid_token(&token) {
            warn!(token = %token_preview(&token), "push token rejected");
            return DeliveryResult::invalid_token(token);
        }
        let message = self.prepare(message);

        let resp = match self
            .client
            .post(&self.config.endpoint)
            .header("Accept", "application/json")
            .json(&message)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                warn!(token = %token_preview(&token), "push send failed: {err}");
                return DeliveryResult::failed(token, err.to_string());
            }
        };
        let status = resp.status();
        let body: ExpoResponse = match resp.json().await {
            Ok(body) => body,
            Err(err) => {
                return DeliveryResult::failed(token, format!("status {status}: {err}"));
            }
        };

        if let Some(err) = body.errors.first() {
            return DeliveryResult::failed(token, err.message.clone());
        }
        match body.data {
            Some(ticket) if ticket.status == "ok" => {
                info!(token = %token_preview(&token), "push accepted");
                DeliveryResult::sent(token, ticket.id)
            }
            Some(ticket) => DeliveryResult::failed(
                token,
                ticket.message.unwrap_or_else(|| ticket.status.clone()),
            ),
            None if status.is_success() => DeliveryResult::sent(token, None),
            None => DeliveryResult::failed(token, format!("status {status}")),
        }
    }
}

/// Relay that only logs; used when no push endpoint should be contacted.
#[derive(Debug, Clone, Default)]
pub struct LoggingRelay;

#[async_trait]
impl PushRelay for LoggingRelay {
    async fn deliver(&self, message: PushMessage) -> DeliveryResult {
        info!(
            token = %token_preview(&message.to),
            title = %message.title,
            "push (dry run)"
        );
        DeliveryResult::sent(message.to, None)
    }
}
