use crate::config::HttpChannelConfig;
use crate::domain::model::CanonicalPhone;
use crate::domain::ports::{MessageSender, SendError};
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

const ERROR_BODY_LIMIT: usize = 200;

#[derive(Serialize)]
struct SendPayload<'a> {
    to: &'a str,
    body: &'a str,
}

/// Delivers each message as a JSON `POST` to an SMS gateway endpoint.
#[derive(Debug, Clone)]
pub struct HttpSender {
    client: Client,
    endpoint: String,
    headers: HashMap<String, String>,
}

impl HttpSender {
    pub fn new(config: &HttpChannelConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint.clone(),
            headers: config.headers.clone(),
        })
    }
}

#[async_trait]
impl MessageSender for HttpSender {
    async fn send(&self, to: &CanonicalPhone, body: &str) -> std::result::Result<(), SendError> {
        let mut request = self.client.post(&self.endpoint).json(&SendPayload {
            to: to.as_str(),
            body,
        });

        // 添加自定義標頭
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        let status = response.status();
        tracing::debug!("Gateway responded {} for {}", status, to);
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(SendError::Rejected {
            status: status.as_u16(),
            body: text.chars().take(ERROR_BODY_LIMIT).collect(),
        })
    }
}
