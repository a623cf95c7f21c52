// HTTP device bridge - reqwest client for the serial bridge's REST API
use crate::application::device_bridge::{DeviceBridge, SetpointCommand};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpBridge {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBridge {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build bridge HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<()> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send POST {} to bridge", path))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Bridge POST {} failed with status {}: {}", path, status, body);
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceBridge for HttpBridge {
    async fn read(&self) -> Result<Value> {
        let response = self
            .client
            .get(self.url("/read"))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send GET /read to bridge")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Bridge read failed with status {}: {}", status, body);
        }

        response
            .json::<Value>()
            .await
            .context("Failed to parse bridge read response")
    }

    async fn set(&self, command: SetpointCommand) -> Result<()> {
        let body = serde_json::to_value(command).context("Failed to encode setpoint")?;
        self.post("/set", &body).await
    }

    async fn toggle(&self, on: bool) -> Result<()> {
        self.post("/toggle", &json!({ "on": on })).await
    }

    async fn feedback(&self) -> Result<()> {
        self.post("/feedback", &json!({})).await
    }
}
