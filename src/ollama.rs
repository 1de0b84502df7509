use anyhow::{Context, Result};
use async_trait::async_trait;

/// Generation provider boundary: a health probe plus one-shot text
/// completion. The reference deployment talks to a local Ollama daemon.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn healthy(&self) -> bool;
    async fn generate(&self, prompt: &str) -> Result<String>;
    /// Human-readable endpoint for error messages.
    fn endpoint(&self) -> String;
}

pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
        })
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn healthy(&self) -> bool {
        let health = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await;
        matches!(health, Ok(resp) if resp.status().is_success())
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request_body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": 0.8,
                "num_predict": 1024,
            }
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request_body)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama error ({}): {}", status, error_body);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(body
            .get("response")
            .and_then(|r| r.as_str())
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    fn endpoint(&self) -> String {
        self.base_url.clone()
    }
}
