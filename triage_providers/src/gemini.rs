//! Gemini `generateContent` client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::info;

use triage_core::{LLMProvider, Message, Role};

use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        info!("Creating GeminiProvider");
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Gemini speaks "user"/"model"; the patient is the user.
    const fn wire_role(role: Role) -> &'static str {
        match role {
            Role::Patient => "user",
            Role::Clinician => "model",
        }
    }

    fn build_request(system_instruction: &str, history: &[Message]) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = history
            .iter()
            .map(|msg| {
                json!({
                    "role": Self::wire_role(msg.role),
                    "parts": [{"text": msg.content}],
                })
            })
            .collect();

        json!({
            "systemInstruction": {"parts": [{"text": system_instruction}]},
            "contents": contents,
        })
    }

    async fn try_send(&self, model: &str, request: &serde_json::Value) -> anyhow::Result<String> {
        let response = self
            .client
            .post(format!(
                "{}/models/{model}:generateContent",
                self.base_url
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        let text = response["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing candidate text"))?
            .to_string();

        Ok(text)
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn generate(
        &self,
        model: &str,
        system_instruction: &str,
        history: &[Message],
    ) -> anyhow::Result<String> {
        let request = Self::build_request(system_instruction, history);

        info!("Sending request to Gemini API: model={model}");

        // Exponential backoff: 2s, 4s, 8s, then a final attempt.
        let reply = retry_with_backoff(|| self.try_send(model, &request), &[2, 4, 8]).await?;

        info!("Received response from Gemini API");
        Ok(reply)
    }

    fn default_model(&self) -> &'static str {
        DEFAULT_MODEL
    }
}
