//! Anthropic Messages API gateway

use async_trait::async_trait;
use tracing::{debug, error};

use super::{GatewayOptions, ModelGateway};
use crate::{
    errors::{Result, SdkError},
    types::{MessagesRequest, MessagesResponse, Turn},
};

/// Gateway issuing one `POST /v1/messages` per call
#[derive(Clone)]
pub struct AnthropicGateway {
    client: reqwest::Client,
    api_key: String,
    options: GatewayOptions,
}

impl std::fmt::Debug for AnthropicGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicGateway")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl AnthropicGateway {
    /// Build a gateway; fails when the key is empty or the HTTP client
    /// cannot be constructed
    pub fn new(api_key: impl Into<String>, options: GatewayOptions) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SdkError::ConfigError("API key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            options,
        })
    }

    /// Options this gateway was built with
    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.options.base_url.trim_end_matches('/'))
    }

    fn build_request(&self, turns: &[Turn], system_prompt: Option<&str>) -> MessagesRequest {
        MessagesRequest {
            model: self.options.model.clone(),
            max_tokens: self.options.max_tokens,
            messages: turns
                .iter()
                .filter(|turn| !turn.role.is_system())
                .cloned()
                .collect(),
            system: system_prompt
                .filter(|prompt| !prompt.is_empty())
                .map(String::from),
        }
    }
}

#[async_trait]
impl ModelGateway for AnthropicGateway {
    async fn generate(&self, turns: &[Turn], system_prompt: Option<&str>) -> Result<String> {
        let request = self.build_request(turns, system_prompt);
        debug!(
            "Calling model {} with {} messages",
            request.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.options.api_version)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Model API error: {} - {}", status, body);
            return Err(SdkError::api_status(status.as_u16(), body));
        }

        let body: MessagesResponse = response.json().await?;
        if let Some(usage) = body.usage {
            debug!(
                "Model usage: {} input / {} output tokens",
                usage.input_tokens, usage.output_tokens
            );
        }

        body.first_text()
            .map(String::from)
            .ok_or_else(|| SdkError::unexpected_response("text content block", "no text content"))
    }
}
