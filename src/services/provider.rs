use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Boundary to the vision/text model: prompt and image in, raw text out.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn call(&self, prompt: &str, image: &[u8]) -> Result<String, ProviderError>;
}

/// Client for a Cloudflare Workers AI vision model.
pub struct WorkersAiClient {
    http: Client,
    account_id: String,
    api_token: String,
    model: String,
}

#[derive(Serialize)]
struct VisionRequest<'a> {
    image: String,
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct VisionResponse {
    result: VisionResult,
}

#[derive(Deserialize)]
struct VisionResult {
    description: String,
}

impl WorkersAiClient {
    pub fn new(account_id: &str, api_token: &str, model: &str) -> Self {
        Self {
            http: Client::new(),
            account_id: account_id.to_string(),
            api_token: api_token.to_string(),
            model: model.to_string(),
        }
    }

    fn url(&self) -> String {
        format!(
            "https://api.cloudflare.com/client/v4/accounts/{}/ai/run/{}",
            self.account_id, self.model
        )
    }
}

#[async_trait]
impl ProviderClient for WorkersAiClient {
    async fn call(&self, prompt: &str, image: &[u8]) -> Result<String, ProviderError> {
        let request_body = VisionRequest {
            image: base64::engine::general_purpose::STANDARD.encode(image),
            prompt,
            max_tokens: 1024,
        };

        let response = self
            .http
            .post(self.url())
            .bearer_auth(&self.api_token)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        let envelope: VisionResponse = serde_json::from_slice(&body)?;
        Ok(envelope.result.description)
    }
}

/// Errors from the external AI provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode provider envelope: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ProviderError {
    /// Network faults, rate limiting, timeouts and server errors are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http(_) => true,
            ProviderError::Api { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            ProviderError::Decode(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_includes_account_and_model() {
        let client = WorkersAiClient::new("acct", "token", "@cf/llava-hf/llava-1.5-7b-hf");
        assert_eq!(
            client.url(),
            "https://api.cloudflare.com/client/v4/accounts/acct/ai/run/@cf/llava-hf/llava-1.5-7b-hf"
        );
    }

    #[test]
    fn test_envelope_decoding() {
        let envelope: VisionResponse = serde_json::from_str(
            r#"{"result":{"description":"{\"confidence\":0.9}"},"success":true,"errors":[]}"#,
        )
        .unwrap();
        assert_eq!(envelope.result.description, r#"{"confidence":0.9}"#);
    }

    #[test]
    fn test_transient_statuses() {
        let api = |status| ProviderError::Api {
            status,
            message: String::new(),
        };
        assert!(api(408).is_transient());
        assert!(api(429).is_transient());
        assert!(api(502).is_transient());
        assert!(!api(400).is_transient());
        assert!(!api(401).is_transient());
    }
}
