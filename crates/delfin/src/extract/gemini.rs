//! Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{CapturedImage, ExtractionError, InferenceClient};
use crate::config::{Config, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::sanitize;

/// Maximum length of a raw error body carried into an error message.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Connection settings for the Gemini API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    /// Base URL, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub endpoint: String,
    pub model: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl GeminiConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }
}

/// Client for the Gemini multimodal endpoint.
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
    api_key: SecretString,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig, api_key: SecretString) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ExtractionError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn request_url(&self) -> Result<Url, ExtractionError> {
        let base = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        Url::parse_with_params(&base, &[("key", self.api_key.expose_secret())])
            .map_err(|e| ExtractionError::Request(format!("Invalid endpoint URL: {}", e)))
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn upstream_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let mut cut = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... (truncated)", &body[..cut])
    } else {
        body.to_string()
    }
}

#[async_trait]
impl InferenceClient for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        image: &CapturedImage,
    ) -> Result<String, ExtractionError> {
        let url = self.request_url()?;
        debug!(
            "POST {} ({} bytes, {})",
            sanitize::redact_api_key(url.as_str()),
            image.bytes().len(),
            image.mime_type()
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: prompt },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type(),
                            data: image.to_base64(),
                        },
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            // reqwest errors embed the URL, which carries the key.
            .map_err(|e| ExtractionError::Request(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExtractionError::Request(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(ExtractionError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&body),
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| ExtractionError::Request(format!("Unexpected response shape: {}", e)))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or(ExtractionError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        let config = GeminiConfig {
            endpoint: format!("{}/v1beta", server.uri()),
            model: "gemini-1.5-flash".to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        };
        GeminiClient::new(config, SecretString::from("test-key")).unwrap()
    }

    fn image() -> CapturedImage {
        CapturedImage::from_bytes(b"hola".to_vec(), "image/jpeg", "pedido.jpg").unwrap()
    }

    #[tokio::test]
    async fn test_sends_prompt_and_inline_image() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{
                    "parts": [
                        {"text": "lee esto"},
                        {"inline_data": {"mime_type": "image/jpeg", "data": "aG9sYQ=="}}
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "{\"orderNumber\": \"PED-1\"}"}]}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server)
            .generate("lee esto", &image())
            .await
            .unwrap();
        assert_eq!(text, "{\"orderNumber\": \"PED-1\"}");
    }

    #[tokio::test]
    async fn test_upstream_error_message_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate("x", &image())
            .await
            .unwrap_err();
        match err {
            ExtractionError::Upstream { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid.");
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body_is_kept() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate("x", &image())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Upstream { status: 503, ref message } if message == "overloaded"
        ));
    }

    #[tokio::test]
    async fn test_no_candidates_is_empty_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate("x", &image())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_timeout_is_a_request_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let config = GeminiConfig {
            endpoint: server.uri(),
            request_timeout: Duration::from_millis(200),
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new(config, SecretString::from("secret-key")).unwrap();

        let err = client.generate("x", &image()).await.unwrap_err();
        match err {
            ExtractionError::Request(message) => assert!(!message.contains("secret-key")),
            other => panic!("expected request error, got {:?}", other),
        }
    }

    #[test]
    fn test_upstream_message_truncates_long_bodies() {
        let body = "x".repeat(500);
        let message = upstream_message(&body);
        assert!(message.ends_with("... (truncated)"));
        assert!(message.len() < 250);
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            model: "gemini-2.0-flash".to_string(),
            request_timeout_secs: 15,
            ..Config::default()
        };
        let gemini = GeminiConfig::from_config(&config);
        assert_eq!(gemini.model, "gemini-2.0-flash");
        assert_eq!(gemini.request_timeout, Duration::from_secs(15));
        assert_eq!(gemini.endpoint, DEFAULT_ENDPOINT);
    }
}
