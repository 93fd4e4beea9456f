//! Gemini `generateContent` client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{GenerationRequest, ImageModel, InlineData, ModelPart, ModelResponse};
use crate::error::{CoreError, Result};

/// Fixed image model used for tattoo overlays.
pub const MODEL_ID: &str = "gemini-2.5-flash-image";

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Longest upstream error body echoed back in an error message.
const MAX_ERROR_CHARS: usize = 500;

/// Bound on establishing the TCP/TLS connection. The generation call itself
/// is not time-limited.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder for [`GeminiClient`].
#[derive(Debug, Clone, Default)]
pub struct GeminiClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
}

impl GeminiClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the API host, e.g. for a proxy.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn build(self) -> Result<GeminiClient> {
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CoreError::Auth("no Gemini API key provided".into()))?;
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_API_BASE.to_owned())
            .trim_end_matches('/')
            .to_owned();

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(GeminiClient {
            http,
            api_key,
            base_url,
        })
    }
}

/// Production [`ImageModel`] backed by the Gemini REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &MODEL_ID)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::new()
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, MODEL_ID)
    }

    async fn generate_impl(&self, request: &GenerationRequest) -> Result<ModelResponse> {
        let start = Instant::now();
        let body = GeminiRequest::from_generation_request(request);

        debug!(
            prompt_chars = request.prompt.len(),
            images = request.images.len(),
            "calling Gemini generateContent"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &text, retry_after));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let parts = gemini_response.into_parts()?;

        info!(
            parts = parts.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Gemini generation finished"
        );
        Ok(ModelResponse { parts })
    }
}

#[async_trait]
impl ImageModel for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<ModelResponse> {
        self.generate_impl(request).await
    }

    fn model_id(&self) -> &str {
        MODEL_ID
    }
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn classify_error(status: u16, body: &str, retry_after: Option<Duration>) -> CoreError {
    let message = upstream_message(body);
    match status {
        401 | 403 => CoreError::Auth(message),
        429 => CoreError::RateLimited { retry_after },
        _ => CoreError::Api { status, message },
    }
}

/// Prefer `error.message` from Google's error envelope; fall back to the raw
/// body, truncated.
fn upstream_message(body: &str) -> String {
    let message = serde_json::from_str::<GeminiErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| body.trim().to_owned());
    if message.chars().count() > MAX_ERROR_CHARS {
        let mut cut: String = message.chars().take(MAX_ERROR_CHARS).collect();
        cut.push('…');
        cut
    } else {
        message
    }
}

// ── Wire types ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiBlob {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn from_generation_request(req: &GenerationRequest) -> Self {
        let mut parts = Vec::with_capacity(1 + req.images.len());
        parts.push(GeminiRequestPart::Text {
            text: req.prompt.clone(),
        });
        for image in &req.images {
            parts.push(GeminiRequestPart::InlineData {
                inline_data: GeminiBlob {
                    mime_type: image.mime_type.clone(),
                    data: STANDARD.encode(&image.data),
                },
            });
        }

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["TEXT".to_owned(), "IMAGE".to_owned()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<GeminiBlob>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl GeminiResponse {
    /// Flatten the first candidate into [`ModelPart`]s.
    ///
    /// A response without candidates yields no parts.
    fn into_parts(self) -> Result<Vec<ModelPart>> {
        if let Some(feedback) = self.prompt_feedback {
            if let Some(reason) = feedback.block_reason {
                let msg = feedback
                    .block_reason_message
                    .unwrap_or_else(|| format!("prompt blocked: {reason}"));
                return Err(CoreError::ContentBlocked(msg));
            }
        }

        let Some(content) = self.candidates.into_iter().next().and_then(|c| c.content) else {
            return Ok(Vec::new());
        };

        content
            .parts
            .into_iter()
            .map(|part| {
                let inline_data = part
                    .inline_data
                    .map(|blob| {
                        STANDARD
                            .decode(blob.data.as_bytes())
                            .map(|data| InlineData {
                                mime_type: blob.mime_type,
                                data,
                            })
                            .map_err(|e| {
                                CoreError::UnexpectedResponse(format!(
                                    "inline image data is not valid base64: {e}"
                                ))
                            })
                    })
                    .transpose()?;
                Ok(ModelPart {
                    text: part.text,
                    inline_data,
                })
            })
            .collect()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::gemini::InputImage;

    #[test]
    fn builder_requires_api_key() {
        assert!(matches!(GeminiClient::builder().build(), Err(CoreError::Auth(_))));
        assert!(GeminiClient::builder().api_key("  ").build().is_err());
        assert!(GeminiClient::builder().api_key("test-key").build().is_ok());
    }

    #[test]
    fn endpoint_uses_fixed_model_and_trims_base() {
        let client = GeminiClient::builder()
            .api_key("k")
            .base_url("http://localhost:9000/")
            .build()
            .unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
        assert_eq!(client.model_id(), MODEL_ID);
    }

    #[test]
    fn debug_hides_api_key() {
        let client = GeminiClient::builder().api_key("secret-key").build().unwrap();
        assert!(!format!("{client:?}").contains("secret-key"));
    }

    #[test]
    fn request_orders_prompt_then_images() {
        let req = GenerationRequest {
            prompt: "draw".into(),
            images: vec![InputImage::png(vec![1, 2, 3]), InputImage::png(vec![4])],
        };
        let json = serde_json::to_value(GeminiRequest::from_generation_request(&req)).unwrap();

        let parts = json["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["text"], "draw");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "AQID");
        assert_eq!(parts[2]["inlineData"]["data"], "BA==");
        assert_eq!(
            json["generationConfig"]["responseModalities"],
            serde_json::json!(["TEXT", "IMAGE"])
        );
    }

    #[test]
    fn response_parts_keep_order_and_decode_inline_data() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "here you go"},
                        {"inlineData": {"mimeType": "image/png", "data": "aGk="}},
                        {}
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let parts = resp.into_parts().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], ModelPart::text("here you go"));
        assert_eq!(parts[1], ModelPart::image("image/png", b"hi".to_vec()));
        assert_eq!(parts[2], ModelPart::default());
    }

    #[test]
    fn inline_data_without_payload_is_empty() {
        let json = r#"{"candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/png"}}]}}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let parts = resp.into_parts().unwrap();
        assert_eq!(parts[0].inline_data.as_ref().unwrap().data, Vec::<u8>::new());
    }

    #[test]
    fn no_candidates_means_no_parts() {
        let resp: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.into_parts().unwrap().is_empty());
    }

    #[test]
    fn prompt_block_is_an_error() {
        let json = r#"{
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let err = resp.into_parts().unwrap_err();
        assert_eq!(err.to_string(), "content blocked: prompt blocked: SAFETY");
    }

    #[test]
    fn invalid_base64_is_unexpected_response() {
        let json = r#"{"candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "%%%"}}]}}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(resp.into_parts(), Err(CoreError::UnexpectedResponse(_))));
    }

    #[test]
    fn error_classification() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        match classify_error(400, body, None) {
            CoreError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(classify_error(403, "nope", None), CoreError::Auth(m) if m == "nope"));
        assert!(matches!(
            classify_error(429, "", Some(Duration::from_secs(3))),
            CoreError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(3)
        ));
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(MAX_ERROR_CHARS * 2);
        let msg = upstream_message(&body);
        assert_eq!(msg.chars().count(), MAX_ERROR_CHARS + 1);
    }
}
