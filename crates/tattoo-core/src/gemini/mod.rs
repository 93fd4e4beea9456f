//! Generative image model seam.
//!
//! [`ImageModel`] is what request handlers call; [`GeminiClient`] is the
//! production implementation talking to the Gemini REST API.

mod client;

pub use client::{GeminiClient, GeminiClientBuilder, DEFAULT_API_BASE, MODEL_ID};

use async_trait::async_trait;

use crate::error::Result;

/// An image attached to a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InputImage {
    pub fn png(data: Vec<u8>) -> Self {
        Self {
            mime_type: crate::codec::PNG_MIME.to_owned(),
            data,
        }
    }
}

/// Prompt plus images, sent to the model in this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub images: Vec<InputImage>,
}

/// Binary payload carried inline in a response part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineData {
    pub mime_type: String,
    /// Raw (already base64-decoded) bytes; may be empty.
    pub data: Vec<u8>,
}

/// One unit of a generation response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelPart {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

impl ModelPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn image(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data,
            }),
        }
    }
}

/// Ordered parts returned by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub parts: Vec<ModelPart>,
}

/// Anything that can turn a prompt and images into response parts.
#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<ModelResponse>;

    /// Identifier reported in logs.
    fn model_id(&self) -> &str;
}
