use axum::extract::Multipart;
use axum::extract::multipart::Field;
use serde::Serialize;
use tattoo_core::PromptFields;
use tracing::debug;

use crate::error::ServerError;

/// One uploaded file.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Upload {
    async fn read(field: Field<'_>) -> Result<Self, ServerError> {
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let data = field.bytes().await?.to_vec();
        Ok(Self {
            file_name,
            content_type,
            data,
        })
    }
}

/// Multipart body of `POST /generate-tattoo`.
///
/// Text fields that are not sent are treated as empty. File fields with no
/// content (an untouched file input) are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct TattooForm {
    pub photo: Option<Upload>,
    pub reference: Option<Upload>,
    pub style: String,
    pub theme: String,
    pub color_mode: String,
    pub physical_attributes: String,
}

impl TattooForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "photo" | "reference" => {
                    let upload = Upload::read(field).await?;
                    debug!(
                        field = %name,
                        file_name = ?upload.file_name,
                        content_type = ?upload.content_type,
                        size_bytes = upload.data.len(),
                        "received upload"
                    );
                    if upload.data.is_empty() {
                        continue;
                    }
                    if name == "photo" {
                        form.photo = Some(upload);
                    } else {
                        form.reference = Some(upload);
                    }
                }
                "style" => form.style = field.text().await?,
                "theme" => form.theme = field.text().await?,
                "color_mode" => form.color_mode = field.text().await?,
                "physical_attributes" => form.physical_attributes = field.text().await?,
                other => debug!(field = %other, "ignoring unknown form field"),
            }
        }

        Ok(form)
    }

    /// The fields that shape the prompt.
    pub fn prompt_fields(&self) -> PromptFields {
        PromptFields {
            theme: self.theme.clone(),
            style: self.style.clone(),
            color_mode: self.color_mode.clone(),
            physical_attributes: self.physical_attributes.clone(),
            has_reference: self.reference.is_some(),
        }
    }
}

/// JSON body returned to callers that send `Accept: application/json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateResponse {
    pub generated_text: String,
    pub image_base64: Option<String>,
}

/// Data shown on the result section of the page.
#[derive(Debug, Clone, Serialize)]
pub struct TattooResult {
    pub uploaded_image_base64: String,
    pub generated_image_base64: Option<String>,
    pub style: String,
    pub theme: String,
    pub color_mode: String,
    pub size: String,
}

/// Context of `index.html`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexView {
    pub result: Option<TattooResult>,
    pub error: Option<String>,
}

impl IndexView {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_result(result: TattooResult) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn with_error(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(message.into()),
        }
    }
}
