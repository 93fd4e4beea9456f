//! Tattoo generation route.
//!
//! `POST /generate-tattoo` takes the multipart form, asks the image model to
//! draw the tattoo onto the photo, saves what comes back, and answers with
//! the HTML page or, when the caller asks for it, JSON.

use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tattoo_core::{build_prompt, codec, prepare_inputs, process_parts};
use tracing::{debug, error, info};

use crate::error::ServerError;
use crate::schemas::tattoo::{GenerateResponse, IndexView, TattooForm, TattooResult};
use crate::state::AppState;

/// Register tattoo routes (with and without the trailing slash).
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate-tattoo", post(generate_tattoo))
        .route("/generate-tattoo/", post(generate_tattoo))
}

/// `true` when the caller's `Accept` header asks for JSON.
pub fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

/// Tattoo generation (`POST /generate-tattoo`).
///
/// Always answers: failures become the page with an error message (HTML
/// callers) or `{"error": ...}` (JSON callers).
pub async fn generate_tattoo(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let json = wants_json(&headers);
    match handle(&state, json, multipart).await {
        Ok(response) => response,
        Err(e) => error_response(&state, json, e),
    }
}

async fn handle(
    state: &AppState,
    json: bool,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ServerError> {
    let multipart = multipart.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let form = TattooForm::from_multipart(multipart).await?;

    let fields = form.prompt_fields();
    let prompt = build_prompt(&fields);
    debug!(prompt = %prompt, "built prompt");

    let photo = form
        .photo
        .ok_or_else(|| ServerError::BadRequest("a photo is required".into()))?
        .data;
    let reference = form.reference.map(|r| r.data);

    let inputs =
        tokio::task::spawn_blocking(move || prepare_inputs(&photo, reference.as_deref())).await??;
    let uploaded_image_base64 = codec::to_base64(&inputs.photo_png);
    let request = inputs.into_request(prompt);

    info!(
        model = state.model.model_id(),
        has_reference = fields.has_reference,
        images = request.images.len(),
        "requesting tattoo generation"
    );
    let response = state.model.generate(&request).await?;

    let store = Arc::clone(&state.store);
    let outcome = tokio::task::spawn_blocking(move || process_parts(response.parts, &store)).await?;
    info!(
        saved = outcome.saved.len(),
        text_chars = outcome.generated_text.len(),
        has_image = outcome.image_base64.is_some(),
        "tattoo generation done"
    );

    if json {
        return Ok(Json(GenerateResponse {
            generated_text: outcome.generated_text,
            image_base64: outcome.image_base64,
        })
        .into_response());
    }

    let page = state.templates.render_index(&IndexView::with_result(TattooResult {
        uploaded_image_base64,
        generated_image_base64: outcome.image_base64,
        style: form.style,
        theme: form.theme,
        color_mode: form.color_mode,
        size: form.physical_attributes,
    }))?;
    Ok(Html(page).into_response())
}

fn error_response(state: &AppState, json: bool, err: ServerError) -> Response {
    let status = err.status();
    let message = err.client_message();

    if json {
        return (status, Json(json!({ "error": message }))).into_response();
    }
    match state.templates.render_index(&IndexView::with_error(message.clone())) {
        Ok(page) => (status, Html(page)).into_response(),
        Err(e) => {
            error!(error = %e, "failed to render error page");
            (status, message).into_response()
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
