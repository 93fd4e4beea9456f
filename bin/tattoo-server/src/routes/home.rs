//! Home page.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;

use crate::error::ServerError;
use crate::schemas::tattoo::IndexView;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(home))
}

/// `GET /`: the upload form, with no result and no error.
pub async fn home(State(state): State<Arc<AppState>>) -> Result<Html<String>, ServerError> {
    Ok(Html(state.templates.render_index(&IndexView::empty())?))
}
