//! Shared fixtures for router tests.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use http_body_util::BodyExt;
use image::{DynamicImage, Rgba, RgbaImage};
use tattoo_core::{
    CoreError, GenerationRequest, ImageModel, ModelPart, ModelResponse, OutputStore,
};
use tempfile::TempDir;

use crate::config::Config;
use crate::routes;
use crate::state::AppState;
use crate::templates::Templates;

const BOUNDARY: &str = "tattoo-test-boundary";

/// Records every request and answers with canned parts or a canned error.
#[derive(Clone)]
pub struct FakeModel {
    parts: Option<Vec<ModelPart>>,
    seen: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl FakeModel {
    pub fn returning(parts: Vec<ModelPart>) -> Self {
        Self {
            parts: Some(parts),
            seen: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            parts: None,
            seen: Arc::default(),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageModel for FakeModel {
    async fn generate(&self, request: &GenerationRequest) -> tattoo_core::Result<ModelResponse> {
        self.seen.lock().unwrap().push(request.clone());
        match &self.parts {
            Some(parts) => Ok(ModelResponse {
                parts: parts.clone(),
            }),
            None => Err(CoreError::Api {
                status: 503,
                message: "model overloaded".into(),
            }),
        }
    }

    fn model_id(&self) -> &str {
        "fake-model"
    }
}

/// Temp directories backing a test app; dropped with the test.
pub struct TestDirs {
    root: TempDir,
}

impl TestDirs {
    pub fn output(&self) -> PathBuf {
        self.root.path().join("generated images")
    }

    pub fn static_dir(&self) -> PathBuf {
        self.root.path().join("static")
    }
}

pub fn test_config(dirs: &TestDirs) -> Config {
    Config {
        bind_address: "127.0.0.1:0".into(),
        gemini_api_key: "test-key".into(),
        gemini_api_base: None,
        output_dir: dirs.output(),
        static_dir: dirs.static_dir(),
        max_upload_bytes: 4 * 1024 * 1024,
        cors_allowed_origins: None,
        log_level: "debug".into(),
        log_json: false,
    }
}

pub fn test_app(model: FakeModel) -> (Router, TestDirs) {
    let dirs = TestDirs {
        root: tempfile::tempdir().unwrap(),
    };
    std::fs::create_dir_all(dirs.static_dir()).unwrap();
    let config = test_config(&dirs);

    let state = Arc::new(AppState {
        store: Arc::new(OutputStore::new(config.output_dir.clone())),
        config: Arc::new(config),
        model: Arc::new(model),
        templates: Arc::new(Templates::new().unwrap()),
    });
    (routes::build(state), dirs)
}

pub fn sample_png() -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([30, 30, 30, 255])));
    tattoo_core::codec::encode_png(&img).unwrap()
}

/// Hand-rolled `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

pub async fn body_string(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(resp: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(resp).await).unwrap()
}
