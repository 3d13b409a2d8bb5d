//! Fixtures for router tests: in-memory stores, a mock weather provider and a
//! throwaway media directory.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::Config;
use crate::logic::geo::GeoPoint;
use crate::media::PhotoStore;
use crate::middleware::owner::issue_test_token;
use crate::models::{Detection, DetectionFilter, DetectionId, NewDetection};
use crate::providers::MockEnvironmentProvider;
use crate::repository::{
    DetectionRepository, InMemoryDetectionRepository, InMemoryProfileRepository, RepositoryError,
};
use crate::{create_router, AppState};

const BOUNDARY: &str = "cropcare-test-boundary";

pub struct TestApp {
    pub state: AppState,
    pub detections: Arc<InMemoryDetectionRepository>,
    // Removed on drop
    _media: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_provider(MockEnvironmentProvider::new())
    }

    pub fn with_provider(provider: MockEnvironmentProvider) -> Self {
        let media = TempDir::new().expect("temp media dir");
        let mut config = Config::from_lookup(|_| None);
        config.media_root = media.path().display().to_string();

        let detections = Arc::new(InMemoryDetectionRepository::new());
        let state = AppState {
            detections: detections.clone(),
            profiles: Arc::new(InMemoryProfileRepository::new()),
            environment: Arc::new(provider),
            photos: PhotoStore::new(media.path()),
            config,
        };

        Self {
            state,
            detections,
            _media: media,
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub fn token_for(&self, user: Uuid) -> String {
        issue_test_token(user, &self.state.config.jwt_secret)
    }

    /// Send one request and decode the JSON body (`Null` when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, json) = self.exchange(request).await;
        (status, json)
    }

    pub async fn exchange(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router().oneshot(request).await.expect("router responds");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        (status, headers, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, token, Body::empty(), None)).await
    }

    pub async fn get_with_headers(&self, uri: &str) -> (StatusCode, HeaderMap, Value) {
        self.exchange(request(Method::GET, uri, None, Body::empty(), None)).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let body = Body::from(body.to_string());
        self.send(request(Method::POST, uri, token, body, Some("application/json"))).await
    }

    pub async fn upload(&self, form: MultipartForm, token: Option<&str>) -> (StatusCode, Value) {
        let content_type = format!("multipart/form-data; boundary={}", BOUNDARY);
        let body = Body::from(form.finish());
        self.send(request(Method::POST, "/api/detections", token, body, Some(&content_type)))
            .await
    }
}

fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Body,
    content_type: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body).expect("valid request")
}

/// Hand-built `multipart/form-data` body
#[derive(Default)]
pub struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name, file_name
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// A leaf photo upload with the usual fields
    pub fn leaf(label: &str, confidence: f64) -> Self {
        Self::new()
            .file("image", "leaf.jpg", b"\xFF\xD8\xFFfake-jpeg")
            .text("label", label)
            .text("confidence", &confidence.to_string())
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}

/// Store whose region lookups time out for one center; everything else is
/// served from the wrapped in-memory store.
pub struct RegionOutage {
    inner: Arc<InMemoryDetectionRepository>,
    down: GeoPoint,
}

impl RegionOutage {
    pub fn new(inner: Arc<InMemoryDetectionRepository>, down: GeoPoint) -> Self {
        Self { inner, down }
    }
}

#[axum::async_trait]
impl DetectionRepository for RegionOutage {
    async fn create(&self, record: NewDetection) -> Result<Detection, RepositoryError> {
        self.inner.create(record).await
    }

    async fn get(&self, id: DetectionId) -> Result<Option<Detection>, RepositoryError> {
        self.inner.get(id).await
    }

    async fn list(
        &self,
        filter: &DetectionFilter,
        limit: usize,
    ) -> Result<Vec<Detection>, RepositoryError> {
        if filter.region.is_some_and(|r| r.center == self.down) {
            return Err(RepositoryError::Timeout {
                after: Duration::from_secs(5),
            });
        }
        self.inner.list(filter, limit).await
    }

    async fn update_advice(
        &self,
        id: DetectionId,
        advice: Vec<String>,
    ) -> Result<Option<Detection>, RepositoryError> {
        self.inner.update_advice(id, advice).await
    }
}
