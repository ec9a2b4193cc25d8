//! Router construction

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::routes;
use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    let uploads = ServeDir::new(state.uploads.dir());
    let mount_path = state.config.uploads.mount_path().to_string();
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        // Browser form
        .route(
            "/",
            get(routes::predict::upload_form).post(routes::predict::predict_form),
        )
        // JSON API
        .route("/api/predict", post(routes::predict::predict_json))
        // Health check
        .route("/health", get(routes::health::health_check))
        // Stored uploads, so the result page can show the image
        .nest_service(&mount_path, uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use image::{ImageFormat, RgbImage};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use tomato_leaf::config::UploadConfig;
    use tomato_leaf::inference::{ImagePreprocessor, ImageTensor, PreprocessConfig};
    use tomato_leaf::{
        AppConfig, Classifier, DiseaseKnowledgeBase, LabelCatalog, LeafError, Pipeline,
        TomatoDisease, UploadStore,
    };

    use crate::state::AppState;

    const BOUNDARY: &str = "leafboundary";

    struct StubClassifier {
        probs: Option<Vec<f32>>,
        calls: Arc<AtomicUsize>,
    }

    impl Classifier for StubClassifier {
        fn num_classes(&self) -> usize {
            4
        }

        fn predict(&self, _tensor: &ImageTensor) -> tomato_leaf::Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.probs
                .clone()
                .ok_or_else(|| LeafError::Inference("model exploded".to_string()))
        }
    }

    struct Harness {
        app: Router,
        calls: Arc<AtomicUsize>,
        dir: TempDir,
    }

    impl Harness {
        fn stored_files(&self) -> usize {
            std::fs::read_dir(self.dir.path()).unwrap().count()
        }
    }

    fn harness(probs: Option<Vec<f32>>) -> Harness {
        harness_with(probs, |_| {})
    }

    fn harness_with(probs: Option<Vec<f32>>, configure: impl FnOnce(&mut AppConfig)) -> Harness {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut config = AppConfig::default();
        config.uploads = UploadConfig {
            dir: dir.path().to_path_buf(),
            ..UploadConfig::default()
        };
        configure(&mut config);

        let catalog = LabelCatalog::from_labels(TomatoDisease::ALL.iter().map(|d| d.label()));
        let pipeline = Pipeline::new(
            catalog,
            DiseaseKnowledgeBase::builtin(),
            ImagePreprocessor::new(PreprocessConfig::default()),
            Box::new(StubClassifier {
                probs,
                calls: Arc::clone(&calls),
            }),
        );
        let uploads = UploadStore::open(&config.uploads).unwrap();
        let state = AppState::new(config, pipeline, uploads).unwrap();

        Harness {
            app: router(Arc::new(state)),
            calls,
            dir,
        }
    }

    fn leaf_png() -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbImage::from_pixel(32, 32, image::Rgb([40, 160, 60]))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn multipart_body(field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn early_blight() -> Option<Vec<f32>> {
        Some(vec![0.7, 0.1, 0.1, 0.1])
    }

    #[tokio::test]
    async fn test_upload_form() {
        let h = harness(early_blight());
        let response = h
            .app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("<form"));
        assert!(html.contains("name=\"file\""));
    }

    #[tokio::test]
    async fn test_predict_form_renders_result() {
        let h = harness(early_blight());
        let body = multipart_body("file", "leaf.png", &leaf_png());
        let response = h
            .app
            .clone()
            .oneshot(upload_request("/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Early blight"));
        assert!(html.contains("70.00%"));
        assert!(html.contains("10.00%"));
        assert!(html.contains(TomatoDisease::EarlyBlight.description()));
        assert_eq!(h.stored_files(), 1);
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);

        let stored = std::fs::read_dir(h.dir.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .file_name()
            .to_string_lossy()
            .into_owned();
        assert!(stored.ends_with(".png"));
        assert!(html.contains(&stored));

        // The stored image is served back under the upload prefix
        let uri = format!("/static/uploads/{}", stored);
        let response = h
            .app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rejects_unsupported_extension() {
        let h = harness(early_blight());
        let body = multipart_body("file", "leaf.gif", &leaf_png());
        let response = h
            .app
            .clone()
            .oneshot(upload_request("/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.stored_files(), 0);
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejects_missing_file_field() {
        let h = harness(early_blight());
        let body = multipart_body("photo", "leaf.png", &leaf_png());
        let response = h
            .app
            .clone()
            .oneshot(upload_request("/api/predict", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["error"], "Invalid upload: no file uploaded");
        assert_eq!(h.stored_files(), 0);
    }

    #[tokio::test]
    async fn test_predict_json() {
        let h = harness(early_blight());
        let body = multipart_body("file", "LEAF.JPG", &leaf_png());
        let response = h
            .app
            .clone()
            .oneshot(upload_request("/api/predict", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["label"], "Early blight");
        assert_eq!(json["index"], 0);
        assert_eq!(json["predictions"].as_array().unwrap().len(), 4);
        assert_eq!(json["predictions"][0]["percentage"], "70.00%");
        assert_eq!(json["predictions"][3]["label"], "Healthy");
        assert!(json["image_url"].as_str().unwrap().ends_with(".jpg"));
        assert_eq!(h.stored_files(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_image_is_server_error() {
        let h = harness(early_blight());
        let body = multipart_body("file", "leaf.png", b"definitely not a png");
        let response = h
            .app
            .clone()
            .oneshot(upload_request("/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.starts_with("Failed to process image"));
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_classifier_failure_is_server_error() {
        let h = harness(None);
        let body = multipart_body("file", "leaf.png", &leaf_png());
        let response = h
            .app
            .clone()
            .oneshot(upload_request("/api/predict", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(json["error"].as_str().unwrap().contains("model exploded"));
    }

    #[tokio::test]
    async fn test_upload_over_limit() {
        let h = harness_with(early_blight(), |config| config.server.max_upload_bytes = 16);
        let body = multipart_body("file", "leaf.png", &leaf_png());
        let response = h
            .app
            .clone()
            .oneshot(upload_request("/api/predict", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(h.stored_files(), 0);
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_uploads_served_under_custom_prefix() {
        let h = harness_with(early_blight(), |config| {
            config.uploads.url_prefix = "/files/".to_string();
        });
        let body = multipart_body("file", "leaf.png", &leaf_png());
        let response = h
            .app
            .clone()
            .oneshot(upload_request("/api/predict", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        let image_url = json["image_url"].as_str().unwrap().to_string();
        assert!(image_url.starts_with("/files/"));
        assert!(!image_url.starts_with("/files//"));

        let response = h
            .app
            .oneshot(Request::get(image_url).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(early_blight());
        let response = h
            .app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["num_classes"], 4);
    }
}
