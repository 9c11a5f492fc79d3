//! Web服务器

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use triage_core::Result;

use crate::handlers::{
    api_root, create_patient, delete_scan, download_scan_file, export_scan, get_patient, get_scan,
    health, list_patient_scans, metrics, patient_dashboard, upload_scan,
};
use crate::state::AppState;

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState, max_upload_bytes: usize) -> Self {
        let app = Self::create_app(state, max_upload_bytes);
        Self { addr, app }
    }

    pub fn create_app(state: AppState, max_upload_bytes: usize) -> Router {
        Router::new()
            // 根路径
            .route("/", get(api_root))

            // 健康检查与指标
            .route("/health", get(health))
            .route("/metrics", get(metrics))

            // API路由
            .nest("/api/v1", api_routes())

            // 上传大小限制
            .layer(DefaultBodyLimit::max(max_upload_bytes))

            // 全局中间件
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(
                        CorsLayer::new()
                            .allow_origin(Any)
                            .allow_methods(Any)
                            .allow_headers(Any),
                    ),
            )
            .with_state(state)
    }

    pub async fn run(self) -> Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app).await?;

        Ok(())
    }
}

/// API v1 路由
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/patients", post(create_patient))
        .route("/patients/:id", get(get_patient))
        .route(
            "/patients/:id/scans",
            post(upload_scan).get(list_patient_scans),
        )
        .route("/patients/:id/dashboard", get(patient_dashboard))
        .route("/scans/:id", get(get_scan).delete(delete_scan))
        .route("/scans/:id/export", get(export_scan))
        .route("/scans/:id/file", get(download_scan_file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use image::{DynamicImage, RgbImage};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use triage_admin::InferenceMetrics;
    use triage_database::ResultStore;
    use triage_inference::testing::{encode_png, stub_assembler, TEST_MODEL_VERSION};
    use triage_storage::StorageManager;

    const BOUNDARY: &str = "triage-test-boundary";

    fn app(dir: &tempfile::TempDir, max_upload_bytes: usize) -> Router {
        let state = AppState::new(
            stub_assembler(vec![0.2, 0.7, 0.1], -0.4),
            ResultStore::in_memory(),
            Arc::new(StorageManager::new(dir.path().to_str().unwrap())),
            InferenceMetrics::new().unwrap(),
        );
        WebServer::create_app(state, max_upload_bytes)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, request).await;
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn multipart_upload(uri: &str, field: &str, filename: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn create_patient(app: &Router, hospital_number: &str) -> String {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/patients")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "name": "Chen Qi",
                    "dob": "1968-11-02",
                    "hospital_number": hospital_number,
                    "national_id": "110101196811021234"
                })
                .to_string(),
            ))
            .unwrap();

        let (status, body) = send_json(app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    fn png() -> Vec<u8> {
        encode_png(&DynamicImage::ImageRgb8(RgbImage::new(32, 32)))
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, 1024 * 1024);

        let (status, body) = send_json(&app, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model_version"], TEST_MODEL_VERSION);

        let (status, body) = send_json(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_upload_dashboard_and_export_agree() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, 1024 * 1024);
        let patient_id = create_patient(&app, "H500").await;

        let (status, scan) = send_json(
            &app,
            multipart_upload(
                &format!("/api/v1/patients/{}/scans", patient_id),
                "file",
                "chest.png",
                &png(),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let scan_id = scan["id"].as_str().unwrap().to_string();
        assert_eq!(scan["prediction"]["classification_label"], "Benign");
        assert_eq!(scan["prediction"]["prognosis_label"], "Good");

        let (status, detail) = send_json(&app, get(&format!("/api/v1/scans/{}", scan_id))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, dashboard) = send_json(
            &app,
            get(&format!("/api/v1/patients/{}/dashboard", patient_id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dashboard["latest_scan"]["id"], scan_id.as_str());
        assert_eq!(dashboard["latest_scan"]["prediction"], detail["prediction"]);

        let export_uri = format!("/api/v1/scans/{}/export", scan_id);
        let (status, export) = send_json(&app, get(&export_uri)).await;
        assert_eq!(status, StatusCode::OK);
        let prediction = &detail["prediction"];
        assert_eq!(export["scan"]["classification"], prediction["classification_label"]);
        assert_eq!(export["scan"]["prognosis"], prediction["prognosis_label"]);
        assert_eq!(
            export["scan"]["classification_confidence"],
            prediction["classification_confidence"]
        );
        assert_eq!(export["scan"]["model_version"], TEST_MODEL_VERSION);
        assert_eq!(export["patient"]["hospital_number"], "H500");

        let (_, first) = send(&app, get(&export_uri)).await;
        let (_, second) = send(&app, get(&export_uri)).await;
        assert_eq!(first, second);

        let (status, file) = send(&app, get(&format!("/api/v1/scans/{}/file", scan_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(file, png());
    }

    #[tokio::test]
    async fn test_corrupt_upload_rejected_without_scan() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, 1024 * 1024);
        let patient_id = create_patient(&app, "H501").await;

        let (status, body) = send_json(
            &app,
            multipart_upload(
                &format!("/api/v1/patients/{}/scans", patient_id),
                "file",
                "broken.jpg",
                b"\xff\xd8\xff\xe0 not really a jpeg",
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], true);

        let (status, list) = send_json(
            &app,
            get(&format!("/api/v1/patients/{}/scans", patient_id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["total"], 0);

        let (_, dashboard) = send_json(
            &app,
            get(&format!("/api/v1/patients/{}/dashboard", patient_id)),
        )
        .await;
        assert_eq!(dashboard["latest_scan"], Value::Null);
    }

    #[tokio::test]
    async fn test_upload_requires_file_field() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, 1024 * 1024);
        let patient_id = create_patient(&app, "H502").await;

        let (status, _) = send_json(
            &app,
            multipart_upload(
                &format!("/api/v1/patients/{}/scans", patient_id),
                "attachment",
                "chest.png",
                &png(),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, 256);
        let patient_id = create_patient(&app, "H503").await;

        let (status, _) = send(
            &app,
            multipart_upload(
                &format!("/api/v1/patients/{}/scans", patient_id),
                "file",
                "big.png",
                &vec![0u8; 4096],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_delete_scan_then_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, 1024 * 1024);
        let patient_id = create_patient(&app, "H504").await;

        let (_, scan) = send_json(
            &app,
            multipart_upload(
                &format!("/api/v1/patients/{}/scans", patient_id),
                "file",
                "chest.png",
                &png(),
            ),
        )
        .await;
        let scan_uri = format!("/api/v1/scans/{}", scan["id"].as_str().unwrap());

        let delete = Request::builder()
            .method("DELETE")
            .uri(&scan_uri)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, delete).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, get(&scan_uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, get(&format!("{}/export", scan_uri))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get(&format!("/api/v1/patients/{}", patient_id))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_overlong_hospital_number_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, 1024 * 1024);

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/patients")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "name": "Chen Qi",
                    "hospital_number": "H".repeat(65),
                    "national_id": "110101196811021234"
                })
                .to_string(),
            ))
            .unwrap();

        let (status, body) = send_json(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
    }

    #[tokio::test]
    async fn test_unknown_patient_and_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, 1024 * 1024);

        let (status, body) = send_json(
            &app,
            get(&format!("/api/v1/patients/{}", uuid::Uuid::new_v4())),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);

        let (status, body) = send(&app, get("/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("triage_uploads_total"));
    }
}
