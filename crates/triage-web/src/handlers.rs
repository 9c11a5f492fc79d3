//! HTTP处理器

use crate::error::{ApiError, ApiResult};
use crate::export::ExportDocument;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use triage_core::{Patient, TriageError};
use uuid::Uuid;

/// 上传表单中的文件字段名
const FILE_FIELD: &str = "file";

/// API根路径处理器
pub async fn api_root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": "Scan Triage API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "model_version": &*state.model_version,
        "endpoints": {
            "health": "/health",
            "metrics": "/metrics",
            "api": "/api/v1"
        }
    }))
}

/// 健康检查处理器
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "model_version": &*state.model_version
    }))
}

/// Prometheus 指标
pub async fn metrics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let body = state
        .metrics
        .render()
        .map_err(|e| TriageError::Internal(format!("指标导出失败: {}", e)))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

/// 患者登记请求
#[derive(Debug, Deserialize)]
pub struct CreatePatientRequest {
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub hospital_number: String,
    pub national_id: String,
    pub created_by: Option<String>,
}

/// 登记患者
pub async fn create_patient(
    State(state): State<AppState>,
    Json(request): Json<CreatePatientRequest>,
) -> ApiResult<impl IntoResponse> {
    let patient = Patient::new(
        request.name,
        request.dob,
        request.hospital_number,
        request.national_id,
        request.created_by.unwrap_or_else(|| "anonymous".to_string()),
    );
    state.results.register_patient(&patient).await?;

    Ok((StatusCode::CREATED, Json(patient)))
}

/// 患者详情
pub async fn get_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let patient = state.results.patient(&patient_id).await?;
    Ok(Json(patient))
}

/// 上传影像，同步完成推理后返回检查记录
pub async fn upload_scan(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let data = field.bytes().await?;
        info!("Received upload {} ({} bytes) for patient {}", filename, data.len(), patient_id);

        let scan = state.uploads.ingest(&patient_id, &filename, data).await?;
        return Ok((StatusCode::CREATED, Json(scan)));
    }

    Err(ApiError::from(TriageError::Validation(format!(
        "缺少上传字段 `{}`",
        FILE_FIELD
    ))))
}

/// 患者全部检查，最新的在前
pub async fn list_patient_scans(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let scans = state.results.scans_for_patient(&patient_id).await?;
    Ok(Json(json!({
        "scans": scans,
        "total": scans.len()
    })))
}

/// 患者看板：最近一次检查及其预测结果
pub async fn patient_dashboard(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let patient = state.results.patient(&patient_id).await?;
    let latest = state.results.latest_for_patient(&patient_id).await?;

    Ok(Json(json!({
        "patient": patient,
        "latest_scan": latest
    })))
}

/// 检查详情
pub async fn get_scan(
    State(state): State<AppState>,
    Path(scan_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let scan = state.results.scan(&scan_id).await?;
    Ok(Json(scan))
}

/// 下载原始上传文件
pub async fn download_scan_file(
    State(state): State<AppState>,
    Path(scan_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let (scan, data) = state.uploads.original_upload(&scan_id).await?;
    let filename: String = scan
        .filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        data,
    ))
}

/// 删除检查
pub async fn delete_scan(
    State(state): State<AppState>,
    Path(scan_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.uploads.delete_scan(&scan_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 导出检查结果
pub async fn export_scan(
    State(state): State<AppState>,
    Path(scan_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let (patient, scan) = state.results.export_scan(&scan_id).await?;
    let document = ExportDocument::build(&patient, &scan)?;
    let disposition = format!("attachment; filename=\"scan-{}.json\"", scan_id);

    Ok(([(header::CONTENT_DISPOSITION, disposition)], Json(document)))
}
