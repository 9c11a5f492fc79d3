//! HTTP 错误映射

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;
use triage_core::TriageError;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// 处理器返回的错误
#[derive(Debug)]
pub enum ApiError {
    Triage(TriageError),
    /// 请求体读取失败，状态码由 axum 给出（超限为 413）
    Upload { status: StatusCode, message: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Triage(e) => match e {
                TriageError::Decode(_) | TriageError::Validation(_) => StatusCode::BAD_REQUEST,
                TriageError::NotFound(_) => StatusCode::NOT_FOUND,
                TriageError::PredictionAlreadySet { .. } => StatusCode::CONFLICT,
                TriageError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Upload { status, .. } => *status,
        }
    }
}

impl From<TriageError> for ApiError {
    fn from(e: TriageError) -> Self {
        ApiError::Triage(e)
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Upload {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Triage(e) => e.to_string(),
            ApiError::Upload { message, .. } => message,
        };

        if status.is_server_error() {
            error!("请求处理失败: {}", message);
        }

        let body = Json(json!({
            "error": true,
            "message": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
