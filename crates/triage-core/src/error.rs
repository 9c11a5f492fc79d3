//! 错误定义模块

use thiserror::Error;
use uuid::Uuid;

/// 分诊系统统一错误类型
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("数据库错误: {0}")]
    Database(String),

    /// 上传内容无法解析为图像，由用户修正后重新上传
    #[error("图像解码错误: {0}")]
    Decode(String),

    /// 模型仓库不可达或模型文件无法加载，进程不得对外提供服务
    #[error("模型不可用: {0}")]
    ModelUnavailable(String),

    /// 模型调用过程中的意外失败
    #[error("推理错误: {0}")]
    Inference(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("系统内部错误: {0}")]
    Internal(String),

    #[error("检查 {scan_id} 已有预测结果，不允许重新计算")]
    PredictionAlreadySet { scan_id: Uuid },
}

impl TriageError {
    /// 错误类别标签，用于指标和日志字段
    pub fn kind(&self) -> &'static str {
        match self {
            TriageError::Config(_) => "config",
            TriageError::Database(_) => "database",
            TriageError::Decode(_) => "decode",
            TriageError::ModelUnavailable(_) => "model_unavailable",
            TriageError::Inference(_) => "inference",
            TriageError::Storage(_) => "storage",
            TriageError::Io(_) => "io",
            TriageError::Serialization(_) => "serialization",
            TriageError::Validation(_) => "validation",
            TriageError::NotFound(_) => "not_found",
            TriageError::Internal(_) => "internal",
            TriageError::PredictionAlreadySet { .. } => "prediction_already_set",
        }
    }
}

/// 分诊系统统一结果类型
pub type Result<T> = std::result::Result<T, TriageError>;
