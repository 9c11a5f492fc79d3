//! # 分诊管理模块
//!
//! 配置加载与校验、推理指标采集

pub mod config;
pub mod monitoring;

pub use config::{
    ConfigManager, ConfigValidator, DatabaseBackend, DatabaseConfig, LoggingConfig,
    ModelBackend, ModelsConfig, ServerConfig, StorageConfig, TriageConfig,
};
pub use monitoring::InferenceMetrics;
