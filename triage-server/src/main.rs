//! 影像分诊服务主程序

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use triage_admin::{
    ConfigManager, DatabaseBackend, InferenceMetrics, ModelBackend, ModelsConfig, TriageConfig,
};
use triage_database::{DatabasePool, PgScanRepository, ResultStore};
use triage_inference::{ModelArtifacts, ModelRegistry, ModelStore};
use triage_storage::StorageManager;
use triage_web::{AppState, WebServer};

/// 分诊服务命令行参数
#[derive(Parser, Debug)]
#[command(name = "triage-server")]
#[command(about = "医学影像分诊推理服务")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 监听主机，覆盖配置文件
    #[arg(long)]
    host: Option<String>,

    /// 服务器端口，覆盖配置文件
    #[arg(short, long)]
    port: Option<u16>,

    /// 日志级别，默认取配置文件中的 logging.level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 日志级别可能来自配置文件，加载结果在日志初始化后补记
    let config_manager = ConfigManager::load(args.config.as_deref())?;
    let config_source = config_manager.config_path().map(str::to_string);
    let mut config = config_manager.into_config();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // 初始化日志
    let log_level = args
        .log_level
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(log_level.as_str())
        .init();

    info!("启动影像分诊服务...");
    match &config_source {
        Some(path) => info!("Configuration loaded successfully from: {}", path),
        None => info!("未指定配置文件，使用默认配置与环境变量"),
    }
    info!("  监听地址: {}:{}", config.server.host, config.server.port);
    info!("  上传目录: {}", config.storage.root_path);

    // 模型加载失败时不对外提供服务
    let model_store = open_model_store(&config.models)?;
    let artifacts = ModelArtifacts {
        classifier_key: config.models.classifier_key.clone(),
        feature_extractor_key: config.models.feature_extractor_key.clone(),
        prognosis_key: config.models.prognosis_key.clone(),
        release: config.models.release.clone(),
    };
    let registry = match ModelRegistry::load(&model_store, &artifacts).await {
        Ok(registry) => registry,
        Err(e) => {
            error!("模型加载失败，服务无法启动: {}", e);
            return Err(e.into());
        }
    };

    let results = open_result_store(&config).await?;

    tokio::fs::create_dir_all(&config.storage.root_path)
        .await
        .with_context(|| format!("无法创建上传目录 {}", config.storage.root_path))?;
    let storage = Arc::new(StorageManager::new(&config.storage.root_path));

    let metrics = InferenceMetrics::new()?;
    let state = AppState::new(registry.assembler(), results, storage, metrics);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("无效的监听地址")?;

    let server = WebServer::new(addr, state, config.server.max_upload_bytes);
    if let Err(e) = server.run().await {
        error!("服务器启动失败: {}", e);
        return Err(e.into());
    }

    Ok(())
}

fn open_model_store(models: &ModelsConfig) -> Result<ModelStore> {
    let store = match models.backend {
        ModelBackend::Local => ModelStore::local(&models.root_path)?,
        ModelBackend::S3 => {
            let bucket = models
                .bucket
                .as_deref()
                .ok_or_else(|| anyhow!("S3 模型仓库缺少 bucket 配置"))?;
            ModelStore::s3(bucket, models.region.as_deref(), models.endpoint.as_deref())?
        }
    };
    Ok(store)
}

async fn open_result_store(config: &TriageConfig) -> Result<ResultStore> {
    match config.database.backend {
        DatabaseBackend::Postgres => {
            let pool = DatabasePool::connect(
                &config.database.connection_string,
                config.database.max_connections,
            )
            .await?;
            let repository = PgScanRepository::new(pool);
            repository.migrate().await?;
            Ok(ResultStore::new(Arc::new(repository)))
        }
        DatabaseBackend::Memory => {
            warn!("使用内存数据库，进程退出后数据丢失");
            Ok(ResultStore::in_memory())
        }
    }
}
