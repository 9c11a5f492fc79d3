//! 模型仓库
//!
//! 启动时按 bucket/key 拉取模型文件。仓库不可达或文件缺失都视为模型不可用。

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::{error, info};
use triage_core::{Result, TriageError};

/// 模型仓库客户端
#[derive(Clone)]
pub struct ModelStore {
    store: Arc<dyn ObjectStore>,
    location: String,
}

impl ModelStore {
    /// 本地目录作为模型仓库
    pub fn local(root: &str) -> Result<Self> {
        let store = LocalFileSystem::new_with_prefix(root)
            .map_err(|e| TriageError::ModelUnavailable(format!("模型目录不可用 {}: {}", root, e)))?;

        Ok(Self {
            store: Arc::new(store),
            location: format!("file://{}", root),
        })
    }

    /// S3 兼容对象存储，凭据从环境变量读取
    pub fn s3(bucket: &str, region: Option<&str>, endpoint: Option<&str>) -> Result<Self> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
        if let Some(region) = region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| TriageError::ModelUnavailable(format!("无法连接模型仓库 s3://{}: {}", bucket, e)))?;

        Ok(Self {
            store: Arc::new(store),
            location: format!("s3://{}", bucket),
        })
    }

    /// 内存仓库
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            location: "memory://".to_string(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// 写入模型文件
    pub async fn put(&self, key: &str, bytes: Bytes) -> Result<()> {
        let path = Self::parse_key(key)?;
        self.store
            .put(&path, bytes)
            .await
            .map_err(|e| TriageError::Storage(format!("模型文件写入失败 {}: {}", key, e)))?;
        Ok(())
    }

    /// 拉取模型文件
    pub async fn fetch(&self, key: &str) -> Result<Bytes> {
        let path = Self::parse_key(key)?;

        let result = self.store.get(&path).await.map_err(|e| {
            error!("模型文件拉取失败 {}/{}: {}", self.location, key, e);
            TriageError::ModelUnavailable(format!("无法获取模型 {}: {}", key, e))
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| TriageError::ModelUnavailable(format!("模型文件读取中断 {}: {}", key, e)))?;

        if bytes.is_empty() {
            return Err(TriageError::ModelUnavailable(format!("模型文件为空: {}", key)));
        }

        info!("Fetched model artifact {}/{} ({} bytes)", self.location, key, bytes.len());
        Ok(bytes)
    }

    fn parse_key(key: &str) -> Result<ObjectPath> {
        ObjectPath::parse(key)
            .map_err(|e| TriageError::ModelUnavailable(format!("无效的模型路径 {}: {}", key, e)))
    }
}
