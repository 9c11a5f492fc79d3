//! 影像存储管理

use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use triage_core::utils::{sanitize_filename, to_hex};
use triage_core::{Result, TriageError};
use uuid::Uuid;

/// 已落盘的上传文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// 相对存储根目录的路径
    pub storage_path: String,
    /// 内容 SHA-256
    pub digest: String,
    pub size: usize,
}

/// 存储管理器
pub struct StorageManager {
    base_path: PathBuf,
}

impl StorageManager {
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: PathBuf::from(base_path),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// 存储上传文件，路径为 `{patient_id}/{scan_id}/{摘要前16位}_{文件名}`
    ///
    /// 每个检查独占一个目录，内容相同的两次上传互不影响。
    pub async fn store_upload(
        &self,
        patient_id: &Uuid,
        scan_id: &Uuid,
        filename: &str,
        data: &[u8],
    ) -> Result<StoredUpload> {
        let digest = to_hex(&Sha256::digest(data));
        let storage_path = format!(
            "{}/{}/{}_{}",
            patient_id,
            scan_id,
            &digest[..16],
            sanitize_filename(filename)
        );

        self.store_file(data, &storage_path).await?;
        info!("Stored upload {} ({} bytes)", storage_path, data.len());

        Ok(StoredUpload {
            storage_path,
            digest,
            size: data.len(),
        })
    }

    /// 写入文件
    pub async fn store_file(&self, data: &[u8], path: &str) -> Result<String> {
        let full_path = self.resolve(path)?;
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&full_path, data).await?;
        debug!("写入文件: {:?}", full_path);
        Ok(full_path.to_string_lossy().to_string())
    }

    /// 获取文件
    pub async fn get_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(path)?;
        match tokio::fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TriageError::NotFound(format!("文件不存在: {}", path)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 删除文件，文件不存在时视为成功
    pub async fn remove_file(&self, path: &str) -> Result<()> {
        let full_path = self.resolve(path)?;
        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("待删除文件不存在: {:?}", full_path);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 只接受根目录内的相对路径
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(TriageError::Storage(format!("非法存储路径: {}", path)));
        }
        Ok(self.base_path.join(relative))
    }
}
