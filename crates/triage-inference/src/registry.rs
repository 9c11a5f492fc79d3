//! 模型注册表
//!
//! 进程启动时同步加载全部模型，加载失败则进程不能提供推理服务。
//! 加载完成后模型只读，以 `Arc` 句柄传给每次推理调用。

use crate::assembler::ResultAssembler;
use crate::classification::{ClassificationModel, OnnxClassificationModel};
use crate::contract::CNN_INPUT;
use crate::feature::{FeatureExtractor, OnnxFeatureExtractor};
use crate::model_store::ModelStore;
use crate::prognosis::{LinearPrognosisModel, PrognosisModel};
use image::RgbImage;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{error, info};
use triage_core::utils::to_hex;
use triage_core::{Result, TriageError};

/// 模型文件在仓库中的位置
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub classifier_key: String,
    pub feature_extractor_key: String,
    pub prognosis_key: String,
    /// 发布标识，作为模型版本前缀
    pub release: String,
}

/// 已加载的模型集合
#[derive(Clone)]
pub struct ModelRegistry {
    feature_extractor: Arc<dyn FeatureExtractor>,
    classifier: Arc<dyn ClassificationModel>,
    prognosis: Arc<dyn PrognosisModel>,
    model_version: String,
}

impl ModelRegistry {
    /// 从模型仓库拉取并加载全部模型，随后用全黑图像做一次自检
    pub async fn load(store: &ModelStore, artifacts: &ModelArtifacts) -> Result<Self> {
        info!("开始从 {} 加载模型", store.location());

        let classifier_bytes = store.fetch(&artifacts.classifier_key).await?;
        let extractor_bytes = store.fetch(&artifacts.feature_extractor_key).await?;
        let prognosis_bytes = store.fetch(&artifacts.prognosis_key).await?;

        let model_version = model_version(
            &artifacts.release,
            &[&classifier_bytes[..], &extractor_bytes[..], &prognosis_bytes[..]],
        );

        // 图优化是 CPU 密集操作
        let (classifier, extractor, prognosis) = tokio::task::spawn_blocking(move || {
            let classifier = OnnxClassificationModel::from_bytes(&classifier_bytes)?;
            let extractor = OnnxFeatureExtractor::from_bytes(&extractor_bytes)?;
            let prognosis = LinearPrognosisModel::from_json(&prognosis_bytes)?;
            Ok::<_, TriageError>((classifier, extractor, prognosis))
        })
        .await
        .map_err(|e| TriageError::Internal(format!("模型加载线程异常: {}", e)))??;

        let registry = Self::from_parts(
            Arc::new(extractor),
            Arc::new(classifier),
            Arc::new(prognosis),
            model_version,
        );
        registry.self_check()?;

        info!("模型加载完成，版本: {}", registry.model_version);
        Ok(registry)
    }

    pub fn from_parts(
        feature_extractor: Arc<dyn FeatureExtractor>,
        classifier: Arc<dyn ClassificationModel>,
        prognosis: Arc<dyn PrognosisModel>,
        model_version: String,
    ) -> Self {
        Self {
            feature_extractor,
            classifier,
            prognosis,
            model_version,
        }
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    /// 共享同一组模型实例的结果组装器
    pub fn assembler(&self) -> ResultAssembler {
        ResultAssembler::new(
            self.feature_extractor.clone(),
            self.classifier.clone(),
            self.prognosis.clone(),
            self.model_version.clone(),
        )
    }

    /// 完整跑通一次流水线，特征维度与预后模型不匹配等问题在启动时暴露
    pub fn self_check(&self) -> Result<()> {
        let blank = RgbImage::new(CNN_INPUT.size, CNN_INPUT.size);
        self.assembler().assemble(&blank).map_err(|e| {
            error!("模型自检失败: {}", e);
            TriageError::ModelUnavailable(format!("模型自检失败: {}", e))
        })?;
        Ok(())
    }
}

/// `{release}+{摘要前12位}`，摘要覆盖全部模型文件内容
pub fn model_version(release: &str, artifacts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for artifact in artifacts {
        hasher.update((artifact.len() as u64).to_le_bytes());
        hasher.update(artifact);
    }
    let digest = to_hex(&hasher.finalize());
    format!("{}+{}", release, &digest[..12])
}
