//! 结果组装
//!
//! 对每张影像执行一次预处理，分别走分类和预后两条模型路径，映射标签，
//! 打上当前流水线固定的模型版本，得到一条不可变的预测记录。
//! 模型调用失败不重试，直接中止，不会产生只有一半结果的记录。

use crate::classification::ClassificationModel;
use crate::decoder::ImageDecoder;
use crate::feature::FeatureExtractor;
use crate::preprocess::Preprocessor;
use crate::prognosis::PrognosisModel;
use crate::scorer::{ClassificationScorer, PrognosisScorer, Scorer};
use image::RgbImage;
use std::sync::Arc;
use tracing::{debug, warn};
use triage_core::{LabelMapper, PredictionResult, Result};

/// 结果组装器
///
/// 只持有共享的只读模型句柄，克隆开销很小，可在多个请求间并发使用。
#[derive(Clone)]
pub struct ResultAssembler {
    preprocessor: Preprocessor,
    classifier: ClassificationScorer,
    prognosis: PrognosisScorer,
    model_version: Arc<str>,
}

impl ResultAssembler {
    pub fn new(
        feature_extractor: Arc<dyn FeatureExtractor>,
        classification_model: Arc<dyn ClassificationModel>,
        prognosis_model: Arc<dyn PrognosisModel>,
        model_version: impl Into<String>,
    ) -> Self {
        Self {
            preprocessor: Preprocessor::new(feature_extractor),
            classifier: ClassificationScorer::new(classification_model),
            prognosis: PrognosisScorer::new(prognosis_model),
            model_version: Arc::from(model_version.into()),
        }
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    /// 对已解码图像生成预测结果
    pub fn assemble(&self, image: &RgbImage) -> Result<PredictionResult> {
        let inputs = self.preprocessor.prepare(image)?;

        let classification = self.classifier.score(&inputs.cnn_tensor).map_err(|e| {
            warn!("classification path failed: {}", e);
            e
        })?;
        let prognosis = self.prognosis.score(&inputs.feature_vector).map_err(|e| {
            warn!("prognosis path failed: {}", e);
            e
        })?;

        let result = PredictionResult {
            classification_label: LabelMapper::classify_label(classification.index),
            prognosis_label: LabelMapper::prognosis_label(prognosis.index),
            classification_confidence: classification.confidence,
            prognosis_confidence: prognosis.confidence,
            model_version: self.model_version.to_string(),
        };

        debug!(
            classification = %result.classification_label,
            prognosis = %result.prognosis_label,
            classification_confidence = result.classification_confidence,
            prognosis_confidence = result.prognosis_confidence,
            "prediction assembled"
        );

        Ok(result)
    }

    /// 解码原始上传字节后生成预测结果
    pub fn assemble_bytes(&self, bytes: &[u8]) -> Result<PredictionResult> {
        let image = ImageDecoder::decode(bytes)?;
        self.assemble(&image)
    }
}
