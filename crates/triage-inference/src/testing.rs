//! 测试用的确定性桩模型

use crate::assembler::ResultAssembler;
use crate::classification::ClassificationModel;
use crate::feature::FeatureExtractor;
use crate::prognosis::PrognosisModel;
use image::{DynamicImage, ImageFormat};
use ndarray::{Array2, Array4, Axis};
use std::io::Cursor;
use std::sync::Arc;
use triage_core::{Result, TriageError};

pub const TEST_MODEL_VERSION: &str = "test-release+000000000000";

/// 固定输出概率向量的分类模型
pub struct FixedClassificationModel {
    probabilities: Vec<f32>,
}

impl FixedClassificationModel {
    pub fn new(probabilities: Vec<f32>) -> Self {
        Self { probabilities }
    }
}

impl ClassificationModel for FixedClassificationModel {
    fn predict(&self, _input: &Array4<f32>) -> Result<Vec<f32>> {
        Ok(self.probabilities.clone())
    }
}

/// 固定输出评分的预后模型
pub struct FixedPrognosisModel {
    score: f32,
}

impl FixedPrognosisModel {
    pub fn new(score: f32) -> Self {
        Self { score }
    }
}

impl PrognosisModel for FixedPrognosisModel {
    fn predict(&self, _features: &Array2<f32>) -> Result<f32> {
        Ok(self.score)
    }
}

/// 总是失败的分类模型
pub struct FailingClassificationModel;

impl ClassificationModel for FailingClassificationModel {
    fn predict(&self, _input: &Array4<f32>) -> Result<Vec<f32>> {
        Err(TriageError::Inference("simulated classifier failure".to_string()))
    }
}

/// 按通道求均值的特征提取器（NHWC 输入），输出 3 维特征
pub struct ChannelMeanExtractor;

impl FeatureExtractor for ChannelMeanExtractor {
    fn extract(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        let means = input
            .mean_axis(Axis(0))
            .and_then(|a| a.mean_axis(Axis(0)))
            .and_then(|a| a.mean_axis(Axis(0)))
            .ok_or_else(|| TriageError::Inference("empty input tensor".to_string()))?;
        Ok(means.to_vec())
    }
}

/// 由固定输出桩模型组装的结果组装器
pub fn stub_assembler(probabilities: Vec<f32>, prognosis_score: f32) -> ResultAssembler {
    ResultAssembler::new(
        Arc::new(ChannelMeanExtractor),
        Arc::new(FixedClassificationModel::new(probabilities)),
        Arc::new(FixedPrognosisModel::new(prognosis_score)),
        TEST_MODEL_VERSION,
    )
}

/// 将图像编码为 PNG 字节
pub fn encode_png(image: &DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .expect("png encoding of an in-memory image");
    buf.into_inner()
}
