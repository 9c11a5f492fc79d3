//! 特征提取
//!
//! 冻结的预训练卷积骨干网络，去掉分类头，输出最深层卷积特征图。
//! 进程启动时加载一次，之后所有请求共享只读实例。

use crate::contract::FEATURE_INPUT;
use crate::onnx::{load_plan, run_plan, OnnxPlan};
use ndarray::Array4;
use triage_core::Result;

/// 特征提取器
pub trait FeatureExtractor: Send + Sync {
    /// 将归一化图像张量映射为展平的一维特征向量
    fn extract(&self, input: &Array4<f32>) -> Result<Vec<f32>>;
}

/// 基于 ONNX 骨干网络的特征提取器
pub struct OnnxFeatureExtractor {
    plan: OnnxPlan,
}

impl OnnxFeatureExtractor {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let plan = load_plan(bytes, FEATURE_INPUT, "feature_extractor")?;
        Ok(Self { plan })
    }
}

impl FeatureExtractor for OnnxFeatureExtractor {
    fn extract(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        run_plan(&self.plan, input, "feature_extractor")
    }
}
