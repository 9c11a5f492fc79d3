//! 影像分类模型

use crate::contract::CNN_INPUT;
use crate::onnx::{load_plan, run_plan, OnnxPlan};
use ndarray::Array4;
use triage_core::Result;

/// 分类模型：CNN 输入张量 → 各类别概率
///
/// 给定已加载的权重，`predict` 是输入的纯函数，可被多个请求并发调用。
pub trait ClassificationModel: Send + Sync {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>>;
}

/// 基于 ONNX 的卷积分类网络，输出层为 softmax
pub struct OnnxClassificationModel {
    plan: OnnxPlan,
}

impl OnnxClassificationModel {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let plan = load_plan(bytes, CNN_INPUT, "classifier")?;
        Ok(Self { plan })
    }
}

impl ClassificationModel for OnnxClassificationModel {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        run_plan(&self.plan, input, "classifier")
    }
}
