//! 预后模型
//!
//! 经典机器学习模型，输入为骨干网络特征向量（单行矩阵），输出一个连续评分。

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::info;
use triage_core::{Result, TriageError};

/// 预后模型：特征矩阵 [1, n] → 标量评分
pub trait PrognosisModel: Send + Sync {
    fn predict(&self, features: &Array2<f32>) -> Result<f32>;
}

/// 线性决策函数 `score = coefficients · x + intercept`
///
/// 权重文件为 JSON：`{"coefficients": [...], "intercept": 0.0}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearPrognosisModel {
    coefficients: Vec<f32>,
    intercept: f32,
}

impl LinearPrognosisModel {
    pub fn new(coefficients: Vec<f32>, intercept: f32) -> Result<Self> {
        let model = Self {
            coefficients,
            intercept,
        };
        model.validate()?;
        Ok(model)
    }

    /// 从模型仓库拉取的权重文件加载
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let model: Self = serde_json::from_slice(bytes)
            .map_err(|e| TriageError::ModelUnavailable(format!("预后模型权重无法解析: {}", e)))?;
        model.validate()?;

        info!("Prognosis model loaded with {} features", model.n_features());
        Ok(model)
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn validate(&self) -> Result<()> {
        if self.coefficients.is_empty() {
            return Err(TriageError::ModelUnavailable("预后模型系数为空".to_string()));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(TriageError::ModelUnavailable("预后模型包含非有限权重".to_string()));
        }
        Ok(())
    }
}

impl PrognosisModel for LinearPrognosisModel {
    fn predict(&self, features: &Array2<f32>) -> Result<f32> {
        if features.nrows() != 1 {
            return Err(TriageError::Inference(format!(
                "预后模型期望单行输入，实际 {} 行",
                features.nrows()
            )));
        }
        if features.ncols() != self.n_features() {
            return Err(TriageError::Inference(format!(
                "特征维度不匹配: 期望 {}，实际 {}",
                self.n_features(),
                features.ncols()
            )));
        }

        // 固定顺序的 f64 累加，相同输入得到逐位相同的结果
        let dot: f64 = features
            .row(0)
            .iter()
            .zip(&self.coefficients)
            .map(|(x, w)| f64::from(*x) * f64::from(*w))
            .sum();

        Ok((dot + f64::from(self.intercept)) as f32)
    }
}
