//! 评分器
//!
//! 神经网络和经典模型两种后端统一为 `score(input) -> (下标, 置信度)`，
//! 各自的输入类型保持不同。

use crate::classification::ClassificationModel;
use crate::prognosis::PrognosisModel;
use ndarray::{Array2, Array4};
use std::sync::Arc;
use triage_core::{LabelMapper, Result, TriageError};

/// 单个模型路径的评分
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    /// 查表用的标签下标
    pub index: i64,
    pub confidence: f32,
}

/// 评分能力
pub trait Scorer {
    type Input: ?Sized;

    fn score(&self, input: &Self::Input) -> Result<Score>;
}

/// 分类评分：argmax 下标 + 对应概率
#[derive(Clone)]
pub struct ClassificationScorer {
    model: Arc<dyn ClassificationModel>,
}

impl ClassificationScorer {
    pub fn new(model: Arc<dyn ClassificationModel>) -> Self {
        Self { model }
    }
}

impl Scorer for ClassificationScorer {
    type Input = Array4<f32>;

    fn score(&self, input: &Array4<f32>) -> Result<Score> {
        let probabilities = self.model.predict(input)?;

        if let Some(bad) = probabilities
            .iter()
            .find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0)
        {
            return Err(TriageError::Inference(format!(
                "分类模型输出不是概率分布: {}",
                bad
            )));
        }

        let (index, confidence) = first_argmax(&probabilities)
            .ok_or_else(|| TriageError::Inference("分类模型输出为空".to_string()))?;

        Ok(Score {
            index: index as i64,
            confidence,
        })
    }
}

/// 预后评分：评分四舍五入为下标，绝对值为置信度
#[derive(Clone)]
pub struct PrognosisScorer {
    model: Arc<dyn PrognosisModel>,
}

impl PrognosisScorer {
    pub fn new(model: Arc<dyn PrognosisModel>) -> Self {
        Self { model }
    }
}

impl Scorer for PrognosisScorer {
    type Input = Array2<f32>;

    fn score(&self, input: &Array2<f32>) -> Result<Score> {
        let raw = self.model.predict(input)?;
        let index = LabelMapper::round_score(raw)
            .ok_or_else(|| TriageError::Inference(format!("预后评分不是有限值: {}", raw)))?;

        Ok(Score {
            index,
            confidence: raw.abs(),
        })
    }
}

/// 最大值下标，并列时取最小下标
pub fn first_argmax(values: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((i, v)),
        }
    }
    best
}
