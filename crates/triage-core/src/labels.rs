//! 标签映射
//!
//! 模型原始输出（类别下标、连续评分）到固定可读标签的查表映射。
//! 表外的键一律映射为 `Unknown`，不会使流水线失败。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 影像分类标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassificationLabel {
    Normal,
    Benign,
    Malignant,
    Unknown,
}

impl ClassificationLabel {
    /// 固定查表：{0: Normal, 1: Benign, 2: Malignant}
    pub fn from_index(index: i64) -> Self {
        match index {
            0 => ClassificationLabel::Normal,
            1 => ClassificationLabel::Benign,
            2 => ClassificationLabel::Malignant,
            _ => ClassificationLabel::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationLabel::Normal => "Normal",
            ClassificationLabel::Benign => "Benign",
            ClassificationLabel::Malignant => "Malignant",
            ClassificationLabel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ClassificationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 预后标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrognosisLabel {
    Good,
    Fair,
    Poor,
    Unknown,
}

impl PrognosisLabel {
    /// 固定查表：{0: Good, 1: Fair, 2: Poor}，键为取整后的评分
    pub fn from_index(index: i64) -> Self {
        match index {
            0 => PrognosisLabel::Good,
            1 => PrognosisLabel::Fair,
            2 => PrognosisLabel::Poor,
            _ => PrognosisLabel::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrognosisLabel::Good => "Good",
            PrognosisLabel::Fair => "Fair",
            PrognosisLabel::Poor => "Poor",
            PrognosisLabel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PrognosisLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 标签映射器
pub struct LabelMapper;

impl LabelMapper {
    /// 分类下标映射
    pub fn classify_label(index: i64) -> ClassificationLabel {
        ClassificationLabel::from_index(index)
    }

    /// 取整后的预后评分映射
    pub fn prognosis_label(rounded_score: i64) -> PrognosisLabel {
        PrognosisLabel::from_index(rounded_score)
    }

    /// 四舍五入到最近整数，.5 远离零取整
    ///
    /// 非有限值返回 `None`；超出 i64 范围的值饱和到边界，查表时必然落到 `Unknown`。
    pub fn round_score(score: f32) -> Option<i64> {
        if !score.is_finite() {
            return None;
        }
        Some(score.round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        assert_eq!(LabelMapper::classify_label(0), ClassificationLabel::Normal);
        assert_eq!(LabelMapper::classify_label(1), ClassificationLabel::Benign);
        assert_eq!(LabelMapper::classify_label(2), ClassificationLabel::Malignant);
        assert_eq!(LabelMapper::classify_label(3), ClassificationLabel::Unknown);
        assert_eq!(LabelMapper::classify_label(-1), ClassificationLabel::Unknown);
    }

    #[test]
    fn test_prognosis_table() {
        assert_eq!(LabelMapper::prognosis_label(0), PrognosisLabel::Good);
        assert_eq!(LabelMapper::prognosis_label(1), PrognosisLabel::Fair);
        assert_eq!(LabelMapper::prognosis_label(2), PrognosisLabel::Poor);
        assert_eq!(LabelMapper::prognosis_label(7), PrognosisLabel::Unknown);
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(LabelMapper::round_score(1.5), Some(2));
        assert_eq!(LabelMapper::round_score(0.5), Some(1));
        assert_eq!(LabelMapper::round_score(-0.5), Some(-1));
        assert_eq!(LabelMapper::round_score(1.2), Some(1));
        assert_eq!(LabelMapper::round_score(2.49), Some(2));
        assert_eq!(LabelMapper::round_score(f32::NAN), None);
        assert_eq!(LabelMapper::round_score(f32::INFINITY), None);
    }

    #[test]
    fn test_rounded_scores_map_through_table() {
        let label = |s: f32| LabelMapper::round_score(s).map(LabelMapper::prognosis_label);
        assert_eq!(label(1.5), Some(PrognosisLabel::Poor));
        assert_eq!(label(-0.5), Some(PrognosisLabel::Unknown));
        assert_eq!(label(-0.4), Some(PrognosisLabel::Good));
    }

    #[test]
    fn test_labels_serialize_as_names() {
        let json = serde_json::to_string(&ClassificationLabel::Malignant).unwrap();
        assert_eq!(json, "\"Malignant\"");
        assert_eq!(PrognosisLabel::Fair.to_string(), "Fair");
    }
}
