//! 核心数据模型定义

use crate::error::{Result, TriageError};
use crate::labels::{ClassificationLabel, PrognosisLabel};
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 患者基本信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub dob: Option<NaiveDate>,      // 出生日期
    pub hospital_number: String,     // 医院内部病历号
    pub national_id: String,         // 身份证号
    pub created_by: String,          // 录入人
    pub created_at: DateTime<Utc>,
}

impl Patient {
    pub fn new(
        name: String,
        dob: Option<NaiveDate>,
        hospital_number: String,
        national_id: String,
        created_by: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            dob,
            hospital_number,
            national_id,
            created_by,
            created_at: Utc::now().trunc_subsecs(6),
        }
    }
}

/// 单次影像的预测结果
///
/// 与所属检查一起创建，写入后不可修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub classification_label: ClassificationLabel,
    pub prognosis_label: PrognosisLabel,
    /// 取值 [0,1]
    pub classification_confidence: f32,
    /// 预后评分的绝对值，不是概率
    pub prognosis_confidence: f32,
    pub model_version: String,
}

/// 上传的影像检查
///
/// 预测结果只能从无到有设置一次，之后不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub filename: String,
    pub storage_path: String,
    pub uploaded_at: DateTime<Utc>,
    prediction: Option<PredictionResult>,
}

impl Scan {
    /// 创建尚无预测结果的检查
    pub fn new(patient_id: Uuid, filename: String, storage_path: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            filename,
            storage_path,
            // TIMESTAMPTZ 只保存到微秒
            uploaded_at: Utc::now().trunc_subsecs(6),
            prediction: None,
        }
    }

    /// 上传时一次性创建带预测结果的检查
    pub fn with_prediction(
        patient_id: Uuid,
        filename: String,
        storage_path: String,
        prediction: PredictionResult,
    ) -> Self {
        Self {
            prediction: Some(prediction),
            ..Self::new(patient_id, filename, storage_path)
        }
    }

    /// 从持久化记录还原
    pub fn restore(
        id: Uuid,
        patient_id: Uuid,
        filename: String,
        storage_path: String,
        uploaded_at: DateTime<Utc>,
        prediction: Option<PredictionResult>,
    ) -> Self {
        Self {
            id,
            patient_id,
            filename,
            storage_path,
            uploaded_at,
            prediction,
        }
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        self.prediction.as_ref()
    }

    pub fn has_prediction(&self) -> bool {
        self.prediction.is_some()
    }

    /// absent → computed，单向转换
    pub fn attach_prediction(&mut self, prediction: PredictionResult) -> Result<()> {
        if self.prediction.is_some() {
            return Err(TriageError::PredictionAlreadySet { scan_id: self.id });
        }
        self.prediction = Some(prediction);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_prediction() -> PredictionResult {
        PredictionResult {
            classification_label: ClassificationLabel::Benign,
            prognosis_label: PrognosisLabel::Good,
            classification_confidence: 0.7,
            prognosis_confidence: 0.1,
            model_version: "r1+000000000000".to_string(),
        }
    }

    #[test]
    fn test_attach_prediction_once() {
        let mut scan = Scan::new(Uuid::new_v4(), "a.png".into(), "p/a.png".into());
        assert!(!scan.has_prediction());

        scan.attach_prediction(sample_prediction()).unwrap();
        assert_eq!(scan.prediction(), Some(&sample_prediction()));

        let mut other = sample_prediction();
        other.classification_label = ClassificationLabel::Malignant;
        let err = scan.attach_prediction(other).unwrap_err();
        assert!(matches!(err, TriageError::PredictionAlreadySet { scan_id } if scan_id == scan.id));
        assert_eq!(scan.prediction(), Some(&sample_prediction()));
    }

    #[test]
    fn test_upload_time_has_microsecond_precision() {
        use chrono::Timelike;

        for _ in 0..16 {
            let scan = Scan::new(Uuid::new_v4(), "a.png".into(), "p/a.png".into());
            assert_eq!(scan.uploaded_at.nanosecond() % 1_000, 0);
        }
    }

    #[test]
    fn test_scan_roundtrips_with_embedded_prediction() {
        let scan = Scan::with_prediction(
            Uuid::new_v4(),
            "chest.png".into(),
            "uploads/chest.png".into(),
            sample_prediction(),
        );
        let json = serde_json::to_value(&scan).unwrap();
        assert_eq!(json["prediction"]["classification_label"], "Benign");

        let back: Scan = serde_json::from_value(json).unwrap();
        assert_eq!(back, scan);
    }
}
