//! 结果导出
//!
//! 导出文档只由已保存的患者与检查生成，不含导出时间，同一检查每次导出的 JSON 完全相同。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use triage_core::{
    ClassificationLabel, Patient, PrognosisLabel, Result, Scan, TriageError,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportPatient {
    pub id: Uuid,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub hospital_number: String,
    pub national_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportScan {
    pub id: Uuid,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub classification: ClassificationLabel,
    pub prognosis: PrognosisLabel,
    pub classification_confidence: f32,
    pub prognosis_confidence: f32,
    pub model_version: String,
}

/// 单次检查的导出文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub patient: ExportPatient,
    pub scan: ExportScan,
}

impl ExportDocument {
    pub fn build(patient: &Patient, scan: &Scan) -> Result<Self> {
        if scan.patient_id != patient.id {
            return Err(TriageError::Internal(format!(
                "检查 {} 不属于患者 {}",
                scan.id, patient.id
            )));
        }
        let prediction = scan
            .prediction()
            .ok_or_else(|| TriageError::NotFound(format!("检查 {} 没有预测结果", scan.id)))?;

        Ok(Self {
            patient: ExportPatient {
                id: patient.id,
                name: patient.name.clone(),
                dob: patient.dob,
                hospital_number: patient.hospital_number.clone(),
                national_id: patient.national_id.clone(),
            },
            scan: ExportScan {
                id: scan.id,
                filename: scan.filename.clone(),
                uploaded_at: scan.uploaded_at,
                classification: prediction.classification_label,
                prognosis: prediction.prognosis_label,
                classification_confidence: prediction.classification_confidence,
                prognosis_confidence: prediction.prognosis_confidence,
                model_version: prediction.model_version.clone(),
            },
        })
    }
}
