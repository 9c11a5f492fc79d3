//! 结果存储
//!
//! 预测结果只有一份，存放在检查记录内。详情、看板、导出全部从这里读取，
//! 因此不同视图之间不会出现不一致。

use crate::repository::{MemoryScanRepository, ScanRepository};
use std::sync::Arc;
use tracing::info;
use triage_core::{Patient, PredictionResult, Result, Scan, TriageError};
use uuid::Uuid;

/// 与 patients 表的 VARCHAR 长度一致
const PATIENT_FIELD_LIMITS: [(&str, usize); 4] = [
    ("name", 255),
    ("hospital_number", 64),
    ("national_id", 64),
    ("created_by", 255),
];

/// 患者、检查与预测结果的统一访问入口
#[derive(Clone)]
pub struct ResultStore {
    repository: Arc<dyn ScanRepository>,
}

impl ResultStore {
    pub fn new(repository: Arc<dyn ScanRepository>) -> Self {
        Self { repository }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryScanRepository::new()))
    }

    /// 登记患者
    pub async fn register_patient(&self, patient: &Patient) -> Result<()> {
        if patient.name.trim().is_empty() || patient.hospital_number.trim().is_empty() {
            return Err(TriageError::Validation("患者姓名和病历号不能为空".to_string()));
        }

        let values = [
            &patient.name,
            &patient.hospital_number,
            &patient.national_id,
            &patient.created_by,
        ];
        for ((field, limit), value) in PATIENT_FIELD_LIMITS.iter().zip(values) {
            if value.chars().count() > *limit {
                return Err(TriageError::Validation(format!(
                    "{} 超过 {} 个字符",
                    field, limit
                )));
            }
        }

        self.repository.insert_patient(patient).await?;
        info!("Registered patient {}", patient.id);
        Ok(())
    }

    pub async fn patient(&self, id: &Uuid) -> Result<Patient> {
        self.repository
            .get_patient(id)
            .await?
            .ok_or_else(|| TriageError::NotFound(format!("患者不存在: {}", id)))
    }

    /// 保存检查，预测结果必须已经计算完成
    pub async fn record_scan(&self, scan: &Scan) -> Result<()> {
        let prediction = scan.prediction().ok_or_else(|| {
            TriageError::Validation(format!("检查 {} 缺少预测结果", scan.id))
        })?;

        self.repository.insert_scan(scan).await?;
        info!(
            scan_id = %scan.id,
            patient_id = %scan.patient_id,
            classification = %prediction.classification_label,
            "Recorded scan"
        );
        Ok(())
    }

    pub async fn scan(&self, id: &Uuid) -> Result<Scan> {
        self.repository
            .get_scan(id)
            .await?
            .ok_or_else(|| TriageError::NotFound(format!("检查不存在: {}", id)))
    }

    /// 检查的预测结果
    pub async fn prediction_for_scan(&self, id: &Uuid) -> Result<PredictionResult> {
        let scan = self.scan(id).await?;
        scan.prediction()
            .cloned()
            .ok_or_else(|| TriageError::NotFound(format!("检查 {} 没有预测结果", id)))
    }

    /// 患者最近一次检查，看板使用
    pub async fn latest_for_patient(&self, patient_id: &Uuid) -> Result<Option<Scan>> {
        self.patient(patient_id).await?;
        self.repository.latest_scan_for_patient(patient_id).await
    }

    /// 患者全部检查，最新的在前
    pub async fn scans_for_patient(&self, patient_id: &Uuid) -> Result<Vec<Scan>> {
        self.patient(patient_id).await?;
        self.repository.list_scans_for_patient(patient_id).await
    }

    /// 删除检查及其预测结果，患者保留。返回被删除的检查，调用方据此清理文件
    pub async fn delete_scan(&self, id: &Uuid) -> Result<Scan> {
        let scan = self.scan(id).await?;
        if !self.repository.delete_scan(id).await? {
            return Err(TriageError::NotFound(format!("检查不存在: {}", id)));
        }
        info!("Deleted scan {}", id);
        Ok(scan)
    }

    /// 导出所需的患者与检查，检查必须带预测结果
    pub async fn export_scan(&self, id: &Uuid) -> Result<(Patient, Scan)> {
        let scan = self.scan(id).await?;
        if !scan.has_prediction() {
            return Err(TriageError::NotFound(format!("检查 {} 没有预测结果", id)));
        }
        let patient = self.patient(&scan.patient_id).await?;
        Ok((patient, scan))
    }
}
