//! 数据库模型

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use triage_core::models::{Patient, PredictionResult, Scan};
use uuid::Uuid;

/// 数据库患者表
#[derive(Debug, FromRow)]
pub struct DbPatient {
    pub id: Uuid,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub hospital_number: String,
    pub national_id: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbPatient> for Patient {
    fn from(db_patient: DbPatient) -> Self {
        Patient {
            id: db_patient.id,
            name: db_patient.name,
            dob: db_patient.dob,
            hospital_number: db_patient.hospital_number,
            national_id: db_patient.national_id,
            created_by: db_patient.created_by,
            created_at: db_patient.created_at,
        }
    }
}

/// 数据库检查表，预测结果以 JSONB 内嵌
#[derive(Debug, FromRow)]
pub struct DbScan {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub filename: String,
    pub storage_path: String,
    pub uploaded_at: DateTime<Utc>,
    pub prediction: Option<Json<PredictionResult>>,
}

impl From<DbScan> for Scan {
    fn from(db_scan: DbScan) -> Self {
        Scan::restore(
            db_scan.id,
            db_scan.patient_id,
            db_scan.filename,
            db_scan.storage_path,
            db_scan.uploaded_at,
            db_scan.prediction.map(|json| json.0),
        )
    }
}
