//! 数据库查询操作

use crate::connection::DatabasePool;
use crate::models::*;
use sqlx::types::Json;
use triage_core::{Patient, Result, Scan, TriageError};
use uuid::Uuid;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// 同一时间戳的检查按写入顺序，后写入者在前
const SCANS_BY_PATIENT: &str =
    "SELECT * FROM scans WHERE patient_id = $1 ORDER BY uploaded_at DESC, seq DESC";
const LATEST_SCAN_BY_PATIENT: &str =
    "SELECT * FROM scans WHERE patient_id = $1 ORDER BY uploaded_at DESC, seq DESC LIMIT 1";

/// 数据库查询操作接口
pub struct DatabaseQueries<'a> {
    pool: &'a DatabasePool,
}

impl<'a> DatabaseQueries<'a> {
    pub fn new(pool: &'a DatabasePool) -> Self {
        Self { pool }
    }

    /// 创建数据库表
    pub async fn create_tables(&self) -> Result<()> {
        let pool = self.pool.pool();

        // 创建患者表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS patients (
                id UUID PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                dob DATE,
                hospital_number VARCHAR(64) UNIQUE NOT NULL,
                national_id VARCHAR(64) NOT NULL,
                created_by VARCHAR(255) NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| TriageError::Database(e.to_string()))?;

        // 创建检查表，预测结果内嵌为 JSONB 列
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS scans (
                id UUID PRIMARY KEY,
                patient_id UUID NOT NULL REFERENCES patients(id) ON DELETE RESTRICT,
                filename VARCHAR(255) NOT NULL,
                storage_path VARCHAR(512) NOT NULL,
                uploaded_at TIMESTAMP WITH TIME ZONE NOT NULL,
                prediction JSONB,
                seq BIGSERIAL NOT NULL
            )
        "#).execute(pool).await.map_err(|e| TriageError::Database(e.to_string()))?;

        // 旧库补齐写入序号列
        sqlx::query("ALTER TABLE scans ADD COLUMN IF NOT EXISTS seq BIGSERIAL NOT NULL")
            .execute(pool)
            .await
            .map_err(|e| TriageError::Database(e.to_string()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_scans_patient_uploaded_seq ON scans(patient_id, uploaded_at DESC, seq DESC)")
            .execute(pool)
            .await
            .map_err(|e| TriageError::Database(e.to_string()))?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    // ========== 患者相关操作 ==========

    /// 创建新患者
    pub async fn insert_patient(&self, patient: &Patient) -> Result<()> {
        sqlx::query(r#"
            INSERT INTO patients (id, name, dob, hospital_number, national_id, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#)
        .bind(patient.id)
        .bind(&patient.name)
        .bind(patient.dob)
        .bind(&patient.hospital_number)
        .bind(&patient.national_id)
        .bind(&patient.created_by)
        .bind(patient.created_at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| map_write_error(e, "患者已存在"))?;

        Ok(())
    }

    /// 根据ID查找患者
    pub async fn get_patient_by_id(&self, id: &Uuid) -> Result<Option<Patient>> {
        let result = sqlx::query_as::<_, DbPatient>(
            "SELECT * FROM patients WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| TriageError::Database(e.to_string()))?;

        Ok(result.map(Patient::from))
    }

    // ========== 检查相关操作 ==========

    /// 创建检查，预测结果在同一条 INSERT 中写入
    pub async fn insert_scan(&self, scan: &Scan) -> Result<()> {
        sqlx::query(r#"
            INSERT INTO scans (id, patient_id, filename, storage_path, uploaded_at, prediction)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#)
        .bind(scan.id)
        .bind(scan.patient_id)
        .bind(&scan.filename)
        .bind(&scan.storage_path)
        .bind(scan.uploaded_at)
        .bind(scan.prediction().map(Json))
        .execute(self.pool.pool())
        .await
        .map_err(|e| map_write_error(e, "检查已存在"))?;

        Ok(())
    }

    /// 根据ID查找检查
    pub async fn get_scan_by_id(&self, id: &Uuid) -> Result<Option<Scan>> {
        let result = sqlx::query_as::<_, DbScan>(
            "SELECT * FROM scans WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| TriageError::Database(e.to_string()))?;

        Ok(result.map(Scan::from))
    }

    /// 根据患者ID获取所有检查，最新的在前
    pub async fn get_scans_by_patient_id(&self, patient_id: &Uuid) -> Result<Vec<Scan>> {
        let results = sqlx::query_as::<_, DbScan>(SCANS_BY_PATIENT)
        .bind(patient_id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| TriageError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Scan::from).collect())
    }

    /// 患者最近一次检查
    pub async fn get_latest_scan_by_patient_id(&self, patient_id: &Uuid) -> Result<Option<Scan>> {
        let result = sqlx::query_as::<_, DbScan>(LATEST_SCAN_BY_PATIENT)
        .bind(patient_id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| TriageError::Database(e.to_string()))?;

        Ok(result.map(Scan::from))
    }

    /// 删除检查，不影响患者记录
    pub async fn delete_scan(&self, id: &Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM scans WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| TriageError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

/// 唯一约束冲突 → 验证错误，外键缺失 → 未找到
fn map_write_error(e: sqlx::Error, duplicate_message: &str) -> TriageError {
    let code = e
        .as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned());

    match code.as_deref() {
        Some(UNIQUE_VIOLATION) => TriageError::Validation(duplicate_message.to_string()),
        Some(FOREIGN_KEY_VIOLATION) => TriageError::NotFound("患者不存在".to_string()),
        _ => TriageError::Database(e.to_string()),
    }
}
