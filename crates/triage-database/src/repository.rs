//! 检查记录仓储
//!
//! Postgres 为生产实现，内存实现用于测试和无数据库的演示部署。

use crate::connection::DatabasePool;
use crate::queries::DatabaseQueries;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use triage_core::{Patient, Result, Scan, TriageError};
use uuid::Uuid;

/// 患者与检查的持久化接口
#[async_trait]
pub trait ScanRepository: Send + Sync {
    async fn insert_patient(&self, patient: &Patient) -> Result<()>;
    async fn get_patient(&self, id: &Uuid) -> Result<Option<Patient>>;
    /// 检查只创建一次，患者必须存在
    async fn insert_scan(&self, scan: &Scan) -> Result<()>;
    async fn get_scan(&self, id: &Uuid) -> Result<Option<Scan>>;
    /// 按上传时间倒序
    async fn list_scans_for_patient(&self, patient_id: &Uuid) -> Result<Vec<Scan>>;
    async fn latest_scan_for_patient(&self, patient_id: &Uuid) -> Result<Option<Scan>>;
    /// 返回是否确实删除了记录
    async fn delete_scan(&self, id: &Uuid) -> Result<bool>;
}

/// Postgres 仓储
pub struct PgScanRepository {
    pool: DatabasePool,
}

impl PgScanRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// 建表
    pub async fn migrate(&self) -> Result<()> {
        DatabaseQueries::new(&self.pool).create_tables().await
    }
}

#[async_trait]
impl ScanRepository for PgScanRepository {
    async fn insert_patient(&self, patient: &Patient) -> Result<()> {
        DatabaseQueries::new(&self.pool).insert_patient(patient).await
    }

    async fn get_patient(&self, id: &Uuid) -> Result<Option<Patient>> {
        DatabaseQueries::new(&self.pool).get_patient_by_id(id).await
    }

    async fn insert_scan(&self, scan: &Scan) -> Result<()> {
        DatabaseQueries::new(&self.pool).insert_scan(scan).await
    }

    async fn get_scan(&self, id: &Uuid) -> Result<Option<Scan>> {
        DatabaseQueries::new(&self.pool).get_scan_by_id(id).await
    }

    async fn list_scans_for_patient(&self, patient_id: &Uuid) -> Result<Vec<Scan>> {
        DatabaseQueries::new(&self.pool)
            .get_scans_by_patient_id(patient_id)
            .await
    }

    async fn latest_scan_for_patient(&self, patient_id: &Uuid) -> Result<Option<Scan>> {
        DatabaseQueries::new(&self.pool)
            .get_latest_scan_by_patient_id(patient_id)
            .await
    }

    async fn delete_scan(&self, id: &Uuid) -> Result<bool> {
        DatabaseQueries::new(&self.pool).delete_scan(id).await
    }
}

#[derive(Default)]
struct MemoryState {
    patients: HashMap<Uuid, Patient>,
    // 插入顺序
    scans: Vec<Scan>,
}

/// 内存仓储
#[derive(Default)]
pub struct MemoryScanRepository {
    state: RwLock<MemoryState>,
}

impl MemoryScanRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScanRepository for MemoryScanRepository {
    async fn insert_patient(&self, patient: &Patient) -> Result<()> {
        let mut state = self.state.write().await;
        let duplicate = state.patients.values().any(|p| {
            p.id == patient.id || p.hospital_number == patient.hospital_number
        });
        if duplicate {
            return Err(TriageError::Validation("患者已存在".to_string()));
        }
        state.patients.insert(patient.id, patient.clone());
        Ok(())
    }

    async fn get_patient(&self, id: &Uuid) -> Result<Option<Patient>> {
        Ok(self.state.read().await.patients.get(id).cloned())
    }

    async fn insert_scan(&self, scan: &Scan) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.patients.contains_key(&scan.patient_id) {
            return Err(TriageError::NotFound("患者不存在".to_string()));
        }
        if state.scans.iter().any(|s| s.id == scan.id) {
            return Err(TriageError::Validation("检查已存在".to_string()));
        }
        state.scans.push(scan.clone());
        Ok(())
    }

    async fn get_scan(&self, id: &Uuid) -> Result<Option<Scan>> {
        let state = self.state.read().await;
        Ok(state.scans.iter().find(|s| s.id == *id).cloned())
    }

    async fn list_scans_for_patient(&self, patient_id: &Uuid) -> Result<Vec<Scan>> {
        let state = self.state.read().await;
        // 先按插入倒序，稳定排序后同一时间戳的后插入者在前
        let mut scans: Vec<Scan> = state
            .scans
            .iter()
            .rev()
            .filter(|s| s.patient_id == *patient_id)
            .cloned()
            .collect();
        scans.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(scans)
    }

    async fn latest_scan_for_patient(&self, patient_id: &Uuid) -> Result<Option<Scan>> {
        Ok(self
            .list_scans_for_patient(patient_id)
            .await?
            .into_iter()
            .next())
    }

    async fn delete_scan(&self, id: &Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.scans.len();
        state.scans.retain(|s| s.id != *id);
        Ok(state.scans.len() < before)
    }
}
