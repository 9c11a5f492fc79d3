//! 上传编排
//!
//! 校验患者 → 解码并推理 → 保存文件 → 写入带预测结果的检查。
//! 解码或推理失败时既不落盘也不产生检查记录；写库失败时删除已保存的文件。

use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use triage_admin::InferenceMetrics;
use triage_core::{Result, Scan, TriageError};
use triage_database::ResultStore;
use triage_inference::ResultAssembler;
use triage_storage::StorageManager;
use uuid::Uuid;

/// 上传服务
#[derive(Clone)]
pub struct UploadService {
    assembler: ResultAssembler,
    results: ResultStore,
    storage: Arc<StorageManager>,
    metrics: InferenceMetrics,
}

impl UploadService {
    pub fn new(
        assembler: ResultAssembler,
        results: ResultStore,
        storage: Arc<StorageManager>,
        metrics: InferenceMetrics,
    ) -> Self {
        Self {
            assembler,
            results,
            storage,
            metrics,
        }
    }

    /// 处理一次上传，成功时返回已保存的检查
    pub async fn ingest(&self, patient_id: &Uuid, filename: &str, data: Bytes) -> Result<Scan> {
        self.metrics.record_upload();

        match self.process(patient_id, filename, data).await {
            Ok(scan) => Ok(scan),
            Err(e) => {
                self.metrics.record_failure(e.kind());
                warn!("上传处理失败 patient={} file={}: {}", patient_id, filename, e);
                Err(e)
            }
        }
    }

    async fn process(&self, patient_id: &Uuid, filename: &str, data: Bytes) -> Result<Scan> {
        self.results.patient(patient_id).await?;

        let assembler = self.assembler.clone();
        let bytes = data.clone();
        let started = Instant::now();
        let prediction = tokio::task::spawn_blocking(move || assembler.assemble_bytes(&bytes))
            .await
            .map_err(|e| TriageError::Internal(format!("推理线程异常: {}", e)))??;
        self.metrics
            .record_inference(prediction.classification_label.as_str(), started.elapsed());

        let mut scan = Scan::new(
            *patient_id,
            triage_core::utils::sanitize_filename(filename),
            String::new(),
        );
        scan.attach_prediction(prediction)?;
        let stored = self
            .storage
            .store_upload(patient_id, &scan.id, &scan.filename, &data)
            .await?;
        scan.storage_path = stored.storage_path;

        if let Err(e) = self.results.record_scan(&scan).await {
            if let Err(cleanup) = self.storage.remove_file(&scan.storage_path).await {
                warn!("清理上传文件失败 {}: {}", scan.storage_path, cleanup);
            }
            return Err(e);
        }

        info!(
            scan_id = %scan.id,
            digest = %stored.digest,
            size = stored.size,
            "Scan ingested"
        );
        Ok(scan)
    }

    /// 检查记录及其原始上传内容
    pub async fn original_upload(&self, scan_id: &Uuid) -> Result<(Scan, Vec<u8>)> {
        let scan = self.results.scan(scan_id).await?;
        let data = self.storage.get_file(&scan.storage_path).await?;
        Ok((scan, data))
    }

    /// 删除检查及其上传文件，患者保留
    pub async fn delete_scan(&self, scan_id: &Uuid) -> Result<()> {
        let scan = self.results.delete_scan(scan_id).await?;
        if let Err(e) = self.storage.remove_file(&scan.storage_path).await {
            warn!("删除上传文件失败 {}: {}", scan.storage_path, e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use triage_core::{ClassificationLabel, Patient, PrognosisLabel};
    use triage_inference::testing::{encode_png, stub_assembler};

    struct Fixture {
        service: UploadService,
        results: ResultStore,
        storage: Arc<StorageManager>,
        metrics: InferenceMetrics,
        patient: Patient,
        _dir: tempfile::TempDir,
    }

    async fn fixture(probabilities: Vec<f32>, score: f32) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(StorageManager::new(dir.path().to_str().unwrap()));
        let results = ResultStore::in_memory();
        let metrics = InferenceMetrics::new().unwrap();
        let patient = Patient::new(
            "赵六".to_string(),
            None,
            "H400".to_string(),
            "110101199912121234".to_string(),
            "dr.sun".to_string(),
        );
        results.register_patient(&patient).await.unwrap();

        let service = UploadService::new(
            stub_assembler(probabilities, score),
            results.clone(),
            storage.clone(),
            metrics.clone(),
        );

        Fixture {
            service,
            results,
            storage,
            metrics,
            patient,
            _dir: dir,
        }
    }

    fn png() -> Bytes {
        Bytes::from(encode_png(&DynamicImage::ImageRgb8(RgbImage::new(64, 48))))
    }

    #[tokio::test]
    async fn test_ingest_records_scan_with_prediction() {
        let f = fixture(vec![0.1, 0.2, 0.7], 2.0).await;

        let scan = f
            .service
            .ingest(&f.patient.id, "scan 1.png", png())
            .await
            .unwrap();

        let stored = f.results.scan(&scan.id).await.unwrap();
        assert_eq!(stored, scan);
        assert_eq!(stored.filename, "scan_1.png");
        let prediction = stored.prediction().unwrap();
        assert_eq!(prediction.classification_label, ClassificationLabel::Malignant);
        assert_eq!(prediction.prognosis_label, PrognosisLabel::Poor);

        let file = f.storage.get_file(&stored.storage_path).await.unwrap();
        assert_eq!(Bytes::from(file), png());
    }

    #[tokio::test]
    async fn test_decode_failure_leaves_nothing_behind() {
        let f = fixture(vec![1.0, 0.0, 0.0], 0.0).await;

        let err = f
            .service
            .ingest(&f.patient.id, "broken.png", Bytes::from_static(b"\x89PNG\r\n\x1a\ntruncated"))
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Decode(_)));

        assert!(f.results.scans_for_patient(&f.patient.id).await.unwrap().is_empty());
        let patient_dir = f.storage.base_path().join(f.patient.id.to_string());
        assert!(!patient_dir.exists());

        let metrics = f.metrics.render().unwrap();
        assert!(metrics.contains(r#"triage_upload_failures_total{kind="decode"} 1"#));
    }

    #[tokio::test]
    async fn test_unknown_patient_rejected_before_inference() {
        let f = fixture(vec![1.0, 0.0, 0.0], 0.0).await;
        let err = f
            .service
            .ingest(&Uuid::new_v4(), "a.png", png())
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::NotFound(_)));
        assert!(!f.metrics.render().unwrap().contains("triage_classifications_total{"));
    }

    #[tokio::test]
    async fn test_original_upload_returns_stored_bytes() {
        let f = fixture(vec![1.0, 0.0, 0.0], 0.0).await;
        let scan = f.service.ingest(&f.patient.id, "a.png", png()).await.unwrap();

        let (stored, data) = f.service.original_upload(&scan.id).await.unwrap();
        assert_eq!(stored.id, scan.id);
        assert_eq!(Bytes::from(data), png());

        assert!(matches!(
            f.service.original_upload(&Uuid::new_v4()).await,
            Err(TriageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_scan_removes_file() {
        let f = fixture(vec![1.0, 0.0, 0.0], 0.0).await;
        let scan = f.service.ingest(&f.patient.id, "a.png", png()).await.unwrap();

        f.service.delete_scan(&scan.id).await.unwrap();

        assert!(matches!(
            f.storage.get_file(&scan.storage_path).await,
            Err(TriageError::NotFound(_))
        ));
        assert!(f.results.patient(&f.patient.id).await.is_ok());
    }
}
