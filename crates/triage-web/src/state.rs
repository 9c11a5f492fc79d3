//! 共享应用状态

use crate::upload::UploadService;
use std::sync::Arc;
use triage_admin::InferenceMetrics;
use triage_database::ResultStore;
use triage_inference::ResultAssembler;
use triage_storage::StorageManager;

/// 所有处理器共享的状态，克隆只复制句柄
#[derive(Clone)]
pub struct AppState {
    pub uploads: UploadService,
    pub results: ResultStore,
    pub metrics: InferenceMetrics,
    pub model_version: Arc<str>,
}

impl AppState {
    pub fn new(
        assembler: ResultAssembler,
        results: ResultStore,
        storage: Arc<StorageManager>,
        metrics: InferenceMetrics,
    ) -> Self {
        let model_version = Arc::from(assembler.model_version());
        let uploads = UploadService::new(assembler, results.clone(), storage, metrics.clone());

        Self {
            uploads,
            results,
            metrics,
            model_version,
        }
    }
}
