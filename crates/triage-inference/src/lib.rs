//! # Triage Inference
//!
//! 推理流水线：原始上传 → 解码 → 预处理 → {分类模型, 特征提取 → 预后模型}
//! → 标签映射 → 预测结果。
//!
//! 模型在进程启动时由 [`ModelRegistry`] 一次性加载，之后以只读句柄在并发请求间共享。

pub mod assembler;
pub mod classification;
pub mod contract;
pub mod decoder;
pub mod feature;
pub mod model_store;
mod onnx;
pub mod preprocess;
pub mod prognosis;
pub mod registry;
pub mod scorer;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use assembler::ResultAssembler;
pub use classification::{ClassificationModel, OnnxClassificationModel};
pub use contract::{InputContract, TensorLayout, CNN_INPUT, FEATURE_INPUT};
pub use decoder::ImageDecoder;
pub use feature::{FeatureExtractor, OnnxFeatureExtractor};
pub use model_store::ModelStore;
pub use preprocess::{PreparedInputs, Preprocessor};
pub use prognosis::{LinearPrognosisModel, PrognosisModel};
pub use registry::{ModelArtifacts, ModelRegistry};
pub use scorer::{ClassificationScorer, PrognosisScorer, Score, Scorer};
