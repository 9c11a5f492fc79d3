//! # 分诊 Web 模块
//!
//! 患者登记、影像上传、看板、导出等 HTTP 接口

pub mod error;
pub mod export;
pub mod handlers;
pub mod server;
pub mod state;
pub mod upload;

pub use error::{ApiError, ApiResult};
pub use export::ExportDocument;
pub use server::WebServer;
pub use state::AppState;
pub use upload::UploadService;
