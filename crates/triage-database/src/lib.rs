//! # 分诊数据库模块
//!
//! 负责患者与检查记录的持久化。预测结果内嵌在检查记录中，与检查在同一次写入中创建；
//! 所有读取方都经由 [`ResultStore`] 读取，不存在独立维护的结果表。

pub mod connection;
pub mod models;
pub mod queries;
pub mod repository;
pub mod store;

// 重新导出主要类型
pub use connection::DatabasePool;
pub use queries::DatabaseQueries;
pub use repository::{MemoryScanRepository, PgScanRepository, ScanRepository};
pub use store::ResultStore;
