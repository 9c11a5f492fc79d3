//! # 上传存储模块
//!
//! 负责原始影像上传文件的落盘与读取。

pub mod storage;

pub use storage::*;
