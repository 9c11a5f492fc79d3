//! 数据库连接管理

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{error, info};
use triage_core::{Result, TriageError};

/// 数据库连接池
#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// 建立连接池并执行一次 ping
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| {
                error!("数据库连接失败: {}", e);
                TriageError::Database(e.to_string())
            })?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| TriageError::Database(e.to_string()))?;

        info!("Database connection successful");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
