//! SQLite 状态存储（sqlx，异步）
//!
//! 需要启用 `async-sqlite` feature。所有状态存于单表 bot_state（key 主键，value 为 JSON 文本）。

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::store::StateStore;
use crate::core::StateError;

/// SQLite 持久化状态存储
pub struct PersistentStateStore {
    pool: SqlitePool,
}

impl PersistentStateStore {
    /// 打开（必要时创建）数据库文件并建表
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, sqlx::Error> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    /// 从连接池创建
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn init_tables(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS bot_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn backend_err(e: sqlx::Error) -> StateError {
    StateError::Backend(e.to_string())
}

#[async_trait]
impl StateStore for PersistentStateStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, StateError> {
        let row = sqlx::query("SELECT value FROM bot_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;

        match row {
            Some(row) => {
                let raw: String = row.get("value");
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), StateError> {
        let raw = serde_json::to_string(&value)?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query("INSERT OR REPLACE INTO bot_state (key, value, updated_at) VALUES (?, ?, ?)")
            .bind(key)
            .bind(&raw)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StateError> {
        sqlx::query("DELETE FROM bot_state WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }
}
