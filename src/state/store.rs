//! 状态存储抽象层
//!
//! 统一的键值存储接口（值为 JSON），支持内存和 SQLite 持久化两种实现

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::StateSection;
use crate::core::StateError;

#[cfg(feature = "async-sqlite")]
use super::persistent::PersistentStateStore;

/// 状态存储接口
#[async_trait]
pub trait StateStore: Send + Sync {
    /// 读取键对应的值，不存在时返回 None
    async fn load(&self, key: &str) -> Result<Option<Value>, StateError>;

    /// 写入（覆盖）键对应的值
    async fn save(&self, key: &str, value: Value) -> Result<(), StateError>;

    /// 删除键；不存在时视为成功
    async fn delete(&self, key: &str) -> Result<(), StateError>;
}

/// 内存状态存储
#[derive(Default)]
pub struct MemoryStateStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, StateError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), StateError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StateError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// 创建状态存储
///
/// backend = "sqlite" 且启用了 async-sqlite feature 时使用持久化存储；否则使用内存存储
pub async fn create_state_store(config: &StateSection) -> Arc<dyn StateStore> {
    let wants_sqlite = config.backend.eq_ignore_ascii_case("sqlite");

    #[cfg(feature = "async-sqlite")]
    if wants_sqlite {
        let path = config
            .db_path
            .clone()
            .unwrap_or_else(|| std::path::PathBuf::from("crmbot.db"));
        match PersistentStateStore::new(&path).await {
            Ok(store) => {
                tracing::info!("Using persistent state store: {:?}", path);
                return Arc::new(store);
            }
            Err(e) => {
                tracing::warn!("Failed to open persistent state store, falling back to memory: {}", e);
            }
        }
    }

    #[cfg(not(feature = "async-sqlite"))]
    if wants_sqlite {
        tracing::warn!("SQLite state store requested but async-sqlite feature not enabled, using memory store");
    }

    tracing::info!("Using in-memory state store");
    Arc::new(MemoryStateStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_crud() {
        let store = MemoryStateStore::new();
        assert_eq!(store.load("k").await.unwrap(), None);

        store.save("k", json!({"a": 1})).await.unwrap();
        assert_eq!(store.load("k").await.unwrap(), Some(json!({"a": 1})));

        store.save("k", json!({"a": 2})).await.unwrap();
        assert_eq!(store.len().await, 1);

        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_factory_defaults_to_memory() {
        let store = create_state_store(&StateSection::default()).await;
        store.save("x", json!(1)).await.unwrap();
        assert_eq!(store.load("x").await.unwrap(), Some(json!(1)));
    }
}
