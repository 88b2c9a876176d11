//! 类型化状态访问器
//!
//! 键格式为 `{scope}/{property}`，scope 为 `conversation/{id}` 或 `user/{id}`。
//! 读取时若不存在则用默认工厂创建（get-or-create），写回时机由调用方决定。

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::store::StateStore;
use crate::core::StateError;

/// 状态作用域
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateScope {
    Conversation(String),
    User(String),
}

impl fmt::Display for StateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateScope::Conversation(id) => write!(f, "conversation/{}", id),
            StateScope::User(id) => write!(f, "user/{}", id),
        }
    }
}

/// 某个属性的类型化访问器
pub struct StateAccessor<T> {
    store: Arc<dyn StateStore>,
    property: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for StateAccessor<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            property: self.property.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> StateAccessor<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn StateStore>, property: impl Into<String>) -> Self {
        Self {
            store,
            property: property.into(),
            _marker: PhantomData,
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn key(&self, scope: &StateScope) -> String {
        format!("{}/{}", scope, self.property)
    }

    pub async fn get(&self, scope: &StateScope) -> Result<Option<T>, StateError> {
        match self.store.load(&self.key(scope)).await? {
            Some(raw) => Ok(Some(serde_json::from_value(raw)?)),
            None => Ok(None),
        }
    }

    /// 读取；不存在时返回 default() 的值（不立即写入存储）
    pub async fn get_or_create<F>(&self, scope: &StateScope, default: F) -> Result<T, StateError>
    where
        F: FnOnce() -> T,
    {
        Ok(self.get(scope).await?.unwrap_or_else(default))
    }

    pub async fn set(&self, scope: &StateScope, value: &T) -> Result<(), StateError> {
        let raw = serde_json::to_value(value)?;
        self.store.save(&self.key(scope), raw).await
    }

    pub async fn delete(&self, scope: &StateScope) -> Result<(), StateError> {
        self.store.delete(&self.key(scope)).await
    }
}
