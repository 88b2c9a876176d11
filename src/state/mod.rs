//! 对话状态：会话 / 用户数据模型、键值存储与类型化访问器

pub mod accessor;
pub mod models;
#[cfg(feature = "async-sqlite")]
pub mod persistent;
pub mod store;

pub use accessor::{StateAccessor, StateScope};
pub use models::{ConversationData, UserProfile};
#[cfg(feature = "async-sqlite")]
pub use persistent::PersistentStateStore;
pub use store::{create_state_store, MemoryStateStore, StateStore};
