//! 会话级与用户级持久数据

use serde::{Deserialize, Serialize};

/// 会话数据：按会话惰性创建，只有显式重置才会删除
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationData {
    /// 最近一次识别出的意图标签
    pub last_topic: Option<String>,
    pub turn_count: u64,
    /// 本会话内创建的案例数
    pub case_count: u32,
}

/// 用户资料：跨会话保留
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    /// CRM 中的联系人 ID
    pub contact_id: Option<String>,
}

impl UserProfile {
    /// 是否已知用户姓名
    pub fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }
}
