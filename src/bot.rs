//! 宿主层：按会话串行执行轮次
//!
//! 每轮：取得会话锁 -> 通过 StateAccessor 读取对话栈 / 会话数据 / 用户资料 ->
//! 运行对话引擎 -> 写回会话数据与用户资料，对话栈仅在有改动时写回 -> 把活动转交给 ActivitySink。
//! 本轮失败时不写回任何状态，持久化内容保持为上一轮结束时的样子。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::core::DialogError;
use crate::dialog::{Activity, DialogEngine, DialogStack, TurnContext, TurnInput, TurnStatus};
use crate::state::{ConversationData, StateAccessor, StateScope, StateStore, UserProfile};

pub const DIALOG_STACK_PROPERTY: &str = "dialogStack";
pub const CONVERSATION_DATA_PROPERTY: &str = "conversationData";
pub const USER_PROFILE_PROPERTY: &str = "userProfile";

/// 出站活动的接收方（渠道适配器）；投递失败只记录日志
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn deliver(&self, conversation_id: &str, activity: &Activity) -> Result<(), String>;
}

/// 单轮执行结果
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub activities: Vec<Activity>,
    /// 本轮结束后的栈深度
    pub depth: usize,
    pub status: TurnStatus,
}

impl TurnReport {
    /// 本轮发出的文本消息
    pub fn texts(&self) -> Vec<&str> {
        self.activities.iter().filter_map(Activity::text).collect()
    }
}

pub struct Bot {
    engine: DialogEngine,
    stack_state: StateAccessor<DialogStack>,
    conversation_state: StateAccessor<ConversationData>,
    user_state: StateAccessor<UserProfile>,
    sink: Option<Arc<dyn ActivitySink>>,
    /// conversation_id -> 会话锁
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl Bot {
    pub fn new(engine: DialogEngine, store: Arc<dyn StateStore>) -> Self {
        Self {
            engine,
            stack_state: StateAccessor::new(Arc::clone(&store), DIALOG_STACK_PROPERTY),
            conversation_state: StateAccessor::new(Arc::clone(&store), CONVERSATION_DATA_PROPERTY),
            user_state: StateAccessor::new(store, USER_PROFILE_PROPERTY),
            sink: None,
            locks: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ActivitySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn engine(&self) -> &DialogEngine {
        &self.engine
    }

    /// 获取或创建会话锁
    async fn conversation_lock(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(conversation_id) {
                return Arc::clone(lock);
            }
        }

        let mut locks = self.locks.write().await;
        Arc::clone(
            locks
                .entry(conversation_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// 释放会话锁：没有其他轮次持有或等待时从表中移除
    async fn release_lock(&self, conversation_id: &str, lock: Arc<Mutex<()>>) {
        drop(lock);
        let mut locks = self.locks.write().await;
        if locks
            .get(conversation_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(conversation_id);
        }
    }

    /// 当前持有会话锁的会话数
    pub async fn active_conversations(&self) -> usize {
        self.locks.read().await.len()
    }

    /// 处理一条用户消息
    pub async fn on_turn(&self, input: TurnInput) -> Result<TurnReport, DialogError> {
        let lock = self.conversation_lock(&input.conversation_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.run_turn(&input).await
        };
        // 对话已结束或本轮失败时，会话锁不再需要常驻
        let finished = match &result {
            Ok(report) => matches!(report.status, TurnStatus::Completed(_)),
            Err(_) => true,
        };
        if finished {
            self.release_lock(&input.conversation_id, lock).await;
        }
        result
    }

    async fn run_turn(&self, input: &TurnInput) -> Result<TurnReport, DialogError> {
        let conversation_scope = StateScope::Conversation(input.conversation_id.clone());
        let user_scope = StateScope::User(input.user_id.clone());

        let mut stack = self
            .stack_state
            .get_or_create(&conversation_scope, DialogStack::new)
            .await?;
        let mut conversation = self
            .conversation_state
            .get_or_create(&conversation_scope, ConversationData::default)
            .await?;
        let mut user = self
            .user_state
            .get_or_create(&user_scope, UserProfile::default)
            .await?;
        conversation.turn_count += 1;

        let (status, activities) = {
            let mut turn = TurnContext::new(input, &mut conversation, &mut user);
            let status = self.engine.run_turn(&mut stack, &mut turn).await;
            (status, turn.into_activities())
        };
        let status = status.map_err(|e| {
            tracing::error!(conversation = %input.conversation_id, error = %e, "Turn failed");
            e
        })?;

        self.user_state.set(&user_scope, &user).await?;
        self.conversation_state
            .set(&conversation_scope, &conversation)
            .await?;
        if stack.is_dirty() {
            self.stack_state.set(&conversation_scope, &stack).await?;
            stack.mark_clean();
        }

        if let Some(sink) = &self.sink {
            for activity in &activities {
                if let Err(e) = sink.deliver(&input.conversation_id, activity).await {
                    tracing::warn!(conversation = %input.conversation_id, "Activity delivery failed: {}", e);
                }
            }
        }

        tracing::info!(
            conversation = %input.conversation_id,
            depth = stack.depth(),
            activities = activities.len(),
            completed = matches!(status, TurnStatus::Completed(_)),
            "Turn completed"
        );
        Ok(TurnReport {
            activities,
            depth: stack.depth(),
            status,
        })
    }

    /// 显式重置会话：删除对话栈与会话数据（用户资料保留）
    pub async fn reset_conversation(&self, conversation_id: &str) -> Result<(), DialogError> {
        let lock = self.conversation_lock(conversation_id).await;
        let result = {
            let _guard = lock.lock().await;
            let scope = StateScope::Conversation(conversation_id.to_string());
            match self.stack_state.delete(&scope).await {
                Ok(()) => self.conversation_state.delete(&scope).await,
                Err(e) => Err(e),
            }
        };
        self.release_lock(conversation_id, lock).await;
        result?;
        tracing::info!(conversation = %conversation_id, "Conversation reset");
        Ok(())
    }

    /// 读取持久化的对话栈（不存在时为空栈）
    pub async fn dialog_stack(&self, conversation_id: &str) -> Result<DialogStack, DialogError> {
        let scope = StateScope::Conversation(conversation_id.to_string());
        Ok(self.stack_state.get_or_create(&scope, DialogStack::new).await?)
    }

    pub async fn conversation_data(&self, conversation_id: &str) -> Result<ConversationData, DialogError> {
        let scope = StateScope::Conversation(conversation_id.to_string());
        Ok(self
            .conversation_state
            .get_or_create(&scope, ConversationData::default)
            .await?)
    }

    pub async fn user_profile(&self, user_id: &str) -> Result<UserProfile, DialogError> {
        let scope = StateScope::User(user_id.to_string());
        Ok(self.user_state.get_or_create(&scope, UserProfile::default).await?)
    }
}
