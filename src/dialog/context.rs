//! 轮次上下文
//!
//! 一轮（turn）= 一条用户消息驱动的一次完整执行。TurnContext 只存活于单轮之内，
//! 从不持久化：它携带本轮输入、对外发送的活动、宿主借给本轮的会话 / 用户状态引用，
//! 以及类型化的轮次信号 TurnSignal。

use serde::{Deserialize, Serialize};

use crate::escalation::EscalationCommand;
use crate::state::{ConversationData, UserProfile};

/// 本轮输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnInput {
    pub conversation_id: String,
    pub user_id: String,
    pub text: String,
}

impl TurnInput {
    pub fn new(
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            text: text.into(),
        }
    }
}

/// 轮次信号：子对话在本轮结束并把控制权交回父对话时置为 Continuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnSignal {
    /// 本轮尚无子对话完成
    #[default]
    Fresh,
    /// 子对话刚刚结束，本轮文本已被其消费
    Continuation,
}

/// 发往渠道的活动
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activity {
    /// 纯文本消息
    Message { text: String },
    /// 转人工等渠道命令
    Command { command: EscalationCommand },
}

impl Activity {
    pub fn text(&self) -> Option<&str> {
        match self {
            Activity::Message { text } => Some(text),
            Activity::Command { .. } => None,
        }
    }
}

/// 单轮执行上下文
pub struct TurnContext<'a> {
    input: &'a TurnInput,
    conversation: &'a mut ConversationData,
    user: &'a mut UserProfile,
    signal: TurnSignal,
    activities: Vec<Activity>,
}

impl<'a> TurnContext<'a> {
    pub fn new(
        input: &'a TurnInput,
        conversation: &'a mut ConversationData,
        user: &'a mut UserProfile,
    ) -> Self {
        Self {
            input,
            conversation,
            user,
            signal: TurnSignal::Fresh,
            activities: Vec::new(),
        }
    }

    pub fn input(&self) -> &TurnInput {
        self.input
    }

    pub fn text(&self) -> &str {
        &self.input.text
    }

    pub fn conversation(&mut self) -> &mut ConversationData {
        &mut *self.conversation
    }

    pub fn user(&mut self) -> &mut UserProfile {
        &mut *self.user
    }

    pub fn signal(&self) -> TurnSignal {
        self.signal
    }

    /// 读取并清除信号
    pub fn take_signal(&mut self) -> TurnSignal {
        std::mem::take(&mut self.signal)
    }

    /// 子对话结束时由引擎调用；同一轮内多次置位按最后一次为准
    pub(crate) fn mark_continuation(&mut self) {
        self.signal = TurnSignal::Continuation;
    }

    pub fn send(&mut self, text: impl Into<String>) {
        self.activities.push(Activity::Message { text: text.into() });
    }

    pub fn escalate(&mut self, command: EscalationCommand) {
        self.activities.push(Activity::Command { command });
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn into_activities(self) -> Vec<Activity> {
        self.activities
    }
}
