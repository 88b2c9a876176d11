//! 转人工命令
//!
//! 机器人向全渠道（Omni-Channel）发送的命令：转人工 / 结束会话，附带工作流上下文变量。
//! 命令一经构造即不可变，只产生、不存储。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 命令类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandType {
    Escalate,
    EndConversation,
}

/// 渠道命令：类型 + 上下文变量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationCommand {
    #[serde(rename = "type")]
    command_type: CommandType,
    context: HashMap<String, Value>,
}

impl EscalationCommand {
    pub fn new(command_type: CommandType) -> Self {
        Self {
            command_type,
            context: HashMap::new(),
        }
    }

    /// 转人工命令，带单个上下文变量（如 BotHandoffTopic = CreditCard）
    pub fn escalate(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(CommandType::Escalate).with_context(key, value)
    }

    pub fn end_conversation() -> Self {
        Self::new(CommandType::EndConversation)
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn command_type(&self) -> CommandType {
        self.command_type
    }

    pub fn context(&self) -> &HashMap<String, Value> {
        &self.context
    }
}
