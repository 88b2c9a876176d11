//! 瀑布式对话
//!
//! 一个瀑布式对话是固定顺序的步骤序列。每个步骤实现 WaterfallStep，拿到 StepContext
//! （上一步结果 / 子对话结果 / 用户回复、步骤局部状态、本轮上下文），返回 StepResult
//! 决定控制流：挂起等待下一轮、继续、开始子对话、替换自身、重复、跳过或结束。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::context::{TurnContext, TurnSignal};
use super::registry::DialogId;
use super::stack::StackFrame;
use crate::core::DialogError;
use crate::escalation::EscalationCommand;
use crate::state::{ConversationData, UserProfile};

/// 步骤的控制决策
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    /// 挂起，等待下一轮用户输入；下一轮的文本作为下一步的输入
    Suspend,
    /// 立即进入下一步（同一轮内，无需用户往返）
    Continue(Value),
    /// 开始子对话；子对话结束后其结果作为下一步的输入
    BeginChild { dialog_id: DialogId, options: Value },
    /// 结束自身并在同一栈位开始新的对话实例
    ReplaceSelf { dialog_id: DialogId, options: Value },
    /// 以相同参数重新开始自身（步骤状态清空）
    Repeat,
    /// 跳过其后的 count 个步骤，value 作为落点步骤的输入
    Skip { count: usize, value: Value },
    /// 结束自身，把结果交给调用方
    End(Value),
}

impl StepResult {
    pub fn next() -> Self {
        StepResult::Continue(Value::Null)
    }

    pub fn end() -> Self {
        StepResult::End(Value::Null)
    }

    pub fn begin(dialog_id: impl Into<DialogId>) -> Self {
        Self::begin_with(dialog_id, Value::Null)
    }

    pub fn begin_with(dialog_id: impl Into<DialogId>, options: Value) -> Self {
        StepResult::BeginChild {
            dialog_id: dialog_id.into(),
            options,
        }
    }

    pub fn replace(dialog_id: impl Into<DialogId>) -> Self {
        StepResult::ReplaceSelf {
            dialog_id: dialog_id.into(),
            options: Value::Null,
        }
    }
}

/// 步骤执行时可见的上下文
pub struct StepContext<'s, 't> {
    turn: &'s mut TurnContext<'t>,
    frame: &'s mut StackFrame,
    result: Value,
}

impl<'s, 't> StepContext<'s, 't> {
    pub(crate) fn new(turn: &'s mut TurnContext<'t>, frame: &'s mut StackFrame, result: Value) -> Self {
        Self { turn, frame, result }
    }

    pub fn index(&self) -> usize {
        self.frame.step_index()
    }

    pub fn dialog_id(&self) -> &str {
        self.frame.dialog_id()
    }

    /// 对话的调用参数
    pub fn options(&self) -> &Value {
        self.frame.options()
    }

    /// 本步输入：上一步结果、子对话结果或本轮用户回复
    pub fn result(&self) -> &Value {
        &self.result
    }

    /// 本步输入按字符串读取（非字符串时为空串）
    pub fn result_str(&self) -> &str {
        self.result.as_str().unwrap_or_default()
    }

    /// 本轮原始文本
    pub fn text(&self) -> &str {
        self.turn.text()
    }

    /// 步骤局部状态（随栈帧持久化）
    pub fn values(&mut self) -> &mut Map<String, Value> {
        self.frame.state_mut()
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.frame.state().get(key)
    }

    pub fn value_str(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(Value::as_str)
    }

    pub fn turn(&mut self) -> &mut TurnContext<'t> {
        &mut *self.turn
    }

    pub fn conversation(&mut self) -> &mut ConversationData {
        self.turn.conversation()
    }

    pub fn user(&mut self) -> &mut UserProfile {
        self.turn.user()
    }

    pub fn signal(&self) -> TurnSignal {
        self.turn.signal()
    }

    pub fn take_signal(&mut self) -> TurnSignal {
        self.turn.take_signal()
    }

    pub fn send(&mut self, text: impl Into<String>) {
        self.turn.send(text);
    }

    pub fn escalate(&mut self, command: EscalationCommand) {
        self.turn.escalate(command);
    }
}

/// 瀑布步骤
#[async_trait]
pub trait WaterfallStep: Send + Sync {
    async fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepResult, DialogError>;
}

/// 瀑布式对话：ID + 有序步骤
pub struct WaterfallDialog {
    id: DialogId,
    steps: Vec<Arc<dyn WaterfallStep>>,
}

impl WaterfallDialog {
    pub fn new(id: impl Into<DialogId>) -> Self {
        Self {
            id: id.into(),
            steps: Vec::new(),
        }
    }

    /// 追加一个步骤
    pub fn step(mut self, step: impl WaterfallStep + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn run_step(
        &self,
        index: usize,
        step: &mut StepContext<'_, '_>,
    ) -> Result<StepResult, DialogError> {
        let handler = self.steps.get(index).ok_or_else(|| DialogError::StepOutOfRange {
            dialog_id: self.id.clone(),
            index,
        })?;
        handler.run(step).await
    }
}
