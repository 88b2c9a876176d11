//! 对话引擎：轮次恢复协议
//!
//! 每轮：栈空则在根作用域压入入口对话并运行第 0 步；栈非空则以本轮文本恢复栈顶帧。
//! 栈帧的 step_index 指向最近一次运行（并在等待输入或子对话）的步骤；
//! 恢复时游标 +1 再运行，游标到达步骤数即视为对话耗尽并以当前值结束。
//! 父对话的游标只在子对话帧完全弹出后才前移。

use std::sync::Arc;

use serde_json::Value;

use super::context::TurnContext;
use super::registry::{DialogId, DialogRegistry};
use super::stack::DialogStack;
use super::waterfall::{StepContext, StepResult};
use crate::core::DialogError;

/// 单轮执行结束时的状态
#[derive(Debug, Clone, PartialEq)]
pub enum TurnStatus {
    /// 某个步骤挂起，等待下一轮输入
    Waiting,
    /// 最外层对话已结束，栈为空
    Completed(Value),
}

enum Action {
    /// 运行栈顶帧当前游标处的步骤
    Run(Value),
    /// 游标前移后运行
    Resume(Value),
    /// 弹出栈顶并把结果交给新的栈顶
    Finish(Value),
}

/// 对话引擎：持有只读注册表与入口对话 ID，可被多个会话并发共享
pub struct DialogEngine {
    registry: Arc<DialogRegistry>,
    root_dialog: DialogId,
    max_steps_per_turn: usize,
}

impl DialogEngine {
    pub fn new(registry: Arc<DialogRegistry>, root_dialog: impl Into<DialogId>) -> Self {
        Self {
            registry,
            root_dialog: root_dialog.into(),
            max_steps_per_turn: 64,
        }
    }

    pub fn with_max_steps(mut self, max_steps_per_turn: usize) -> Self {
        self.max_steps_per_turn = max_steps_per_turn.max(1);
        self
    }

    pub fn registry(&self) -> &DialogRegistry {
        &self.registry
    }

    pub fn root_dialog(&self) -> &str {
        &self.root_dialog
    }

    /// 执行一轮：直到某步挂起、最外层对话结束或出错
    pub async fn run_turn(
        &self,
        stack: &mut DialogStack,
        turn: &mut TurnContext<'_>,
    ) -> Result<TurnStatus, DialogError> {
        stack.bind(&self.registry)?;
        let mut action = if stack.is_empty() {
            stack.push(&self.registry, self.registry.root(), &self.root_dialog, Value::Null)?;
            tracing::debug!(dialog = %self.root_dialog, "Starting root dialog");
            Action::Run(Value::Null)
        } else {
            Action::Resume(Value::String(turn.text().to_string()))
        };

        let mut steps_run = 0usize;
        loop {
            action = match action {
                Action::Resume(value) => {
                    let frame = stack.peek_mut()?;
                    let len = self
                        .registry
                        .waterfall(frame.scope(), frame.dialog_id())?
                        .len();
                    frame.advance(1, len);
                    stack.mark_dirty();
                    Action::Run(value)
                }
                Action::Finish(value) => {
                    let ended = stack.pop()?;
                    tracing::debug!(dialog = %ended.dialog_id(), depth = stack.depth(), "Dialog ended");
                    if stack.is_empty() {
                        return Ok(TurnStatus::Completed(value));
                    }
                    turn.mark_continuation();
                    Action::Resume(value)
                }
                Action::Run(value) => {
                    steps_run += 1;
                    if steps_run > self.max_steps_per_turn {
                        return Err(DialogError::StepLimitExceeded(self.max_steps_per_turn));
                    }
                    match self.run_step(stack, turn, value).await? {
                        Some(next) => next,
                        None => return Ok(TurnStatus::Waiting),
                    }
                }
            };
        }
    }

    /// 运行栈顶帧的当前步骤，把 StepResult 翻译为下一个动作；挂起时返回 None
    async fn run_step(
        &self,
        stack: &mut DialogStack,
        turn: &mut TurnContext<'_>,
        value: Value,
    ) -> Result<Option<Action>, DialogError> {
        let frame = stack.peek_mut()?;
        let dialog = self.registry.waterfall(frame.scope(), frame.dialog_id())?;
        let index = frame.step_index();
        if index >= dialog.len() {
            return Ok(Some(Action::Finish(value)));
        }

        let result = {
            let mut ctx = StepContext::new(turn, frame, value);
            dialog.run_step(index, &mut ctx).await?
        };
        stack.mark_dirty();
        tracing::debug!(dialog = %dialog.id(), step = index, result = ?result, "Step finished");

        let next = match result {
            StepResult::Suspend => return Ok(None),
            StepResult::Continue(value) => Action::Resume(value),
            StepResult::Skip { count, value } => {
                // 落点最多为最后一步之后，Resume 再 +1 即耗尽
                stack.peek_mut()?.advance(count, dialog.len().saturating_sub(1));
                Action::Resume(value)
            }
            StepResult::BeginChild { dialog_id, options } => {
                let scope = stack.peek_mut()?.scope();
                stack.push(&self.registry, scope, &dialog_id, options.clone())?;
                Action::Run(options)
            }
            StepResult::ReplaceSelf { dialog_id, options } => {
                stack.replace_top(&self.registry, &dialog_id, options.clone())?;
                Action::Run(options)
            }
            StepResult::Repeat => {
                let top = stack.peek_mut()?;
                let (dialog_id, options) = (top.dialog_id().to_string(), top.options().clone());
                stack.replace_top(&self.registry, &dialog_id, options.clone())?;
                Action::Run(options)
            }
            StepResult::End(value) => Action::Finish(value),
        };
        Ok(Some(next))
    }
}
