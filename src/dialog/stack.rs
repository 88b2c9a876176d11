//! 对话栈
//!
//! 对话栈是轮次之间持久化的单位：有序的栈帧列表，最后一个为当前活动对话。
//! 每个栈帧记录 (对话 ID, 所属作用域, 步骤游标, 步骤局部状态)。
//! 作用域以组合对话 ID 路径持久化，加载后由 `bind` 换算回注册表下标，
//! 因此注册顺序变化不影响已保存的栈。
//! 每次变更都会置脏标记，由调用方决定何时写回存储；本模块不做任何 I/O。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::registry::{DialogId, DialogRegistry, ScopeId};
use crate::core::DialogError;

/// 单个栈帧
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackFrame {
    dialog_id: DialogId,
    /// 所属作用域的组合对话路径（从根开始）
    #[serde(default)]
    scope_path: Vec<DialogId>,
    #[serde(skip)]
    scope: ScopeId,
    step_index: usize,
    /// 调用参数（第 0 步的输入）
    #[serde(default)]
    options: Value,
    /// 步骤局部状态，在同一对话实例的多次挂起之间携带
    #[serde(default)]
    state: Map<String, Value>,
}

impl StackFrame {
    fn new(dialog_id: DialogId, scope: ScopeId, scope_path: Vec<DialogId>, options: Value) -> Self {
        Self {
            dialog_id,
            scope_path,
            scope,
            step_index: 0,
            options,
            state: Map::new(),
        }
    }

    pub fn dialog_id(&self) -> &str {
        &self.dialog_id
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn scope_path(&self) -> &[DialogId] {
        &self.scope_path
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn options(&self) -> &Value {
        &self.options
    }

    pub fn state(&self) -> &Map<String, Value> {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.state
    }

    /// 游标前移，最多到 `len`（表示已耗尽）
    pub(crate) fn advance(&mut self, steps: usize, len: usize) {
        self.step_index = (self.step_index + steps).min(len);
    }
}

/// 对话栈
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogStack {
    frames: Vec<StackFrame>,
    #[serde(skip)]
    dirty: bool,
}

impl PartialEq for DialogStack {
    fn eq(&self, other: &Self) -> bool {
        self.frames == other.frames
    }
}

impl DialogStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在 scope 链上解析 dialog_id 并压入新帧（step_index = 0，状态为空）。
    /// 组合对话会展开为其初始对话。
    pub fn push(
        &mut self,
        registry: &DialogRegistry,
        scope: ScopeId,
        dialog_id: &str,
        options: Value,
    ) -> Result<&StackFrame, DialogError> {
        let resolved = registry.resolve_waterfall(scope, dialog_id)?;
        let path = registry.scope_path(resolved.scope)?;
        self.frames
            .push(StackFrame::new(resolved.id, resolved.scope, path, options));
        self.dirty = true;
        Ok(&self.frames[self.frames.len() - 1])
    }

    /// 按持久化的作用域路径重新定位每个帧的作用域（加载后、运行前调用）
    pub fn bind(&mut self, registry: &DialogRegistry) -> Result<(), DialogError> {
        for frame in &mut self.frames {
            frame.scope = registry.scope_at(&frame.scope_path)?;
        }
        Ok(())
    }

    /// 弹出栈顶帧；空栈返回 EmptyStack
    pub fn pop(&mut self) -> Result<StackFrame, DialogError> {
        let frame = self.frames.pop().ok_or(DialogError::EmptyStack)?;
        self.dirty = true;
        Ok(frame)
    }

    /// 原子地替换栈顶：在被替换帧的作用域内解析新对话，解析失败时栈保持不变
    pub fn replace_top(
        &mut self,
        registry: &DialogRegistry,
        dialog_id: &str,
        options: Value,
    ) -> Result<&StackFrame, DialogError> {
        let scope = self.peek().ok_or(DialogError::EmptyStack)?.scope;
        let resolved = registry.resolve_waterfall(scope, dialog_id)?;
        let path = registry.scope_path(resolved.scope)?;
        self.frames.pop();
        self.frames
            .push(StackFrame::new(resolved.id, resolved.scope, path, options));
        self.dirty = true;
        Ok(&self.frames[self.frames.len() - 1])
    }

    pub fn peek(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    pub(crate) fn peek_mut(&mut self) -> Result<&mut StackFrame, DialogError> {
        self.frames.last_mut().ok_or(DialogError::EmptyStack)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// 清空整个栈（外部重置会话时使用）
    pub fn clear(&mut self) {
        if !self.frames.is_empty() {
            self.frames.clear();
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// 存储写回后由调用方清除脏标记
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
