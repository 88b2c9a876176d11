//! 对话注册表
//!
//! 注册表是一棵作用域树（arena 存储）：每个节点是一个作用域，持有本作用域内注册的对话，
//! 并通过下标指向父作用域。组合对话（ComponentDialog）拥有自己的子作用域，同时以自身 ID
//! 注册到父作用域中。解析时只从当前活动帧所在的作用域沿父链向上查找，从不查兄弟节点。
//! 注册表在启动期构建，之后只读，可被多个会话共享。

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::waterfall::WaterfallDialog;
use crate::core::DialogError;

/// 对话 ID
pub type DialogId = String;

/// 作用域下标（节点表中的位置），可随栈帧一起序列化
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ScopeId(pub usize);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);
}

/// 作用域内的一个条目
pub enum DialogEntry {
    /// 可直接运行的瀑布式对话
    Waterfall(Arc<WaterfallDialog>),
    /// 组合对话：开始时转为在其子作用域内开始 initial 对话
    Component { scope: ScopeId, initial: DialogId },
}

/// 解析结果：真正会被压栈的瀑布式对话及其所属作用域
#[derive(Clone)]
pub struct ResolvedDialog {
    pub id: DialogId,
    pub scope: ScopeId,
    pub dialog: Arc<WaterfallDialog>,
}

struct RegistryNode {
    owner: Option<DialogId>,
    parent: Option<ScopeId>,
    entries: HashMap<DialogId, DialogEntry>,
}

impl RegistryNode {
    fn new(owner: Option<DialogId>, parent: Option<ScopeId>) -> Self {
        Self {
            owner,
            parent,
            entries: HashMap::new(),
        }
    }
}

/// 组合对话定义：子对话列表 + 初始对话，注册时展开为一个子作用域
pub struct ComponentDialog {
    id: DialogId,
    initial: Option<DialogId>,
    dialogs: Vec<WaterfallDialog>,
    components: Vec<ComponentDialog>,
}

impl ComponentDialog {
    pub fn new(id: impl Into<DialogId>) -> Self {
        Self {
            id: id.into(),
            initial: None,
            dialogs: Vec::new(),
            components: Vec::new(),
        }
    }

    /// 添加子对话（第一个添加的对话默认为初始对话）
    pub fn add_dialog(mut self, dialog: WaterfallDialog) -> Self {
        self.dialogs.push(dialog);
        self
    }

    /// 添加嵌套的组合对话
    pub fn add_component(mut self, component: ComponentDialog) -> Self {
        self.components.push(component);
        self
    }

    /// 指定初始对话
    pub fn initial_dialog(mut self, id: impl Into<DialogId>) -> Self {
        self.initial = Some(id.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// 作用域树形式的对话注册表
pub struct DialogRegistry {
    nodes: Vec<RegistryNode>,
}

impl Default for DialogRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogRegistry {
    pub fn new() -> Self {
        Self {
            nodes: vec![RegistryNode::new(None, None)],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId::ROOT
    }

    /// 在指定作用域注册瀑布式对话；同一作用域内 ID 重复时返回 DuplicateId
    pub fn register(&mut self, scope: ScopeId, dialog: WaterfallDialog) -> Result<(), DialogError> {
        let id = dialog.id().to_string();
        let node = self.node_mut(scope)?;
        if node.entries.contains_key(&id) {
            return Err(DialogError::DuplicateId(id));
        }
        node.entries
            .insert(id, DialogEntry::Waterfall(Arc::new(dialog)));
        Ok(())
    }

    /// 注册组合对话：先在父作用域占位自身 ID，再为其创建子作用域并递归注册子对话。
    /// 返回新建的子作用域。
    pub fn register_component(
        &mut self,
        parent: ScopeId,
        component: ComponentDialog,
    ) -> Result<ScopeId, DialogError> {
        let ComponentDialog {
            id,
            initial,
            dialogs,
            components,
        } = component;

        if self.node(parent)?.entries.contains_key(&id) {
            return Err(DialogError::DuplicateId(id));
        }

        let initial = initial
            .or_else(|| dialogs.first().map(|d| d.id().to_string()))
            .or_else(|| components.first().map(|c| c.id().to_string()))
            .ok_or_else(|| DialogError::UnknownDialog(format!("{id} (no initial dialog)")))?;

        let scope = ScopeId(self.nodes.len());
        self.nodes.push(RegistryNode::new(Some(id.clone()), Some(parent)));

        for dialog in dialogs {
            self.register(scope, dialog)?;
        }
        for child in components {
            self.register_component(scope, child)?;
        }

        if !self.node(scope)?.entries.contains_key(&initial) {
            return Err(DialogError::UnknownDialog(initial));
        }

        tracing::debug!(component = %id, scope = scope.0, "Registered component dialog");
        self.node_mut(parent)?
            .entries
            .insert(id, DialogEntry::Component { scope, initial });
        Ok(scope)
    }

    /// 从 scope 起沿父链查找 id，返回命中的作用域与条目
    pub fn resolve(&self, scope: ScopeId, id: &str) -> Result<(ScopeId, &DialogEntry), DialogError> {
        let mut current = Some(scope);
        while let Some(s) = current {
            let node = self.node(s)?;
            if let Some(entry) = node.entries.get(id) {
                return Ok((s, entry));
            }
            current = node.parent;
        }
        Err(DialogError::UnknownDialog(id.to_string()))
    }

    /// 解析出真正要压栈的瀑布式对话（组合对话展开为其初始对话，可多层）
    pub fn resolve_waterfall(&self, scope: ScopeId, id: &str) -> Result<ResolvedDialog, DialogError> {
        let (mut found_in, mut entry) = self.resolve(scope, id)?;
        let mut resolved_id = id.to_string();
        loop {
            match entry {
                DialogEntry::Waterfall(dialog) => {
                    return Ok(ResolvedDialog {
                        id: resolved_id,
                        scope: found_in,
                        dialog: Arc::clone(dialog),
                    });
                }
                DialogEntry::Component { scope, initial } => {
                    let node = self.node(*scope)?;
                    entry = node
                        .entries
                        .get(initial)
                        .ok_or_else(|| DialogError::UnknownDialog(initial.clone()))?;
                    found_in = *scope;
                    resolved_id = initial.clone();
                }
            }
        }
    }

    /// 精确查找某作用域内的瀑布式对话（恢复栈帧时使用，不沿父链）
    pub fn waterfall(&self, scope: ScopeId, id: &str) -> Result<Arc<WaterfallDialog>, DialogError> {
        match self.node(scope)?.entries.get(id) {
            Some(DialogEntry::Waterfall(dialog)) => Ok(Arc::clone(dialog)),
            _ => Err(DialogError::UnknownDialog(id.to_string())),
        }
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.nodes.get(scope.0).and_then(|n| n.parent)
    }

    /// 作用域所属的组合对话 ID（根作用域为 None）
    pub fn owner(&self, scope: ScopeId) -> Option<&str> {
        self.nodes.get(scope.0).and_then(|n| n.owner.as_deref())
    }

    /// 作用域的组合对话路径（从根开始，根作用域为空）
    pub fn scope_path(&self, scope: ScopeId) -> Result<Vec<DialogId>, DialogError> {
        self.node(scope)?;
        let mut path = Vec::new();
        let mut current = Some(scope);
        while let Some(s) = current {
            if let Some(owner) = self.owner(s) {
                path.push(owner.to_string());
            }
            current = self.parent(s);
        }
        path.reverse();
        Ok(path)
    }

    /// 沿组合对话路径从根向下找回作用域
    pub fn scope_at(&self, path: &[DialogId]) -> Result<ScopeId, DialogError> {
        path.iter().try_fold(ScopeId::ROOT, |scope, id| {
            match self.node(scope)?.entries.get(id) {
                Some(DialogEntry::Component { scope, .. }) => Ok(*scope),
                _ => Err(DialogError::UnknownDialog(id.clone())),
            }
        })
    }

    /// 作用域内注册的对话 ID 列表（已排序）
    pub fn dialog_ids(&self, scope: ScopeId) -> Vec<String> {
        let mut ids: Vec<String> = self
            .nodes
            .get(scope.0)
            .map(|n| n.entries.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// 组合对话 id 在 scope 链上对应的子作用域
    pub fn component_scope(&self, scope: ScopeId, id: &str) -> Result<ScopeId, DialogError> {
        match self.resolve(scope, id)? {
            (_, DialogEntry::Component { scope, .. }) => Ok(*scope),
            _ => Err(DialogError::UnknownDialog(id.to_string())),
        }
    }

    fn node(&self, scope: ScopeId) -> Result<&RegistryNode, DialogError> {
        self.nodes
            .get(scope.0)
            .ok_or_else(|| DialogError::UnknownDialog(format!("scope #{}", scope.0)))
    }

    fn node_mut(&mut self, scope: ScopeId) -> Result<&mut RegistryNode, DialogError> {
        self.nodes
            .get_mut(scope.0)
            .ok_or_else(|| DialogError::UnknownDialog(format!("scope #{}", scope.0)))
    }
}
