//! 对话运行时：注册表、对话栈、瀑布式对话、轮次上下文与引擎

pub mod context;
pub mod engine;
pub mod prompt;
pub mod registry;
pub mod stack;
pub mod waterfall;

pub use context::{Activity, TurnContext, TurnInput, TurnSignal};
pub use engine::{DialogEngine, TurnStatus};
pub use prompt::{PromptKind, PromptOptions};
pub use registry::{ComponentDialog, DialogEntry, DialogId, DialogRegistry, ResolvedDialog, ScopeId};
pub use stack::{DialogStack, StackFrame};
pub use waterfall::{StepContext, StepResult, WaterfallDialog, WaterfallStep};
