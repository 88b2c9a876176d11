//! crmbot - 栈式对话编排运行时
//!
//! 模块划分：
//! - **bot**: 宿主层（按会话串行执行轮次、加载 / 保存状态、投递活动）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与 Bot 构建器
//! - **crm**: 联系人 / 案例 / 发票记录与仓储
//! - **dialog**: 对话运行时（注册表、对话栈、瀑布式对话、轮次上下文、引擎、输入提示）
//! - **dialogs**: 业务对话（意图路由 MainDialog、问候、新建案例、发票上传）
//! - **escalation**: 转人工命令
//! - **intent**: 意图识别（关键词规则 / 远程 HTTP）
//! - **observability**: 日志初始化
//! - **state**: 会话 / 用户状态存储与访问器

pub mod bot;
pub mod config;
pub mod core;
pub mod crm;
pub mod dialog;
pub mod dialogs;
pub mod escalation;
pub mod intent;
pub mod observability;
pub mod state;

pub use bot::{ActivitySink, Bot, TurnReport};
pub use core::{BotBuilder, DialogError};
