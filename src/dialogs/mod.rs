//! 业务对话：意图路由（MainDialog）与叶子对话（问候、新建案例、发票上传）
//!
//! 作用域布局：
//! - 根作用域：MainDialog（组合对话，初始对话为 MainDialog.mainFlow）
//! - MainDialog 作用域：mainFlow 路由瀑布 + greeting / newCase / invoiceUpload 三个组合对话
//! - 每个叶子组合对话的作用域：自己的主瀑布（`.flow`）与输入提示对话

pub mod common;
pub mod greeting;
pub mod invoice;
pub mod main_dialog;
pub mod new_case;

use std::sync::Arc;

use crate::config::RouterSection;
use crate::core::DialogError;
use crate::crm::{CaseRepository, ContactRepository, InvoiceRepository};
use crate::dialog::{DialogRegistry, ScopeId};
use crate::intent::IntentClassifier;

pub const MAIN_DIALOG: &str = "MainDialog";
pub const MAIN_FLOW: &str = "MainDialog.mainFlow";
pub const GREETING: &str = "MainDialog.greeting";
pub const NEW_CASE: &str = "MainDialog.newCase";
pub const INVOICE_UPLOAD: &str = "MainDialog.invoiceUpload";

/// 对话依赖的外部协作方
#[derive(Clone)]
pub struct DialogServices {
    pub classifier: Arc<dyn IntentClassifier>,
    pub contacts: Arc<dyn ContactRepository>,
    pub cases: Arc<dyn CaseRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub router: Arc<RouterSection>,
}

/// 构建完整注册表（启动期调用；ID 冲突或初始对话缺失时失败）
pub fn build_registry(services: &DialogServices) -> Result<DialogRegistry, DialogError> {
    let mut registry = DialogRegistry::new();
    let main = main_dialog::component(services)
        .add_component(greeting::component())
        .add_component(new_case::component(services))
        .add_component(invoice::component(services));
    registry.register_component(ScopeId::ROOT, main)?;
    tracing::info!(dialogs = ?registry.dialog_ids(ScopeId::ROOT), "Dialog registry built");
    Ok(registry)
}
