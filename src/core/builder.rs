//! Bot 构建器：统一的 Bot 初始化逻辑
//!
//! 未显式提供的协作方按配置创建：识别器来自 [classifier]，状态存储来自 [state]，
//! CRM 仓储默认使用内存实现。

use std::sync::Arc;

use crate::bot::{ActivitySink, Bot};
use crate::config::AppConfig;
use crate::core::DialogError;
use crate::crm::{
    CaseRepository, ContactRepository, InvoiceRepository, MemoryCaseRepository,
    MemoryContactRepository, MemoryInvoiceRepository,
};
use crate::dialog::DialogEngine;
use crate::dialogs::{build_registry, DialogServices};
use crate::intent::{create_classifier, IntentClassifier};
use crate::state::{create_state_store, StateStore};

/// Bot 构建器
pub struct BotBuilder {
    config: AppConfig,
    classifier: Option<Arc<dyn IntentClassifier>>,
    store: Option<Arc<dyn StateStore>>,
    contacts: Option<Arc<dyn ContactRepository>>,
    cases: Option<Arc<dyn CaseRepository>>,
    invoices: Option<Arc<dyn InvoiceRepository>>,
    sink: Option<Arc<dyn ActivitySink>>,
}

impl BotBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            classifier: None,
            store: None,
            contacts: None,
            cases: None,
            invoices: None,
            sink: None,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_contacts(mut self, contacts: Arc<dyn ContactRepository>) -> Self {
        self.contacts = Some(contacts);
        self
    }

    pub fn with_cases(mut self, cases: Arc<dyn CaseRepository>) -> Self {
        self.cases = Some(cases);
        self
    }

    pub fn with_invoices(mut self, invoices: Arc<dyn InvoiceRepository>) -> Self {
        self.invoices = Some(invoices);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ActivitySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 构建注册表与引擎；注册表装配失败（ID 冲突等）时返回错误
    pub async fn build(self) -> Result<Bot, DialogError> {
        let classifier = self
            .classifier
            .unwrap_or_else(|| create_classifier(&self.config.classifier));
        let store = match self.store {
            Some(store) => store,
            None => create_state_store(&self.config.state).await,
        };

        let services = DialogServices {
            classifier,
            contacts: self
                .contacts
                .unwrap_or_else(|| Arc::new(MemoryContactRepository::new())),
            cases: self
                .cases
                .unwrap_or_else(|| Arc::new(MemoryCaseRepository::new())),
            invoices: self
                .invoices
                .unwrap_or_else(|| Arc::new(MemoryInvoiceRepository::new())),
            router: Arc::new(self.config.router.clone()),
        };

        let registry = build_registry(&services)?;
        let engine = DialogEngine::new(Arc::new(registry), self.config.bot.root_dialog.clone())
            .with_max_steps(self.config.bot.max_steps_per_turn);

        let bot = Bot::new(engine, store);
        Ok(match self.sink {
            Some(sink) => bot.with_sink(sink),
            None => bot,
        })
    }
}
