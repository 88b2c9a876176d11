//! CRM 仓储接口与内存实现
//!
//! 对话只通过这些 trait 读写领域记录；失败一律以 RepositoryError 返回，
//! 由调用步骤决定是让本轮失败还是转成面向用户的提示。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Case, Contact, Invoice};
use crate::core::RepositoryError;

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Contact>, RepositoryError>;

    /// 新建联系人；邮箱已存在时返回 Conflict
    async fn create(&self, name: &str, email: &str) -> Result<Contact, RepositoryError>;
}

#[async_trait]
pub trait CaseRepository: Send + Sync {
    async fn create(
        &self,
        contact_id: Uuid,
        title: &str,
        description: &str,
    ) -> Result<Case, RepositoryError>;

    async fn list_for_contact(&self, contact_id: Uuid) -> Result<Vec<Case>, RepositoryError>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// 同一联系人下发票号重复时返回 Conflict
    async fn create(
        &self,
        contact_id: Uuid,
        invoice_number: &str,
        amount: f64,
    ) -> Result<Invoice, RepositoryError>;
}

/// 内存联系人仓储
#[derive(Default)]
pub struct MemoryContactRepository {
    contacts: RwLock<HashMap<Uuid, Contact>>,
}

impl MemoryContactRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置联系人（演示与测试用）
    pub async fn seed(&self, contact: Contact) {
        self.contacts.write().await.insert(contact.id, contact);
    }
}

#[async_trait]
impl ContactRepository for MemoryContactRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Contact>, RepositoryError> {
        let email = email.to_lowercase();
        Ok(self
            .contacts
            .read()
            .await
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn create(&self, name: &str, email: &str) -> Result<Contact, RepositoryError> {
        let contact = Contact::new(name, email);
        let mut contacts = self.contacts.write().await;
        if contacts.values().any(|c| c.email == contact.email) {
            return Err(RepositoryError::Conflict(format!("contact {}", contact.email)));
        }
        contacts.insert(contact.id, contact.clone());
        Ok(contact)
    }
}

/// 内存案例仓储
#[derive(Default)]
pub struct MemoryCaseRepository {
    cases: RwLock<Vec<Case>>,
}

impl MemoryCaseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.cases.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cases.read().await.is_empty()
    }
}

#[async_trait]
impl CaseRepository for MemoryCaseRepository {
    async fn create(
        &self,
        contact_id: Uuid,
        title: &str,
        description: &str,
    ) -> Result<Case, RepositoryError> {
        let case = Case::new(contact_id, title, description);
        self.cases.write().await.push(case.clone());
        Ok(case)
    }

    async fn list_for_contact(&self, contact_id: Uuid) -> Result<Vec<Case>, RepositoryError> {
        Ok(self
            .cases
            .read()
            .await
            .iter()
            .filter(|c| c.contact_id == contact_id)
            .cloned()
            .collect())
    }
}

/// 内存发票仓储
#[derive(Default)]
pub struct MemoryInvoiceRepository {
    invoices: RwLock<Vec<Invoice>>,
}

impl MemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceRepository for MemoryInvoiceRepository {
    async fn create(
        &self,
        contact_id: Uuid,
        invoice_number: &str,
        amount: f64,
    ) -> Result<Invoice, RepositoryError> {
        let mut invoices = self.invoices.write().await;
        if invoices
            .iter()
            .any(|i| i.contact_id == contact_id && i.invoice_number.eq_ignore_ascii_case(invoice_number))
        {
            return Err(RepositoryError::Conflict(format!("invoice {}", invoice_number)));
        }
        let invoice = Invoice::new(contact_id, invoice_number, amount);
        invoices.push(invoice.clone());
        Ok(invoice)
    }
}
