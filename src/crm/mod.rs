//! CRM 领域：记录模型与仓储

pub mod models;
pub mod repository;

pub use models::{Case, Contact, Invoice};
pub use repository::{
    CaseRepository, ContactRepository, InvoiceRepository, MemoryCaseRepository,
    MemoryContactRepository, MemoryInvoiceRepository,
};
