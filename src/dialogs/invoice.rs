//! 发票上传对话
//!
//! 邮箱 -> 查找联系人（不存在则致歉并结束）-> 发票号 -> 金额 -> 创建发票 -> 确认。

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use super::common::{apologize, bind_contact, forget_email, remember_email, AskEmailStep};
use super::{DialogServices, INVOICE_UPLOAD};
use crate::core::{DialogError, RepositoryError};
use crate::crm::{ContactRepository, InvoiceRepository};
use crate::dialog::{
    ComponentDialog, PromptKind, PromptOptions, StepContext, StepResult, WaterfallDialog, WaterfallStep,
};

pub const FLOW: &str = "MainDialog.invoiceUpload.flow";
pub const EMAIL_PROMPT: &str = "MainDialog.invoiceUpload.email";
pub const NUMBER_PROMPT: &str = "MainDialog.invoiceUpload.number";
pub const AMOUNT_PROMPT: &str = "MainDialog.invoiceUpload.amount";

pub fn component(services: &DialogServices) -> ComponentDialog {
    let flow = WaterfallDialog::new(FLOW)
        .step(AskEmailStep {
            prompt_id: EMAIL_PROMPT,
            prompt: "Sure, let's register your invoice. What is your email address?",
        })
        .step(LookupContactStep {
            contacts: Arc::clone(&services.contacts),
        })
        .step(AskAmountStep)
        .step(CreateInvoiceStep {
            invoices: Arc::clone(&services.invoices),
        });

    ComponentDialog::new(INVOICE_UPLOAD)
        .add_dialog(flow)
        .add_dialog(PromptKind::Email.dialog(EMAIL_PROMPT))
        .add_dialog(PromptKind::Text.dialog(NUMBER_PROMPT))
        .add_dialog(PromptKind::Amount.dialog(AMOUNT_PROMPT))
        .initial_dialog(FLOW)
}

struct LookupContactStep {
    contacts: Arc<dyn ContactRepository>,
}

#[async_trait]
impl WaterfallStep for LookupContactStep {
    async fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepResult, DialogError> {
        let email = remember_email(step);
        let contact = match self.contacts.find_by_email(&email).await {
            Ok(Some(contact)) => contact,
            Ok(None) => {
                tracing::info!("No contact for invoice upload");
                forget_email(step);
                step.send(format!(
                    "I couldn't find a customer account for {}. Please contact support to register first.",
                    email
                ));
                return Ok(StepResult::end());
            }
            Err(e) => return Ok(apologize(step, &e)),
        };

        bind_contact(step, &contact);
        let options = PromptOptions::new("What is the invoice number?");
        Ok(StepResult::begin_with(NUMBER_PROMPT, options.to_value()))
    }
}

struct AskAmountStep;

#[async_trait]
impl WaterfallStep for AskAmountStep {
    async fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepResult, DialogError> {
        let number = step.result().clone();
        step.values().insert("invoice_number".into(), number);
        let options = PromptOptions::new("What is the total amount of the invoice?")
            .with_retry("Please enter the amount as a positive number, e.g. 125.50.");
        Ok(StepResult::begin_with(AMOUNT_PROMPT, options.to_value()))
    }
}

struct CreateInvoiceStep {
    invoices: Arc<dyn InvoiceRepository>,
}

#[async_trait]
impl WaterfallStep for CreateInvoiceStep {
    async fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepResult, DialogError> {
        let amount = step.result().as_f64().unwrap_or_default();
        let number = step.value_str("invoice_number").unwrap_or_default().to_string();
        let Some(contact_id) = step
            .value_str("contact_id")
            .and_then(|id| Uuid::from_str(id).ok())
        else {
            let err = RepositoryError::NotFound("contact for invoice".into());
            return Ok(apologize(step, &err));
        };

        match self.invoices.create(contact_id, &number, amount).await {
            Ok(invoice) => {
                tracing::info!(invoice = %invoice.invoice_number, amount, "Invoice registered");
                step.send(format!(
                    "Thanks! Invoice {} for {:.2} has been registered.",
                    invoice.invoice_number, invoice.amount
                ));
                Ok(StepResult::End(json!(invoice.id)))
            }
            Err(RepositoryError::Conflict(_)) => {
                step.send(format!("Invoice {} has already been registered.", number));
                Ok(StepResult::end())
            }
            Err(e) => Ok(apologize(step, &e)),
        }
    }
}
