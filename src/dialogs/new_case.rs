//! 新建案例对话
//!
//! 邮箱 -> 查找联系人（不存在则询问姓名并新建）-> 标题 -> 描述 -> 创建案例 -> 回复工单号。
//! 仓储失败时致歉并结束，不让本轮失败。

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use super::common::{apologize, bind_contact, forget_email, remember_email, AskEmailStep};
use super::{DialogServices, NEW_CASE};
use crate::core::{DialogError, RepositoryError};
use crate::crm::{CaseRepository, ContactRepository};
use crate::dialog::{
    ComponentDialog, PromptKind, PromptOptions, StepContext, StepResult, WaterfallDialog, WaterfallStep,
};

pub const FLOW: &str = "MainDialog.newCase.flow";
pub const EMAIL_PROMPT: &str = "MainDialog.newCase.email";
pub const NAME_PROMPT: &str = "MainDialog.newCase.name";
pub const TITLE_PROMPT: &str = "MainDialog.newCase.title";
pub const DESCRIPTION_PROMPT: &str = "MainDialog.newCase.description";

pub fn component(services: &DialogServices) -> ComponentDialog {
    let flow = WaterfallDialog::new(FLOW)
        .step(AskEmailStep {
            prompt_id: EMAIL_PROMPT,
            prompt: "I can open a case for you. What is your email address?",
        })
        .step(LookupContactStep {
            contacts: Arc::clone(&services.contacts),
            cases: Arc::clone(&services.cases),
        })
        .step(CreateContactStep {
            contacts: Arc::clone(&services.contacts),
        })
        .step(AskTitleStep)
        .step(AskDescriptionStep)
        .step(CreateCaseStep {
            cases: Arc::clone(&services.cases),
        });

    ComponentDialog::new(NEW_CASE)
        .add_dialog(flow)
        .add_dialog(PromptKind::Email.dialog(EMAIL_PROMPT))
        .add_dialog(PromptKind::Text.dialog(NAME_PROMPT))
        .add_dialog(PromptKind::Text.dialog(TITLE_PROMPT))
        .add_dialog(PromptKind::Text.dialog(DESCRIPTION_PROMPT))
        .initial_dialog(FLOW)
}

struct LookupContactStep {
    contacts: Arc<dyn ContactRepository>,
    cases: Arc<dyn CaseRepository>,
}

#[async_trait]
impl WaterfallStep for LookupContactStep {
    async fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepResult, DialogError> {
        let email = remember_email(step);
        match self.contacts.find_by_email(&email).await {
            Ok(Some(contact)) => {
                bind_contact(step, &contact);
                if step.user().name.is_none() {
                    step.user().name = Some(contact.name.clone());
                }
                // 已有案例只做提示，查询失败不影响建单
                match self.cases.list_for_contact(contact.id).await {
                    Ok(existing) if !existing.is_empty() => {
                        step.send(format!(
                            "Welcome back, {}. You already have {} case(s) with us.",
                            contact.name,
                            existing.len()
                        ));
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(contact = %contact.id, error = %e, "Failed to list cases"),
                }
                // 跳过新建联系人
                Ok(StepResult::Skip {
                    count: 1,
                    value: Value::Null,
                })
            }
            Ok(None) => {
                forget_email(step);
                let options = PromptOptions::new(
                    "I couldn't find you in our records. What is your full name?",
                );
                Ok(StepResult::begin_with(NAME_PROMPT, options.to_value()))
            }
            Err(e) => Ok(apologize(step, &e)),
        }
    }
}

struct CreateContactStep {
    contacts: Arc<dyn ContactRepository>,
}

#[async_trait]
impl WaterfallStep for CreateContactStep {
    async fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepResult, DialogError> {
        let name = step.result_str().to_string();
        let email = step.value_str("email").unwrap_or_default().to_string();
        match self.contacts.create(&name, &email).await {
            Ok(contact) => {
                tracing::info!(contact = %contact.id, "Contact created");
                bind_contact(step, &contact);
                step.user().name = Some(contact.name);
                Ok(StepResult::next())
            }
            Err(e) => Ok(apologize(step, &e)),
        }
    }
}

struct AskTitleStep;

#[async_trait]
impl WaterfallStep for AskTitleStep {
    async fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepResult, DialogError> {
        let options = PromptOptions::new("Please give your case a short title.");
        Ok(StepResult::begin_with(TITLE_PROMPT, options.to_value()))
    }
}

struct AskDescriptionStep;

#[async_trait]
impl WaterfallStep for AskDescriptionStep {
    async fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepResult, DialogError> {
        let title = step.result().clone();
        step.values().insert("title".into(), title);
        let options = PromptOptions::new("Please describe the problem.");
        Ok(StepResult::begin_with(DESCRIPTION_PROMPT, options.to_value()))
    }
}

struct CreateCaseStep {
    cases: Arc<dyn CaseRepository>,
}

#[async_trait]
impl WaterfallStep for CreateCaseStep {
    async fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepResult, DialogError> {
        let description = step.result_str().to_string();
        let title = step.value_str("title").unwrap_or_default().to_string();
        let Some(contact_id) = step
            .value_str("contact_id")
            .and_then(|id| Uuid::from_str(id).ok())
        else {
            let err = RepositoryError::NotFound("contact for new case".into());
            return Ok(apologize(step, &err));
        };

        match self.cases.create(contact_id, &title, &description).await {
            Ok(case) => {
                tracing::info!(ticket = %case.ticket_number, "Case created");
                step.conversation().case_count += 1;
                step.send(format!(
                    "Your case has been created. Your ticket number is {}.",
                    case.ticket_number
                ));
                Ok(StepResult::End(json!(case.ticket_number)))
            }
            Err(e) => Ok(apologize(step, &e)),
        }
    }
}
