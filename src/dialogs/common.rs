//! 叶子对话共用的步骤

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::{DialogError, RepositoryError};
use crate::crm::Contact;
use crate::dialog::{PromptOptions, StepContext, StepResult, WaterfallStep};

pub const APOLOGY: &str = "Sorry, something went wrong on our side. Please try again later.";

/// 用户资料里已有邮箱则直接继续，否则开始邮箱提示对话
pub struct AskEmailStep {
    pub prompt_id: &'static str,
    pub prompt: &'static str,
}

#[async_trait]
impl WaterfallStep for AskEmailStep {
    async fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepResult, DialogError> {
        if let Some(email) = step.user().email.clone() {
            return Ok(StepResult::Continue(Value::String(email)));
        }
        let options = PromptOptions::new(self.prompt)
            .with_retry("That doesn't look like a valid email address. Please try again.");
        Ok(StepResult::begin_with(self.prompt_id, options.to_value()))
    }
}

/// 把本步输入中的邮箱记入步骤状态并返回；用户资料要等联系人确认后再写
pub fn remember_email(step: &mut StepContext<'_, '_>) -> String {
    let email = step.result_str().to_string();
    step.values().insert("email".into(), json!(email));
    email
}

/// 联系人已确认：把邮箱与联系人 id 写入用户资料
pub fn bind_contact(step: &mut StepContext<'_, '_>, contact: &Contact) {
    step.values().insert("contact_id".into(), json!(contact.id));
    let user = step.user();
    user.email = Some(contact.email.clone());
    user.contact_id = Some(contact.id.to_string());
}

/// 邮箱没有对应联系人：清掉资料里的邮箱，下次重新询问
pub fn forget_email(step: &mut StepContext<'_, '_>) {
    let user = step.user();
    user.email = None;
    user.contact_id = None;
}

/// 仓储失败时的本地恢复：记录告警、致歉并结束叶子对话
pub fn apologize(step: &mut StepContext<'_, '_>, err: &RepositoryError) -> StepResult {
    tracing::warn!(dialog = %step.dialog_id(), error = %err, "Repository call failed");
    step.send(APOLOGY);
    StepResult::end()
}
