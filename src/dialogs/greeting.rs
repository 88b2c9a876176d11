//! 问候对话：已知姓名直接问候；否则询问姓名、写入用户资料后问候

use async_trait::async_trait;
use serde_json::Value;

use super::GREETING;
use crate::core::DialogError;
use crate::dialog::{ComponentDialog, PromptKind, StepContext, StepResult, WaterfallDialog, WaterfallStep};

pub const FLOW: &str = "MainDialog.greeting.flow";

pub fn component() -> ComponentDialog {
    let flow = WaterfallDialog::new(FLOW).step(AskNameStep).step(GreetStep);
    ComponentDialog::new(GREETING).add_dialog(flow).initial_dialog(FLOW)
}

fn greet(step: &mut StepContext<'_, '_>, name: &str) {
    step.send(format!("Hi {}! How can I help you today?", name));
}

struct AskNameStep;

#[async_trait]
impl WaterfallStep for AskNameStep {
    async fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepResult, DialogError> {
        if step.user().has_name() {
            let name = step.user().name.clone().unwrap_or_default();
            greet(step, &name);
            return Ok(StepResult::End(Value::String(name)));
        }
        // 在本对话内直接询问，不另开提示帧
        step.send("Hello! What is your name?");
        Ok(StepResult::Suspend)
    }
}

struct GreetStep;

#[async_trait]
impl WaterfallStep for GreetStep {
    async fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepResult, DialogError> {
        let Some(Value::String(name)) = PromptKind::Text.validate(step.result_str()) else {
            step.send("Sorry, I didn't catch that.");
            return Ok(StepResult::Repeat);
        };
        step.user().name = Some(name.clone());
        greet(step, &name);
        Ok(StepResult::End(Value::String(name)))
    }
}
