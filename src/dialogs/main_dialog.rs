//! 意图路由（入口对话 MainDialog）
//!
//! 两步瀑布 MainDialog.mainFlow：
//! 1. 本轮若有子对话刚结束（TurnSignal::Continuation），清除信号并直接继续，不再识别；
//!    否则识别本轮文本，按最高分意图分派（开始子对话 / 转人工 / 固定回复）。
//! 2. 信号仍在则发送收尾提示并以新的 mainFlow 替换自身；否则结束。

use std::sync::Arc;

use async_trait::async_trait;

use super::{DialogServices, GREETING, INVOICE_UPLOAD, MAIN_DIALOG, MAIN_FLOW, NEW_CASE};
use crate::config::RouterSection;
use crate::core::DialogError;
use crate::dialog::{ComponentDialog, StepContext, StepResult, TurnSignal, WaterfallDialog, WaterfallStep};
use crate::escalation::EscalationCommand;
use crate::intent::{Intent, IntentClassifier};

/// MainDialog 组合对话（叶子组合对话由 build_registry 追加）
pub fn component(services: &DialogServices) -> ComponentDialog {
    let flow = WaterfallDialog::new(MAIN_FLOW)
        .step(ClassifyStep {
            classifier: Arc::clone(&services.classifier),
            router: Arc::clone(&services.router),
        })
        .step(LoopStep {
            router: Arc::clone(&services.router),
        });
    ComponentDialog::new(MAIN_DIALOG)
        .add_dialog(flow)
        .initial_dialog(MAIN_FLOW)
}

struct ClassifyStep {
    classifier: Arc<dyn IntentClassifier>,
    router: Arc<RouterSection>,
}

#[async_trait]
impl WaterfallStep for ClassifyStep {
    async fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepResult, DialogError> {
        if step.take_signal() == TurnSignal::Continuation {
            tracing::debug!("Child dialog completed this turn, skipping classification");
            return Ok(StepResult::next());
        }

        let result = self.classifier.classify(step.text()).await?;
        let top = result.top();
        let intent = Intent::parse(&top.label);
        tracing::info!(intent = %intent, score = top.score, "Routing intent");
        step.conversation().last_topic = Some(intent.label().to_string());

        let next = match intent {
            Intent::Greeting => StepResult::begin(GREETING),
            Intent::Issue => StepResult::begin(NEW_CASE),
            Intent::InvoiceUpload => StepResult::begin(INVOICE_UPLOAD),
            Intent::HumanInteraction => {
                let command = EscalationCommand::escalate(
                    self.router.escalation_context_key.clone(),
                    self.router.escalation_context_value.clone(),
                );
                tracing::info!(context = ?command.context(), "Escalating to human agent");
                step.escalate(command);
                step.send(self.router.escalation_ack.clone());
                StepResult::next()
            }
            Intent::ThankYou => {
                step.send(self.router.thanks_reply.clone());
                StepResult::next()
            }
            Intent::None => StepResult::next(),
            Intent::Unknown(label) => {
                tracing::debug!(label = %label, "Unrecognized intent label");
                step.send(self.router.not_understood.clone());
                StepResult::next()
            }
        };
        Ok(next)
    }
}

struct LoopStep {
    router: Arc<RouterSection>,
}

#[async_trait]
impl WaterfallStep for LoopStep {
    async fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepResult, DialogError> {
        if step.signal() == TurnSignal::Continuation {
            step.send(self.router.closing_prompt.clone());
            return Ok(StepResult::replace(MAIN_FLOW));
        }
        Ok(StepResult::end())
    }
}
