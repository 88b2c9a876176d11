//! 输入提示对话
//!
//! 两步瀑布：第 0 步发送提示并挂起；第 1 步校验用户回复，合法则以规范化后的值结束，
//! 不合法则发送重试提示并 Repeat（重新发送提示、再次挂起）。
//! 调用参数为 PromptOptions 的 JSON 形式。

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::waterfall::{StepContext, StepResult, WaterfallDialog, WaterfallStep};
use crate::core::DialogError;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

/// 提示参数
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptOptions {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<String>,
}

impl PromptOptions {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            retry: None,
        }
    }

    pub fn with_retry(mut self, retry: impl Into<String>) -> Self {
        self.retry = Some(retry.into());
        self
    }

    pub fn to_value(&self) -> Value {
        json!(self)
    }

    fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

/// 提示类型（决定校验与规范化方式）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// 任意非空文本
    Text,
    /// 邮箱地址（转小写）
    Email,
    /// 正金额（允许 $ 与千分位逗号）
    Amount,
}

impl PromptKind {
    /// 构建该类型的提示对话
    pub fn dialog(self, id: impl Into<String>) -> WaterfallDialog {
        WaterfallDialog::new(id)
            .step(AskStep)
            .step(ValidateStep { kind: self })
    }

    /// 校验并规范化输入；不合法返回 None
    pub fn validate(self, input: &str) -> Option<Value> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        match self {
            PromptKind::Text => Some(Value::String(input.to_string())),
            PromptKind::Email => {
                let re = EMAIL_RE
                    .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$").unwrap());
                re.is_match(input)
                    .then(|| Value::String(input.to_lowercase()))
            }
            PromptKind::Amount => {
                let cleaned: String = input
                    .trim_start_matches('$')
                    .chars()
                    .filter(|c| *c != ',')
                    .collect();
                let amount: f64 = cleaned.trim().parse().ok()?;
                (amount.is_finite() && amount > 0.0).then(|| json!(amount))
            }
        }
    }

    fn default_retry(self) -> &'static str {
        match self {
            PromptKind::Text => "Please enter a value.",
            PromptKind::Email => "That doesn't look like a valid email address.",
            PromptKind::Amount => "Please enter a positive amount, e.g. 125.50.",
        }
    }
}

struct AskStep;

#[async_trait]
impl WaterfallStep for AskStep {
    async fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepResult, DialogError> {
        let options = PromptOptions::from_value(step.options());
        if !options.prompt.is_empty() {
            step.send(options.prompt);
        }
        Ok(StepResult::Suspend)
    }
}

struct ValidateStep {
    kind: PromptKind,
}

#[async_trait]
impl WaterfallStep for ValidateStep {
    async fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepResult, DialogError> {
        match self.kind.validate(step.result_str()) {
            Some(value) => Ok(StepResult::End(value)),
            None => {
                let options = PromptOptions::from_value(step.options());
                let retry = options
                    .retry
                    .unwrap_or_else(|| self.kind.default_retry().to_string());
                tracing::debug!(dialog = %step.dialog_id(), kind = ?self.kind, "Prompt input rejected");
                step.send(retry);
                Ok(StepResult::Repeat)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert_eq!(
            PromptKind::Email.validate("  Jane.Doe@Example.com "),
            Some(json!("jane.doe@example.com"))
        );
        assert_eq!(PromptKind::Email.validate("not-an-email"), None);
        assert_eq!(PromptKind::Email.validate("a@b"), None);
        assert_eq!(PromptKind::Email.validate("two words@x.com"), None);
    }

    #[test]
    fn test_amount_validation() {
        assert_eq!(PromptKind::Amount.validate("$1,250.50"), Some(json!(1250.5)));
        assert_eq!(PromptKind::Amount.validate("42"), Some(json!(42.0)));
        assert_eq!(PromptKind::Amount.validate("-3"), None);
        assert_eq!(PromptKind::Amount.validate("abc"), None);
        assert_eq!(PromptKind::Amount.validate("0"), None);
    }

    #[test]
    fn test_text_validation() {
        assert_eq!(PromptKind::Text.validate(" hello "), Some(json!("hello")));
        assert_eq!(PromptKind::Text.validate("   "), None);
    }

    #[test]
    fn test_options_round_trip() {
        let options = PromptOptions::new("Your email?").with_retry("Try again");
        let parsed = PromptOptions::from_value(&options.to_value());
        assert_eq!(parsed.prompt, "Your email?");
        assert_eq!(parsed.retry.as_deref(), Some("Try again"));
        assert_eq!(PromptOptions::from_value(&Value::Null).prompt, "");
    }
}
