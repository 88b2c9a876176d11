//! 意图类型与识别结果

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::ClassifierError;

/// 路由可识别的意图（封闭集合 + Unknown）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Intent {
    Greeting,
    HumanInteraction,
    Issue,
    InvoiceUpload,
    ThankYou,
    /// 保留的兜底标签
    None,
    /// 识别服务返回了路由表之外的标签（保留原文）
    Unknown(String),
}

impl Intent {
    /// 解析标签：忽略大小写与非字母数字字符（"Greeting-Intent" 与 "greetingintent" 等价）
    pub fn parse(label: &str) -> Self {
        let normalized: String = label
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "greeting" | "greetingintent" => Intent::Greeting,
            "humaninteraction" => Intent::HumanInteraction,
            "issue" => Intent::Issue,
            "invoiceupload" => Intent::InvoiceUpload,
            "thankyou" => Intent::ThankYou,
            "none" => Intent::None,
            _ => Intent::Unknown(label.to_string()),
        }
    }

    /// 规范标签名（用于记录 last_topic）
    pub fn label(&self) -> &str {
        match self {
            Intent::Greeting => "greeting",
            Intent::HumanInteraction => "humaninteraction",
            Intent::Issue => "issue",
            Intent::InvoiceUpload => "invoiceupload",
            Intent::ThankYou => "thankyou",
            Intent::None => "none",
            Intent::Unknown(label) => label.as_str(),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 单个候选意图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentScore {
    pub label: String,
    pub score: f64,
}

impl IntentScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// 识别结果：非空、按分数降序（同分保持原顺序）
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    intents: Vec<IntentScore>,
}

impl Classification {
    pub fn new(mut intents: Vec<IntentScore>) -> Result<Self, ClassifierError> {
        if intents.is_empty() {
            return Err(ClassifierError::EmptyResult);
        }
        for item in intents.iter_mut() {
            if item.score.is_nan() {
                return Err(ClassifierError::InvalidResponse(format!(
                    "score for {} is not a number",
                    item.label
                )));
            }
            item.score = item.score.clamp(0.0, 1.0);
        }
        // sort_by 是稳定排序
        intents.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(Self { intents })
    }

    /// 只含一个标签的结果
    pub fn single(label: impl Into<String>, score: f64) -> Result<Self, ClassifierError> {
        Self::new(vec![IntentScore::new(label, score)])
    }

    pub fn top(&self) -> &IntentScore {
        &self.intents[0]
    }

    pub fn top_intent(&self) -> Intent {
        Intent::parse(&self.top().label)
    }

    pub fn intents(&self) -> &[IntentScore] {
        &self.intents
    }
}
