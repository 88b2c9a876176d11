//! 意图识别接口与关键词实现

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use super::http::HttpClassifier;
use super::types::{Classification, IntentScore};
use crate::config::ClassifierSection;
use crate::core::ClassifierError;

/// 意图识别器：原始文本 -> 按分数降序的候选列表
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError>;
}

/// 关键词规则识别器
///
/// 按词边界匹配关键词，命中越多分数越高；结果末尾总是带保留标签 none。
pub struct KeywordClassifier {
    rules: BTreeMap<String, Vec<String>>,
}

/// 小写并以空格重新拼接单词，首尾补空格，便于按词边界查找
fn normalize(text: &str) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    format!(" {} ", words.join(" "))
}

impl KeywordClassifier {
    pub fn new(rules: HashMap<String, Vec<String>>) -> Self {
        let rules = rules
            .into_iter()
            .map(|(label, words)| {
                let words = words
                    .iter()
                    .map(|w| normalize(w))
                    .filter(|w| !w.trim().is_empty())
                    .collect();
                (label, words)
            })
            .collect();
        Self { rules }
    }

    fn score(&self, text: &str) -> Vec<IntentScore> {
        let text = normalize(text);
        let mut hits: Vec<IntentScore> = self
            .rules
            .iter()
            .filter(|(label, _)| label.as_str() != "none")
            .filter_map(|(label, words)| {
                let count = words.iter().filter(|w| text.contains(w.as_str())).count();
                (count > 0).then(|| {
                    IntentScore::new(label.clone(), (0.5 + 0.2 * (count as f64 - 1.0)).min(0.95))
                })
            })
            .collect();

        let none_score = if hits.is_empty() { 0.3 } else { 0.0 };
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.push(IntentScore::new("none", none_score));
        hits
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        let intents = self.score(text);
        tracing::debug!(top = %intents[0].label, score = intents[0].score, "Keyword classification");
        Classification::new(intents)
    }
}

/// 按配置创建识别器；http 缺少 endpoint 或 provider 未知时回退到关键词规则
pub fn create_classifier(config: &ClassifierSection) -> Arc<dyn IntentClassifier> {
    match config.provider.to_lowercase().as_str() {
        "http" => match config.endpoint.as_deref() {
            Some(endpoint) => {
                tracing::info!("Using HTTP intent classifier: {}", endpoint);
                return Arc::new(HttpClassifier::new(endpoint, config.timeout_secs));
            }
            None => {
                tracing::warn!("HTTP classifier requested without endpoint, using keyword rules");
            }
        },
        "keyword" => {}
        other => {
            tracing::warn!("Unknown classifier provider {}, using keyword rules", other);
        }
    }
    tracing::info!("Using keyword intent classifier ({} rules)", config.rules.len());
    Arc::new(KeywordClassifier::new(config.rules.clone()))
}
