//! 意图识别：意图枚举、识别结果与识别器实现（关键词规则 / 远程 HTTP）

pub mod classifier;
pub mod http;
pub mod types;

pub use classifier::{create_classifier, IntentClassifier, KeywordClassifier};
pub use http::HttpClassifier;
pub use types::{Classification, Intent, IntentScore};
