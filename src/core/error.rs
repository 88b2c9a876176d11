//! 对话引擎错误类型
//!
//! DialogError 是一轮（turn）执行失败时向宿主层抛出的统一错误；
//! 意图识别、仓储、状态存储各有独立的错误枚举，通过 `#[from]` 汇入。

use thiserror::Error;

/// 对话引擎错误（配置缺陷、引擎不变量被破坏、外部协作方失败）
#[derive(Error, Debug)]
pub enum DialogError {
    /// begin / replace 引用了未注册的对话 ID（装配缺陷）
    #[error("Unknown dialog: {0}")]
    UnknownDialog(String),

    /// 在空栈上 pop（引擎不变量被破坏）
    #[error("Dialog stack is empty")]
    EmptyStack,

    /// 同一作用域内重复注册（仅启动期出现）
    #[error("Duplicate dialog id: {0}")]
    DuplicateId(String),

    #[error("Step {index} out of range for dialog {dialog_id}")]
    StepOutOfRange { dialog_id: String, index: usize },

    /// 单轮内步进次数超过上限（通常是 replace 死循环）
    #[error("Step limit exceeded: {0}")]
    StepLimitExceeded(usize),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("State error: {0}")]
    State(#[from] StateError),
}

/// 意图识别错误：不做重试，直接让本轮失败
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    #[error("Classifier returned no intents")]
    EmptyResult,

    #[error("Invalid classifier response: {0}")]
    InvalidResponse(String),
}

/// 领域仓储错误（案例 / 联系人 / 发票）
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record conflict: {0}")]
    Conflict(String),

    #[error("Repository backend error: {0}")]
    Backend(String),
}

/// 状态存储错误
#[derive(Error, Debug)]
pub enum StateError {
    #[error("State serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("State backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_converts() {
        let err: DialogError = RepositoryError::NotFound("contact".to_string()).into();
        assert!(matches!(err, DialogError::Repository(RepositoryError::NotFound(_))));
        assert!(err.to_string().contains("contact"));
    }

    #[test]
    fn test_classifier_error_message() {
        let err: DialogError = ClassifierError::Unavailable("timeout".to_string()).into();
        assert_eq!(err.to_string(), "Classifier error: Classifier unavailable: timeout");
    }
}
