//! 核心：错误类型与 Bot 构建器

pub mod builder;
pub mod error;

pub use builder::BotBuilder;
pub use error::{ClassifierError, DialogError, RepositoryError, StateError};
