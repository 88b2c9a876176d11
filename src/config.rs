//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CRMBOT__*` 覆盖（双下划线表示嵌套，如 `CRMBOT__STATE__BACKEND=sqlite`）。

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub bot: BotSection,
    #[serde(default)]
    pub router: RouterSection,
    #[serde(default)]
    pub classifier: ClassifierSection,
    #[serde(default)]
    pub state: StateSection,
}

/// [bot] 段：入口对话与单轮步数上限
#[derive(Debug, Clone, Deserialize)]
pub struct BotSection {
    #[serde(default = "default_root_dialog")]
    pub root_dialog: String,
    /// 单轮内最多执行的步骤数，防止 replace / repeat 死循环
    #[serde(default = "default_max_steps_per_turn")]
    pub max_steps_per_turn: usize,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            root_dialog: default_root_dialog(),
            max_steps_per_turn: default_max_steps_per_turn(),
        }
    }
}

fn default_root_dialog() -> String {
    "MainDialog".to_string()
}

fn default_max_steps_per_turn() -> usize {
    64
}

/// [router] 段：意图路由的固定回复与转人工上下文
#[derive(Debug, Clone, Deserialize)]
pub struct RouterSection {
    #[serde(default = "default_escalation_context_key")]
    pub escalation_context_key: String,
    #[serde(default = "default_escalation_context_value")]
    pub escalation_context_value: String,
    #[serde(default = "default_escalation_ack")]
    pub escalation_ack: String,
    #[serde(default = "default_thanks_reply")]
    pub thanks_reply: String,
    #[serde(default = "default_not_understood")]
    pub not_understood: String,
    #[serde(default = "default_closing_prompt")]
    pub closing_prompt: String,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            escalation_context_key: default_escalation_context_key(),
            escalation_context_value: default_escalation_context_value(),
            escalation_ack: default_escalation_ack(),
            thanks_reply: default_thanks_reply(),
            not_understood: default_not_understood(),
            closing_prompt: default_closing_prompt(),
        }
    }
}

fn default_escalation_context_key() -> String {
    "BotHandoffTopic".to_string()
}

fn default_escalation_context_value() -> String {
    "CreditCard".to_string()
}

fn default_escalation_ack() -> String {
    "requestescalation".to_string()
}

fn default_thanks_reply() -> String {
    "You are welcome".to_string()
}

fn default_not_understood() -> String {
    "I'm sorry I don't know what you mean.".to_string()
}

fn default_closing_prompt() -> String {
    "Is there anything else I can help you with?".to_string()
}

/// [classifier] 段：意图识别后端
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierSection {
    /// keyword（本地关键词规则）/ http（远程识别服务）
    #[serde(default = "default_classifier_provider")]
    pub provider: String,
    pub endpoint: Option<String>,
    #[serde(default = "default_classifier_timeout_secs")]
    pub timeout_secs: u64,
    /// 意图标签 -> 关键词列表（keyword 后端使用）
    #[serde(default = "default_classifier_rules")]
    pub rules: HashMap<String, Vec<String>>,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            provider: default_classifier_provider(),
            endpoint: None,
            timeout_secs: default_classifier_timeout_secs(),
            rules: default_classifier_rules(),
        }
    }
}

fn default_classifier_provider() -> String {
    "keyword".to_string()
}

fn default_classifier_timeout_secs() -> u64 {
    10
}

fn default_classifier_rules() -> HashMap<String, Vec<String>> {
    let rules: [(&str, &[&str]); 5] = [
        ("greeting", &["hello", "hi", "hey", "good morning", "good afternoon"]),
        ("humaninteraction", &["agent", "human", "person", "representative", "operator"]),
        ("issue", &["problem", "issue", "broken", "not working", "complaint", "case"]),
        ("invoiceupload", &["invoice", "bill", "receipt"]),
        ("thankyou", &["thanks", "thank you", "cheers"]),
    ];
    rules
        .into_iter()
        .map(|(label, words)| {
            (
                label.to_string(),
                words.iter().map(|w| w.to_string()).collect(),
            )
        })
        .collect()
}

/// [state] 段：对话状态存储后端
#[derive(Debug, Clone, Deserialize)]
pub struct StateSection {
    /// memory / sqlite（sqlite 需启用 async-sqlite feature）
    #[serde(default = "default_state_backend")]
    pub backend: String,
    pub db_path: Option<PathBuf>,
}

impl Default for StateSection {
    fn default() -> Self {
        Self {
            backend: default_state_backend(),
            db_path: None,
        }
    }
}

fn default_state_backend() -> String {
    "memory".to_string()
}

/// 从默认路径与环境变量加载配置
///
/// - 若存在 `config/default.toml`（或 `../config/default.toml` 等），先加载
/// - 若传入 `config_path` 且文件存在，再加载该文件（覆盖同名项）
/// - 最后用环境变量 `CRMBOT__*` 覆盖
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CRMBOT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
