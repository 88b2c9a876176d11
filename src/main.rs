//! crmbot 控制台宿主
//!
//! 入口：初始化日志、加载配置、构建 Bot，然后逐行读取标准输入作为用户消息。
//! `/reset` 重置当前会话，`/quit` 退出。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use crmbot::config::load_config;
use crmbot::crm::{Contact, MemoryContactRepository};
use crmbot::dialog::{Activity, TurnInput, TurnStatus};
use crmbot::{observability, BotBuilder};
use tokio::io::{AsyncBufReadExt, BufReader};

const CONVERSATION_ID: &str = "console";
const USER_ID: &str = "console-user";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path).context("Failed to load config")?;

    // 演示用联系人，便于直接走发票流程
    let contacts = Arc::new(MemoryContactRepository::new());
    contacts.seed(Contact::new("Demo Customer", "demo@example.com")).await;

    let bot = BotBuilder::new(config)
        .with_contacts(contacts)
        .build()
        .await
        .context("Failed to build bot")?;

    println!("crmbot ready. Type a message, /reset to start over, /quit to exit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let text = line.trim();
        match text {
            "" => continue,
            "/quit" => break,
            "/reset" => {
                bot.reset_conversation(CONVERSATION_ID)
                    .await
                    .context("Failed to reset conversation")?;
                println!("(conversation reset)");
                continue;
            }
            _ => {}
        }

        match bot.on_turn(TurnInput::new(CONVERSATION_ID, USER_ID, text)).await {
            Ok(report) => {
                for activity in &report.activities {
                    match activity {
                        Activity::Message { text } => println!("bot> {}", text),
                        Activity::Command { command } => {
                            let raw = serde_json::to_string(command).unwrap_or_default();
                            println!("bot> [command] {}", raw);
                        }
                    }
                }
                if matches!(report.status, TurnStatus::Completed(_)) {
                    println!("(dialog finished)");
                }
            }
            Err(e) => eprintln!("error: {:#}", anyhow::Error::from(e)),
        }
    }

    Ok(())
}
