//! 对话流程集成测试：通过 Bot 端到端驱动路由与叶子对话

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use crmbot::config::AppConfig;
use crmbot::core::{ClassifierError, DialogError, RepositoryError};
use crmbot::crm::{
    Case, CaseRepository, Contact, ContactRepository, MemoryCaseRepository, MemoryContactRepository,
    MemoryInvoiceRepository,
};
use crmbot::dialog::{Activity, DialogStack, TurnContext, TurnInput, TurnStatus};
use crmbot::escalation::CommandType;
use crmbot::intent::{Classification, IntentClassifier, IntentScore};
use crmbot::state::{ConversationData, MemoryStateStore, StateStore, UserProfile};
use crmbot::{ActivitySink, Bot, BotBuilder};

const CLOSING: &str = "Is there anything else I can help you with?";

/// 按整句文本返回预设标签；未配置的文本识别为 none(0.30)
struct ScriptedClassifier {
    script: HashMap<String, (String, f64)>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    fn new(entries: &[(&str, &str, f64)]) -> Self {
        Self {
            script: entries
                .iter()
                .map(|(text, label, score)| (text.to_string(), (label.to_string(), *score)))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntentClassifier for ScriptedClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (label, score) = self
            .script
            .get(text)
            .cloned()
            .unwrap_or_else(|| ("none".to_string(), 0.30));
        Classification::new(vec![
            IntentScore::new(label, score),
            IntentScore::new("none", 0.05),
        ])
    }
}

struct FailingClassifier;

#[async_trait]
impl IntentClassifier for FailingClassifier {
    async fn classify(&self, _text: &str) -> Result<Classification, ClassifierError> {
        Err(ClassifierError::Unavailable("service down".into()))
    }
}

struct FailingCaseRepository;

#[async_trait]
impl CaseRepository for FailingCaseRepository {
    async fn create(&self, _: Uuid, _: &str, _: &str) -> Result<Case, RepositoryError> {
        Err(RepositoryError::Backend("crm offline".into()))
    }

    async fn list_for_contact(&self, _: Uuid) -> Result<Vec<Case>, RepositoryError> {
        Err(RepositoryError::Backend("crm offline".into()))
    }
}

#[derive(Default)]
struct RecordingSink {
    delivered: Mutex<Vec<(String, Activity)>>,
}

#[async_trait]
impl ActivitySink for RecordingSink {
    async fn deliver(&self, conversation_id: &str, activity: &Activity) -> Result<(), String> {
        self.delivered
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), activity.clone()));
        Ok(())
    }
}

fn script() -> Arc<ScriptedClassifier> {
    Arc::new(ScriptedClassifier::new(&[
        ("hello", "greetingintent", 0.91),
        ("hmm", "none", 0.30),
        ("talk to a human", "humaninteraction", 0.88),
        ("thanks", "thank you", 0.95),
        ("will it rain", "weather", 0.70),
        ("my card is broken", "issue", 0.84),
        ("upload invoice", "invoiceupload", 0.79),
    ]))
}

struct Fixture {
    bot: Bot,
    classifier: Arc<ScriptedClassifier>,
    store: Arc<MemoryStateStore>,
    contacts: Arc<MemoryContactRepository>,
    cases: Arc<MemoryCaseRepository>,
}

async fn fixture() -> Fixture {
    let classifier = script();
    let store = Arc::new(MemoryStateStore::new());
    let contacts = Arc::new(MemoryContactRepository::new());
    let cases = Arc::new(MemoryCaseRepository::new());
    let bot = BotBuilder::new(AppConfig::default())
        .with_classifier(classifier.clone())
        .with_state_store(store.clone())
        .with_contacts(contacts.clone())
        .with_cases(cases.clone())
        .with_invoices(Arc::new(MemoryInvoiceRepository::new()))
        .build()
        .await
        .unwrap();
    Fixture {
        bot,
        classifier,
        store,
        contacts,
        cases,
    }
}

async fn say(bot: &Bot, text: &str) -> crmbot::TurnReport {
    bot.on_turn(TurnInput::new("c1", "u1", text)).await.unwrap()
}

fn stack_ids(stack: &DialogStack) -> Vec<&str> {
    stack.frames().iter().map(|f| f.dialog_id()).collect()
}

#[tokio::test]
async fn test_scenario_a_greeting_pushes_child() {
    let fx = fixture().await;

    let report = say(&fx.bot, "hello").await;
    assert_eq!(report.depth, 2);
    assert_eq!(report.status, TurnStatus::Waiting);
    assert_eq!(report.texts(), vec!["Hello! What is your name?"]);

    let stack = fx.bot.dialog_stack("c1").await.unwrap();
    assert_eq!(stack_ids(&stack), vec!["MainDialog.mainFlow", "MainDialog.greeting.flow"]);

    // 子对话结束：路由收尾提示、替换自身、清除信号后结束
    let report = say(&fx.bot, "Ada").await;
    assert_eq!(report.texts(), vec!["Hi Ada! How can I help you today?", CLOSING]);
    assert_eq!(report.depth, 0);
    assert_eq!(report.status, TurnStatus::Completed(Value::Null));
    assert_eq!(fx.classifier.calls(), 1);
    assert_eq!(fx.bot.user_profile("u1").await.unwrap().name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn test_known_user_greeted_without_question() {
    let fx = fixture().await;
    say(&fx.bot, "hello").await;
    say(&fx.bot, "Ada").await;

    let report = say(&fx.bot, "hello").await;
    assert_eq!(report.texts(), vec!["Hi Ada! How can I help you today?", CLOSING]);
    assert_eq!(report.depth, 0);
}

#[tokio::test]
async fn test_scenario_b_none_ends_silently() {
    let fx = fixture().await;
    let report = say(&fx.bot, "hmm").await;
    assert!(report.activities.is_empty());
    assert_eq!(report.depth, 0);
    assert_eq!(report.status, TurnStatus::Completed(Value::Null));
    assert!(fx.bot.dialog_stack("c1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_scenario_c_continuation_skips_classification() {
    let fx = fixture().await;
    say(&fx.bot, "hello").await;
    assert_eq!(fx.classifier.calls(), 1);

    // 本轮文本被问候对话消费；路由不再识别它
    let report = say(&fx.bot, "anything else I can help with").await;
    assert_eq!(fx.classifier.calls(), 1);
    assert_eq!(report.texts().last(), Some(&CLOSING));
    assert_eq!(report.status, TurnStatus::Completed(Value::Null));

    // 信号不会延续到下一轮
    let report = say(&fx.bot, "thanks").await;
    assert_eq!(fx.classifier.calls(), 2);
    assert_eq!(report.texts(), vec!["You are welcome"]);
}

#[tokio::test]
async fn test_scenario_d_escalation() {
    let fx = fixture().await;
    let report = say(&fx.bot, "talk to a human").await;

    let commands: Vec<_> = report
        .activities
        .iter()
        .filter_map(|a| match a {
            Activity::Command { command } => Some(command),
            _ => None,
        })
        .collect();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].command_type(), CommandType::Escalate);
    assert_eq!(commands[0].context().get("BotHandoffTopic"), Some(&json!("CreditCard")));
    assert_eq!(report.texts(), vec!["requestescalation"]);
    assert_eq!(report.depth, 0);
}

#[tokio::test]
async fn test_routing_table_replies() {
    let fx = fixture().await;

    let report = say(&fx.bot, "thanks").await;
    assert_eq!(report.texts(), vec!["You are welcome"]);

    let report = say(&fx.bot, "will it rain").await;
    assert_eq!(report.texts(), vec!["I'm sorry I don't know what you mean."]);
    assert_eq!(report.depth, 0);

    let report = say(&fx.bot, "my card is broken").await;
    assert_eq!(report.depth, 3);
    let stack = fx.bot.dialog_stack("c1").await.unwrap();
    assert_eq!(
        stack_ids(&stack),
        vec!["MainDialog.mainFlow", "MainDialog.newCase.flow", "MainDialog.newCase.email"]
    );
    assert_eq!(
        fx.bot.conversation_data("c1").await.unwrap().last_topic.as_deref(),
        Some("issue")
    );

    fx.bot.reset_conversation("c1").await.unwrap();
    let report = say(&fx.bot, "upload invoice").await;
    assert_eq!(report.depth, 3);
    assert_eq!(
        report.texts(),
        vec!["Sure, let's register your invoice. What is your email address?"]
    );
}

#[tokio::test]
async fn test_new_case_flow_creates_contact_and_case() {
    let fx = fixture().await;

    let report = say(&fx.bot, "my card is broken").await;
    assert_eq!(report.texts(), vec!["I can open a case for you. What is your email address?"]);

    let report = say(&fx.bot, "not-an-email").await;
    assert_eq!(
        report.texts(),
        vec![
            "That doesn't look like a valid email address. Please try again.",
            "I can open a case for you. What is your email address?",
        ]
    );
    assert_eq!(report.depth, 3);

    let report = say(&fx.bot, "Ada@Example.com").await;
    assert_eq!(
        report.texts(),
        vec!["I couldn't find you in our records. What is your full name?"]
    );

    let report = say(&fx.bot, "Ada Lovelace").await;
    assert_eq!(report.texts(), vec!["Please give your case a short title."]);

    let report = say(&fx.bot, "Card broken").await;
    assert_eq!(report.texts(), vec!["Please describe the problem."]);

    let report = say(&fx.bot, "It snapped in half").await;
    assert_eq!(report.depth, 0);
    let texts = report.texts();
    assert_eq!(texts.len(), 2);
    assert!(texts[0].starts_with("Your case has been created. Your ticket number is CAS-"));
    assert_eq!(texts[1], CLOSING);
    assert_eq!(fx.classifier.calls(), 1);

    let contact = fx.contacts.find_by_email("ada@example.com").await.unwrap().unwrap();
    let cases = fx.cases.list_for_contact(contact.id).await.unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].title, "Card broken");
    assert_eq!(cases[0].description, "It snapped in half");

    let profile = fx.bot.user_profile("u1").await.unwrap();
    assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
    assert_eq!(profile.contact_id, Some(contact.id.to_string()));
    assert_eq!(fx.bot.conversation_data("c1").await.unwrap().case_count, 1);
}

#[tokio::test]
async fn test_new_case_known_contact_skips_name() {
    let fx = fixture().await;
    fx.contacts.seed(Contact::new("Grace", "grace@example.com")).await;

    say(&fx.bot, "my card is broken").await;
    let report = say(&fx.bot, "grace@example.com").await;
    assert_eq!(report.texts(), vec!["Please give your case a short title."]);
    assert_eq!(fx.bot.user_profile("u1").await.unwrap().name.as_deref(), Some("Grace"));
}

#[tokio::test]
async fn test_new_case_mentions_existing_cases() {
    let fx = fixture().await;
    let grace = Contact::new("Grace", "grace@example.com");
    fx.contacts.seed(grace.clone()).await;
    fx.cases.create(grace.id, "Old", "Earlier problem").await.unwrap();

    say(&fx.bot, "my card is broken").await;
    let report = say(&fx.bot, "grace@example.com").await;
    assert_eq!(
        report.texts(),
        vec![
            "Welcome back, Grace. You already have 1 case(s) with us.",
            "Please give your case a short title.",
        ]
    );
}

#[tokio::test]
async fn test_case_repository_failure_is_recovered_locally() {
    let classifier = script();
    let contacts = Arc::new(MemoryContactRepository::new());
    contacts.seed(Contact::new("Grace", "grace@example.com")).await;
    let bot = BotBuilder::new(AppConfig::default())
        .with_classifier(classifier)
        .with_state_store(Arc::new(MemoryStateStore::new()))
        .with_contacts(contacts)
        .with_cases(Arc::new(FailingCaseRepository))
        .build()
        .await
        .unwrap();

    for text in ["my card is broken", "grace@example.com", "Card broken"] {
        say(&bot, text).await;
    }
    let report = say(&bot, "It snapped").await;
    assert_eq!(
        report.texts(),
        vec!["Sorry, something went wrong on our side. Please try again later.", CLOSING]
    );
    assert_eq!(report.depth, 0);
}

#[tokio::test]
async fn test_invoice_flow() {
    let fx = fixture().await;
    fx.contacts.seed(Contact::new("Demo", "demo@example.com")).await;

    say(&fx.bot, "upload invoice").await;
    let report = say(&fx.bot, "demo@example.com").await;
    assert_eq!(report.texts(), vec!["What is the invoice number?"]);

    let report = say(&fx.bot, "INV-42").await;
    assert_eq!(report.texts(), vec!["What is the total amount of the invoice?"]);

    let report = say(&fx.bot, "lots").await;
    assert_eq!(
        report.texts(),
        vec![
            "Please enter the amount as a positive number, e.g. 125.50.",
            "What is the total amount of the invoice?",
        ]
    );

    let report = say(&fx.bot, "$1,250.50").await;
    assert_eq!(
        report.texts(),
        vec!["Thanks! Invoice INV-42 for 1250.50 has been registered.", CLOSING]
    );
    assert_eq!(report.depth, 0);
}

#[tokio::test]
async fn test_invoice_unknown_contact_ends() {
    let fx = fixture().await;
    say(&fx.bot, "upload invoice").await;
    let report = say(&fx.bot, "nobody@example.com").await;
    assert_eq!(
        report.texts(),
        vec![
            "I couldn't find a customer account for nobody@example.com. Please contact support to register first.",
            CLOSING,
        ]
    );
    assert_eq!(report.depth, 0);
}

#[tokio::test]
async fn test_invoice_mistyped_email_is_asked_again() {
    let fx = fixture().await;
    fx.contacts.seed(Contact::new("Demo", "demo@example.com")).await;

    say(&fx.bot, "upload invoice").await;
    let report = say(&fx.bot, "demo@exampel.com").await;
    assert!(report.texts()[0].starts_with("I couldn't find a customer account for demo@exampel.com."));
    assert_eq!(fx.bot.user_profile("u1").await.unwrap().email, None);

    let report = say(&fx.bot, "upload invoice").await;
    assert_eq!(
        report.texts(),
        vec!["Sure, let's register your invoice. What is your email address?"]
    );
    let report = say(&fx.bot, "demo@example.com").await;
    assert_eq!(report.texts(), vec!["What is the invoice number?"]);
    let profile = fx.bot.user_profile("u1").await.unwrap();
    assert_eq!(profile.email.as_deref(), Some("demo@example.com"));
}

#[tokio::test]
async fn test_classifier_failure_fails_turn_without_saving() {
    let store = Arc::new(MemoryStateStore::new());
    let bot = BotBuilder::new(AppConfig::default())
        .with_classifier(Arc::new(FailingClassifier))
        .with_state_store(store.clone())
        .build()
        .await
        .unwrap();

    let err = bot.on_turn(TurnInput::new("c1", "u1", "hello")).await.unwrap_err();
    assert!(matches!(err, DialogError::Classifier(ClassifierError::Unavailable(_))));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_resume_same_frame_twice_is_deterministic() {
    let fx = fixture().await;
    say(&fx.bot, "hello").await;
    let persisted = fx.bot.dialog_stack("c1").await.unwrap();

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let mut stack = persisted.clone();
        let input = TurnInput::new("c1", "u1", "Ada");
        let mut conversation = ConversationData::default();
        let mut user = UserProfile::default();
        let mut turn = TurnContext::new(&input, &mut conversation, &mut user);
        let status = fx.bot.engine().run_turn(&mut stack, &mut turn).await.unwrap();
        outcomes.push((status, turn.into_activities(), stack));
    }
    assert_eq!(outcomes[0], outcomes[1]);
}

#[tokio::test]
async fn test_stack_survives_restart() {
    let fx = fixture().await;
    say(&fx.bot, "my card is broken").await;

    let raw = fx.store.load("conversation/c1/dialogStack").await.unwrap().unwrap();
    let stack: DialogStack = serde_json::from_value(raw.clone()).unwrap();
    assert_eq!(stack.depth(), 3);
    assert_eq!(serde_json::to_value(&stack).unwrap(), raw);

    // 同一存储上的新 Bot 继续该会话
    let restarted = BotBuilder::new(AppConfig::default())
        .with_classifier(fx.classifier.clone())
        .with_state_store(fx.store.clone())
        .with_contacts(fx.contacts.clone())
        .build()
        .await
        .unwrap();
    let report = say(&restarted, "ada@example.com").await;
    assert_eq!(
        report.texts(),
        vec!["I couldn't find you in our records. What is your full name?"]
    );
    assert_eq!(fx.classifier.calls(), 1);
}

#[tokio::test]
async fn test_conversations_are_independent() {
    let fx = fixture().await;
    let (a, b) = tokio::join!(
        fx.bot.on_turn(TurnInput::new("c-a", "u-a", "hello")),
        fx.bot.on_turn(TurnInput::new("c-b", "u-b", "thanks")),
    );
    assert_eq!(a.unwrap().depth, 2);
    assert_eq!(b.unwrap().depth, 0);
    assert_eq!(fx.bot.dialog_stack("c-a").await.unwrap().depth(), 2);
    assert!(fx.bot.dialog_stack("c-b").await.unwrap().is_empty());
    assert_eq!(fx.bot.active_conversations().await, 1);
}

#[tokio::test]
async fn test_finished_and_reset_conversations_release_locks() {
    let fx = fixture().await;
    for i in 0..100 {
        let id = format!("c{}", i);
        let report = fx.bot.on_turn(TurnInput::new(id.as_str(), "u1", "thanks")).await.unwrap();
        assert!(matches!(report.status, TurnStatus::Completed(_)));
        fx.bot.reset_conversation(&id).await.unwrap();
    }
    assert_eq!(fx.bot.active_conversations().await, 0);

    let report = say(&fx.bot, "hello").await;
    assert!(matches!(report.status, TurnStatus::Waiting));
    assert_eq!(fx.bot.active_conversations().await, 1);

    fx.bot.reset_conversation("c1").await.unwrap();
    assert_eq!(fx.bot.active_conversations().await, 0);
}

#[tokio::test]
async fn test_reset_starts_fresh_and_sink_receives_activities() {
    let sink = Arc::new(RecordingSink::default());
    let classifier = script();
    let bot = BotBuilder::new(AppConfig::default())
        .with_classifier(classifier.clone())
        .with_state_store(Arc::new(MemoryStateStore::new()))
        .with_sink(sink.clone())
        .build()
        .await
        .unwrap();

    say(&bot, "hello").await;
    bot.reset_conversation("c1").await.unwrap();
    assert!(bot.dialog_stack("c1").await.unwrap().is_empty());

    let report = say(&bot, "thanks").await;
    assert_eq!(report.texts(), vec!["You are welcome"]);
    assert_eq!(classifier.calls(), 2);

    let delivered = sink.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 2);
    assert!(delivered.iter().all(|(id, _)| id == "c1"));
    assert_eq!(delivered[1].1.text(), Some("You are welcome"));
}
