//! Tests for context builder

use chrono::NaiveDate;
use concierge_agent::ContextBuilder;
use concierge_provider::Message;
use concierge_session::{Message as TranscriptMessage, GREETING};

fn builder() -> ContextBuilder {
    ContextBuilder::with_date(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap())
}

#[test]
fn test_system_prompt_sections() {
    let prompt = builder().build_system_prompt();

    assert!(prompt.starts_with("You are a helpful travel assistant."));
    assert!(prompt.contains("destination AND dates"));
    assert!(prompt.contains("comprehensive summary"));
    assert!(prompt.ends_with("Today's date is 2025-03-14."));
}

#[test]
fn test_default_builder_uses_today() {
    let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
    let prompt = ContextBuilder::new().build_system_prompt();
    assert!(prompt.contains(&today));
}

#[test]
fn test_build_messages_order() {
    let history = vec![
        TranscriptMessage::assistant(GREETING),
        TranscriptMessage::user("I want to go to Lisbon"),
        TranscriptMessage::assistant("When would you like to travel?"),
    ];
    let scratch = vec![Message::tool("call_1", "search_flights", "[]")];

    let messages = builder().build_messages(&history, "In May", &scratch);

    let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(
        roles,
        vec!["system", "assistant", "user", "assistant", "user", "tool"]
    );
    assert_eq!(messages[4].content.as_deref(), Some("In May"));
    assert_eq!(messages[5].tool_call_id.as_deref(), Some("call_1"));
}

#[test]
fn test_build_messages_without_history() {
    let messages = builder().build_messages(&[], "Hello", &[]);

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, "system");
    assert_eq!(messages[1].role, "user");
    assert_eq!(messages[1].content.as_deref(), Some("Hello"));
}
