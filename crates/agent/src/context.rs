//! Prompt assembly for one planning step

use chrono::{Local, NaiveDate};
use tracing::trace;

use concierge_provider::Message;
use concierge_session::{history_for_provider, Message as TranscriptMessage};

/// Builds the oracle's view of a turn: instructions, history, input, scratch
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    today: Option<NaiveDate>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the date shown in the prompt
    pub fn with_date(date: NaiveDate) -> Self {
        Self { today: Some(date) }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn build_system_prompt(&self) -> String {
        format!(
            r#"You are a helpful travel assistant. Your goal is to help the user book a flight and hotel, and then add the trip to their calendar.

You have access to a conversation history with the user. Use this history to fill in any missing details in the user's latest request. For example, if the user already told you the destination is London, you must remember that.

IMPORTANT: You must gather all necessary information (like destination AND dates for a flight search) from the user's request and the chat history before calling a tool.

When you have completed all tasks, you must provide a final, comprehensive summary to the user.
Today's date is {}."#,
            self.today().format("%Y-%m-%d")
        )
    }

    /// `[system, history..., user(input), scratch...]`
    pub fn build_messages(
        &self,
        history: &[TranscriptMessage],
        input: &str,
        scratch: &[Message],
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + scratch.len() + 2);
        messages.push(Message::system(self.build_system_prompt()));
        messages.extend(history_for_provider(history));
        messages.push(Message::user(input));
        messages.extend_from_slice(scratch);

        trace!("◆ context of {} messages", messages.len());
        messages
    }
}
