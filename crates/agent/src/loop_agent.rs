//! Planning loop - one user turn from input to final answer

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use concierge_config::Config;
use concierge_provider::{
    chat_with_timeout, ChatParams, Decision, Message, Provider, ToolCall, ToolCallDef, ToolChoice,
};
use concierge_session::{Message as TranscriptMessage, Transcript};

use crate::context::ContextBuilder;
use crate::tools::ToolRegistry;
use crate::{AgentError, Result};

const EMPTY_ANSWER_APOLOGY: &str = "I'm sorry, I wasn't able to come up with an answer to that. Could you rephrase your request?";

const STEP_LIMIT_APOLOGY: &str = "I'm sorry, I wasn't able to complete your request within the allowed number of steps. Please try rephrasing it or breaking it into smaller requests.";

/// Knobs for a planning run
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    /// Empty means the provider's default model
    pub model: String,
    pub max_iterations: u32,
    pub max_tokens: u32,
    pub temperature: f32,
    pub oracle_timeout: Duration,
}

impl LoopSettings {
    pub fn from_config(config: &Config) -> Self {
        let defaults = &config.assistant.defaults;
        Self {
            model: defaults.model.clone(),
            max_iterations: config.max_tool_iterations(),
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            oracle_timeout: config.oracle_timeout(),
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Drives the oracle and the tools until the oracle gives a final answer
pub struct AgentLoop<P: Provider> {
    provider: Arc<P>,
    tools: ToolRegistry,
    context: ContextBuilder,
    settings: LoopSettings,
}

impl<P: Provider> AgentLoop<P> {
    pub fn new(provider: P, tools: ToolRegistry) -> Self {
        Self::with_settings(provider, tools, LoopSettings::default())
    }

    pub fn with_config(provider: P, tools: ToolRegistry, config: &Config) -> Self {
        Self::with_settings(provider, tools, LoopSettings::from_config(config))
    }

    pub fn with_settings(provider: P, tools: ToolRegistry, mut settings: LoopSettings) -> Self {
        if settings.max_iterations == 0 {
            warn!("◆ max_tool_iterations is 0, using 1");
            settings.max_iterations = 1;
        }
        Self {
            provider: Arc::new(provider),
            tools,
            context: ContextBuilder::new(),
            settings,
        }
    }

    pub fn with_context(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    fn model(&self) -> String {
        if self.settings.model.is_empty() {
            self.provider.default_model()
        } else {
            self.settings.model.clone()
        }
    }

    /// Handle one chat turn: record the input, plan, record the answer
    pub async fn respond(&self, transcript: &mut Transcript, input: &str) -> String {
        transcript.push_user(input);
        let answer = self.answer(transcript.snapshot_excluding_last(), input).await;
        transcript.push_assistant(answer.clone());
        answer
    }

    /// Run a turn and always come back with text
    pub async fn answer(&self, history: &[TranscriptMessage], input: &str) -> String {
        match self.run_turn(history, input).await {
            Ok(answer) => answer,
            Err(AgentError::MaxIterations(limit)) => {
                warn!("◆ turn stopped after {} iterations", limit);
                STEP_LIMIT_APOLOGY.to_string()
            }
            Err(AgentError::EmptyAnswer) => {
                warn!("◆ oracle gave an empty answer");
                EMPTY_ANSWER_APOLOGY.to_string()
            }
            Err(AgentError::Provider(e)) => {
                error!("◆ oracle error: {}", e);
                format!(
                    "I'm sorry, I couldn't reach the planning service ({}). Please try again in a moment.",
                    e
                )
            }
        }
    }

    /// The planning loop proper. Scratch context lives only for this call.
    pub async fn run_turn(&self, history: &[TranscriptMessage], input: &str) -> Result<String> {
        info!(
            "◆ turn started with {} history messages",
            history.len()
        );

        let mut scratch: Vec<Message> = Vec::new();
        let definitions = self.tools.definitions();
        let model = self.model();

        for iteration in 1..=self.settings.max_iterations {
            debug!("◆ iteration {}", iteration);

            let params = ChatParams {
                model: model.clone(),
                messages: self.context.build_messages(history, input, &scratch),
                tools: definitions.clone(),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
                tool_choice: ToolChoice::Auto,
            };

            let response =
                chat_with_timeout(self.provider.as_ref(), params, self.settings.oracle_timeout)
                    .await?;

            match response.decision() {
                Decision::FinalAnswer(text) if text.trim().is_empty() => {
                    debug!("◆ empty answer, finish reason {}", response.finish_reason);
                    return Err(AgentError::EmptyAnswer);
                }
                Decision::FinalAnswer(text) => {
                    info!("◆ turn finished after {} iterations", iteration);
                    return Ok(text);
                }
                Decision::ToolCalls(calls) => {
                    let calls: Vec<ToolCall> = calls.into_iter().map(ensure_call_id).collect();
                    scratch.push(Message::assistant_tool_calls(
                        response.content.clone(),
                        calls.iter().map(ToolCallDef::from).collect(),
                    ));

                    for call in &calls {
                        let output = self.tools.execute(call).await;
                        debug!("◆ {} -> {}", call.name, output);
                        scratch.push(Message::tool(&call.id, &call.name, output.render()));
                    }
                }
            }
        }

        Err(AgentError::MaxIterations(self.settings.max_iterations))
    }
}

/// Tool results are matched to calls by id, so every call needs one
fn ensure_call_id(mut call: ToolCall) -> ToolCall {
    if call.id.is_empty() {
        call.id = format!("call_{}", Uuid::new_v4().simple());
    }
    call
}
