//! Agent module - turns one user command into at most one tool call.
//!
//! Each command is an independent two-step exchange:
//! 1. Send the user text, the advertised tools and the system instruction
//! 2. If the first reply part is text, that is the answer
//! 3. If it is a function call, execute it through the registry
//! 4. Send the user text, the model's turn and the function result back
//!    and return the model's final text
//!
//! Nothing here fails: service errors become reply text, and so do tool
//! errors (they travel to the model as the function result).

mod prompt;

pub use prompt::DEFAULT_SYSTEM_INSTRUCTION;

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::Instrument;

use crate::config::Config;
use crate::llm::{Content, FunctionCall, GeminiClient, GenerateRequest, GenerateResponse, LlmClient};
use crate::process::SystemLauncher;
use crate::tools::ToolRegistry;

/// Reply used when the model gives nothing usable.
pub const FALLBACK_REPLY: &str = "I'm not sure how to help with that";

/// The tool call made during an exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub name: String,
    pub arguments: Map<String, Value>,
    pub result: String,
}

/// Outcome of one command.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeResult {
    /// Final text shown to the user
    pub text: String,
    /// The tool that ran, if any
    pub action: Option<ActionRecord>,
}

impl ExchangeResult {
    fn reply(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: None,
        }
    }
}

impl fmt::Display for ExchangeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// The desktop command agent.
pub struct Agent {
    config: Config,
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
}

impl Agent {
    /// Create an agent talking to Gemini with the built-in desktop tools.
    pub fn new(config: Config) -> Self {
        let llm = Arc::new(GeminiClient::new(
            config.api_key.clone(),
            config.api_base.clone(),
        ));
        let tools = ToolRegistry::with_defaults(Arc::new(SystemLauncher), config.command_timeout);

        Self::with_parts(config, llm, tools)
    }

    pub fn with_parts(config: Config, llm: Arc<dyn LlmClient>, tools: ToolRegistry) -> Self {
        Self { config, llm, tools }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one user command through the model.
    pub async fn process_command(&self, user_input: &str) -> ExchangeResult {
        self.process_command_with(user_input, &|_| {}).await
    }

    /// Like [`Agent::process_command`], calling `on_call` just before the
    /// requested tool runs.
    pub async fn process_command_with(
        &self,
        user_input: &str,
        on_call: &(dyn Fn(&FunctionCall) + Send + Sync),
    ) -> ExchangeResult {
        let span = tracing::info_span!("exchange", command = %user_input, model = %self.config.model);

        async {
            let request = GenerateRequest::new(vec![Content::user_text(user_input)])
                .with_functions(self.tools.function_declarations())
                .with_system_instruction(&self.config.system_instruction);

            match self.llm.generate(&self.config.model, &request).await {
                Ok(response) => self.respond(user_input, &response, on_call).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Initial model call failed");
                    ExchangeResult::reply(format!("Error processing command: {}", e))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Interpret the first reply.
    ///
    /// Only the first part of the first candidate is looked at; later parts
    /// are ignored.
    pub async fn handle_response(
        &self,
        user_input: &str,
        response: &GenerateResponse,
    ) -> ExchangeResult {
        self.respond(user_input, response, &|_| {}).await
    }

    async fn respond(
        &self,
        user_input: &str,
        response: &GenerateResponse,
        on_call: &(dyn Fn(&FunctionCall) + Send + Sync),
    ) -> ExchangeResult {
        let Some(content) = response.first_content() else {
            return ExchangeResult::reply(FALLBACK_REPLY);
        };
        let Some(part) = content.parts.first() else {
            return ExchangeResult::reply(FALLBACK_REPLY);
        };

        if let Some(call) = &part.function_call {
            on_call(call);
            return self.handle_function_call(user_input, content, call).await;
        }

        match part.text.as_deref() {
            Some(text) if !text.is_empty() => ExchangeResult::reply(text),
            _ => {
                tracing::debug!("First reply part has neither text nor a function call");
                ExchangeResult::reply(FALLBACK_REPLY)
            }
        }
    }

    /// Execute the requested tool and ask the model for the final reply.
    async fn handle_function_call(
        &self,
        user_input: &str,
        model_turn: &Content,
        call: &FunctionCall,
    ) -> ExchangeResult {
        let args = Value::Object(call.args.clone());
        tracing::info!(tool = %call.name, args = %args, "Executing tool");

        let result = self.tools.execute(&call.name, &call.args).await;
        tracing::debug!(tool = %call.name, result = %result, "Tool finished");

        let mut model_turn = model_turn.clone();
        if model_turn.role.is_none() {
            model_turn.role = Some("model".to_string());
        }

        let request = GenerateRequest::new(vec![
            Content::user_text(user_input),
            model_turn,
            Content::function_response(call.name.clone(), result.clone()),
        ])
        .with_system_instruction(&self.config.system_instruction);

        let text = match self.llm.generate(&self.config.model, &request).await {
            Ok(response) => response.text().unwrap_or_else(|| FALLBACK_REPLY.to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "Follow-up model call failed");
                format!("Error getting final response: {}", e)
            }
        };

        ExchangeResult {
            text,
            action: Some(ActionRecord {
                name: call.name.clone(),
                arguments: call.args.clone(),
                result,
            }),
        }
    }
}
