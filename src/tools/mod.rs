//! Tool system for the agent.
//!
//! Each tool is a named desktop capability with a flat parameter schema.
//! The registry advertises the schemas to the model and dispatches calls by
//! name. Dispatch never fails: every problem comes back as text, because the
//! text is forwarded to the model as the function result.

mod browser;
mod file_system;
mod system;

pub use browser::{OpenBrowser, SearchWeb};
pub use file_system::{OpenFileManager, OpenTextEditor};
pub use system::{OpenCalculator, OpenSystemMonitor, OpenTerminal, ShellCommand, SystemInfo};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::llm::FunctionDeclaration;
use crate::process::Launcher;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("{0}")]
    Failed(String),
}

/// Primitive parameter types the model can fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
}

impl ParamKind {
    fn schema_type(&self) -> &'static str {
        match self {
            ParamKind::String => "STRING",
            ParamKind::Number => "NUMBER",
            ParamKind::Integer => "INTEGER",
            ParamKind::Boolean => "BOOLEAN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolParameter {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
}

impl ToolParameter {
    pub fn required(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Name, description and parameters of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolSchema {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Function declaration in the shape the model expects.
    pub fn to_declaration(&self) -> FunctionDeclaration {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({ "type": p.kind.schema_type(), "description": p.description }),
                )
            })
            .collect();

        let mut parameters = json!({ "type": "OBJECT", "properties": properties });
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        if !required.is_empty() {
            parameters["required"] = json!(required);
        }

        FunctionDeclaration {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters,
        }
    }
}

/// A single argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    String(String),
    Number(f64),
    Bool(bool),
}

/// Arguments checked against a tool's schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    values: BTreeMap<String, ArgValue>,
}

impl ToolArgs {
    /// Check raw call arguments against `schema`.
    ///
    /// Unknown keys, missing required keys, nested values and type
    /// mismatches are rejected. `null` counts as absent. A string parameter
    /// accepts numbers and booleans in their textual form.
    pub fn validate(schema: &ToolSchema, raw: &Map<String, Value>) -> Result<Self, ToolError> {
        let invalid = |reason: String| ToolError::InvalidArguments {
            tool: schema.name.clone(),
            reason,
        };

        let mut values = BTreeMap::new();
        for (key, value) in raw {
            let param = schema
                .parameter(key)
                .ok_or_else(|| invalid(format!("unknown parameter '{}'", key)))?;
            let converted = match (param.kind, value) {
                (_, Value::Null) => continue,
                (ParamKind::String, Value::String(s)) => ArgValue::String(s.clone()),
                (ParamKind::String, Value::Number(n)) => ArgValue::String(n.to_string()),
                (ParamKind::String, Value::Bool(b)) => ArgValue::String(b.to_string()),
                (ParamKind::Number, Value::Number(n)) => {
                    ArgValue::Number(n.as_f64().ok_or_else(|| invalid(format!("'{}' is out of range", key)))?)
                }
                (ParamKind::Integer, Value::Number(n)) => {
                    let f = n.as_f64().unwrap_or(f64::NAN);
                    if f.fract() != 0.0 || !f.is_finite() {
                        return Err(invalid(format!("'{}' must be a whole number", key)));
                    }
                    ArgValue::Number(f)
                }
                (ParamKind::Boolean, Value::Bool(b)) => ArgValue::Bool(*b),
                (_, Value::Array(_) | Value::Object(_)) => {
                    return Err(invalid(format!("'{}' must be a primitive value", key)));
                }
                (kind, other) => {
                    return Err(invalid(format!(
                        "'{}' expected {}, got {}",
                        key,
                        kind.schema_type().to_lowercase(),
                        other
                    )));
                }
            };
            values.insert(key.clone(), converted);
        }

        if let Some(missing) = schema
            .parameters
            .iter()
            .find(|p| p.required && !values.contains_key(&p.name))
        {
            return Err(invalid(format!("missing required parameter '{}'", missing.name)));
        }

        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    /// Non-empty string value of `name`.
    pub fn get_opt_str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// String value of a required parameter.
    pub fn get_str(&self, name: &str) -> Result<&str, ToolError> {
        match self.values.get(name) {
            Some(ArgValue::String(s)) => Ok(s.as_str()),
            _ => Err(ToolError::Failed(format!("Missing '{}' argument", name))),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A desktop capability the model can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and parameters. Read once when the tool is
    /// registered.
    fn schema(&self) -> ToolSchema;

    /// Perform the action. Failures carry the text shown to the model.
    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError>;
}

/// A registered tool with its schema built once.
struct Entry {
    schema: ToolSchema,
    tool: Arc<dyn Tool>,
}

/// Registry of available tools, in presentation order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Entry>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all built-in desktop tools.
    pub fn with_defaults(launcher: Arc<dyn Launcher>, command_timeout: Duration) -> Self {
        let mut registry = Self::new();

        registry.register(Arc::new(OpenBrowser::new(launcher.clone())));
        registry.register(Arc::new(SearchWeb::new(launcher.clone())));
        registry.register(Arc::new(OpenFileManager::new(launcher.clone())));
        registry.register(Arc::new(OpenTextEditor::new(launcher.clone())));
        registry.register(Arc::new(OpenTerminal::new(launcher.clone())));
        registry.register(Arc::new(OpenCalculator::new(launcher.clone())));
        registry.register(Arc::new(OpenSystemMonitor::new(launcher.clone())));
        registry.register(Arc::new(ShellCommand::new(launcher, command_timeout)));
        registry.register(Arc::new(SystemInfo));

        registry
    }

    /// Register a tool. A tool with the same name is replaced in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let entry = Entry {
            schema: tool.schema(),
            tool,
        };
        match self.position(&entry.schema.name) {
            Some(index) => {
                tracing::debug!(tool = %entry.schema.name, "Replacing registered tool");
                self.tools[index] = entry;
            }
            None => self.tools.push(entry),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.tools.iter().position(|e| e.schema.name == name)
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.tools.iter().find(|e| e.schema.name == name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.entry(name).map(|e| Arc::clone(&e.tool))
    }

    /// Schemas of all registered tools.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|e| e.schema.clone()).collect()
    }

    pub fn function_declarations(&self) -> Vec<FunctionDeclaration> {
        self.tools.iter().map(|e| e.schema.to_declaration()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name and return its result text.
    pub async fn execute(&self, name: &str, arguments: &Map<String, Value>) -> String {
        let Some(entry) = self.entry(name) else {
            tracing::warn!(tool = %name, "Model requested unknown tool");
            return format!("Unknown tool: {}", name);
        };

        let outcome = match ToolArgs::validate(&entry.schema, arguments) {
            Ok(args) => entry.tool.execute(&args).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool execution failed");
                e.to_string()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::process::{CommandOutput, ProcessError};
    use std::sync::Mutex;

    /// Launcher that records requests instead of starting anything.
    #[derive(Default)]
    pub struct RecordingLauncher {
        pub detached: Mutex<Vec<Vec<String>>>,
        pub sync: Mutex<Vec<(String, Duration)>>,
        /// Programs whose detached launch fails.
        pub missing: Vec<String>,
        pub sync_result: Mutex<Option<Result<CommandOutput, ProcessError>>>,
    }

    impl RecordingLauncher {
        pub fn missing(programs: &[&str]) -> Self {
            Self {
                missing: programs.iter().map(|p| p.to_string()).collect(),
                ..Self::default()
            }
        }

        pub fn with_sync_result(result: Result<CommandOutput, ProcessError>) -> Self {
            Self {
                sync_result: Mutex::new(Some(result)),
                ..Self::default()
            }
        }

        pub fn detached_calls(&self) -> Vec<Vec<String>> {
            self.detached.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Launcher for RecordingLauncher {
        fn run_detached(&self, argv: &[String]) -> Result<(), ProcessError> {
            self.detached.lock().unwrap().push(argv.to_vec());
            match argv.first() {
                None => Err(ProcessError::EmptyCommand),
                Some(program) if self.missing.contains(program) => Err(ProcessError::Spawn {
                    program: program.clone(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                }),
                Some(_) => Ok(()),
            }
        }

        async fn run_sync(
            &self,
            command_line: &str,
            timeout: Duration,
        ) -> Result<CommandOutput, ProcessError> {
            self.sync
                .lock()
                .unwrap()
                .push((command_line.to_string(), timeout));
            self.sync_result.lock().unwrap().take().unwrap_or(Ok(CommandOutput {
                success: true,
                stdout: String::new(),
                stderr: String::new(),
            }))
        }
    }

    pub fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}
