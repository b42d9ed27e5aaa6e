//! LLM service contract.
//!
//! Types mirror the Gemini `generateContent` wire format. A reply part is
//! either plain text or a structured function call; the follow-up turn
//! replays the model's content and adds a function-response part.

mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Errors talking to the LLM service.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        }
    }

    /// Function result turn, `{"result": <result>}` under the function's name.
    pub fn function_response(name: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                function_response: Some(FunctionResponse {
                    name: name.into(),
                    response: json!({ "result": result.into() }),
                }),
                ..Part::default()
            }],
        }
    }
}

/// One piece of a turn.
///
/// Unknown fields (thought signatures and the like) are kept in `extra` so a
/// model turn can be sent back exactly as it was received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn function_call(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            function_call: Some(FunctionCall {
                name: name.into(),
                args,
            }),
            ..Self::default()
        }
    }
}

/// Structured call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

/// A function advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDeclarations {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDeclarations>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

impl GenerateRequest {
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
            tools: None,
            system_instruction: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: &str) -> Self {
        self.system_instruction = Some(Content {
            role: None,
            parts: vec![Part::text(instruction)],
        });
        self
    }

    pub fn with_functions(mut self, declarations: Vec<FunctionDeclaration>) -> Self {
        if !declarations.is_empty() {
            self.tools = Some(vec![ToolDeclarations {
                function_declarations: declarations,
            }]);
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
    #[serde(default)]
    pub total_token_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

impl GenerateResponse {
    /// Response with a single candidate holding `parts`.
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts,
                }),
                finish_reason: Some("STOP".to_string()),
            }],
            usage_metadata: None,
        }
    }

    pub fn first_content(&self) -> Option<&Content> {
        self.candidates.first()?.content.as_ref()
    }

    pub fn first_part(&self) -> Option<&Part> {
        self.first_content()?.parts.first()
    }

    /// Concatenated text of the first candidate, if it has any.
    pub fn text(&self) -> Option<String> {
        let content = self.first_content()?;
        let texts: Vec<&str> = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }
}

/// Client for the remote model.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_function_call_and_keeps_unknown_fields() {
        let resp: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "functionCall": {"name": "open_browser", "args": {"url": "https://example.com"}},
                        "thoughtSignature": "abc123"
                    }]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "totalTokenCount": 20}
        }))
        .unwrap();

        let part = resp.first_part().unwrap();
        let call = part.function_call.as_ref().unwrap();
        assert_eq!(call.name, "open_browser");
        assert_eq!(call.args["url"], "https://example.com");
        assert_eq!(part.extra["thoughtSignature"], "abc123");
        assert_eq!(resp.usage_metadata.as_ref().unwrap().prompt_token_count, 12);

        // Replaying the part must carry the signature back.
        let replay = serde_json::to_value(part).unwrap();
        assert_eq!(replay["thoughtSignature"], "abc123");
        assert!(replay.get("text").is_none());
    }

    #[test]
    fn function_call_without_args_has_empty_map() {
        let part: Part =
            serde_json::from_value(json!({"functionCall": {"name": "open_calculator"}})).unwrap();
        assert!(part.function_call.unwrap().args.is_empty());
    }

    #[test]
    fn empty_body_has_no_candidates() {
        let resp: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.candidates.is_empty());
        assert!(resp.first_part().is_none());
        assert!(resp.text().is_none());
    }

    #[test]
    fn text_joins_text_parts_of_first_candidate() {
        let resp = GenerateResponse::from_parts(vec![
            Part::text("Opening "),
            Part::function_call("noop", Map::new()),
            Part::text("Firefox."),
        ]);
        assert_eq!(resp.text().as_deref(), Some("Opening Firefox."));
    }

    #[test]
    fn request_serializes_in_wire_shape() {
        let request = GenerateRequest::new(vec![
            Content::user_text("open calc"),
            Content::function_response("open_calculator", "Opening KCalc calculator"),
        ])
        .with_system_instruction("Be brief.")
        .with_functions(vec![FunctionDeclaration {
            name: "open_calculator".to_string(),
            description: "Opens a calculator".to_string(),
            parameters: json!({"type": "OBJECT", "properties": {}}),
        }]);

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "open calc");
        assert_eq!(
            body["contents"][1]["parts"][0]["functionResponse"],
            json!({"name": "open_calculator", "response": {"result": "Opening KCalc calculator"}})
        );
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "open_calculator"
        );
    }

    #[test]
    fn no_functions_means_no_tools_field() {
        let request = GenerateRequest::new(vec![Content::user_text("hi")]).with_functions(vec![]);
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("systemInstruction").is_none());
    }
}
