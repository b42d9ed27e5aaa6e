//! Console loop: read a command, run it through the agent, print the reply.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::agent::Agent;
use crate::llm::FunctionCall;

/// Words that end the session (case-insensitive).
pub const EXIT_KEYWORDS: [&str; 3] = ["exit", "quit", "bye"];

const WELCOME: &str = "============================================================
Jarvis Desktop Agent
============================================================
Type your command. Examples:
  -  'open browser'
  -  'search for python tutorials'
  -  'what time is it?'
  -  'open my documents folder'
Type 'exit' or 'quit' to close
";

const GOODBYE_INTERRUPTED: &str = "\n\nGoodbye!\n";

pub fn is_exit_keyword(input: &str) -> bool {
    let input = input.trim();
    EXIT_KEYWORDS.iter().any(|k| input.eq_ignore_ascii_case(k))
}

/// Interactive front end for an [`Agent`].
pub struct Interface {
    agent: Arc<Agent>,
}

impl Interface {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }

    /// Run until an exit keyword, end of input or Ctrl-C.
    pub async fn run<R, W>(&self, input: R, output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.run_until(input, output, tokio::signal::ctrl_c()).await
    }

    /// Run until an exit keyword, end of input or `shutdown` resolves.
    ///
    /// Each command runs in its own task so a panic while handling one
    /// command is reported and the session continues. `shutdown` also
    /// interrupts a command that is still running.
    pub async fn run_until<R, W, S>(&self, input: R, mut output: W, shutdown: S) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future,
    {
        output.write_all(WELCOME.as_bytes()).await?;

        let mut lines = input.lines();
        tokio::pin!(shutdown);

        loop {
            output.write_all(b"\n You> ").await?;
            output.flush().await?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = &mut shutdown => None,
            };

            let Some(line) = line else {
                output.write_all(GOODBYE_INTERRUPTED.as_bytes()).await?;
                break;
            };

            let command = line.trim();
            if command.is_empty() {
                continue;
            }
            if is_exit_keyword(command) {
                output.write_all(b"Goodbye!\n").await?;
                break;
            }

            let (echo_tx, mut echo_rx) = mpsc::unbounded_channel::<String>();
            let agent = Arc::clone(&self.agent);
            let command = command.to_string();
            let mut task = tokio::spawn(async move {
                let on_call = move |call: &FunctionCall| {
                    let _ = echo_tx.send(format!(
                        " [Executing: {}({})]\n",
                        call.name,
                        Value::Object(call.args.clone())
                    ));
                };
                agent.process_command_with(&command, &on_call).await
            });

            let joined = loop {
                tokio::select! {
                    Some(echo) = echo_rx.recv() => {
                        output.write_all(echo.as_bytes()).await?;
                        output.flush().await?;
                    }
                    joined = &mut task => break Some(joined),
                    _ = &mut shutdown => {
                        task.abort();
                        break None;
                    }
                }
            };

            while let Ok(echo) = echo_rx.try_recv() {
                output.write_all(echo.as_bytes()).await?;
            }

            let reply = match joined {
                Some(Ok(result)) => format!("\n Jarvis> {}\n", result.text),
                Some(Err(e)) => {
                    tracing::error!(error = %e, "Command handling aborted");
                    format!("\n Error: {}\n", e)
                }
                None => {
                    tracing::info!("Interrupted while a command was running");
                    output.write_all(GOODBYE_INTERRUPTED.as_bytes()).await?;
                    break;
                }
            };
            output.write_all(reply.as_bytes()).await?;
        }

        output.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::ScriptedLlm;
    use crate::config::Config;
    use crate::llm::{GenerateRequest, GenerateResponse, LlmClient, LlmError, Part};
    use crate::tools::{Tool, ToolArgs, ToolError, ToolRegistry, ToolSchema};
    use async_trait::async_trait;
    use serde_json::Map;
    use std::time::Duration;

    struct Explodes;

    #[async_trait]
    impl Tool for Explodes {
        fn schema(&self) -> ToolSchema {
            ToolSchema::new("explode", "panics")
        }

        async fn execute(&self, _args: &ToolArgs) -> Result<String, ToolError> {
            panic!("boom");
        }
    }

    fn interface(replies: Vec<GenerateResponse>) -> (Interface, Arc<ScriptedLlm>) {
        let llm = Arc::new(ScriptedLlm::new(replies.into_iter().map(Ok).collect()));
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(Explodes));
        let agent = Agent::with_parts(Config::new("k"), llm.clone(), tools);
        (Interface::new(Arc::new(agent)), llm)
    }

    async fn session(interface: &Interface, input: &str) -> String {
        let mut output = Vec::new();
        interface.run(input.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn exit_keywords_are_case_insensitive() {
        assert!(is_exit_keyword("exit"));
        assert!(is_exit_keyword("  QUIT "));
        assert!(is_exit_keyword("Bye"));
        assert!(!is_exit_keyword("exit now"));
        assert!(!is_exit_keyword("goodbye"));
    }

    #[tokio::test]
    async fn prints_reply_and_stops_at_exit() {
        let (interface, llm) = interface(vec![GenerateResponse::from_parts(vec![Part::text(
            "Hello!",
        )])]);

        let out = session(&interface, "hi\nexit\nnever read\n").await;

        assert!(out.starts_with("===="));
        assert!(out.contains("\n Jarvis> Hello!\n"));
        assert!(out.ends_with("Goodbye!\n"));
        assert_eq!(llm.requests().len(), 1);
    }

    #[tokio::test]
    async fn blank_lines_are_skipped_and_eof_ends_session() {
        let (interface, llm) = interface(vec![]);
        let out = session(&interface, "\n   \n").await;
        assert!(out.ends_with("\n\nGoodbye!\n"));
        assert!(llm.requests().is_empty());
    }

    #[tokio::test]
    async fn requested_action_is_echoed_before_the_reply() {
        let (interface, _) = interface(vec![
            GenerateResponse::from_parts(vec![Part::function_call("missing_tool", Map::new())]),
            GenerateResponse::from_parts(vec![Part::text("That tool doesn't exist.")]),
        ]);
        let out = session(&interface, "do it\n").await;
        let echo = out.find(" [Executing: missing_tool({})]\n").unwrap();
        let reply = out.find("\n Jarvis> That tool doesn't exist.\n").unwrap();
        assert!(echo < reply);
    }

    #[tokio::test]
    async fn panic_in_a_command_does_not_end_the_session() {
        let (interface, llm) = interface(vec![
            GenerateResponse::from_parts(vec![Part::function_call("explode", Map::new())]),
            GenerateResponse::from_parts(vec![Part::text("still here")]),
        ]);

        let out = session(&interface, "explode\nhello\nquit\n").await;

        assert!(out.contains("\n Error: "));
        assert!(out.contains("\n Jarvis> still here\n"));
        assert!(out.ends_with("Goodbye!\n"));
        assert_eq!(llm.requests().len(), 2);
    }

    struct Hangs;

    #[async_trait]
    impl LlmClient for Hangs {
        async fn generate(
            &self,
            _model: &str,
            _request: &GenerateRequest,
        ) -> Result<GenerateResponse, LlmError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn interrupt_stops_a_command_that_never_finishes() {
        let agent = Agent::with_parts(Config::new("k"), Arc::new(Hangs), ToolRegistry::new());
        let interface = Interface::new(Arc::new(agent));
        let mut output = Vec::new();

        let finished = tokio::time::timeout(
            Duration::from_secs(2),
            interface.run_until(
                "open browser\nnever read\n".as_bytes(),
                &mut output,
                tokio::time::sleep(Duration::from_millis(100)),
            ),
        )
        .await;

        assert!(finished.is_ok(), "session kept running after the interrupt");
        let out = String::from_utf8(output).unwrap();
        assert!(out.ends_with("\n\nGoodbye!\n"));
        assert!(!out.contains("Jarvis>"));
    }

    #[tokio::test]
    async fn interrupt_while_waiting_for_input_ends_session() {
        let (interface, llm) = interface(vec![]);
        let (_keep_open, reader) = tokio::io::duplex(64);
        let mut output = Vec::new();

        interface
            .run_until(
                tokio::io::BufReader::new(reader),
                &mut output,
                tokio::time::sleep(Duration::from_millis(50)),
            )
            .await
            .unwrap();

        assert!(String::from_utf8(output).unwrap().ends_with("\n You> \n\nGoodbye!\n"));
        assert!(llm.requests().is_empty());
    }
}
