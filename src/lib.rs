//! # Jarvis
//!
//! A natural-language dispatcher for desktop actions.
//!
//! This library provides:
//! - A fixed set of desktop tools (browser, file manager, editor, terminal,
//!   shell commands, system info)
//! - A Gemini function-calling client
//! - An agent that handles each command as one two-step exchange
//! - A console loop around the agent
//!
//! ## Architecture
//!
//! 1. Send the command and the tool schemas to the model
//! 2. If the model answers in text, print it
//! 3. If it asks for a tool, run it and send the result back
//! 4. Print the model's final answer
//!
//! ## Example
//!
//! ```rust,ignore
//! use jarvis::{Agent, Config};
//!
//! let config = Config::from_env()?;
//! let agent = Agent::new(config);
//! let reply = agent.process_command("open my documents folder").await;
//! println!("{}", reply);
//! ```

pub mod agent;
pub mod config;
pub mod interface;
pub mod llm;
pub mod process;
pub mod tools;

pub use agent::{Agent, ExchangeResult};
pub use config::Config;
