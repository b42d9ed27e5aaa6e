//! Browser tools: open a page and search the web.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ParamKind, Tool, ToolArgs, ToolError, ToolParameter, ToolSchema};
use crate::process::{launched, Launcher};

const SEARCH_URL: &str = "https://www.google.com/search?q=";

/// Open the web browser, optionally at a URL.
pub struct OpenBrowser {
    launcher: Arc<dyn Launcher>,
}

impl OpenBrowser {
    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        Self { launcher }
    }
}

#[async_trait]
impl Tool for OpenBrowser {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "open_browser",
            "Opens the web browser. Can optionally open a specific URL",
        )
        .param(ToolParameter::optional(
            "url",
            ParamKind::String,
            "Optional URL to open. If not provided, opens the browser homepage",
        ))
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        match args.get_opt_str("url") {
            Some(url) => {
                if launched(self.launcher.run_detached(&["xdg-open".to_string(), url.to_string()])) {
                    Ok(format!("Opening browser at {}", url))
                } else {
                    Err(ToolError::Failed(format!("Failed to open browser at {}", url)))
                }
            }
            None => {
                if launched(self.launcher.run_detached(&["firefox".to_string()])) {
                    Ok("Opening Firefox browser".to_string())
                } else {
                    Err(ToolError::Failed("Failed to open browser".to_string()))
                }
            }
        }
    }
}

/// Search the web in the browser.
pub struct SearchWeb {
    launcher: Arc<dyn Launcher>,
}

impl SearchWeb {
    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        Self { launcher }
    }
}

fn search_url(query: &str) -> String {
    format!("{}{}", SEARCH_URL, urlencoding::encode(query.trim()))
}

#[async_trait]
impl Tool for SearchWeb {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "search_web",
            "Opens the browser and searches for the given query on Google",
        )
        .param(ToolParameter::required(
            "query",
            ParamKind::String,
            "The search query",
        ))
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let query = args.get_str("query")?;
        let url = search_url(query);
        if launched(self.launcher.run_detached(&["xdg-open".to_string(), url])) {
            Ok(format!("Searching for: {}", query))
        } else {
            Err(ToolError::Failed(format!("Failed to search for: {}", query)))
        }
    }
}
