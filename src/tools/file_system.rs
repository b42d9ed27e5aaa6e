//! File manager and text editor tools.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ParamKind, Tool, ToolArgs, ToolError, ToolParameter, ToolSchema};
use crate::process::{launched, Launcher};

/// Build `program [target]`.
fn argv(program: &str, target: Option<&str>) -> Vec<String> {
    let mut argv = vec![program.to_string()];
    argv.extend(target.map(str::to_string));
    argv
}

/// Open the Dolphin file manager.
pub struct OpenFileManager {
    launcher: Arc<dyn Launcher>,
}

impl OpenFileManager {
    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        Self { launcher }
    }
}

#[async_trait]
impl Tool for OpenFileManager {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "open_file_manager",
            "Opens the Dolphin file manager. Can optionally open a specific directory",
        )
        .param(ToolParameter::optional(
            "path",
            ParamKind::String,
            "Optional directory path to open. Defaults to the home directory",
        ))
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let path = args.get_opt_str("path");
        if !launched(self.launcher.run_detached(&argv("dolphin", path))) {
            return Err(ToolError::Failed("Failed to open file manager".to_string()));
        }
        Ok(match path {
            Some(p) => format!("Opening file manager at {}", p),
            None => "Opening file manager".to_string(),
        })
    }
}

/// Open the Kate text editor.
pub struct OpenTextEditor {
    launcher: Arc<dyn Launcher>,
}

impl OpenTextEditor {
    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        Self { launcher }
    }
}

#[async_trait]
impl Tool for OpenTextEditor {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "open_text_editor",
            "Opens the Kate text editor. Can optionally open a specific file",
        )
        .param(ToolParameter::optional(
            "file_path",
            ParamKind::String,
            "Optional file path to open in the editor",
        ))
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let file_path = args.get_opt_str("file_path");
        if !launched(self.launcher.run_detached(&argv("kate", file_path))) {
            return Err(ToolError::Failed("Failed to open text editor".to_string()));
        }
        Ok(match file_path {
            Some(f) => format!("Opening Kate editor with {}", f),
            None => "Opening Kate editor".to_string(),
        })
    }
}
