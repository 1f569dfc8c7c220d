use serde::{Deserialize, Serialize};

/// One JSON line written back to the editor transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Evaluate `code` in the editor.
    Eval { code: String },
    /// Show `text` in the editor's echo area.
    Message { text: String },
}

impl Outbound {
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
