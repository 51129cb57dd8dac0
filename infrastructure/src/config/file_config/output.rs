//! `[output]` section: how results reach the terminal

use serde::{Deserialize, Serialize};
use table_domain::OutputFormat;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// `text` or `json`; unset means text unless the command line says otherwise
    pub format: Option<OutputFormat>,
    /// ANSI colors in text output
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
        }
    }
}

impl FileOutputConfig {
    /// The command-line choice wins over the file
    pub fn effective_format(&self, requested: Option<OutputFormat>) -> OutputFormat {
        requested.or(self.format).unwrap_or_default()
    }
}
