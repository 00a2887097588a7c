//! Client settings.

use macro_analyzer::LintConfiguration;
use serde::Deserialize;
use serde_json::Value;

/// Settings sent by the client, either flat or under a `"macro"` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub sequence: SequenceSettings,
    pub keywords: Vec<CustomKeyword>,
    pub lint: LintConfiguration,
}

impl Settings {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        let section = value.get("macro").unwrap_or(value);
        serde_json::from_value(section.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SequenceSettings {
    /// Step between generated sequence numbers
    pub increment: u32,
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self { increment: 10 }
    }
}

/// User documentation attached to a symbol name
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CustomKeyword {
    pub symbol: String,
    pub description: Description,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Description {
    One(String),
    Many(Vec<String>),
}

impl Description {
    /// Markdown text; several entries become separate paragraphs
    pub fn text(&self) -> String {
        match self {
            Description::One(text) => text.clone(),
            Description::Many(lines) => lines.join("\n\n"),
        }
    }
}
