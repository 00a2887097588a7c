//! Per-rule lint levels.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Rule, Severity};

/// Configured level of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Ignore,
    Warning,
    Error,
}

impl Level {
    /// `None` for ignored rules
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Level::Ignore => None,
            Level::Warning => Some(Severity::Warning),
            Level::Error => Some(Severity::Error),
        }
    }
}

/// Rule id (`"duplicateInclude"`, ...) to level. Unlisted rules keep their default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LintConfiguration {
    rules: HashMap<String, Level>,
}

impl LintConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self, rule: Rule) -> Level {
        self.rules
            .get(rule.id())
            .copied()
            .unwrap_or_else(|| rule.default_level())
    }

    pub fn set(&mut self, rule: Rule, level: Level) -> &mut Self {
        self.rules.insert(rule.id().to_string(), level);
        self
    }

    pub fn with(mut self, rule: Rule, level: Level) -> Self {
        self.set(rule, level);
        self
    }
}
