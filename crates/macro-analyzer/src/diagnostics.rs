use macro_syntax::{NodeId, Span};
use serde::{Deserialize, Serialize};

use crate::config::Level;

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// Lint rules. Codes are grouped by area:
/// M01xx includes/programs, M02xx symbols, M03xx sequences and jumps,
/// M04xx statements and conditionals, M05xx loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rule {
    DuplicateInclude,
    IncludeNotFound,
    DuplicateFunction,
    UnknownSymbol,
    DuplicateDeclaration,
    DuplicateAddress,
    DuplicateSequence,
    DuplicateLabel,
    DuplicateLabelSequence,
    SeqNotFound,
    IncompleteParameter,
    AssignmentConstant,
    TooManyConditionals,
    MixedConditionals,
    NestingTooDeep,
    WhileLogicOperator,
    DoEndNumberNotEqual,
    DoEndNumberTooBig,
    DuplicateDoEndNumber,
}

impl Rule {
    pub const ALL: [Rule; 19] = [
        Rule::DuplicateInclude,
        Rule::IncludeNotFound,
        Rule::DuplicateFunction,
        Rule::UnknownSymbol,
        Rule::DuplicateDeclaration,
        Rule::DuplicateAddress,
        Rule::DuplicateSequence,
        Rule::DuplicateLabel,
        Rule::DuplicateLabelSequence,
        Rule::SeqNotFound,
        Rule::IncompleteParameter,
        Rule::AssignmentConstant,
        Rule::TooManyConditionals,
        Rule::MixedConditionals,
        Rule::NestingTooDeep,
        Rule::WhileLogicOperator,
        Rule::DoEndNumberNotEqual,
        Rule::DoEndNumberTooBig,
        Rule::DuplicateDoEndNumber,
    ];

    /// Key used in the lint configuration
    pub fn id(&self) -> &'static str {
        match self {
            Rule::DuplicateInclude => "duplicateInclude",
            Rule::IncludeNotFound => "includeNotFound",
            Rule::DuplicateFunction => "duplicateFunction",
            Rule::UnknownSymbol => "unknownSymbol",
            Rule::DuplicateDeclaration => "duplicateDeclaration",
            Rule::DuplicateAddress => "duplicateAddress",
            Rule::DuplicateSequence => "duplicateSequence",
            Rule::DuplicateLabel => "duplicateLabel",
            Rule::DuplicateLabelSequence => "duplicateLabelSequence",
            Rule::SeqNotFound => "seqNotFound",
            Rule::IncompleteParameter => "incompleteParameter",
            Rule::AssignmentConstant => "assignmentConstant",
            Rule::TooManyConditionals => "tooManyConditionals",
            Rule::MixedConditionals => "mixedConditionals",
            Rule::NestingTooDeep => "nestingTooDeep",
            Rule::WhileLogicOperator => "whileLogicOperator",
            Rule::DoEndNumberNotEqual => "doEndNumberNotEqual",
            Rule::DoEndNumberTooBig => "doEndNumberTooBig",
            Rule::DuplicateDoEndNumber => "duplicateDoEndNumber",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Rule::DuplicateInclude => "M0100",
            Rule::IncludeNotFound => "M0101",
            Rule::DuplicateFunction => "M0102",
            Rule::UnknownSymbol => "M0200",
            Rule::DuplicateDeclaration => "M0201",
            Rule::DuplicateAddress => "M0202",
            Rule::DuplicateSequence => "M0300",
            Rule::DuplicateLabel => "M0301",
            Rule::DuplicateLabelSequence => "M0302",
            Rule::SeqNotFound => "M0303",
            Rule::IncompleteParameter => "M0400",
            Rule::AssignmentConstant => "M0401",
            Rule::TooManyConditionals => "M0402",
            Rule::MixedConditionals => "M0403",
            Rule::NestingTooDeep => "M0404",
            Rule::WhileLogicOperator => "M0500",
            Rule::DoEndNumberNotEqual => "M0501",
            Rule::DoEndNumberTooBig => "M0502",
            Rule::DuplicateDoEndNumber => "M0503",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Rule::DuplicateInclude => "Duplicate include",
            Rule::IncludeNotFound => "Include file not found",
            Rule::DuplicateFunction => "Duplicate function",
            Rule::UnknownSymbol => "Unknown symbol",
            Rule::DuplicateDeclaration => "Duplicate symbol declaration",
            Rule::DuplicateAddress => "Duplicate address or number",
            Rule::DuplicateSequence => "Duplicate sequence number",
            Rule::DuplicateLabel => "Duplicate label number",
            Rule::DuplicateLabelSequence => "Sequence number and label define the same value",
            Rule::SeqNotFound => "Sequence number or label not found",
            Rule::IncompleteParameter => "Incomplete parameter found",
            Rule::AssignmentConstant => "Assignment to a constant",
            Rule::TooManyConditionals => "Too many conditional statements",
            Rule::MixedConditionals => "Logic operators mixed up in a conditional",
            Rule::NestingTooDeep => "Nesting too deep",
            Rule::WhileLogicOperator => "Logic operator in a WHILE condition",
            Rule::DoEndNumberNotEqual => "DO and END numbers are not equal",
            Rule::DoEndNumberTooBig => "DO or END number too big",
            Rule::DuplicateDoEndNumber => "Duplicate DO or END number",
        }
    }

    pub fn default_level(&self) -> Level {
        match self {
            Rule::DuplicateFunction
            | Rule::DuplicateAddress
            | Rule::DuplicateSequence
            | Rule::DuplicateLabel
            | Rule::DuplicateLabelSequence
            | Rule::AssignmentConstant => Level::Warning,
            _ => Level::Error,
        }
    }
}

/// A lint finding
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// The node the finding is anchored at
    pub node: NodeId,
    pub rule: Rule,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub code: Option<String>,
    pub detail: Option<String>,
}

impl Diagnostic {
    pub fn new(rule: Rule, node: NodeId, span: Span, severity: Severity) -> Self {
        Self {
            node,
            rule,
            severity,
            message: rule.message().to_string(),
            span,
            code: Some(rule.code().to_string()),
            detail: None,
        }
    }

    pub fn error(rule: Rule, node: NodeId, span: Span) -> Self {
        Self::new(rule, node, span, Severity::Error)
    }

    pub fn warning(rule: Rule, node: NodeId, span: Span) -> Self {
        Self::new(rule, node, span, Severity::Warning)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        self.message = format!("{}: {}", self.message, detail);
        self.detail = Some(detail);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> Span {
        Span::new(start, end)
    }

    #[test]
    fn test_error_creation() {
        let d = Diagnostic::error(Rule::UnknownSymbol, NodeId(3), span(10, 20));
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "Unknown symbol");
        assert_eq!(d.span, span(10, 20));
        assert_eq!(d.code.as_deref(), Some("M0200"));
        assert!(d.detail.is_none());
    }

    #[test]
    fn test_warning_creation() {
        let d = Diagnostic::warning(Rule::DuplicateAddress, NodeId(1), span(0, 5));
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.rule, Rule::DuplicateAddress);
    }

    #[test]
    fn test_with_detail_extends_message() {
        let d = Diagnostic::error(Rule::IncludeNotFound, NodeId(1), span(0, 1))
            .with_detail("defs.def");
        assert_eq!(d.detail.as_deref(), Some("defs.def"));
        assert_eq!(d.message, "Include file not found: defs.def");
    }

    #[test]
    fn test_rule_codes_are_unique() {
        let mut codes: Vec<_> = Rule::ALL.iter().map(|r| r.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), Rule::ALL.len());
    }

    #[test]
    fn test_rule_ids_match_serde_names() {
        for rule in Rule::ALL {
            let json = serde_json::to_string(&rule).expect("serialize");
            assert_eq!(json, format!("\"{}\"", rule.id()));
        }
    }
}
