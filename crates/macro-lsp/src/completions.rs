//! Context-sensitive completion.
//!
//! The innermost node around the cursor that has an entry in the dispatch
//! table decides what is proposed. Symbols come from the scope of the file and
//! its includes.

use std::sync::Arc;

use tower_lsp::lsp_types::*;

use macro_analyzer::{FileRecord, FileResolver, Scope, Symbol, SymbolOrigin};
use macro_syntax::{strip_sequence_prefix, Field, Node, NodeKind, ReferenceType, ValueType};

use crate::document::LineIndex;
use crate::settings::{CustomKeyword, Settings};

/// Value types usable in statements and conditions
const STATEMENT_TYPES: &[ValueType] = &[
    ValueType::Address,
    ValueType::Constant,
    ValueType::Variable,
    ValueType::Numeric,
];

/// Value types usable as jump targets
const LABEL_TYPES: &[ValueType] = &[
    ValueType::Numeric,
    ValueType::Constant,
    ValueType::Variable,
    ValueType::String,
];

const OPERATORS: &[&str] = &[
    "&&", "||", "EQ", "NE", "LE", "GE", "LT", "GT", "AND", "OR", "XOR", "MOD",
];

const KEYWORDS: &[&str] = &["IF", "THEN", "GOTO", "ENDIF", "WHILE", "DO", "END"];

/// Proposed outside of any program
const FILE_KEYWORDS: &[&str] = &["@", ">", "$", "$INCLUDE", "$NOLIST", "$LIST", "%"];

const WORD_DELIMITERS: &str = " \t\n\r\":{[()]},*>+";

/// Sort text buckets; the editor sorts lexically
mod sort {
    pub const SNIPPET: &str = " ";
    pub const OPERATOR: &str = "1";
    pub const KEYWORD: &str = "2";
    pub const LABEL: &str = "3";
    pub const CONSTANT: &str = "4";
    pub const VARIABLE: &str = "5";
    pub const VALUE: &str = "6";
    pub const ADDRESS: &str = "7";
    pub const NC_CODE: &str = "8";
}

pub fn get_completions(
    record: &Arc<FileRecord>,
    files: &dyn FileResolver,
    offset: usize,
    settings: &Settings,
) -> CompletionList {
    let mut engine = CompletionEngine::new(record, files, offset, settings);
    let items = engine.complete();
    CompletionList {
        is_incomplete: false,
        items,
    }
}

/// The text typed so far: everything after the last delimiter before `offset`
pub fn current_word(source: &str, offset: usize) -> &str {
    let before = source.get(..offset.min(source.len())).unwrap_or_default();
    let start = before
        .rfind(|c: char| WORD_DELIMITERS.contains(c))
        .map_or(0, |i| i + 1);
    &before[start..]
}

// ============================================================================
// Completion Engine
// ============================================================================

struct CompletionEngine<'a> {
    record: &'a Arc<FileRecord>,
    index: LineIndex,
    offset: usize,
    current_word: &'a str,
    increment: u64,
    /// Custom keywords not yet attached to a proposal
    keywords: Vec<CustomKeyword>,
    scope: Scope,
    items: Vec<CompletionItem>,
}

impl<'a> CompletionEngine<'a> {
    fn new(
        record: &'a Arc<FileRecord>,
        files: &dyn FileResolver,
        offset: usize,
        settings: &Settings,
    ) -> Self {
        let source = record.tree.source();
        Self {
            record,
            index: LineIndex::new(source),
            offset,
            current_word: current_word(source, offset),
            increment: u64::from(settings.sequence.increment),
            keywords: settings.keywords.clone(),
            scope: Scope::build(Arc::clone(record), files),
            items: Vec::new(),
        }
    }

    fn complete(&mut self) -> Vec<CompletionItem> {
        let record = self.record;
        let path = record.tree.node_path(self.offset);

        for node in path.iter().rev() {
            match node.kind() {
                NodeKind::Function => {
                    self.add_symbols(ReferenceType::Variable, None);
                    self.add_symbols(ReferenceType::Label, None);
                    self.add_keywords();
                    self.add_sequence_snippet(*node);
                }
                NodeKind::Variable => self.add_symbols(ReferenceType::Variable, None),
                NodeKind::If => {
                    self.add_symbols(ReferenceType::Variable, Some(STATEMENT_TYPES));
                    self.add_symbols(ReferenceType::Label, Some(LABEL_TYPES));
                }
                NodeKind::Then | NodeKind::Else | NodeKind::While => {
                    self.add_symbols(ReferenceType::Variable, Some(STATEMENT_TYPES));
                    self.add_symbols(ReferenceType::Label, Some(LABEL_TYPES));
                    self.add_keywords();
                    self.add_sequence_snippet(*node);
                }
                NodeKind::Goto => {
                    self.add_symbols(ReferenceType::Label, Some(LABEL_TYPES));
                    self.add_symbols(ReferenceType::Variable, Some(LABEL_TYPES));
                }
                NodeKind::ConditionalExpr | NodeKind::BinaryExpr | NodeKind::Assignment => {
                    self.add_symbols(ReferenceType::Variable, Some(STATEMENT_TYPES));
                    self.add_symbols(ReferenceType::Label, Some(LABEL_TYPES));
                    self.add_operators();
                }
                _ => continue,
            }
            if !self.items.is_empty() || self.offset > node.start() {
                self.add_custom_keywords();
                return std::mem::take(&mut self.items);
            }
        }

        self.add_file_keywords();
        std::mem::take(&mut self.items)
    }

    fn add_symbols(&mut self, reference_type: ReferenceType, value_types: Option<&[ValueType]>) {
        let value_types = if self.current_word == "#" {
            // `#` starts a macro variable number, so only numeric symbols fit.
            if reference_type != ReferenceType::Variable {
                return;
            }
            Some(&[ValueType::Numeric][..])
        } else {
            value_types
        };

        let mut items = Vec::new();
        for symbol in self.scope.find_symbols(reference_type, value_types) {
            let (sort, kind) = sort_and_kind(reference_type, symbol.value_type);
            let detail = self.declaration_detail(reference_type, symbol);
            let documentation = take_keyword_description(&mut self.keywords, &symbol.name);
            items.push(CompletionItem {
                label: symbol.name.clone(),
                kind: Some(kind),
                detail,
                documentation: documentation.map(markdown),
                sort_text: Some(sort.to_string()),
                ..Default::default()
            });
        }
        self.items.extend(items);
    }

    /// `(symbol:numeric) @FEED  100`, then the declaration's line comment
    fn declaration_detail(&self, reference_type: ReferenceType, symbol: &Symbol) -> Option<String> {
        let SymbolOrigin::Declared(id) = symbol.origin else {
            return None;
        };
        let owner = self.scope.scope_of(symbol)?.record();
        let decl = owner.tree.declaration(id)?;
        let kind = match reference_type {
            ReferenceType::Label => "label",
            _ => "symbol",
        };
        let mut text = format!(
            "({kind}:{}) @{}  {}",
            decl.value_type,
            decl.name,
            decl.value().unwrap_or_default()
        );
        let start = owner.tree.node(decl.node).map_or(0, |n| n.start());
        if let Some(comment) = line_comment(owner.tree.source(), start) {
            text.push_str("\n\n");
            text.push_str(comment);
        }
        Some(text)
    }

    fn add_keywords(&mut self) {
        for &keyword in KEYWORDS {
            self.items.push(CompletionItem {
                label: keyword.to_string(),
                kind: Some(CompletionItemKind::KEYWORD),
                sort_text: Some(sort::KEYWORD.to_string()),
                ..Default::default()
            });
        }
    }

    fn add_operators(&mut self) {
        for &operator in OPERATORS {
            self.items.push(CompletionItem {
                label: operator.to_string(),
                kind: Some(CompletionItemKind::OPERATOR),
                sort_text: Some(sort::OPERATOR.to_string()),
                ..Default::default()
            });
        }
    }

    fn add_file_keywords(&mut self) {
        for &keyword in FILE_KEYWORDS {
            self.items.push(CompletionItem {
                label: keyword.to_string(),
                kind: Some(CompletionItemKind::KEYWORD),
                ..Default::default()
            });
        }
    }

    /// Custom keywords that did not document any proposed symbol
    fn add_custom_keywords(&mut self) {
        for keyword in std::mem::take(&mut self.keywords) {
            self.items.push(CompletionItem {
                label: keyword.symbol,
                kind: Some(CompletionItemKind::SNIPPET),
                documentation: Some(markdown(keyword.description.text())),
                ..Default::default()
            });
        }
    }

    /// `N<next>` where next is the highest sequence number of the program
    /// plus the configured increment. Nothing is proposed past `u64::MAX`.
    fn add_sequence_snippet(&mut self, node: Node<'_>) {
        let highest = node
            .find_ancestor_of(NodeKind::Function)
            .map_or(0, highest_sequence_number);
        let Some(next) = highest.checked_add(self.increment) else {
            return;
        };

        let start = self.offset.saturating_sub(self.current_word.len());
        let range = Range::new(
            self.index.offset_to_position(start),
            self.index.offset_to_position(self.offset),
        );
        self.items.push(CompletionItem {
            label: "N-Number".to_string(),
            kind: Some(CompletionItemKind::SNIPPET),
            text_edit: Some(CompletionTextEdit::Edit(TextEdit {
                range,
                new_text: format!("N${{1:{next}}} $0"),
            })),
            insert_text_format: Some(InsertTextFormat::SNIPPET),
            sort_text: Some(sort::SNIPPET.to_string()),
            ..Default::default()
        });
    }
}

fn highest_sequence_number(function: Node<'_>) -> u64 {
    let mut highest = 0;
    function.accept(|candidate| {
        if candidate.kind() != NodeKind::SequenceNumber {
            return true;
        }
        let number = candidate
            .child_by_field(Field::Number)
            .or_else(|| candidate.child_by_kind(NodeKind::Numeric));
        if let Some(value) = number.and_then(|n| strip_sequence_prefix(n.text()).parse::<u64>().ok())
        {
            highest = highest.max(value);
        }
        false
    });
    highest
}

fn sort_and_kind(
    reference_type: ReferenceType,
    value_type: ValueType,
) -> (&'static str, CompletionItemKind) {
    if reference_type == ReferenceType::Label {
        return match value_type {
            ValueType::String => (sort::LABEL, CompletionItemKind::TEXT),
            _ => (sort::LABEL, CompletionItemKind::CONSTANT),
        };
    }
    match value_type {
        ValueType::Address => (sort::ADDRESS, CompletionItemKind::INTERFACE),
        ValueType::Constant => (sort::CONSTANT, CompletionItemKind::CONSTANT),
        ValueType::Variable => (sort::VALUE, CompletionItemKind::VALUE),
        ValueType::NcCode => (sort::NC_CODE, CompletionItemKind::EVENT),
        _ => (sort::VARIABLE, CompletionItemKind::VARIABLE),
    }
}

/// Remove the first custom keyword for `symbol` and return its text
fn take_keyword_description(keywords: &mut Vec<CustomKeyword>, symbol: &str) -> Option<String> {
    let index = keywords.iter().position(|k| k.symbol == symbol)?;
    Some(keywords.remove(index).description.text())
}

/// Trailing `; ...` or `( ... )` comment on the line containing `offset`
fn line_comment(source: &str, offset: usize) -> Option<&str> {
    let rest = source.get(offset..)?;
    let line = rest.lines().next()?;
    let comment = match line.find(';') {
        Some(index) => &line[index + 1..],
        None => &line[line.find('(')?..],
    };
    let comment = comment.trim();
    (!comment.is_empty()).then_some(comment)
}

fn markdown(value: String) -> Documentation {
    Documentation::MarkupContent(MarkupContent {
        kind: MarkupKind::Markdown,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Description;
    use crate::test_helpers::{definitions, labels, program, store, DEFS, MAIN};
    use macro_syntax::TreeBuilder;

    /// `@FEED 100`, `@SPEED #500`, `@AXIS X`, `>LOOP 10`, then program O100
    /// with `N10 G01` and `N20 G00`; the cursor goes on the last, empty line.
    fn sample(b: &mut TreeBuilder) {
        b.variable_def("FEED", "100", ValueType::Numeric);
        b.trivia(" (feed rate)");
        b.newline();
        b.variable_def("SPEED", "#500", ValueType::Variable);
        b.newline();
        b.variable_def("AXIS", "X", ValueType::Address);
        b.newline();
        b.label_def("LOOP", "10", ValueType::Numeric);
        b.newline();
        b.start(NodeKind::Function);
        b.trivia("O");
        b.token_field(NodeKind::Numeric, Field::Name, "100");
        b.newline();
        for number in ["10", "20"] {
            b.start(NodeKind::SequenceNumber);
            b.trivia("N");
            b.token_field(NodeKind::Numeric, Field::Number, number);
            b.trivia(" ");
            b.start(NodeKind::Statement);
            b.token(NodeKind::Code, "G01");
            b.finish();
            b.finish();
            b.newline();
        }
    }

    fn complete_at_end(settings: &Settings, build: impl FnOnce(&mut TreeBuilder)) -> CompletionList {
        let store = store(vec![(MAIN, program(build))]);
        let record = store.get(MAIN).expect("main");
        let offset = record.tree.source().len();
        get_completions(&record, &store, offset, settings)
    }

    fn item<'l>(list: &'l CompletionList, label: &str) -> &'l CompletionItem {
        list.items
            .iter()
            .find(|i| i.label == label)
            .unwrap_or_else(|| panic!("no item {label}"))
    }

    #[test]
    fn test_current_word() {
        assert_eq!(current_word("G01 X#1", 7), "X#1");
        assert_eq!(current_word("IF [#", 5), "#");
        assert_eq!(current_word("A+FE", 4), "FE");
        assert_eq!(current_word("", 0), "");
    }

    #[test]
    fn test_function_body_proposals() {
        let list = complete_at_end(&Settings::default(), sample);
        let found = labels(&list);
        for expected in ["FEED", "SPEED", "AXIS", "LOOP", "IF", "GOTO", "N-Number"] {
            assert!(found.contains(&expected), "missing {expected}: {found:?}");
        }
        assert_eq!(item(&list, "FEED").sort_text.as_deref(), Some(sort::VARIABLE));
        assert_eq!(item(&list, "SPEED").sort_text.as_deref(), Some(sort::VALUE));
        assert_eq!(item(&list, "AXIS").sort_text.as_deref(), Some(sort::ADDRESS));
        assert_eq!(item(&list, "LOOP").sort_text.as_deref(), Some(sort::LABEL));
        assert_eq!(item(&list, "IF").sort_text.as_deref(), Some(sort::KEYWORD));
    }

    #[test]
    fn test_declaration_detail() {
        let list = complete_at_end(&Settings::default(), sample);
        assert_eq!(
            item(&list, "FEED").detail.as_deref(),
            Some("(symbol:numeric) @FEED  100\n\n(feed rate)")
        );
        assert_eq!(
            item(&list, "LOOP").detail.as_deref(),
            Some("(label:numeric) @LOOP  10")
        );
    }

    #[test]
    fn test_sequence_snippet_uses_increment() {
        let list = complete_at_end(&Settings::default(), sample);
        let Some(CompletionTextEdit::Edit(edit)) = &item(&list, "N-Number").text_edit else {
            panic!("snippet edit");
        };
        assert_eq!(edit.new_text, "N${1:30} $0");

        let mut settings = Settings::default();
        settings.sequence.increment = 5;
        let list = complete_at_end(&settings, sample);
        let Some(CompletionTextEdit::Edit(edit)) = &item(&list, "N-Number").text_edit else {
            panic!("snippet edit");
        };
        assert_eq!(edit.new_text, "N${1:25} $0");
    }

    #[test]
    fn test_sequence_snippet_skipped_past_largest_number() {
        let list = complete_at_end(&Settings::default(), |b| {
            b.start(NodeKind::Function);
            b.trivia("O");
            b.token_field(NodeKind::Numeric, Field::Name, "100");
            b.newline();
            b.start(NodeKind::SequenceNumber);
            b.trivia("N");
            b.token_field(NodeKind::Numeric, Field::Number, &u64::MAX.to_string());
            b.trivia(" ");
            b.start(NodeKind::Statement);
            b.token(NodeKind::Code, "G01");
            b.finish();
            b.finish();
            b.newline();
        });
        let found = labels(&list);
        assert!(!found.contains(&"N-Number"), "{found:?}");
        assert!(found.contains(&"GOTO"));
    }

    #[test]
    fn test_hash_restricts_to_numeric_variables() {
        let list = complete_at_end(&Settings::default(), |b| {
            sample(b);
            b.trivia("#");
        });
        let found = labels(&list);
        assert!(found.contains(&"FEED"));
        assert!(!found.contains(&"SPEED"));
        assert!(!found.contains(&"LOOP"));
    }

    #[test]
    fn test_goto_proposals() {
        let list = complete_at_end(&Settings::default(), |b| {
            sample(b);
            b.start(NodeKind::Goto);
            b.trivia("GOTO ");
            b.token_field(NodeKind::Label, Field::Label, "L");
        });
        let found = labels(&list);
        assert!(found.contains(&"LOOP"));
        assert!(found.contains(&"FEED"));
        assert!(!found.contains(&"AXIS"));
        assert!(!found.contains(&"IF"));
    }

    #[test]
    fn test_operators_in_conditions() {
        let list = complete_at_end(&Settings::default(), |b| {
            sample(b);
            b.start(NodeKind::If);
            b.trivia("IF [");
            b.start_field(NodeKind::ConditionalExpr, Field::Condition);
            b.token(NodeKind::Variable, "#1");
            b.trivia(" ");
            b.token(NodeKind::Operator, "E");
        });
        let found = labels(&list);
        assert!(found.contains(&"EQ"));
        assert!(found.contains(&"&&"));
        assert_eq!(item(&list, "EQ").sort_text.as_deref(), Some(sort::OPERATOR));
    }

    #[test]
    fn test_file_level_keywords() {
        let list = complete_at_end(&Settings::default(), |b| b.trivia(""));
        assert_eq!(labels(&list), FILE_KEYWORDS.to_vec());
    }

    #[test]
    fn test_custom_keywords_used_once() {
        let mut settings = Settings::default();
        settings.keywords = vec![
            CustomKeyword {
                symbol: "FEED".to_string(),
                description: Description::One("Feed rate in mm/min".to_string()),
            },
            CustomKeyword {
                symbol: "PI".to_string(),
                description: Description::Many(vec!["Circle".to_string(), "constant".to_string()]),
            },
        ];
        let list = complete_at_end(&settings, sample);

        let Some(Documentation::MarkupContent(doc)) = &item(&list, "FEED").documentation else {
            panic!("FEED documentation");
        };
        assert_eq!(doc.value, "Feed rate in mm/min");
        assert_eq!(labels(&list).iter().filter(|l| **l == "FEED").count(), 1);

        let pi = item(&list, "PI");
        assert_eq!(pi.kind, Some(CompletionItemKind::SNIPPET));
    }

    #[test]
    fn test_included_symbols_are_proposed() {
        let store = store(vec![
            (DEFS, definitions(|b| {
                b.variable_def("TOOL", "1", ValueType::Numeric);
            })),
            (MAIN, program(|b| {
                b.include("defs.def");
                b.newline();
                sample(b);
            })),
        ]);
        let record = store.get(MAIN).expect("main");
        let offset = record.tree.source().len();
        let list = get_completions(&record, &store, offset, &Settings::default());
        assert!(labels(&list).contains(&"TOOL"));
    }

    #[test]
    fn test_completion_is_deterministic() {
        let first = complete_at_end(&Settings::default(), sample);
        let second = complete_at_end(&Settings::default(), sample);
        assert_eq!(labels(&first), labels(&second));
    }

    #[test]
    fn test_line_comment() {
        assert_eq!(line_comment("@A 1 ; note\n@B 2", 0), Some("note"));
        assert_eq!(line_comment("@A 1 (note)\n", 0), Some("(note)"));
        assert_eq!(line_comment("@A 1\n; other line", 0), None);
    }
}
