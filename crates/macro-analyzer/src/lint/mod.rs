//! Lint engine.
//!
//! One depth-first walk over a file collects findings in traversal order; a
//! short pass afterwards checks goto targets against the sequence numbers and
//! labels gathered per program.

mod conditionals;
mod declarations;
mod loops;
mod sequences;
mod statements;

use std::collections::{BTreeMap, HashMap};

use macro_syntax::{DeclarationKind, Node, NodeId, NodeKind, ValueType};
use tracing::debug;

use crate::config::LintConfiguration;
use crate::diagnostics::{Diagnostic, Rule};
use crate::files::{FileRecord, FileResolver};

const MAX_CONDITIONAL_LINKS: usize = 4;
const MAX_WHILE_DEPTH: usize = 3;
const MAX_IF_DEPTH: usize = 10;

/// Lint one file
pub fn lint(
    record: &FileRecord,
    files: &dyn FileResolver,
    config: &LintConfiguration,
) -> Vec<Diagnostic> {
    let mut visitor = LintVisitor::new(record, files, config);
    visitor.run();
    debug!(
        "linted {}: {} diagnostics",
        record.uri,
        visitor.diagnostics.len()
    );
    visitor.diagnostics
}

/// What the flat declaration map remembers about a name
#[derive(Debug, Clone)]
struct LintDeclaration {
    kind: DeclarationKind,
    value_text: Option<String>,
    value_type: ValueType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Sequence,
    Label,
}

/// A jump target seen inside a program
#[derive(Debug, Clone)]
struct SequenceEntry {
    value: String,
    kind: EntryKind,
}

struct LintVisitor<'a> {
    record: &'a FileRecord,
    files: &'a dyn FileResolver,
    config: &'a LintConfiguration,
    /// Flat across the file and its includes
    declarations: HashMap<String, LintDeclaration>,
    /// Per program, keyed by the function node
    sequences: HashMap<NodeId, Vec<SequenceEntry>>,
    gotos: BTreeMap<NodeId, Vec<NodeId>>,
    duplicates: Vec<String>,
    imports: Vec<String>,
    functions: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> LintVisitor<'a> {
    fn new(
        record: &'a FileRecord,
        files: &'a dyn FileResolver,
        config: &'a LintConfiguration,
    ) -> Self {
        Self {
            record,
            files,
            config,
            declarations: HashMap::new(),
            sequences: HashMap::new(),
            gotos: BTreeMap::new(),
            duplicates: Vec::new(),
            imports: Vec::new(),
            functions: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn run(&mut self) {
        let record = self.record;
        record.tree.root().accept(|node| self.visit(node));
        self.check_goto_targets();
    }

    fn visit(&mut self, node: Node<'a>) -> bool {
        match node.kind() {
            NodeKind::Include => self.visit_include(node),
            NodeKind::VariableDef | NodeKind::LabelDef => self.visit_declaration(node, true),
            NodeKind::Symbol => self.visit_symbol(node),
            NodeKind::Variable => self.visit_variable(node),
            NodeKind::Label => self.visit_label(node),
            NodeKind::Function => self.visit_function(node),
            NodeKind::SequenceNumber => self.visit_sequence_number(node),
            NodeKind::Goto => self.visit_goto(node),
            NodeKind::Statement => self.visit_statement(node),
            NodeKind::Assignment => self.visit_assignment(node),
            NodeKind::If => self.visit_if(node),
            NodeKind::While => self.visit_while(node),
            _ => true,
        }
    }

    fn report(&mut self, rule: Rule, node: Node<'_>) {
        self.push(rule, node, None);
    }

    fn report_with(&mut self, rule: Rule, node: Node<'_>, detail: impl Into<String>) {
        self.push(rule, node, Some(detail.into()));
    }

    fn push(&mut self, rule: Rule, node: Node<'_>, detail: Option<String>) {
        let Some(severity) = self.config.level(rule).severity() else {
            return;
        };
        let diagnostic = Diagnostic::new(rule, node.id(), node.span(), severity);
        self.diagnostics.push(match detail {
            Some(detail) => diagnostic.with_detail(detail),
            None => diagnostic,
        });
    }
}

/// The program a node belongs to; nodes outside any program share the root
fn function_of(node: Node<'_>) -> NodeId {
    node.find_ancestor_of(NodeKind::Function)
        .map(|f| f.id())
        .unwrap_or(NodeId(0))
}
