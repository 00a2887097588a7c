//! Program, sequence number and jump checks (M0102, M03xx).
//!
//! - M0102: two programs resolve to the same number
//! - M0300: sequence number used twice in a program
//! - M0301: label value used twice in a program
//! - M0302: a label and a sequence number share a value
//! - M0303: goto target missing from its program

use macro_syntax::{is_numeric_text, strip_sequence_prefix, Field, Node, NodeKind, ValueType};

use super::{function_of, EntryKind, LintVisitor, SequenceEntry};
use crate::diagnostics::Rule;

impl LintVisitor<'_> {
    pub(super) fn visit_function(&mut self, node: Node<'_>) -> bool {
        let Some(ident) = node.child_by_field(Field::Name).or_else(|| node.child(0)) else {
            return true;
        };
        let number = match self.resolve(ident) {
            Some(decl) => decl.value_text,
            None => Some(ident.text().to_string()),
        };
        if let Some(number) = number {
            if self.functions.contains(&number) {
                self.report_with(Rule::DuplicateFunction, ident, number);
            } else {
                self.functions.push(number);
            }
        }
        true
    }

    pub(super) fn visit_label(&mut self, node: Node<'_>) -> bool {
        let jump_position = matches!(
            node.parent_kind(),
            Some(NodeKind::Function | NodeKind::Then | NodeKind::Else | NodeKind::While)
        ) && !matches!(node.field(), Some(Field::DoLabel | Field::EndLabel));
        if jump_position && node.find_ancestor_of(NodeKind::Function).is_some() {
            if let Some(value) = self.resolve(node).and_then(|d| d.value_text) {
                self.add_sequence_entry(node, &value, EntryKind::Label);
            }
        }
        true
    }

    pub(super) fn visit_sequence_number(&mut self, node: Node<'_>) -> bool {
        let number = node.child_by_field(Field::Number).or_else(|| {
            node.children()
                .find(|c| c.kind() == NodeKind::Numeric)
        });
        if let Some(number) = number {
            self.add_sequence_entry(number, number.text(), EntryKind::Sequence);
        }
        true
    }

    pub(super) fn visit_goto(&mut self, node: Node<'_>) -> bool {
        self.gotos
            .entry(function_of(node))
            .or_default()
            .push(node.id());
        true
    }

    /// Record a jump target, reporting at `anchor` when its program already has the value
    pub(super) fn add_sequence_entry(&mut self, anchor: Node<'_>, value: &str, kind: EntryKind) {
        let value = strip_sequence_prefix(value).to_string();
        let entries = self.sequences.entry(function_of(anchor)).or_default();
        let rule = entries.iter().find(|e| e.value == value).map(|existing| {
            if existing.kind != kind {
                Rule::DuplicateLabelSequence
            } else if kind == EntryKind::Sequence {
                Rule::DuplicateSequence
            } else {
                Rule::DuplicateLabel
            }
        });
        match rule {
            Some(rule) => self.report_with(rule, anchor, value),
            None => entries.push(SequenceEntry { value, kind }),
        }
    }

    /// Runs after the walk, once every program's targets are known
    pub(super) fn check_goto_targets(&mut self) {
        let record = self.record;
        let gotos = std::mem::take(&mut self.gotos);
        for (function, ids) in gotos {
            for id in ids {
                let Some(goto) = record.tree.node(id) else {
                    continue;
                };
                let Some(label) = goto.child_by_field(Field::Label).or_else(|| goto.child(0))
                else {
                    continue;
                };
                let Some(target) = self.jump_value(label) else {
                    continue;
                };
                let found = target.as_deref().is_some_and(|value| {
                    let value = strip_sequence_prefix(value);
                    self.sequences
                        .get(&function)
                        .is_some_and(|entries| entries.iter().any(|e| e.value == value))
                });
                if !found {
                    let detail = target.unwrap_or_default();
                    self.report_with(Rule::SeqNotFound, label, detail);
                }
            }
        }
    }

    /// The value a goto jumps to. `None` when the target is not checked at all,
    /// `Some(None)` when it should resolve but does not.
    fn jump_value(&self, label: Node<'_>) -> Option<Option<String>> {
        if is_numeric_text(label.text()) {
            return Some(Some(label.text().to_string()));
        }
        match label.kind() {
            NodeKind::Label => Some(self.resolve(label).and_then(|d| d.value_text)),
            NodeKind::Variable | NodeKind::Symbol => {
                let decl = self.resolve(label)?;
                matches!(
                    decl.value_type,
                    ValueType::Numeric | ValueType::Constant | ValueType::Sequence
                )
                .then_some(decl.value_text)
            }
            _ => None,
        }
    }
}
