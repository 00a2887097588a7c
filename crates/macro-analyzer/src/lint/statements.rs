//! Statement checks (M0400, M0401).

use macro_syntax::{Field, Node, NodeKind, ValueType};

use super::declarations::inside_definition;
use super::LintVisitor;
use crate::diagnostics::Rule;

impl LintVisitor<'_> {
    pub(super) fn visit_statement(&mut self, node: Node<'_>) -> bool {
        for child in node.children() {
            if !matches!(child.kind(), NodeKind::Parameter | NodeKind::Code) {
                continue;
            }
            if !inside_definition(child) && child.text().chars().count() <= 1 {
                self.report_with(Rule::IncompleteParameter, child, child.text());
            }
        }
        true
    }

    pub(super) fn visit_assignment(&mut self, node: Node<'_>) -> bool {
        let Some(target) = node.child_by_field(Field::Target).or_else(|| node.child(0)) else {
            return true;
        };
        let constant = self
            .resolve(target)
            .is_some_and(|decl| decl.value_type == ValueType::Constant);
        if constant {
            self.report_with(Rule::AssignmentConstant, target, target.text());
        }
        true
    }
}
