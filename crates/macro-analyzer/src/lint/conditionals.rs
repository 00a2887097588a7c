//! Conditional checks (M0402 - M0404).
//!
//! A condition is a chain of conditionals: each `ConditionalExpr` holds the
//! logic operator joining it to the next one (`Logic`) and the next one itself
//! (`Next`).

use macro_syntax::{Field, Node, NodeKind};

use super::{LintVisitor, MAX_CONDITIONAL_LINKS, MAX_IF_DEPTH};
use crate::diagnostics::Rule;

/// The conditionals of a condition, first to last
fn conditional_chain(first: Node<'_>) -> Vec<Node<'_>> {
    std::iter::successors(Some(first), |c| c.child_by_field(Field::Next)).collect()
}

impl LintVisitor<'_> {
    pub(super) fn visit_if(&mut self, node: Node<'_>) -> bool {
        if let Some(condition) = node.child_by_field(Field::Condition) {
            let chain = conditional_chain(condition);

            // Every conditional but the last carries a link to its successor.
            if chain.len() > MAX_CONDITIONAL_LINKS + 1 {
                self.report(Rule::TooManyConditionals, chain[MAX_CONDITIONAL_LINKS]);
            }

            let links: Vec<Node<'_>> = chain
                .iter()
                .filter_map(|c| c.child_by_field(Field::Logic))
                .collect();
            if let Some((first, rest)) = links.split_first() {
                for op in rest {
                    if op.text() != first.text() {
                        self.report_with(Rule::MixedConditionals, *op, op.text());
                    }
                }
            }
        }

        let depth = std::iter::once(node)
            .chain(node.ancestors())
            .filter(|n| n.kind() == NodeKind::If)
            .count();
        if depth > MAX_IF_DEPTH {
            self.report(Rule::NestingTooDeep, node);
            return false;
        }
        true
    }
}
