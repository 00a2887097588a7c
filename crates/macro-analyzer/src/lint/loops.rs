//! `WHILE [..] DO n ... END n` checks (M0404, M05xx).

use macro_syntax::{Field, Node, NodeKind};

use super::{LintVisitor, MAX_WHILE_DEPTH};
use crate::diagnostics::Rule;

impl LintVisitor<'_> {
    pub(super) fn visit_while(&mut self, node: Node<'_>) -> bool {
        if let Some(condition) = node.child_by_field(Field::Condition) {
            if condition.child_by_field(Field::Logic).is_some() {
                self.report(Rule::WhileLogicOperator, condition);
            }
        }

        let do_label = node.child_by_field(Field::DoLabel);
        let end_label = node.child_by_field(Field::EndLabel);
        let do_value = do_label.and_then(|l| self.loop_number(l));
        let do_number = numeric(do_value.as_deref());

        if let (Some(do_label), Some(end_label)) = (do_label, end_label) {
            let end_value = self.loop_number(end_label);
            if do_value != end_value {
                self.report(Rule::DoEndNumberNotEqual, do_label);
                self.report(Rule::DoEndNumberNotEqual, end_label);
            }
            for (label, value) in [(do_label, &do_value), (end_label, &end_value)] {
                if numeric(value.as_deref()).is_some_and(|n| n > MAX_WHILE_DEPTH as f64) {
                    self.report(Rule::DoEndNumberTooBig, label);
                }
            }
        }

        // Enclosing loops, innermost first, starting with this one.
        let loops = std::iter::once(node)
            .chain(node.ancestors())
            .filter(|n| n.kind() == NodeKind::While);
        for (depth, outer) in loops.enumerate() {
            if depth >= MAX_WHILE_DEPTH {
                self.report(Rule::NestingTooDeep, node);
                return false;
            }
            if depth == 0 {
                continue;
            }
            let Some(outer_do) = outer.child_by_field(Field::DoLabel) else {
                continue;
            };
            let outer_number = numeric(self.loop_number(outer_do).as_deref());
            if do_number.is_some() && outer_number == do_number {
                self.report(Rule::DuplicateDoEndNumber, outer_do);
            }
        }
        true
    }

    /// DO/END identifier: the number itself, or a label's declared value
    fn loop_number(&self, label: Node<'_>) -> Option<String> {
        match label.kind() {
            NodeKind::Label | NodeKind::Symbol | NodeKind::Variable => {
                self.resolve(label).and_then(|d| d.value_text)
            }
            _ => Some(label.text().to_string()),
        }
    }
}

fn numeric(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use macro_syntax::{Field, NodeKind, TreeBuilder, ValueType};

    use crate::diagnostics::Rule;
    use crate::test_helpers::{lint_program, rules};

    /// Open `WHILE [#1 LT 10] DO <n>`; the caller closes it with `end_while`.
    fn start_while(b: &mut TreeBuilder, do_kind: NodeKind, do_number: &str, logic: bool) {
        b.start(NodeKind::While);
        b.trivia("WHILE [");
        b.start_field(NodeKind::ConditionalExpr, Field::Condition);
        b.token(NodeKind::Variable, "#1");
        b.trivia(" LT 10");
        if logic {
            b.trivia(" ");
            b.token_field(NodeKind::Operator, Field::Logic, "&&");
            b.trivia(" ");
            b.start_field(NodeKind::ConditionalExpr, Field::Next);
            b.token(NodeKind::Variable, "#2");
            b.trivia(" GT 0");
            b.finish();
        }
        b.finish();
        b.trivia("] DO");
        b.token_field(do_kind, Field::DoLabel, do_number);
        b.newline();
    }

    fn end_while(b: &mut TreeBuilder, end_kind: NodeKind, end_number: &str) {
        b.trivia("END");
        b.token_field(end_kind, Field::EndLabel, end_number);
        b.finish();
        b.newline();
    }

    fn simple_while(b: &mut TreeBuilder, do_number: &str, end_number: &str) {
        start_while(b, NodeKind::Numeric, do_number, false);
        end_while(b, NodeKind::Numeric, end_number);
    }

    #[test]
    fn test_valid_loop() {
        assert!(lint_program(|b| simple_while(b, "1", "1")).is_empty());
    }

    #[test]
    fn test_logic_operator_in_while() {
        let diagnostics = lint_program(|b| {
            start_while(b, NodeKind::Numeric, "1", true);
            end_while(b, NodeKind::Numeric, "1");
        });
        assert_eq!(rules(&diagnostics), vec![Rule::WhileLogicOperator]);
    }

    #[test]
    fn test_do_end_mismatch_reported_at_both() {
        let diagnostics = lint_program(|b| simple_while(b, "1", "2"));
        assert_eq!(
            rules(&diagnostics),
            vec![Rule::DoEndNumberNotEqual, Rule::DoEndNumberNotEqual]
        );
        assert!(diagnostics[0].span.start < diagnostics[1].span.start);
    }

    #[test]
    fn test_do_number_too_big() {
        let diagnostics = lint_program(|b| simple_while(b, "4", "4"));
        assert_eq!(
            rules(&diagnostics),
            vec![Rule::DoEndNumberTooBig, Rule::DoEndNumberTooBig]
        );
    }

    #[test]
    fn test_do_number_through_label() {
        let diagnostics = lint_program(|b| {
            b.label_def("OUTER", "5", ValueType::Numeric);
            b.newline();
            start_while(b, NodeKind::Label, "OUTER", false);
            end_while(b, NodeKind::Label, "OUTER");
        });
        assert_eq!(
            rules(&diagnostics),
            vec![Rule::DoEndNumberTooBig, Rule::DoEndNumberTooBig]
        );
    }

    #[test]
    fn test_nested_loops_with_same_number() {
        let diagnostics = lint_program(|b| {
            for _ in 0..4 {
                start_while(b, NodeKind::Numeric, "1", false);
            }
            for _ in 0..4 {
                end_while(b, NodeKind::Numeric, "1");
            }
        });
        let found = rules(&diagnostics);
        assert!(found.contains(&Rule::DuplicateDoEndNumber));
        assert_eq!(
            found.iter().filter(|r| **r == Rule::NestingTooDeep).count(),
            1
        );
        // Only the fourth loop is too deep.
        let deep = diagnostics
            .iter()
            .find(|d| d.rule == Rule::NestingTooDeep)
            .expect("nesting finding");
        let last_while_start = diagnostics
            .iter()
            .filter(|d| d.rule == Rule::DuplicateDoEndNumber)
            .map(|d| d.span.start)
            .max()
            .expect("duplicate findings");
        assert!(deep.span.start > last_while_start);
    }

    #[test]
    fn test_three_nested_loops_are_allowed() {
        let diagnostics = lint_program(|b| {
            for number in ["1", "2", "3"] {
                start_while(b, NodeKind::Numeric, number, false);
            }
            for number in ["3", "2", "1"] {
                end_while(b, NodeKind::Numeric, number);
            }
        });
        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
    }
}
