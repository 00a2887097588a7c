//! Include and declaration checks (M01xx, M02xx).
//!
//! - M0100: include listed twice
//! - M0101: include target cannot be resolved
//! - M0200: symbol is neither declared nor a number
//! - M0201: name declared twice (includes count as the same namespace)
//! - M0202: two declarations share an address, NC code or number

use macro_syntax::{is_numeric_text, Field, Node, NodeKind, ValueType};

use super::{EntryKind, LintDeclaration, LintVisitor};
use crate::diagnostics::Rule;

impl LintVisitor<'_> {
    pub(super) fn visit_include(&mut self, node: Node<'_>) -> bool {
        let Some(uri) = node.child_by_field(Field::Uri).or_else(|| node.child(0)) else {
            return false;
        };
        let target = self.files.resolve_reference(uri.text(), &self.record.uri);

        if self.imports.contains(&target) {
            self.report(Rule::DuplicateInclude, node);
            return false;
        }
        self.imports.push(target.clone());

        match self.files.get(&target) {
            Some(include) => {
                // Pull the included declarations into the flat map without reporting.
                include.tree.root().accept(|candidate| {
                    if candidate.kind().is_declaration() {
                        self.visit_declaration(candidate, false);
                        return false;
                    }
                    true
                });
            }
            None => self.report_with(Rule::IncludeNotFound, node, uri.text()),
        }
        false
    }

    /// `local` is false for declarations pulled in from an include; those only
    /// feed the duplicate bookkeeping.
    pub(super) fn visit_declaration(&mut self, node: Node<'_>, local: bool) -> bool {
        let Some(decl) = node.declaration() else {
            return true;
        };

        if self.declarations.contains_key(&decl.name) {
            self.duplicates.push(decl.name.clone());
            if local {
                self.report_with(Rule::DuplicateDeclaration, node, decl.name.as_str());
            }
        }

        if local
            && matches!(
                decl.value_type,
                ValueType::Address | ValueType::NcCode | ValueType::Numeric
            )
        {
            let clash = decl.value_text.is_some()
                && self.declarations.values().any(|existing| {
                    existing.kind == decl.kind && existing.value_text == decl.value_text
                });
            if clash {
                self.report(Rule::DuplicateAddress, node);
            }
        }

        self.declarations.insert(
            decl.name.clone(),
            LintDeclaration {
                kind: decl.kind,
                value_text: decl.value_text.clone(),
                value_type: decl.value_type,
            },
        );
        true
    }

    pub(super) fn visit_symbol(&mut self, node: Node<'_>) -> bool {
        let name = node.text();
        if !self.declarations.contains_key(name) && !is_numeric_text(name) {
            self.report_with(Rule::UnknownSymbol, node, name);
        }
        true
    }

    pub(super) fn visit_variable(&mut self, node: Node<'_>) -> bool {
        if self.duplicates.iter().any(|d| d == node.text()) {
            self.report(Rule::DuplicateDeclaration, node);
        }

        if let Some(decl) = self.resolve(node) {
            if decl.value_type == ValueType::Sequence {
                if let Some(value) = decl.value_text {
                    self.add_sequence_entry(node, &value, EntryKind::Label);
                }
            }
        }
        true
    }

    /// Declaration behind a reference: the annotated one, else the flat map,
    /// which also covers names declared in includes
    pub(super) fn resolve(&self, node: Node<'_>) -> Option<LintDeclaration> {
        match node.declaration() {
            Some(decl) => Some(LintDeclaration {
                kind: decl.kind,
                value_text: decl.value_text.clone(),
                value_type: decl.value_type,
            }),
            None => self.declarations.get(node.text()).cloned(),
        }
    }
}

/// Whether a def node sits above `node`
pub(super) fn inside_definition(node: Node<'_>) -> bool {
    node.find_ancestor(|k| matches!(k, NodeKind::VariableDef | NodeKind::LabelDef))
        .is_some()
}

#[cfg(test)]
mod tests {
    use macro_syntax::{NodeKind, ValueType};

    use crate::diagnostics::Rule;
    use crate::files::{FileResolver, FileStore};
    use crate::test_helpers::{definitions, lint_in, lint_program, program, rules, DEFS, MAIN};

    #[test]
    fn test_duplicate_declaration_reported_at_second() {
        let diagnostics = lint_program(|b| {
            b.variable_def("A", "1", ValueType::Numeric);
            b.newline();
            b.variable_def("B", "2", ValueType::Numeric);
            b.newline();
            b.variable_def("A", "3", ValueType::Numeric);
        });
        assert_eq!(rules(&diagnostics), vec![Rule::DuplicateDeclaration]);
        assert_eq!(diagnostics[0].detail.as_deref(), Some("A"));
        // The second `@A` starts on the third line.
        assert_eq!(diagnostics[0].span.start, 10);
    }

    #[test]
    fn test_duplicate_address() {
        let diagnostics = lint_program(|b| {
            b.variable_def("X_AXIS", "X", ValueType::Address);
            b.newline();
            b.variable_def("OTHER_X", "X", ValueType::Address);
            b.newline();
            b.label_def("L1", "X", ValueType::Address);
        });
        // Labels live in their own kind, so only the second variable clashes.
        assert_eq!(rules(&diagnostics), vec![Rule::DuplicateAddress]);
    }

    #[test]
    fn test_variables_may_share_values() {
        let diagnostics = lint_program(|b| {
            b.variable_def("A", "#100", ValueType::Variable);
            b.newline();
            b.variable_def("B", "#100", ValueType::Variable);
        });
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_symbol_but_not_numbers() {
        let diagnostics = lint_program(|b| {
            b.start(NodeKind::Statement);
            b.token(NodeKind::Symbol, "UNDECLARED");
            b.trivia(" ");
            b.token(NodeKind::Symbol, "1.5");
            b.finish();
        });
        assert_eq!(rules(&diagnostics), vec![Rule::UnknownSymbol]);
        assert_eq!(diagnostics[0].message, "Unknown symbol: UNDECLARED");
    }

    #[test]
    fn test_include_declarations_are_known() {
        let store = FileStore::new();
        store.insert(
            DEFS,
            definitions(|b| {
                b.variable_def("FEED", "100", ValueType::Numeric);
            }),
        );
        store.insert(
            MAIN,
            program(|b| {
                b.include("defs.def");
                b.newline();
                b.start(NodeKind::Statement);
                b.token(NodeKind::Symbol, "FEED");
                b.finish();
            }),
        );
        assert!(lint_in(&store, MAIN).is_empty());
    }

    #[test]
    fn test_duplicate_across_include_is_flat() {
        let store = FileStore::new();
        store.insert(
            DEFS,
            definitions(|b| {
                b.variable_def("FEED", "100", ValueType::Numeric);
            }),
        );
        store.insert(
            MAIN,
            program(|b| {
                b.include("defs.def");
                b.newline();
                b.variable_def("FEED", "200", ValueType::Numeric);
            }),
        );
        assert_eq!(rules(&lint_in(&store, MAIN)), vec![Rule::DuplicateDeclaration]);
    }

    #[test]
    fn test_duplicate_and_missing_includes() {
        let store = FileStore::new();
        store.insert(DEFS, definitions(|_| {}));
        store.insert(
            MAIN,
            program(|b| {
                b.include("defs.def");
                b.newline();
                b.include("\"defs.def\"");
                b.newline();
                b.include("missing.def");
            }),
        );
        let diagnostics = lint_in(&store, MAIN);
        assert_eq!(
            rules(&diagnostics),
            vec![Rule::DuplicateInclude, Rule::IncludeNotFound]
        );
        assert_eq!(diagnostics[1].detail.as_deref(), Some("missing.def"));

        // The record's include set sees the same two targets.
        let record = store.get(MAIN).expect("main");
        assert_eq!(
            record.includes,
            vec![DEFS.to_string(), "file:///project/missing.def".to_string()]
        );
    }

    #[test]
    fn test_variable_use_of_duplicated_name() {
        let diagnostics = lint_program(|b| {
            b.variable_def("A", "1", ValueType::Numeric);
            b.newline();
            b.variable_def("A", "2", ValueType::Numeric);
            b.newline();
            b.start(NodeKind::Statement);
            b.token(NodeKind::Variable, "A");
            b.finish();
        });
        assert_eq!(
            rules(&diagnostics),
            vec![Rule::DuplicateDeclaration, Rule::DuplicateDeclaration]
        );
    }
}
