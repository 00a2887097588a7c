//! Shared test utilities for macro-analyzer tests.

use macro_syntax::{FileKind, Node, NodeKind, SyntaxTree, TreeBuilder};

use crate::config::LintConfiguration;
use crate::diagnostics::{Diagnostic, Rule};
use crate::files::{FileResolver, FileStore};
use crate::lint::lint;

pub const MAIN: &str = "file:///project/main.src";
pub const DEFS: &str = "file:///project/defs.def";

/// Build a program file.
pub fn program(build: impl FnOnce(&mut TreeBuilder)) -> SyntaxTree {
    let mut b = TreeBuilder::new(FileKind::Program);
    build(&mut b);
    b.build()
}

/// Build a definition file.
pub fn definitions(build: impl FnOnce(&mut TreeBuilder)) -> SyntaxTree {
    let mut b = TreeBuilder::new(FileKind::Definitions);
    build(&mut b);
    b.build()
}

/// Lint a program stored as the only file of a workspace.
pub fn lint_program(build: impl FnOnce(&mut TreeBuilder)) -> Vec<Diagnostic> {
    let store = FileStore::new();
    store.insert(MAIN, program(build));
    lint_in(&store, MAIN)
}

/// Lint a stored file with the default configuration.
pub fn lint_in(store: &FileStore, uri: &str) -> Vec<Diagnostic> {
    let record = store.get(uri).expect("file is stored");
    lint(&record, store, &LintConfiguration::new())
}

pub fn rules(diagnostics: &[Diagnostic]) -> Vec<Rule> {
    diagnostics.iter().map(|d| d.rule).collect()
}

/// First node of `kind` with exactly `text`, in pre-order.
pub fn find_node<'t>(tree: &'t SyntaxTree, kind: NodeKind, text: &str) -> Node<'t> {
    let mut found = None;
    tree.root().accept(|n| {
        if found.is_none() && n.kind() == kind && n.text() == text {
            found = Some(n);
        }
        found.is_none()
    });
    found.expect("node present in tree")
}
