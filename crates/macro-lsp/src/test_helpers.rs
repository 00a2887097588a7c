//! Shared test utilities for macro-lsp tests.

use macro_analyzer::FileStore;
use macro_syntax::{FileKind, SyntaxTree, TreeBuilder};
use tower_lsp::lsp_types::{CompletionList, Position};

pub const MAIN: &str = "file:///project/main.src";
pub const OTHER: &str = "file:///project/other.src";
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

pub fn store(files: Vec<(&str, SyntaxTree)>) -> FileStore {
    let store = FileStore::new();
    for (uri, tree) in files {
        store.insert(uri, tree);
    }
    store
}

/// Byte offset of the `nth` occurrence of `needle`, plus `delta`.
pub fn offset_of(tree: &SyntaxTree, needle: &str, nth: usize, delta: usize) -> usize {
    tree.source()
        .match_indices(needle)
        .nth(nth)
        .map(|(index, _)| index + delta)
        .expect("needle in source")
}

pub fn labels(list: &CompletionList) -> Vec<&str> {
    list.items.iter().map(|i| i.label.as_str()).collect()
}

/// Create a Position from line and character.
pub fn pos(line: u32, character: u32) -> Position {
    Position { line, character }
}
