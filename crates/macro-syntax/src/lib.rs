//! Syntax tree model for the macro/NC language.
//!
//! The tree is produced by an external parser (through [`TreeBuilder`] or the
//! JSON form read by [`SyntaxTree::from_json`]) and is read-only afterwards.

pub mod ast;
pub mod builder;
pub mod error;
pub mod tree;
pub mod types;

pub use ast::{
    DeclId, Declaration, DeclarationKind, DeclarationRef, Field, FileKind, NodeId, NodeKind, Span,
};
pub use builder::TreeBuilder;
pub use error::TreeError;
pub use tree::{Node, SyntaxTree};
pub use types::{ReferenceType, ReferenceTypes, ValueType};

/// Text of a jump value with any leading `N`/`n` removed
pub fn strip_sequence_prefix(text: &str) -> &str {
    text.strip_prefix(['N', 'n']).unwrap_or(text)
}

/// Whether the text reads as a plain number (`10`, `1.5`, `.5`)
pub fn is_numeric_text(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit() || c == '.')
}
