//! Semantic analysis for macro/NC programs: scopes, symbol lookup and linting.

pub mod config;
pub mod diagnostics;
pub mod files;
pub mod lint;
pub mod scope;

#[cfg(test)]
mod test_helpers;

pub use config::{Level, LintConfiguration};
pub use diagnostics::{Diagnostic, Rule, Severity};
pub use files::{resolve_reference, FileFilter, FileRecord, FileResolver, FileStore};
pub use lint::lint;
pub use scope::{is_reference_node, Scope, Symbol, SymbolId, SymbolOrigin};
