//! Language features for macro/NC programs.
//!
//! This crate answers editor requests on top of `macro-analyzer`:
//! - Diagnostics (lint findings)
//! - Completions
//! - Signature help for built-in functions
//! - Go to definition and implementations
//! - Find references and rename
//! - Document symbols and include links
//! - Reference count code lenses

mod code_lens;
pub mod completions;
pub mod document;
pub mod navigation;
mod rename;
pub mod service;
pub mod settings;
pub mod signature_help;
mod symbols;

#[cfg(test)]
mod test_helpers;

pub use code_lens::REFERENCES_COMMAND;
pub use service::LanguageService;
pub use settings::Settings;
