//! Request entry points keyed by URI and LSP position.
//!
//! The service holds no parsed state of its own. Every request fetches the
//! current snapshot of the file from the resolver, so callers may swap files
//! between requests without notifying it.

use std::sync::{Arc, RwLock};

use serde_json::Value;
use tower_lsp::lsp_types::*;
use tracing::{debug, warn};

use macro_analyzer::{lint, FileRecord, FileResolver, Severity};

use crate::code_lens::code_lenses;
use crate::completions::get_completions;
use crate::document::LineIndex;
use crate::navigation::{find_references, get_definition, get_implementations};
use crate::rename::{prepare_rename, rename};
use crate::settings::Settings;
use crate::signature_help::{get_signature_help, SignatureTable};
use crate::symbols::{document_links, document_symbols};

pub struct LanguageService {
    files: Arc<dyn FileResolver>,
    settings: RwLock<Settings>,
    signatures: SignatureTable,
}

impl LanguageService {
    pub fn new(files: Arc<dyn FileResolver>) -> Self {
        let signatures = SignatureTable::builtin().unwrap_or_else(|e| {
            warn!("Failed to load function signatures: {e}");
            SignatureTable::default()
        });

        Self {
            files,
            settings: RwLock::new(Settings::default()),
            signatures,
        }
    }

    /// Replace the settings. Invalid settings are logged and ignored.
    pub fn update_settings(&self, value: &Value) {
        match Settings::from_value(value) {
            Ok(settings) => {
                if let Ok(mut current) = self.settings.write() {
                    *current = settings;
                }
            }
            Err(e) => warn!("Ignoring invalid settings: {e}"),
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .map(|settings| settings.clone())
            .unwrap_or_default()
    }

    /// The file snapshot and the byte offset of `position` in it
    fn locate(&self, uri: &str, position: Position) -> Option<(Arc<FileRecord>, usize)> {
        let Some(record) = self.files.get(uri) else {
            debug!("request for unknown file {uri}");
            return None;
        };
        let offset = LineIndex::new(record.tree.source()).position_to_offset(position);
        Some((record, offset))
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    pub fn diagnostics(&self, uri: &str) -> Vec<Diagnostic> {
        let Some(record) = self.files.get(uri) else {
            return Vec::new();
        };
        let config = self.settings().lint;
        let index = LineIndex::new(record.tree.source());

        lint(&record, self.files.as_ref(), &config)
            .into_iter()
            .map(|d| Diagnostic {
                range: index.range(d.span),
                severity: Some(match d.severity {
                    Severity::Error => DiagnosticSeverity::ERROR,
                    Severity::Warning => DiagnosticSeverity::WARNING,
                }),
                code: d.code.map(NumberOrString::String),
                source: Some("macro".to_string()),
                message: d.message,
                ..Default::default()
            })
            .collect()
    }

    // ========================================================================
    // Editing assistance
    // ========================================================================

    pub fn completion(&self, uri: &str, position: Position) -> Option<CompletionResponse> {
        let (record, offset) = self.locate(uri, position)?;
        let settings = self.settings();
        let list = get_completions(&record, self.files.as_ref(), offset, &settings);
        Some(CompletionResponse::List(list))
    }

    pub fn signature_help(&self, uri: &str, position: Position) -> Option<SignatureHelp> {
        let (record, offset) = self.locate(uri, position)?;
        get_signature_help(&record.tree, offset, &self.signatures)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn definition(&self, uri: &str, position: Position) -> Option<GotoDefinitionResponse> {
        let (record, offset) = self.locate(uri, position)?;
        get_definition(&record, self.files.as_ref(), offset).map(GotoDefinitionResponse::Scalar)
    }

    pub fn references(&self, uri: &str, position: Position) -> Vec<Location> {
        let Some((record, offset)) = self.locate(uri, position) else {
            return Vec::new();
        };
        find_references(&record, self.files.as_ref(), offset, None)
    }

    pub fn implementations(&self, uri: &str, position: Position) -> Vec<Location> {
        let Some((record, offset)) = self.locate(uri, position) else {
            return Vec::new();
        };
        get_implementations(&record, self.files.as_ref(), offset)
    }

    pub fn prepare_rename(&self, uri: &str, position: Position) -> Option<PrepareRenameResponse> {
        let (record, offset) = self.locate(uri, position)?;
        prepare_rename(&record, offset).map(PrepareRenameResponse::Range)
    }

    pub fn rename(&self, uri: &str, position: Position, new_name: &str) -> Option<WorkspaceEdit> {
        let (record, offset) = self.locate(uri, position)?;
        Some(rename(&record, self.files.as_ref(), offset, new_name))
    }

    // ========================================================================
    // Document features
    // ========================================================================

    pub fn document_symbols(&self, uri: &str) -> Option<DocumentSymbolResponse> {
        let record = self.files.get(uri)?;
        Some(DocumentSymbolResponse::Flat(document_symbols(
            &record,
            self.files.as_ref(),
        )))
    }

    pub fn document_links(&self, uri: &str) -> Vec<DocumentLink> {
        match self.files.get(uri) {
            Some(record) => document_links(&record, self.files.as_ref()),
            None => Vec::new(),
        }
    }

    pub fn code_lenses(&self, uri: &str) -> Vec<CodeLens> {
        match self.files.get(uri) {
            Some(record) => code_lenses(&record, self.files.as_ref()),
            None => Vec::new(),
        }
    }
}
