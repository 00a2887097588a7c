//! Navigation providers: definition, references and implementations.
//!
//! Every request resolves the node under the cursor against fresh scopes.
//! The file that declares the symbol (the origin) decides which other files
//! are searched for uses.

use std::sync::Arc;

use tower_lsp::lsp_types::{Location, Url};
use tracing::trace;

use macro_analyzer::{FileFilter, FileRecord, FileResolver, Scope};
use macro_syntax::{Node, NodeKind, ReferenceType, Span};

use crate::document::LineIndex;

// ============================================================================
// Public API
// ============================================================================

/// Declaration of the symbol at `offset`, searching the file itself, then its
/// includes in order.
pub fn get_definition(
    record: &Arc<FileRecord>,
    files: &dyn FileResolver,
    offset: usize,
) -> Option<Location> {
    let node = record.tree.node_at_offset(offset);
    let node = node.find_ancestor(is_named).unwrap_or(node);

    for candidate in search_order(record, files) {
        let scope = Scope::local(Arc::clone(&candidate));
        if let Some(symbol) = scope.find_symbol_from_node(node) {
            let span = candidate.tree.node(symbol.node)?.span();
            return location(&candidate, &LineIndex::new(candidate.tree.source()), span);
        }
    }
    None
}

/// Every use of the symbol at `offset`, declarations included.
///
/// With `implementation` set, uses tagged with other reference types are
/// skipped; untagged uses are always kept.
pub fn find_references(
    record: &Arc<FileRecord>,
    files: &dyn FileResolver,
    offset: usize,
    implementation: Option<ReferenceType>,
) -> Vec<Location> {
    let node = reference_node_at(record, offset);

    let Some(origin) = find_origin(record, files, node) else {
        trace!("no declaration for {:?}", node.text());
        return Vec::new();
    };
    let scope = Scope::local(Arc::clone(&origin));
    let Some(symbol) = scope.find_symbol_from_node(node) else {
        return Vec::new();
    };

    let targets: Vec<Arc<FileRecord>> = match node.kind() {
        NodeKind::Variable | NodeKind::Code => files.get_all(&FileFilter::AllFiles),
        NodeKind::Numeric if is_jump_number(node) => vec![Arc::clone(&origin)],
        NodeKind::Label | NodeKind::Symbol => {
            let mut targets = Vec::new();
            if !origin.is_program() {
                targets.extend(
                    files
                        .get_all(&FileFilter::SourceFiles)
                        .into_iter()
                        .filter(|file| file.includes(&origin.uri)),
                );
            }
            targets.push(Arc::clone(&origin));
            targets
        }
        _ => return Vec::new(),
    };

    let mut locations = Vec::new();
    for file in targets {
        let index = LineIndex::new(file.tree.source());
        file.tree.root().accept(|candidate| {
            if !Scope::matches_symbol(candidate, symbol) {
                return true;
            }
            let types = candidate.reference_types();
            let wanted = match implementation {
                Some(kind) if !types.is_empty() => types.contains(kind.into()),
                _ => true,
            };
            if wanted {
                locations.extend(location(&file, &index, candidate.span()));
            }
            // Uses do not nest.
            false
        });
    }
    locations
}

/// Program headers for a program symbol, jump uses for a label or jump number
pub fn get_implementations(
    record: &Arc<FileRecord>,
    files: &dyn FileResolver,
    offset: usize,
) -> Vec<Location> {
    let node = record.tree.node_at_offset(offset);
    let node = node.find_ancestor(is_named).unwrap_or(node);

    let kind = match node.kind() {
        NodeKind::Symbol => ReferenceType::Program,
        NodeKind::Label => ReferenceType::JumpLabel,
        NodeKind::Numeric if node.parent_kind() == Some(NodeKind::Goto) => {
            ReferenceType::JumpLabel
        }
        _ => return Vec::new(),
    };
    find_references(record, files, offset, Some(kind))
}

// ============================================================================
// Helpers
// ============================================================================

fn is_named(kind: NodeKind) -> bool {
    matches!(kind, NodeKind::Symbol | NodeKind::Label)
}

fn is_jump_number(node: Node<'_>) -> bool {
    matches!(
        node.parent_kind(),
        Some(NodeKind::Goto | NodeKind::SequenceNumber)
    )
}

/// The node a reference request is about: an enclosing symbol or label,
/// else an enclosing variable or NC code, else the node itself
pub(crate) fn reference_node_at(record: &FileRecord, offset: usize) -> Node<'_> {
    let node = record.tree.node_at_offset(offset);
    node.find_ancestor(is_named)
        .or_else(|| node.find_ancestor(|k| matches!(k, NodeKind::Variable | NodeKind::Code)))
        .unwrap_or(node)
}

/// The file itself, then its resolvable includes
fn search_order(record: &Arc<FileRecord>, files: &dyn FileResolver) -> Vec<Arc<FileRecord>> {
    let mut order = vec![Arc::clone(record)];
    order.extend(
        record
            .includes
            .iter()
            .filter(|uri| **uri != record.uri)
            .filter_map(|uri| files.get(uri)),
    );
    order
}

/// First file in search order whose own scope declares the node's symbol
fn find_origin(
    record: &Arc<FileRecord>,
    files: &dyn FileResolver,
    node: Node<'_>,
) -> Option<Arc<FileRecord>> {
    search_order(record, files)
        .into_iter()
        .find(|candidate| {
            Scope::local(Arc::clone(candidate))
                .find_symbol_from_node(node)
                .is_some()
        })
}

pub(crate) fn location(record: &FileRecord, index: &LineIndex, span: Span) -> Option<Location> {
    let uri = Url::parse(&record.uri).ok()?;
    Some(Location::new(uri, index.range(span)))
}
