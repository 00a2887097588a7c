//! Rename support built on reference search.

use std::collections::HashMap;
use std::sync::Arc;

use tower_lsp::lsp_types::{Range, TextEdit, Url, WorkspaceEdit};

use macro_analyzer::{FileRecord, FileResolver};
use macro_syntax::{Field, NodeKind};

use crate::document::LineIndex;
use crate::navigation::find_references;

/// Range of the renameable name at `offset`, if there is one
pub fn prepare_rename(record: &FileRecord, offset: usize) -> Option<Range> {
    let node = record.tree.node_at_offset(offset);
    let node = node
        .find_ancestor(|k| matches!(k, NodeKind::Symbol | NodeKind::Label))
        .or_else(|| {
            node.find_ancestor(|k| {
                matches!(
                    k,
                    NodeKind::Variable | NodeKind::Code | NodeKind::SequenceNumber
                )
            })
        })
        .unwrap_or(node);

    let target = match node.kind() {
        NodeKind::Variable
        | NodeKind::Code
        | NodeKind::Numeric
        | NodeKind::Label
        | NodeKind::Symbol => node,
        NodeKind::SequenceNumber => node
            .child_by_field(Field::Number)
            .or_else(|| node.child(0))?,
        _ => return None,
    };
    Some(LineIndex::new(record.tree.source()).range(target.span()))
}

/// Replace every reference of the symbol at `offset` with `new_name`.
///
/// Collisions with existing names are not checked.
pub fn rename(
    record: &Arc<FileRecord>,
    files: &dyn FileResolver,
    offset: usize,
    new_name: &str,
) -> WorkspaceEdit {
    let mut changes: HashMap<Url, Vec<TextEdit>> = HashMap::new();
    for location in find_references(record, files, offset, None) {
        changes
            .entry(location.uri)
            .or_default()
            .push(TextEdit::new(location.range, new_name.to_string()));
    }
    WorkspaceEdit {
        changes: Some(changes),
        ..Default::default()
    }
}
