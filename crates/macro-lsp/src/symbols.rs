//! Document symbols and include links.

use std::sync::Arc;

use tower_lsp::lsp_types::*;

use macro_analyzer::{FileRecord, FileResolver, Scope, SymbolOrigin};
use macro_syntax::{Field, Node, NodeKind, ValueType};

use crate::document::LineIndex;

// ============================================================================
// Document symbols
// ============================================================================

/// Flat outline of a file in document order
pub fn document_symbols(
    record: &Arc<FileRecord>,
    files: &dyn FileResolver,
) -> Vec<SymbolInformation> {
    let Ok(uri) = Url::parse(&record.uri) else {
        return Vec::new();
    };
    let scope = Scope::build(Arc::clone(record), files);
    let index = LineIndex::new(record.tree.source());
    let mut symbols = Vec::new();

    record.tree.root().accept(|node| {
        if let Some((name, kind)) = outline_entry(node, &scope) {
            #[allow(deprecated)]
            symbols.push(SymbolInformation {
                name,
                kind,
                tags: None,
                deprecated: None,
                location: Location::new(uri.clone(), index.range(node.span())),
                container_name: None,
            });
        }
        true
    });
    symbols
}

fn outline_entry(node: Node<'_>, scope: &Scope) -> Option<(String, SymbolKind)> {
    let parent = node.parent_kind();
    let entry = match node.kind() {
        NodeKind::VariableDef => (node.declaration()?.name.clone(), SymbolKind::VARIABLE),
        NodeKind::LabelDef => (node.declaration()?.name.clone(), SymbolKind::CONSTANT),
        NodeKind::BlockSkip => (node.text().to_string(), SymbolKind::FIELD),
        NodeKind::Function => (function_name(node, scope)?, SymbolKind::FUNCTION),
        NodeKind::SequenceNumber => {
            let number = node
                .child_by_field(Field::Number)
                .or_else(|| node.child(0))?;
            let jump_label = number.kind() == NodeKind::Label
                && matches!(parent, Some(NodeKind::Function | NodeKind::Goto))
                && number.value_type() == Some(ValueType::Numeric);
            if jump_label {
                (number.text().to_string(), SymbolKind::CONSTANT)
            } else if node.child_count() > 1 && parent != Some(NodeKind::BlockSkip) {
                (node.text().to_string(), SymbolKind::FIELD)
            } else {
                return None;
            }
        }
        NodeKind::Statement => {
            if node.child_count() <= 1
                || matches!(parent, Some(NodeKind::SequenceNumber | NodeKind::BlockSkip))
            {
                return None;
            }
            let kind = match node.child(0).map(|c| c.kind()) {
                Some(NodeKind::Code) => SymbolKind::EVENT,
                _ => SymbolKind::PROPERTY,
            };
            (node.text().to_string(), kind)
        }
        NodeKind::Goto => (node.text().to_string(), SymbolKind::EVENT),
        NodeKind::Command => {
            let ident = node
                .child_by_field(Field::Name)
                .or_else(|| node.child(0))
                .unwrap_or(node);
            (ident.text().to_string(), SymbolKind::EVENT)
        }
        NodeKind::Code => (node.text().to_string(), SymbolKind::EVENT),
        NodeKind::Parameter => {
            let kind = if node.value_type() == Some(ValueType::Address) {
                SymbolKind::INTERFACE
            } else {
                SymbolKind::PROPERTY
            };
            (node.text().to_string(), kind)
        }
        _ => return None,
    };
    Some(entry)
}

/// `NAME (value)` for a declared program symbol, `O<number>` otherwise
fn function_name(node: Node<'_>, scope: &Scope) -> Option<String> {
    let ident = node.child_by_field(Field::Name).or_else(|| node.child(0))?;
    let declared = match ident.declaration() {
        Some(decl) => Some((decl.name.clone(), decl.value_text.clone())),
        None => included_declaration(ident, scope),
    };
    let name = match declared {
        Some((name, value)) => format!("{name} ({})", value.unwrap_or_default()),
        None => format!("O{}", ident.text()),
    };
    Some(name)
}

/// Name and value of a declaration found through the include scopes
fn included_declaration(ident: Node<'_>, scope: &Scope) -> Option<(String, Option<String>)> {
    let symbol = scope.find_symbol_from_node(ident)?;
    let SymbolOrigin::Declared(id) = symbol.origin else {
        return None;
    };
    let decl = scope.scope_of(symbol)?.record().tree.declaration(id)?;
    Some((decl.name.clone(), decl.value_text.clone()))
}

// ============================================================================
// Document links
// ============================================================================

/// One link per include statement, pointing at the resolved file
pub fn document_links(record: &FileRecord, files: &dyn FileResolver) -> Vec<DocumentLink> {
    let index = LineIndex::new(record.tree.source());
    let mut links = Vec::new();

    record.tree.root().accept(|node| {
        if node.kind() != NodeKind::Include {
            return true;
        }
        let Some(uri) = node.child_by_field(Field::Uri).or_else(|| node.child(0)) else {
            return false;
        };
        if uri.span().is_empty() {
            return false;
        }
        let target = files.resolve_reference(uri.text(), &record.uri);
        links.push(DocumentLink {
            range: index.range(uri.span()),
            target: Url::parse(&target).ok(),
            tooltip: None,
            data: None,
        });
        false
    });
    links
}
