//! Symbol scopes over a file and its includes.
//!
//! A scope holds the declarations of one file plus the implicit symbols that
//! navigation needs (sequence numbers, macro variables and NC codes, which are
//! never declared). Child scopes are the included files, searched in include
//! order after the local scope.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use macro_syntax::{DeclId, Node, NodeId, NodeKind, ReferenceType, ReferenceTypes, ValueType};
use tracing::trace;

use crate::files::{FileRecord, FileResolver};

/// Unique identifier for a symbol within one scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub usize);

/// Where a symbol comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolOrigin {
    Declared(DeclId),
    /// First occurrence of an undeclared sequence number, variable or code
    Implicit,
}

/// A symbol in the scope
#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub origin: SymbolOrigin,
    pub reference_types: ReferenceTypes,
    pub value_type: ValueType,
    /// Declaration name node, or the first occurrence of an implicit symbol
    pub node: NodeId,
    pub uri: String,
}

impl Symbol {
    pub fn is_declared(&self) -> bool {
        matches!(self.origin, SymbolOrigin::Declared(_))
    }
}

/// Symbols of one file, with one child scope per include
#[derive(Debug)]
pub struct Scope {
    record: Arc<FileRecord>,
    symbols: Vec<Symbol>,
    /// Map from symbol name to symbol IDs, in insertion order
    by_name: HashMap<String, Vec<SymbolId>>,
    children: Vec<Scope>,
}

impl Scope {
    /// Scope of a single file without its includes
    pub fn local(record: Arc<FileRecord>) -> Self {
        let mut scope = Self {
            record,
            symbols: Vec::new(),
            by_name: HashMap::new(),
            children: Vec::new(),
        };
        scope.collect_declared();
        scope.collect_implicit();
        scope
    }

    /// Scope of a file with one child scope per resolvable include.
    ///
    /// Included files are not expanded any further, which also keeps include
    /// cycles from recursing.
    pub fn build(record: Arc<FileRecord>, files: &dyn FileResolver) -> Self {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(record.uri.clone());

        let mut children = Vec::new();
        for uri in &record.includes {
            if !visited.insert(uri.clone()) {
                continue;
            }
            match files.get(uri) {
                Some(include) => children.push(Scope::local(include)),
                None => trace!("include {uri} is not available"),
            }
        }

        let mut scope = Self::local(record);
        scope.children = children;
        scope
    }

    pub fn uri(&self) -> &str {
        &self.record.uri
    }

    pub fn record(&self) -> &Arc<FileRecord> {
        &self.record
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn children(&self) -> &[Scope] {
        &self.children
    }

    /// The scope owning a symbol found through this scope chain
    pub fn scope_of(&self, symbol: &Symbol) -> Option<&Scope> {
        std::iter::once(self)
            .chain(self.children.iter())
            .find(|scope| scope.uri() == symbol.uri)
    }

    fn define(
        &mut self,
        name: &str,
        origin: SymbolOrigin,
        reference_types: ReferenceTypes,
        value_type: ValueType,
        node: NodeId,
    ) {
        let id = SymbolId(self.symbols.len());
        self.symbols.push(Symbol {
            id,
            name: name.to_string(),
            origin,
            reference_types,
            value_type,
            node,
            uri: self.record.uri.clone(),
        });
        self.by_name.entry(name.to_string()).or_default().push(id);
    }

    fn collect_declared(&mut self) {
        let record = Arc::clone(&self.record);
        for (index, decl) in record.tree.declarations().iter().enumerate() {
            self.define(
                &decl.name,
                SymbolOrigin::Declared(DeclId(index)),
                decl.reference_types(),
                decl.value_type,
                decl.name_node.unwrap_or(decl.node),
            );
        }
    }

    fn collect_implicit(&mut self) {
        let record = Arc::clone(&self.record);
        let mut seen: HashSet<(NodeKind, &str)> = HashSet::new();
        let mut implicit = Vec::new();
        record.tree.root().accept(|node| {
            let entry = match node.kind() {
                NodeKind::Numeric if node.parent_kind() == Some(NodeKind::SequenceNumber) => {
                    Some((ReferenceTypes::JUMP_LABEL, ValueType::Sequence))
                }
                NodeKind::Variable | NodeKind::Code => Some((
                    ReferenceTypes::VARIABLE,
                    node.value_type().unwrap_or(ValueType::Undefined),
                )),
                _ => None,
            };
            if let Some((types, value_type)) = entry {
                if seen.insert((node.kind(), node.text())) {
                    implicit.push((node.text(), types, value_type, node.id()));
                }
            }
            true
        });
        for (name, types, value_type, node) in implicit {
            self.define(name, SymbolOrigin::Implicit, types, value_type, node);
        }
    }

    /// Declared symbols of this scope and its children carrying `reference_type`
    /// whose value type is in `value_types`, or any value type when `None`
    pub fn find_symbols(
        &self,
        reference_type: ReferenceType,
        value_types: Option<&[ValueType]>,
    ) -> Vec<&Symbol> {
        let mut found: Vec<&Symbol> = self
            .symbols
            .iter()
            .filter(|s| s.is_declared() && s.reference_types.contains(reference_type.into()))
            .filter(|s| value_types.map_or(true, |types| types.contains(&s.value_type)))
            .collect();
        for child in &self.children {
            found.extend(child.find_symbols(reference_type, value_types));
        }
        found
    }

    fn lookup_local(&self, name: &str, types: ReferenceTypes) -> Option<&Symbol> {
        let ids = self.by_name.get(name)?;
        ids.iter()
            .map(|id| &self.symbols[id.0])
            .find(|s| types.is_empty() || s.reference_types.intersects(types))
    }

    /// Resolve a reference node by name, local scope first, then includes in order
    pub fn find_symbol_from_node(&self, node: Node<'_>) -> Option<&Symbol> {
        if !is_reference_node(node) {
            return None;
        }
        let name = node.text();
        let types = node.reference_types();
        self.lookup_local(name, types).or_else(|| {
            self.children
                .iter()
                .find_map(|child| child.lookup_local(name, types))
        })
    }

    /// Whether `candidate` is a use or declaration of `symbol`
    pub fn matches_symbol(candidate: Node<'_>, symbol: &Symbol) -> bool {
        if !is_reference_node(candidate) || candidate.text() != symbol.name {
            return false;
        }
        let types = candidate.reference_types();
        types.is_empty() || types.intersects(symbol.reference_types)
    }
}

/// Nodes that can name a symbol
pub fn is_reference_node(node: Node<'_>) -> bool {
    match node.kind() {
        NodeKind::Symbol | NodeKind::Label | NodeKind::Variable | NodeKind::Code => true,
        NodeKind::Numeric => matches!(
            node.parent_kind(),
            Some(NodeKind::Goto | NodeKind::SequenceNumber)
        ),
        _ => false,
    }
}
