use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{
    DeclId, Declaration, DeclarationRef, Field, FileKind, NodeData, NodeId, NodeKind, Span,
};
use crate::error::TreeError;
use crate::types::{ReferenceTypes, ValueType};

/// A parsed and annotated macro file.
///
/// Nodes live in an arena indexed by [`NodeId`]; the root is always `NodeId(0)`.
/// Declarations live in a second arena so reference nodes can point at them by
/// index instead of by link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxTree {
    source: String,
    nodes: Vec<NodeData>,
    #[serde(default)]
    declarations: Vec<Declaration>,
}

impl SyntaxTree {
    pub(crate) fn from_parts(
        source: String,
        nodes: Vec<NodeData>,
        declarations: Vec<Declaration>,
    ) -> Self {
        Self {
            source,
            nodes,
            declarations,
        }
    }

    /// Load a tree produced by an external parser
    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        let tree: SyntaxTree = serde_json::from_str(json)?;
        tree.validate()?;
        Ok(tree)
    }

    pub fn to_json(&self) -> Result<String, TreeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check the structural invariants every consumer relies on
    pub fn validate(&self) -> Result<(), TreeError> {
        let root = self.nodes.first().ok_or(TreeError::Empty)?;
        if !root.kind.is_file() {
            return Err(TreeError::RootNotFile);
        }
        if let Some(parent) = root.parent {
            return Err(TreeError::RootHasParent { parent });
        }

        let len = self.source.len();
        for (index, data) in self.nodes.iter().enumerate() {
            let id = NodeId(index);
            if data.span.start > data.span.end || data.span.end > len {
                return Err(TreeError::SpanOutOfRange {
                    node: id,
                    start: data.span.start,
                    end: data.span.end,
                    len,
                });
            }
            for &child in &data.children {
                let child_data = self
                    .nodes
                    .get(child.0)
                    .ok_or(TreeError::ChildOutOfRange { parent: id, child })?;
                if child_data.parent != Some(id) {
                    return Err(TreeError::ParentMismatch {
                        child,
                        listed: id,
                        actual: child_data.parent,
                    });
                }
            }
            if index > 0 {
                let parent = data.parent.ok_or(TreeError::NotListedByParent {
                    node: id,
                    parent: None,
                })?;
                let parent_data = self
                    .nodes
                    .get(parent.0)
                    .ok_or(TreeError::ParentOutOfRange { node: id, parent })?;
                if !parent_data.children.contains(&id) {
                    return Err(TreeError::NotListedByParent {
                        node: id,
                        parent: Some(parent),
                    });
                }
            }
            if let Some(decl) = &data.declaration {
                if decl.uri.is_none() && decl.id.0 >= self.declarations.len() {
                    return Err(TreeError::DeclarationOutOfRange {
                        node: id,
                        decl: decl.id,
                    });
                }
            }
        }
        self.check_reachable()
    }

    /// Every node must be reached once walking down from the root, which
    /// rules out cycles and nodes listed twice.
    fn check_reachable(&self) -> Result<(), TreeError> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![NodeId(0)];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.0], true) {
                return Err(TreeError::Unreachable { node: id });
            }
            stack.extend(self.nodes[id.0].children.iter().copied());
        }
        match seen.iter().position(|reached| !reached) {
            Some(index) => Err(TreeError::Unreachable {
                node: NodeId(index),
            }),
            None => Ok(()),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> Node<'_> {
        Node {
            tree: self,
            id: NodeId(0),
        }
    }

    pub fn file_kind(&self) -> FileKind {
        match self.root().kind() {
            NodeKind::File(kind) => kind,
            _ => FileKind::Definitions,
        }
    }

    /// Programs are source files; everything else is an include-only definition file
    pub fn is_program(&self) -> bool {
        self.file_kind() == FileKind::Program
    }

    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        (id.0 < self.nodes.len()).then_some(Node { tree: self, id })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn declaration(&self, id: DeclId) -> Option<&Declaration> {
        self.declarations.get(id.0)
    }

    /// Path from the root to the node at `offset`
    pub fn node_path(&self, offset: usize) -> Vec<Node<'_>> {
        let mut path = vec![self.root()];
        let mut current = self.root();
        loop {
            let mut next = None;
            let mut preceding = None;
            for child in current.children() {
                if child.span().touches(offset) {
                    next = Some(child);
                } else if child.span().end <= offset {
                    preceding = Some(child);
                }
            }
            match next {
                Some(child) => {
                    path.push(child);
                    current = child;
                }
                None => {
                    // Whitespace between children: fall back to the closest one before the offset.
                    if let Some(child) = preceding {
                        path.push(child);
                    }
                    break;
                }
            }
        }
        path
    }

    /// Innermost node containing `offset`, or the nearest preceding node
    pub fn node_at_offset(&self, offset: usize) -> Node<'_> {
        self.node_path(offset)
            .last()
            .copied()
            .unwrap_or_else(|| self.root())
    }

    pub(crate) fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }
}

/// Borrowed handle to a node of a [`SyntaxTree`]
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("span", &self.span())
            .field("text", &self.text())
            .finish()
    }
}

impl<'t> Node<'t> {
    fn data(&self) -> &'t NodeData {
        self.tree.data(self.id)
    }

    fn handle(&self, id: NodeId) -> Node<'t> {
        Node {
            tree: self.tree,
            id,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    pub fn kind(&self) -> NodeKind {
        self.data().kind
    }

    pub fn is(&self, kind: NodeKind) -> bool {
        self.kind() == kind
    }

    pub fn span(&self) -> Span {
        self.data().span
    }

    pub fn start(&self) -> usize {
        self.data().span.start
    }

    pub fn end(&self) -> usize {
        self.data().span.end
    }

    pub fn text(&self) -> &'t str {
        let span = self.span();
        self.tree.source.get(span.start..span.end).unwrap_or("")
    }

    pub fn field(&self) -> Option<Field> {
        self.data().field
    }

    pub fn parent(&self) -> Option<Node<'t>> {
        self.data().parent.map(|id| self.handle(id))
    }

    pub fn parent_kind(&self) -> Option<NodeKind> {
        self.parent().map(|p| p.kind())
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'t>> + 't {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |&id| Node { tree, id })
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    pub fn child(&self, index: usize) -> Option<Node<'t>> {
        self.data().children.get(index).map(|&id| self.handle(id))
    }

    pub fn child_by_field(&self, field: Field) -> Option<Node<'t>> {
        self.children().find(|c| c.field() == Some(field))
    }

    pub fn child_by_kind(&self, kind: NodeKind) -> Option<Node<'t>> {
        self.children().find(|c| c.kind() == kind)
    }

    /// Strict ancestors, innermost first
    pub fn ancestors(&self) -> impl Iterator<Item = Node<'t>> + 't {
        let mut current = self.parent();
        std::iter::from_fn(move || {
            let node = current?;
            current = node.parent();
            Some(node)
        })
    }

    /// This node or the closest ancestor matching `pred`
    pub fn find_ancestor(&self, pred: impl Fn(NodeKind) -> bool) -> Option<Node<'t>> {
        std::iter::once(*self)
            .chain(self.ancestors())
            .find(|n| pred(n.kind()))
    }

    pub fn find_ancestor_of(&self, kind: NodeKind) -> Option<Node<'t>> {
        self.find_ancestor(|k| k == kind)
    }

    /// Pre-order walk. The visitor returns `false` to skip a node's children.
    pub fn accept(&self, mut visitor: impl FnMut(Node<'t>) -> bool) {
        let mut stack = vec![*self];
        while let Some(node) = stack.pop() {
            if visitor(node) {
                let children = &node.data().children;
                stack.extend(children.iter().rev().map(|&id| node.handle(id)));
            }
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.data().value_type
    }

    pub fn reference_types(&self) -> ReferenceTypes {
        self.data().reference_types
    }

    pub fn declaration_ref(&self) -> Option<&'t DeclarationRef> {
        self.data().declaration.as_ref()
    }

    /// The declaration this node resolves to, when it lives in the same tree
    pub fn declaration(&self) -> Option<&'t Declaration> {
        match self.declaration_ref() {
            Some(DeclarationRef { uri: None, id }) => self.tree.declaration(*id),
            _ => None,
        }
    }
}
