use std::collections::HashMap;

use crate::ast::{
    DeclId, Declaration, DeclarationKind, DeclarationRef, Field, FileKind, NodeData, NodeId,
    NodeKind, Span,
};
use crate::tree::SyntaxTree;
use crate::types::{ReferenceType, ReferenceTypes, ValueType};

/// Incremental construction of a [`SyntaxTree`].
///
/// Text is appended as it is consumed: `token` adds a leaf, `trivia` adds text
/// that belongs to the enclosing node without becoming a node itself.
/// `start`/`finish` bracket inner nodes.
///
/// ```
/// use macro_syntax::{FileKind, NodeKind, Field, TreeBuilder};
///
/// let mut b = TreeBuilder::new(FileKind::Definitions);
/// b.start(NodeKind::VariableDef);
/// b.trivia("@");
/// b.token_field(NodeKind::Symbol, Field::Name, "RADIUS");
/// b.trivia(" ");
/// b.token_field(NodeKind::Variable, Field::Value, "#100");
/// b.finish();
/// let tree = b.build();
/// assert_eq!(tree.declarations()[0].name, "RADIUS");
/// ```
#[derive(Debug)]
pub struct TreeBuilder {
    source: String,
    nodes: Vec<NodeData>,
    stack: Vec<NodeId>,
}

impl TreeBuilder {
    pub fn new(kind: FileKind) -> Self {
        Self {
            source: String::new(),
            nodes: vec![NodeData::new(NodeKind::File(kind), Span::new(0, 0))],
            stack: vec![NodeId(0)],
        }
    }

    /// Current end of the accumulated source
    pub fn offset(&self) -> usize {
        self.source.len()
    }

    fn push(&mut self, kind: NodeKind, field: Option<Field>, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = self.stack.last().copied().unwrap_or(NodeId(0));
        let mut data = NodeData::new(kind, span);
        data.field = field;
        data.parent = Some(parent);
        self.nodes.push(data);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn start(&mut self, kind: NodeKind) -> NodeId {
        let offset = self.offset();
        let id = self.push(kind, None, Span::new(offset, offset));
        self.stack.push(id);
        id
    }

    pub fn start_field(&mut self, kind: NodeKind, field: Field) -> NodeId {
        let id = self.start(kind);
        self.nodes[id.0].field = Some(field);
        id
    }

    /// Close the innermost open node. Trailing whitespace is not part of its span.
    pub fn finish(&mut self) -> NodeId {
        if self.stack.len() <= 1 {
            return NodeId(0);
        }
        let id = self.stack.pop().unwrap_or(NodeId(0));
        let start = self.nodes[id.0].span.start;
        let end = start + self.source[start..].trim_end().len();
        self.nodes[id.0].span.end = end;
        id
    }

    pub fn token(&mut self, kind: NodeKind, text: &str) -> NodeId {
        let start = self.offset();
        self.source.push_str(text);
        self.push(kind, None, Span::new(start, self.offset()))
    }

    pub fn token_field(&mut self, kind: NodeKind, field: Field, text: &str) -> NodeId {
        let id = self.token(kind, text);
        self.nodes[id.0].field = Some(field);
        id
    }

    pub fn trivia(&mut self, text: &str) {
        self.source.push_str(text);
    }

    pub fn set_value_type(&mut self, id: NodeId, value_type: ValueType) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.value_type = Some(value_type);
        }
        self
    }

    pub fn set_reference_types(&mut self, id: NodeId, types: ReferenceTypes) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.reference_types = types;
        }
        self
    }

    /// Point a node at a declaration, typically one that lives in another file
    pub fn set_declaration(&mut self, id: NodeId, declaration: DeclarationRef) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.declaration = Some(declaration);
        }
        self
    }

    pub fn newline(&mut self) {
        self.trivia("\n");
    }

    /// `$INCLUDE <uri>`
    pub fn include(&mut self, uri: &str) -> NodeId {
        let id = self.start(NodeKind::Include);
        self.trivia("$INCLUDE ");
        self.token_field(NodeKind::String, Field::Uri, uri);
        self.finish();
        id
    }

    /// `@<name> <value>`
    pub fn variable_def(&mut self, name: &str, value: &str, value_type: ValueType) -> NodeId {
        self.definition(NodeKind::VariableDef, "@", NodeKind::Symbol, name, value, value_type)
    }

    /// `><name> <value>`
    pub fn label_def(&mut self, name: &str, value: &str, value_type: ValueType) -> NodeId {
        self.definition(NodeKind::LabelDef, ">", NodeKind::Label, name, value, value_type)
    }

    fn definition(
        &mut self,
        kind: NodeKind,
        marker: &str,
        name_kind: NodeKind,
        name: &str,
        value: &str,
        value_type: ValueType,
    ) -> NodeId {
        let id = self.start(kind);
        self.trivia(marker);
        self.token_field(name_kind, Field::Name, name);
        self.trivia(" ");
        let value_kind = match value_type {
            ValueType::Variable => NodeKind::Variable,
            ValueType::NcCode => NodeKind::Code,
            ValueType::Address => NodeKind::Parameter,
            ValueType::String => NodeKind::String,
            _ => NodeKind::Numeric,
        };
        let value = self.token_field(value_kind, Field::Value, value);
        self.set_value_type(value, value_type);
        self.finish();
        id
    }

    /// Close any open nodes, then run the annotation pass
    pub fn build(mut self) -> SyntaxTree {
        while self.stack.len() > 1 {
            self.finish();
        }
        self.nodes[0].span = Span::new(0, self.source.len());

        let declarations = self.collect_declarations();
        self.link_references(&declarations);
        self.fill_reference_types(&declarations);

        SyntaxTree::from_parts(self.source, self.nodes, declarations)
    }

    fn text(&self, id: NodeId) -> &str {
        let span = self.nodes[id.0].span;
        self.source.get(span.start..span.end).unwrap_or("")
    }

    fn child_with_field(&self, id: NodeId, field: Field, fallback: usize) -> Option<NodeId> {
        let children = &self.nodes[id.0].children;
        children
            .iter()
            .copied()
            .find(|c| self.nodes[c.0].field == Some(field))
            .or_else(|| children.get(fallback).copied())
    }

    fn collect_declarations(&mut self) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        for index in 0..self.nodes.len() {
            let kind = match self.nodes[index].kind {
                NodeKind::VariableDef => DeclarationKind::Variable,
                NodeKind::LabelDef => DeclarationKind::Label,
                _ => continue,
            };
            let node = NodeId(index);
            let name_node = self.child_with_field(node, Field::Name, 0);
            let value_node = self
                .child_with_field(node, Field::Value, 1)
                .filter(|v| Some(*v) != name_node);
            let Some(name) = name_node.map(|n| self.text(n).to_string()) else {
                continue;
            };
            let value_text = value_node.map(|v| self.text(v).to_string());
            let value_type = value_node
                .and_then(|v| self.nodes[v.0].value_type)
                .or(self.nodes[index].value_type)
                .unwrap_or(ValueType::Undefined);

            let id = DeclId(declarations.len());
            let decl = Declaration {
                kind,
                name,
                node,
                name_node,
                value_node,
                value_text,
                value_type,
            };
            for target in std::iter::once(node).chain(name_node) {
                let data = &mut self.nodes[target.0];
                data.declaration.get_or_insert(DeclarationRef::local(id));
                if data.reference_types.is_empty() {
                    data.reference_types = decl.reference_types();
                }
                data.value_type.get_or_insert(value_type);
            }
            declarations.push(decl);
        }
        declarations
    }

    fn link_references(&mut self, declarations: &[Declaration]) {
        let mut variables: HashMap<&str, DeclId> = HashMap::new();
        let mut labels: HashMap<&str, DeclId> = HashMap::new();
        for (index, decl) in declarations.iter().enumerate() {
            let table = match decl.kind {
                DeclarationKind::Variable => &mut variables,
                DeclarationKind::Label => &mut labels,
            };
            table.entry(decl.name.as_str()).or_insert(DeclId(index));
        }

        for index in 0..self.nodes.len() {
            let (preferred, other) = match self.nodes[index].kind {
                NodeKind::Symbol => (&variables, &labels),
                NodeKind::Label => (&labels, &variables),
                _ => continue,
            };
            if self.nodes[index].declaration.is_some() {
                continue;
            }
            let text = self.text(NodeId(index));
            let found = preferred.get(text).or_else(|| other.get(text)).copied();
            if let Some(id) = found {
                let data = &mut self.nodes[index];
                data.declaration = Some(DeclarationRef::local(id));
                if data.value_type.is_none() {
                    data.value_type = Some(declarations[id.0].value_type);
                }
            }
        }
    }

    fn fill_reference_types(&mut self, declarations: &[Declaration]) {
        for index in 0..self.nodes.len() {
            if !self.nodes[index].reference_types.is_empty() {
                continue;
            }
            let data = &self.nodes[index];
            let parent = data.parent.map(|p| self.nodes[p.0].kind);
            let resolved = match &data.declaration {
                Some(DeclarationRef { uri: None, id }) => {
                    declarations.get(id.0).map(|d| d.reference_types())
                }
                _ => None,
            };
            let types = match data.kind {
                NodeKind::Symbol => {
                    let base = resolved.unwrap_or(ReferenceTypes::VARIABLE);
                    if parent == Some(NodeKind::Function) && data.field == Some(Field::Name) {
                        base.with(ReferenceType::Program)
                    } else {
                        base
                    }
                }
                NodeKind::Label => {
                    let base = resolved.unwrap_or(ReferenceTypes::LABEL);
                    if parent == Some(NodeKind::Goto) {
                        base.with(ReferenceType::JumpLabel)
                    } else {
                        base
                    }
                }
                NodeKind::Variable | NodeKind::Code => ReferenceTypes::VARIABLE,
                NodeKind::Numeric
                    if matches!(parent, Some(NodeKind::Goto | NodeKind::SequenceNumber)) =>
                {
                    ReferenceTypes::JUMP_LABEL
                }
                _ => continue,
            };
            self.nodes[index].reference_types = types;
        }
    }
}
