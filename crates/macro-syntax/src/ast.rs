use serde::{Deserialize, Serialize};

use crate::types::{ReferenceTypes, ValueType};

/// Span representing a range in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inclusive on both ends, so a cursor right after a token still touches it.
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

/// Index of a node in its tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Index of a declaration in its tree's declaration arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub usize);

/// What a file is for: executable programs or include-only definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Program,
    Definitions,
}

/// Closed set of node kinds produced by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    File(FileKind),
    Include,
    /// A numbered or symbolic program (`O1000 ... M99`)
    Function,
    Statement,
    /// `@NAME value`
    VariableDef,
    /// `>NAME value`
    LabelDef,
    /// Identifier referencing a variable declaration
    Symbol,
    /// Macro variable (`#100`) or a symbol resolved to one
    Variable,
    /// Identifier referencing a label declaration
    Label,
    Numeric,
    String,
    /// `N<number>` at the start of a statement
    SequenceNumber,
    Goto,
    If,
    Then,
    Else,
    While,
    Assignment,
    BinaryExpr,
    ConditionalExpr,
    Operator,
    /// Address word with a value (`X10.`, `F#1`)
    Parameter,
    /// NC code (`G01`, `M03`)
    Code,
    /// `/` block skip
    BlockSkip,
    /// Built-in function call (`SIN[...]`)
    Call,
    CallParam,
    /// Built-in command statement (`POPEN`, `DPRNT[...]`)
    Command,
    Other,
}

impl NodeKind {
    pub fn is_file(&self) -> bool {
        matches!(self, NodeKind::File(_))
    }

    pub fn is_declaration(&self) -> bool {
        matches!(self, NodeKind::VariableDef | NodeKind::LabelDef)
    }
}

/// Role of a node inside its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Name,
    Value,
    Uri,
    Number,
    /// Jump target of a goto
    Label,
    Condition,
    /// Logic operator joining a conditional to the next one
    Logic,
    Next,
    DoLabel,
    EndLabel,
    Target,
    Then,
    Else,
    Body,
}

/// Non-owning link from a reference node to the declaration it resolves to.
///
/// `uri == None` means the declaration lives in the same tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclarationRef {
    #[serde(default)]
    pub uri: Option<String>,
    pub id: DeclId,
}

impl DeclarationRef {
    pub fn local(id: DeclId) -> Self {
        Self { uri: None, id }
    }

    pub fn external(uri: impl Into<String>, id: DeclId) -> Self {
        Self {
            uri: Some(uri.into()),
            id,
        }
    }
}

/// One arena slot of the syntax tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    pub kind: NodeKind,
    pub span: Span,
    #[serde(default)]
    pub field: Option<Field>,
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub value_type: Option<ValueType>,
    #[serde(default)]
    pub reference_types: ReferenceTypes,
    #[serde(default)]
    pub declaration: Option<DeclarationRef>,
}

impl NodeData {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self {
            kind,
            span,
            field: None,
            parent: None,
            children: Vec::new(),
            value_type: None,
            reference_types: ReferenceTypes::empty(),
            declaration: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclarationKind {
    Variable,
    Label,
}

/// A `@` variable or `>` label definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    /// The `VariableDef`/`LabelDef` node
    pub node: NodeId,
    pub name_node: Option<NodeId>,
    pub value_node: Option<NodeId>,
    pub value_text: Option<String>,
    pub value_type: ValueType,
}

impl Declaration {
    pub fn reference_types(&self) -> ReferenceTypes {
        match self.kind {
            DeclarationKind::Variable => ReferenceTypes::VARIABLE,
            DeclarationKind::Label => ReferenceTypes::LABEL,
        }
    }

    pub fn value(&self) -> Option<&str> {
        self.value_text.as_deref()
    }
}
