use thiserror::Error;

use crate::ast::{DeclId, NodeId};

/// Reasons a serialized tree is rejected
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("invalid tree json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tree has no nodes")]
    Empty,

    #[error("root node must be a file node")]
    RootNotFile,

    #[error("node {parent:?} lists child {child:?}, which does not exist")]
    ChildOutOfRange { parent: NodeId, child: NodeId },

    #[error("node {child:?} is listed under {listed:?} but its parent is {actual:?}")]
    ParentMismatch {
        child: NodeId,
        listed: NodeId,
        actual: Option<NodeId>,
    },

    #[error("root node must not have a parent, found {parent:?}")]
    RootHasParent { parent: NodeId },

    #[error("node {node:?} has parent {parent:?}, which does not exist")]
    ParentOutOfRange { node: NodeId, parent: NodeId },

    #[error("node {node:?} names {parent:?} as parent but is not among its children")]
    NotListedByParent { node: NodeId, parent: Option<NodeId> },

    #[error("node {node:?} is not reachable from the root exactly once")]
    Unreachable { node: NodeId },

    #[error("span {start}..{end} of node {node:?} is outside the source (length {len})")]
    SpanOutOfRange {
        node: NodeId,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("node {node:?} refers to unknown declaration {decl:?}")]
    DeclarationOutOfRange { node: NodeId, decl: DeclId },
}
