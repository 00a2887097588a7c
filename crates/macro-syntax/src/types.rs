//! Semantic tags attached to nodes by the annotation pass.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Semantic kind of a declared value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Numeric,
    Constant,
    Variable,
    Address,
    NcCode,
    String,
    Sequence,
    Undefined,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Numeric => "numeric",
            ValueType::Constant => "constant",
            ValueType::Variable => "variable",
            ValueType::Address => "address",
            ValueType::NcCode => "nccode",
            ValueType::String => "string",
            ValueType::Sequence => "sequence",
            ValueType::Undefined => "undefined",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a symbol use functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceType {
    Variable,
    Label,
    Program,
    JumpLabel,
}

bitflags! {
    /// Set of reference types
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ReferenceTypes: u8 {
        const VARIABLE = 1 << 0;
        const LABEL = 1 << 1;
        const PROGRAM = 1 << 2;
        const JUMP_LABEL = 1 << 3;
    }
}

impl ReferenceTypes {
    pub fn of(types: &[ReferenceType]) -> Self {
        types.iter().fold(Self::empty(), |set, ty| set.with(*ty))
    }

    pub fn with(self, ty: ReferenceType) -> Self {
        self | Self::from(ty)
    }
}

impl Default for ReferenceTypes {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<ReferenceType> for ReferenceTypes {
    fn from(ty: ReferenceType) -> Self {
        match ty {
            ReferenceType::Variable => Self::VARIABLE,
            ReferenceType::Label => Self::LABEL,
            ReferenceType::Program => Self::PROGRAM,
            ReferenceType::JumpLabel => Self::JUMP_LABEL,
        }
    }
}
