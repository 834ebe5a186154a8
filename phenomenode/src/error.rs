// error.rs — Crate-wide error type
//
// Every fallible operation in the crate returns `Result<T, Error>`. Variants
// are grouped into the five categories callers match on (`ErrorKind`), and
// each variant carries a stable code in the style of `E0101`.
//
// Codes are never reassigned to a different meaning:
//   E01xx  configuration (kind/tag declaration)
//   E02xx  registry scope discipline
//   E03xx  context addressing
//   E04xx  type / handle errors
//   E05xx  structural integrity (runtime)

use thiserror::Error;

use crate::gate::Role;
use crate::id::{NodeId, VarNodeId};

pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    RegistryUnderflow,
    DuplicateContext,
    Type,
    Runtime,
}

#[derive(Debug, Error)]
pub enum Error {
    /// Kind declaration with a malformed tag or name.
    #[error("invalid kind declaration '{name}' with tag {tag:?}: {reason}")]
    InvalidKind {
        name: String,
        tag: char,
        reason: &'static str,
    },

    /// Tag collision at kind-registration time.
    #[error("tag '{tag}' requested by '{requested}' is already declared by '{existing}'")]
    DuplicateTag {
        tag: char,
        existing: &'static str,
        requested: String,
    },

    #[error("kind '{name}' (tag '{tag}') was never declared")]
    UndeclaredKind { name: &'static str, tag: char },

    #[error("registry level closed without a matching open")]
    RegistryUnderflow,

    #[error("context segment {segment} is already present in ({stack})")]
    DuplicateContext { segment: String, stack: String },

    #[error("{found} is not a varnode of this model ({role} of {node})")]
    NotAVarNode {
        found: VarNodeId,
        node: String,
        role: Role,
    },

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("unknown varnode {0}")]
    UnknownVarNode(VarNodeId),

    #[error("cannot undock {varnode} from {node}: connection is sealed")]
    SealedConnection { varnode: VarNodeId, node: NodeId },

    #[error("{varnode} is referenced more than once in the {role} of {node}")]
    AliasedVarNode {
        varnode: VarNodeId,
        node: String,
        role: Role,
    },

    #[error("{role} index {index} out of range for {node} ({len} entries)")]
    GateIndex {
        node: NodeId,
        role: Role,
        index: usize,
        len: usize,
    },

    #[error("scoped node {node} must start with empty gates and no children")]
    ScopedNodeNotEmpty { node: String },

    #[error("scoped node {node} was given gates or children before exit")]
    ScopedNodeModified { node: NodeId },

    #[error("{node} is not the innermost open scope")]
    ScopeMismatch { node: NodeId },

    #[error("{node} is not under construction")]
    NotUnderConstruction { node: NodeId },

    #[error("{node} is not sealed; its variables are not contextualized yet")]
    NotSealed { node: NodeId },

    #[error("the {role} of {node} carry different variables and cannot form a family")]
    MixedFamily { node: NodeId, role: Role },

    /// New entries on a node that is part of a sealed tree.
    #[error("cannot add {role} to {node}: {reason}")]
    SealedGate {
        node: NodeId,
        role: Role,
        reason: &'static str,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidKind { .. } | Error::DuplicateTag { .. } | Error::UndeclaredKind { .. } => {
                ErrorKind::Configuration
            }
            Error::RegistryUnderflow => ErrorKind::RegistryUnderflow,
            Error::DuplicateContext { .. } => ErrorKind::DuplicateContext,
            Error::NotAVarNode { .. } | Error::UnknownNode(_) | Error::UnknownVarNode(_) => {
                ErrorKind::Type
            }
            Error::SealedConnection { .. }
            | Error::AliasedVarNode { .. }
            | Error::GateIndex { .. }
            | Error::ScopedNodeNotEmpty { .. }
            | Error::ScopedNodeModified { .. }
            | Error::ScopeMismatch { .. }
            | Error::NotUnderConstruction { .. }
            | Error::NotSealed { .. }
            | Error::MixedFamily { .. }
            | Error::SealedGate { .. } => ErrorKind::Runtime,
        }
    }

    /// Stable diagnostic code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidKind { .. } => "E0101",
            Error::DuplicateTag { .. } => "E0102",
            Error::UndeclaredKind { .. } => "E0103",
            Error::RegistryUnderflow => "E0201",
            Error::DuplicateContext { .. } => "E0301",
            Error::NotAVarNode { .. } => "E0401",
            Error::UnknownNode(_) => "E0402",
            Error::UnknownVarNode(_) => "E0403",
            Error::SealedConnection { .. } => "E0501",
            Error::AliasedVarNode { .. } => "E0502",
            Error::GateIndex { .. } => "E0503",
            Error::ScopedNodeNotEmpty { .. } => "E0504",
            Error::ScopedNodeModified { .. } => "E0505",
            Error::ScopeMismatch { .. } => "E0506",
            Error::NotUnderConstruction { .. } => "E0507",
            Error::NotSealed { .. } => "E0508",
            Error::MixedFamily { .. } => "E0509",
            Error::SealedGate { .. } => "E0510",
        }
    }

    /// Only duplicate context items are recoverable by the caller; every
    /// other error means the subtree under construction must be rebuilt.
    pub fn is_fatal(&self) -> bool {
        self.kind() != ErrorKind::DuplicateContext
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_underflow() {
        let e = Error::RegistryUnderflow;
        assert_eq!(
            format!("{e}"),
            "registry level closed without a matching open"
        );
        assert_eq!(e.code(), "E0201");
        assert_eq!(e.kind(), ErrorKind::RegistryUnderflow);
    }

    #[test]
    fn sealed_connection_is_runtime() {
        let e = Error::SealedConnection {
            varnode: VarNodeId(3),
            node: NodeId(1),
        };
        assert_eq!(e.kind(), ErrorKind::Runtime);
        assert!(e.is_fatal());
        assert_eq!(format!("{e}"), "cannot undock v3 from n1: connection is sealed");
    }

    #[test]
    fn duplicate_context_is_recoverable() {
        let e = Error::DuplicateContext {
            segment: "i=0".to_string(),
            stack: "i=0".to_string(),
        };
        assert!(!e.is_fatal());
        assert_eq!(e.code(), "E0301");
    }
}
