// phenomenode — Hierarchical phenomena graphs
//
// Library root. Construction goes through `builder::Builder` over a
// `model::Model` and a `registry::Registry`; everything else is a query or a
// rendering of the sealed result.

pub mod builder;
pub mod context;
pub mod demos;
pub mod dot;
pub mod equation;
pub mod error;
pub mod export;
pub mod gate;
pub mod id;
pub mod model;
pub mod node;
pub mod phenomena;
pub mod preferences;
pub mod registry;
pub mod variable;
pub mod varnode;

pub use builder::{Builder, NodeDecl};
pub use context::{ContextFamily, ContextFormat, ContextItem, ContextKind, ContextSegment, ContextStack, KindTable};
pub use error::{Error, ErrorKind, Result};
pub use gate::{GateItem, Role};
pub use id::{NodeId, VarNodeId};
pub use model::Model;
pub use node::{NodeState, NodeView, Phenomenon};
pub use registry::Registry;
pub use variable::Variable;
pub use varnode::{Connection, VarNode};
