// node.rs — Phenomenon nodes
//
// A `Node` is one unit of decomposition: an identity item, an inlet gate, an
// outlet gate and, once sealed, its direct children. What a node *means* is
// supplied by a `Phenomenon`: its kind, an optional build hook that
// constructs children, and the equations a leaf contributes.
//
// State moves UnderConstruction → Sealed, or UnderConstruction → Abandoned
// when the build hook or scoped body fails. There is no way back.

use std::fmt;

use crate::builder::Builder;
use crate::context::{ContextItem, ContextKind};
use crate::equation::Equation;
use crate::error::Result;
use crate::gate::{Gate, GateRef, Role};
use crate::id::NodeId;
use crate::model::Model;
use crate::variable::Variable;

// ── Phenomenon trait ────────────────────────────────────────────────────────

/// Behaviour of a node kind.
pub trait Phenomenon: fmt::Debug {
    /// Kind of every node built from this phenomenon.
    fn kind(&self) -> ContextKind;

    /// Direct build hook. Runs inside the node's own registry level after its
    /// gates are docked; every node built through `b` becomes a child.
    fn build(&mut self, _b: &mut Builder<'_>, _node: NodeId) -> Result<()> {
        Ok(())
    }

    /// Equations of a sealed leaf.
    fn equations(&self, _view: &NodeView<'_>) -> Result<Vec<Equation>> {
        Ok(Vec::new())
    }
}

// ── Node record ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    UnderConstruction,
    Sealed,
    Abandoned,
}

#[derive(Debug)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) item: ContextItem,
    pub(crate) ins: Gate,
    pub(crate) outs: Gate,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) state: NodeState,
    pub(crate) scoped: bool,
    pub(crate) phenomenon: Option<Box<dyn Phenomenon>>,
}

impl Node {
    pub(crate) fn new(id: NodeId, item: ContextItem, scoped: bool) -> Self {
        Node {
            id,
            item,
            ins: Gate::new(Role::Inlet, id),
            outs: Gate::new(Role::Outlet, id),
            children: Vec::new(),
            parent: None,
            state: NodeState::UnderConstruction,
            scoped,
            phenomenon: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Identity of the node as a context segment.
    pub fn item(&self) -> &ContextItem {
        &self.item
    }

    pub fn kind(&self) -> ContextKind {
        self.item.kind()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_sealed(&self) -> bool {
        self.state == NodeState::Sealed
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether the node was built through the scoped bracket.
    pub fn is_scoped(&self) -> bool {
        self.scoped
    }

    pub fn phenomenon(&self) -> Option<&dyn Phenomenon> {
        self.phenomenon.as_deref()
    }

    pub fn gate(&self, role: Role) -> &Gate {
        match role {
            Role::Inlet => &self.ins,
            Role::Outlet => &self.outs,
        }
    }

    pub(crate) fn gate_mut(&mut self, role: Role) -> &mut Gate {
        match role {
            Role::Inlet => &mut self.ins,
            Role::Outlet => &mut self.outs,
        }
    }

    /// `Kind(identity)`, e.g. `SurgeTank(0)`.
    pub fn label(&self) -> String {
        self.item.to_string()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.item)
    }
}

// ── Leaf view ───────────────────────────────────────────────────────────────

/// What an `equations` hook sees: the sealed node and its model.
#[derive(Clone, Copy)]
pub struct NodeView<'a> {
    pub(crate) model: &'a Model,
    pub(crate) node: NodeId,
}

impl<'a> NodeView<'a> {
    pub fn id(&self) -> NodeId {
        self.node
    }

    pub fn model(&self) -> &'a Model {
        self.model
    }

    pub fn ins(&self) -> Result<GateRef<'a>> {
        self.model.ins(self.node)
    }

    pub fn outs(&self) -> Result<GateRef<'a>> {
        self.model.outs(self.node)
    }

    pub fn inlet_variables(&self) -> Result<Vec<Variable>> {
        self.model.inlet_variables(self.node)
    }

    pub fn outlet_variables(&self) -> Result<Vec<Variable>> {
        self.model.outlet_variables(self.node)
    }

    /// Inlet variables as one family; see [`GateRef::family_variable`].
    pub fn inlet_family(&self) -> Result<Option<Variable>> {
        self.model.inlet_family(self.node)
    }
}
