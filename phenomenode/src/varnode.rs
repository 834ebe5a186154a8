// varnode.rs — Connection points carrying one variable
//
// A `VarNode` links ordered producers (`sources`) to ordered consumers
// (`sinks`). Both lists are nearest-first: index 0 is the node docked most
// recently. Boundary inference docks a composite after its children, so the
// front is the outermost observer and the back is the leaf that first
// docked the connection.
//
// Docking only ever pushes at the nearest end. Undocking is refused once the
// connection is sealed inside a composite.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::id::{NodeId, VarNodeId};
use crate::variable::Variable;

#[derive(Debug, Clone)]
pub struct VarNode {
    variable: Variable,
    sources: VecDeque<NodeId>,
    sinks: VecDeque<NodeId>,
    sealed: bool,
}

impl VarNode {
    pub fn new(variable: Variable) -> Self {
        VarNode {
            variable,
            sources: VecDeque::new(),
            sinks: VecDeque::new(),
            sealed: false,
        }
    }

    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    pub fn sources(&self) -> &VecDeque<NodeId> {
        &self.sources
    }

    pub fn sinks(&self) -> &VecDeque<NodeId> {
        &self.sinks
    }

    /// Nearest producer.
    pub fn source(&self) -> Option<NodeId> {
        self.sources.front().copied()
    }

    /// Nearest consumer.
    pub fn sink(&self) -> Option<NodeId> {
        self.sinks.front().copied()
    }

    /// Producer that docked first (the innermost one).
    pub fn first_source(&self) -> Option<NodeId> {
        self.sources.back().copied()
    }

    /// Consumer that docked first (the innermost one).
    pub fn first_sink(&self) -> Option<NodeId> {
        self.sinks.back().copied()
    }

    pub fn is_feed(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn is_product(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn is_unbound(&self) -> bool {
        self.is_feed() && self.is_product()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    pub(crate) fn push_source(&mut self, node: NodeId) {
        self.sources.push_front(node);
    }

    pub(crate) fn push_sink(&mut self, node: NodeId) {
        self.sinks.push_front(node);
    }

    /// Remove the nearest occurrence of `node` from the sources.
    pub(crate) fn pop_source(&mut self, id: VarNodeId, node: NodeId) -> Result<()> {
        self.check_undock(id, node)?;
        if let Some(pos) = self.sources.iter().position(|&n| n == node) {
            self.sources.remove(pos);
        }
        Ok(())
    }

    /// Remove the nearest occurrence of `node` from the sinks.
    pub(crate) fn pop_sink(&mut self, id: VarNodeId, node: NodeId) -> Result<()> {
        self.check_undock(id, node)?;
        if let Some(pos) = self.sinks.iter().position(|&n| n == node) {
            self.sinks.remove(pos);
        }
        Ok(())
    }

    /// Move `node` to the nearest end of the sources.
    pub(crate) fn raise_source(&mut self, node: NodeId) {
        self.sources.retain(|&n| n != node);
        self.sources.push_front(node);
    }

    /// Move `node` to the nearest end of the sinks.
    pub(crate) fn raise_sink(&mut self, node: NodeId) {
        self.sinks.retain(|&n| n != node);
        self.sinks.push_front(node);
    }

    /// Forget `node` entirely, sealed or not. Used to clean up after an
    /// abandoned construction.
    pub(crate) fn detach(&mut self, node: NodeId) {
        self.sources.retain(|&n| n != node);
        self.sinks.retain(|&n| n != node);
    }

    pub(crate) fn check_undock(&self, id: VarNodeId, node: NodeId) -> Result<()> {
        if self.sealed {
            return Err(Error::SealedConnection { varnode: id, node });
        }
        Ok(())
    }
}

/// One producer → consumer hop over a varnode, with gate positions.
///
/// `None` on either end means the connection leaves the queried subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    pub source: Option<NodeId>,
    pub source_index: Option<usize>,
    pub varnode: VarNodeId,
    pub sink_index: Option<usize>,
    pub sink: Option<NodeId>,
}
