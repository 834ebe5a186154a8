// builder.rs — Direct and scoped node construction
//
// Every node is built through a `Builder`, which borrows the session's
// `Model` and `Registry`. Two idioms:
//
//   direct   `b.node(p).ins(..).outs(..).build()` docks the declared gates,
//            opens a registry level, runs the phenomenon's build hook and
//            captures whatever it built as children.
//   scoped   `b.node(p).scoped(|b| ..)` (or `enter`/`exit`) starts with empty
//            gates; on exit the children's unbound feeds become the inlets
//            and their unbound products the outlets (boundary inference).
//
// Sealing a node records it as parent of its children, seals every varnode
// on the children's gates and registers the node one level up. A node whose
// identity repeats inside its own subtree is refused before sealing, since
// no variable below it could be addressed.
//
// Failure modes: a failing build hook or scoped body closes every level it
//   opened, marks the nodes involved `Abandoned`, detaches them from their
//   varnodes and returns the original error. The registry depth and ticket
//   counters are exactly as before the failed construction started, except
//   that the failed node's own ticket stays consumed.

use crate::context::{ContextFormat, ContextItem, ContextKind};
use crate::error::{Error, Result};
use crate::gate::{dock, dock_item, validate_items, GateItem, Role};
use crate::id::{NodeId, VarNodeId};
use crate::model::Model;
use crate::node::{Node, NodeState, Phenomenon};
use crate::registry::Registry;

// ── Builder ─────────────────────────────────────────────────────────────────

pub struct Builder<'a> {
    model: &'a mut Model,
    registry: &'a mut Registry<NodeId>,
    open: Vec<NodeId>,
}

impl<'a> Builder<'a> {
    pub fn new(model: &'a mut Model, registry: &'a mut Registry<NodeId>) -> Self {
        Builder {
            model,
            registry,
            open: Vec::new(),
        }
    }

    pub fn model(&self) -> &Model {
        self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        self.model
    }

    pub fn registry(&self) -> &Registry<NodeId> {
        self.registry
    }

    /// Nodes currently under construction, outermost first.
    pub fn open_scopes(&self) -> &[NodeId] {
        &self.open
    }

    /// Start declaring a node of phenomenon `p`.
    pub fn node<P: Phenomenon + 'static>(&mut self, phenomenon: P) -> NodeDecl<'_, 'a> {
        NodeDecl {
            builder: self,
            phenomenon: Box::new(phenomenon),
            name: None,
            ins: Vec::new(),
            outs: Vec::new(),
        }
    }

    /// Open a scoped node. Every node built until the matching `exit`
    /// becomes one of its children.
    pub fn enter<P: Phenomenon + 'static>(&mut self, phenomenon: P, name: Option<&str>) -> Result<NodeId> {
        self.begin_scoped(Box::new(phenomenon), name.map(str::to_string))
    }

    /// Close the scoped node opened by `enter`, infer its boundary and seal it.
    pub fn exit(&mut self, node: NodeId) -> Result<NodeId> {
        let n = self.model.node(node)?;
        if n.state() != NodeState::UnderConstruction {
            return Err(Error::NotUnderConstruction { node });
        }
        if !n.is_scoped() || self.open.last() != Some(&node) {
            return Err(Error::ScopeMismatch { node });
        }
        self.open.pop();
        let children = self.registry.close_level()?;

        let n = self.model.node(node)?;
        if !n.ins.is_empty() || !n.outs.is_empty() || !n.children.is_empty() {
            self.abandon(node, children);
            return Err(Error::ScopedNodeModified { node });
        }
        if let Err(e) = self.check_identity(node, &children) {
            self.abandon(node, children);
            return Err(e);
        }

        let (feeds, products) = self.boundary(&children)?;
        tracing::debug!(
            node = %n.label(),
            feeds = feeds.len(),
            products = products.len(),
            "boundary inferred"
        );
        self.adopt(node, Role::Inlet, &feeds)?;
        self.adopt(node, Role::Outlet, &products)?;
        self.seal(node, children)?;
        Ok(node)
    }

    /// Unwind every scope opened since `node` was entered, `node` included.
    /// No-op if `node` is not open.
    pub fn abort(&mut self, node: NodeId) {
        let Some(pos) = self.open.iter().position(|&n| n == node) else {
            return;
        };
        while self.open.len() > pos {
            let Some(top) = self.open.pop() else { break };
            let children = self.registry.close_level().unwrap_or_default();
            self.abandon(top, children);
        }
    }

    // ── Construction ────────────────────────────────────────────────────────

    fn identity(&mut self, kind: ContextKind, name: Option<String>) -> Result<ContextItem> {
        match name {
            Some(name) => self.registry.named_item(kind, name),
            None => self.registry.new_item(kind),
        }
    }

    fn construct(
        &mut self,
        mut phenomenon: Box<dyn Phenomenon>,
        name: Option<String>,
        ins: Vec<GateItem>,
        outs: Vec<GateItem>,
    ) -> Result<NodeId> {
        let kind = phenomenon.kind();
        validate_items(self.model, kind.name(), Role::Inlet, &[], &ins)?;
        validate_items(self.model, kind.name(), Role::Outlet, &[], &outs)?;
        let item = self.identity(kind, name)?;
        let id = self.model.push_node(|id| Node::new(id, item, false));

        for item in ins {
            let vn = dock_item(self.model, id, Role::Inlet, item);
            self.push_entry(id, Role::Inlet, vn)?;
        }
        for item in outs {
            let vn = dock_item(self.model, id, Role::Outlet, item);
            self.push_entry(id, Role::Outlet, vn)?;
        }

        self.registry.open_level();
        self.open.push(id);
        let mut built = phenomenon.build(self, id);
        if built.is_ok() {
            if let Some(&stray) = self.open.last().filter(|&&top| top != id) {
                built = Err(Error::ScopeMismatch { node: stray });
            }
        }
        if let Some(node) = self.model.node_slot(id) {
            node.phenomenon = Some(phenomenon);
        }

        match built {
            Ok(()) => {
                self.open.pop();
                let children = self.registry.close_level()?;
                if let Err(e) = self.check_identity(id, &children) {
                    self.abandon(id, children);
                    return Err(e);
                }
                self.seal(id, children)?;
                Ok(id)
            }
            Err(e) => {
                self.abort(id);
                tracing::debug!(node = %id, error = %e, "build hook failed");
                Err(e)
            }
        }
    }

    fn begin_scoped(&mut self, phenomenon: Box<dyn Phenomenon>, name: Option<String>) -> Result<NodeId> {
        let item = self.identity(phenomenon.kind(), name)?;
        let id = self.model.push_node(|id| Node::new(id, item, true));
        if let Some(node) = self.model.node_slot(id) {
            node.phenomenon = Some(phenomenon);
        }
        self.registry.open_level();
        self.open.push(id);
        tracing::trace!(node = %id, depth = self.open.len(), "entered scoped node");
        Ok(id)
    }

    fn scoped<F>(&mut self, phenomenon: Box<dyn Phenomenon>, name: Option<String>, body: F) -> Result<NodeId>
    where
        F: FnOnce(&mut Builder<'a>) -> Result<()>,
    {
        let id = self.begin_scoped(phenomenon, name)?;
        match body(self).and_then(|()| self.exit(id)) {
            Ok(id) => Ok(id),
            Err(e) => {
                self.abort(id);
                tracing::debug!(node = %id, error = %e, "scoped construction failed");
                Err(e)
            }
        }
    }

    // ── Boundary inference and sealing ─────────────────────────────────────

    /// First-seen feeds and products across `children`, each varnode once.
    fn boundary(&self, children: &[NodeId]) -> Result<(Vec<VarNodeId>, Vec<VarNodeId>)> {
        let mut feeds = Vec::new();
        let mut products = Vec::new();
        for &child in children {
            let c = self.model.node(child)?;
            for &vn in c.ins.iter() {
                if self.model.varnode(vn)?.is_feed() && !feeds.contains(&vn) {
                    feeds.push(vn);
                }
            }
            for &vn in c.outs.iter() {
                if self.model.varnode(vn)?.is_product() && !products.contains(&vn) {
                    products.push(vn);
                }
            }
        }
        Ok((feeds, products))
    }

    /// Refuse `node` if any node below it carries the same identity item.
    fn check_identity(&self, node: NodeId, children: &[NodeId]) -> Result<()> {
        let item = self.model.node(node)?.item();
        for &child in children {
            let mut below = vec![child];
            below.extend(self.model.descendants(child)?);
            for id in below {
                if self.model.node(id)?.item() != item {
                    continue;
                }
                // path from `node` down to just above the repeat
                let mut chain = Vec::new();
                let mut cursor = if id == child { None } else { self.model.parent(id)? };
                while let Some(c) = cursor {
                    chain.push(self.model.node(c)?.item().format(ContextFormat::Formal));
                    cursor = if c == child { None } else { self.model.parent(c)? };
                }
                chain.push(item.format(ContextFormat::Formal));
                chain.reverse();
                return Err(Error::DuplicateContext {
                    segment: item.format(ContextFormat::Formal),
                    stack: chain.join(", "),
                });
            }
        }
        Ok(())
    }

    fn adopt(&mut self, node: NodeId, role: Role, varnodes: &[VarNodeId]) -> Result<()> {
        for &vn in varnodes {
            dock(self.model, node, role, vn);
            self.push_entry(node, role, vn)?;
        }
        Ok(())
    }

    fn push_entry(&mut self, node: NodeId, role: Role, vn: VarNodeId) -> Result<()> {
        let n = self.model.node_slot(node).ok_or(Error::UnknownNode(node))?;
        n.gate_mut(role).push(vn);
        Ok(())
    }

    fn seal(&mut self, node: NodeId, children: Vec<NodeId>) -> Result<()> {
        let mut sealed: Vec<VarNodeId> = Vec::new();
        for &child in &children {
            let c = self.model.node_slot(child).ok_or(Error::UnknownNode(child))?;
            c.parent = Some(node);
            sealed.extend(c.ins.iter().chain(c.outs.iter()).copied());
        }
        for vn in sealed {
            if let Some(v) = self.model.varnode_slot(vn) {
                v.seal();
            }
        }

        let n = self.model.node(node)?;
        let ins = n.ins.varnodes().to_vec();
        let outs = n.outs.varnodes().to_vec();
        for vn in ins {
            if let Some(v) = self.model.varnode_slot(vn) {
                v.raise_sink(node);
            }
        }
        for vn in outs {
            if let Some(v) = self.model.varnode_slot(vn) {
                v.raise_source(node);
            }
        }

        let count = children.len();
        let n = self.model.node_slot(node).ok_or(Error::UnknownNode(node))?;
        n.children = children;
        n.state = NodeState::Sealed;
        let label = n.label();
        self.registry.register(node);
        tracing::debug!(node = %label, children = count, depth = self.registry.depth(), "sealed");
        Ok(())
    }

    /// Mark `node` abandoned, keep `children` attached to it so they never
    /// surface as roots, and detach the whole subtree from its varnodes.
    fn abandon(&mut self, node: NodeId, children: Vec<NodeId>) {
        for &child in &children {
            if let Some(c) = self.model.node_slot(child) {
                c.parent = Some(node);
            }
        }
        if let Some(n) = self.model.node_slot(node) {
            n.children.extend(children);
            n.state = NodeState::Abandoned;
        }

        let mut subtree = vec![node];
        subtree.extend(self.model.descendants(node).unwrap_or_default());
        for id in subtree {
            let varnodes: Vec<VarNodeId> = match self.model.get_node(id) {
                Some(n) => n.ins.iter().chain(n.outs.iter()).copied().collect(),
                None => continue,
            };
            for vn in varnodes {
                if let Some(v) = self.model.varnode_slot(vn) {
                    v.detach(id);
                }
            }
        }
        tracing::debug!(node = %node, "abandoned");
    }
}

// ── Declarations ────────────────────────────────────────────────────────────

/// A node being declared; finish with `build` or `scoped`.
#[must_use = "a node declaration does nothing until built"]
pub struct NodeDecl<'b, 'a> {
    builder: &'b mut Builder<'a>,
    phenomenon: Box<dyn Phenomenon>,
    name: Option<String>,
    ins: Vec<GateItem>,
    outs: Vec<GateItem>,
}

impl<'b, 'a> NodeDecl<'b, 'a> {
    /// Explicit identity instead of a ticket.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn ins<I, T>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<GateItem>,
    {
        self.ins.extend(items.into_iter().map(Into::into));
        self
    }

    pub fn outs<I, T>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<GateItem>,
    {
        self.outs.extend(items.into_iter().map(Into::into));
        self
    }

    /// Direct construction.
    pub fn build(self) -> Result<NodeId> {
        self.builder.construct(self.phenomenon, self.name, self.ins, self.outs)
    }

    /// Scoped construction: run `body`, then infer the boundary. The build
    /// hook of the phenomenon is not run.
    pub fn scoped<F>(self, body: F) -> Result<NodeId>
    where
        F: FnOnce(&mut Builder<'a>) -> Result<()>,
    {
        if !self.ins.is_empty() || !self.outs.is_empty() {
            return Err(Error::ScopedNodeNotEmpty {
                node: self.phenomenon.kind().name().to_string(),
            });
        }
        self.builder.scoped(self.phenomenon, self.name, body)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
