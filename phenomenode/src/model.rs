// model.rs — Node and varnode arenas plus every recursive tree query
//
// The model owns all nodes and varnodes of one construction session and
// hands out `NodeId`/`VarNodeId` handles in construction order. Nodes are
// never removed; abandoned nodes stay in the arena but are unreachable from
// any sealed tree.
//
// Preconditions: queries taking a root expect a sealed tree; unknown handles
//   return `UnknownNode`/`UnknownVarNode`.
// Side effects: none outside the builder and `GateMut`.

use std::collections::HashSet;
use std::fmt::Write;

use crate::context::{ContextFormat, ContextStack, INLET, OUTLET};
use crate::equation::Equation;
use crate::error::{Error, Result};
use crate::gate::{GateMut, GateRef, Role};
use crate::id::{NodeId, VarNodeId};
use crate::node::{Node, NodeState, NodeView};
use crate::variable::Variable;
use crate::varnode::{Connection, VarNode};

#[derive(Debug, Default)]
pub struct Model {
    nodes: Vec<Node>,
    varnodes: Vec<VarNode>,
}

// ── Arena ───────────────────────────────────────────────────────────────────

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_node(&mut self, make: impl FnOnce(NodeId) -> Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(make(id));
        id
    }

    pub(crate) fn push_varnode(&mut self, varnode: VarNode) -> VarNodeId {
        let id = VarNodeId(self.varnodes.len() as u32);
        self.varnodes.push(varnode);
        id
    }

    pub(crate) fn node_slot(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    pub(crate) fn varnode_slot(&mut self, id: VarNodeId) -> Option<&mut VarNode> {
        self.varnodes.get_mut(id.0 as usize)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    pub fn get_varnode(&self, id: VarNodeId) -> Option<&VarNode> {
        self.varnodes.get(id.0 as usize)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.get_node(id).ok_or(Error::UnknownNode(id))
    }

    pub fn varnode(&self, id: VarNodeId) -> Result<&VarNode> {
        self.get_varnode(id).ok_or(Error::UnknownVarNode(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn varnode_count(&self) -> usize {
        self.varnodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn varnode_ids(&self) -> impl Iterator<Item = VarNodeId> {
        (0..self.varnodes.len() as u32).map(VarNodeId)
    }

    /// Sealed nodes without a parent, in construction order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.parent.is_none() && n.state == NodeState::Sealed)
            .map(|n| n.id)
            .collect()
    }
}

// ── Gates ───────────────────────────────────────────────────────────────────

impl Model {
    pub fn gate(&self, node: NodeId, role: Role) -> Result<GateRef<'_>> {
        let gate = self.node(node)?.gate(role);
        Ok(GateRef { model: self, gate })
    }

    pub fn ins(&self, node: NodeId) -> Result<GateRef<'_>> {
        self.gate(node, Role::Inlet)
    }

    pub fn outs(&self, node: NodeId) -> Result<GateRef<'_>> {
        self.gate(node, Role::Outlet)
    }

    pub fn gate_mut(&mut self, node: NodeId, role: Role) -> Result<GateMut<'_>> {
        self.node(node)?;
        Ok(GateMut {
            model: self,
            owner: node,
            role,
        })
    }

    pub fn ins_mut(&mut self, node: NodeId) -> Result<GateMut<'_>> {
        self.gate_mut(node, Role::Inlet)
    }

    pub fn outs_mut(&mut self, node: NodeId) -> Result<GateMut<'_>> {
        self.gate_mut(node, Role::Outlet)
    }
}

// ── Tree queries ────────────────────────────────────────────────────────────

impl Model {
    pub fn children(&self, node: NodeId) -> Result<&[NodeId]> {
        Ok(self.node(node)?.children())
    }

    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(node)?.parent())
    }

    /// 0 for a leaf, otherwise one more than the deepest child.
    pub fn depth(&self, node: NodeId) -> Result<usize> {
        let mut deepest = None;
        for &child in self.children(node)? {
            let d = self.depth(child)?;
            deepest = Some(deepest.map_or(d, |m: usize| m.max(d)));
        }
        Ok(deepest.map_or(0, |d| d + 1))
    }

    /// Every node below `node`, pre-order, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        self.collect_descendants(node, &mut out)?;
        Ok(out)
    }

    fn collect_descendants(&self, node: NodeId, out: &mut Vec<NodeId>) -> Result<()> {
        for &child in self.children(node)? {
            out.push(child);
            self.collect_descendants(child, out)?;
        }
        Ok(())
    }

    /// Leaves of the subtree rooted at `node`, in tree order.
    pub fn leaves(&self, node: NodeId) -> Result<Vec<NodeId>> {
        if self.node(node)?.is_leaf() {
            return Ok(vec![node]);
        }
        let mut leaves = Vec::new();
        for id in self.descendants(node)? {
            if self.node(id)?.is_leaf() {
                leaves.push(id);
            }
        }
        Ok(leaves)
    }

    /// Identity items from the outermost ancestor down to `node`.
    pub fn path(&self, node: NodeId) -> Result<ContextStack> {
        let mut items = Vec::new();
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            let n = self.node(id)?;
            items.push(n.item().clone());
            cursor = n.parent();
        }
        items.reverse();
        ContextStack::from_segments(items)
    }
}

// ── Connectivity ────────────────────────────────────────────────────────────

impl Model {
    /// The connection through `varnode`'s nearest endpoints.
    pub fn connection(&self, varnode: VarNodeId) -> Result<Connection> {
        let vn = self.varnode(varnode)?;
        let source = vn.source();
        let sink = vn.sink();
        Ok(Connection {
            source,
            source_index: self.port_index(source, Role::Outlet, varnode)?,
            varnode,
            sink_index: self.port_index(sink, Role::Inlet, varnode)?,
            sink,
        })
    }

    /// Producer → varnode → consumer triples between the leaves of `root`.
    ///
    /// Endpoints outside the subtree are `None`. A varnode with several leaf
    /// consumers yields one connection per consumer. Each varnode is visited
    /// once, in the order the leaves first reference it.
    pub fn connections(&self, root: NodeId) -> Result<Vec<Connection>> {
        let leaves = self.leaves(root)?;
        let inside: HashSet<NodeId> = leaves.iter().copied().collect();
        let mut seen: HashSet<VarNodeId> = HashSet::new();
        let mut out = Vec::new();

        for &leaf in &leaves {
            let node = self.node(leaf)?;
            for &id in node.outs.iter().chain(node.ins.iter()) {
                if !seen.insert(id) {
                    continue;
                }
                let vn = self.varnode(id)?;
                let sources = endpoints(vn.sources().iter().rev(), &inside);
                let sinks = endpoints(vn.sinks().iter().rev(), &inside);
                for &source in &sources {
                    for &sink in &sinks {
                        out.push(Connection {
                            source,
                            source_index: self.port_index(source, Role::Outlet, id)?,
                            varnode: id,
                            sink_index: self.port_index(sink, Role::Inlet, id)?,
                            sink,
                        });
                    }
                }
            }
        }
        Ok(out)
    }

    fn port_index(&self, node: Option<NodeId>, role: Role, varnode: VarNodeId) -> Result<Option<usize>> {
        match node {
            Some(id) => Ok(self.node(id)?.gate(role).position(varnode)),
            None => Ok(None),
        }
    }

    /// Varnodes a renderer should draw as belonging to `node`: all of its
    /// outlets, then inlets with no source accepted by `filter`.
    pub fn proprietary_varnodes<F>(&self, node: NodeId, filter: F) -> Result<Vec<VarNodeId>>
    where
        F: Fn(NodeId) -> bool,
    {
        let n = self.node(node)?;
        let mut out: Vec<VarNodeId> = n.outs.varnodes().to_vec();
        for &id in n.ins.iter() {
            let vn = self.varnode(id)?;
            if !vn.sources().iter().any(|&s| filter(s)) {
                out.push(id);
            }
        }
        Ok(out)
    }

    /// Address of `varnode` as seen from its producers, or from its consumers
    /// when it has none. `None` for an unbound varnode.
    ///
    /// The port is counted among same-variable ports of the innermost
    /// endpoint and is followed by every endpoint except the outermost.
    pub fn full_context(&self, varnode: VarNodeId) -> Result<Option<ContextStack>> {
        let vn = self.varnode(varnode)?;
        let (endpoints, role) = if !vn.sources().is_empty() {
            (vn.sources(), Role::Outlet)
        } else if !vn.sinks().is_empty() {
            (vn.sinks(), Role::Inlet)
        } else {
            return Ok(None);
        };
        let Some(&innermost) = endpoints.back() else {
            return Ok(None);
        };
        let mut n = 0u32;
        for &other in self.node(innermost)?.gate(role).iter() {
            if other == varnode {
                break;
            }
            if self.varnode(other)?.variable() == vn.variable() {
                n += 1;
            }
        }
        let port = match role {
            Role::Inlet => INLET.item(n),
            Role::Outlet => OUTLET.item(n),
        };
        let mut stack = ContextStack::new().append(port)?;
        for &id in endpoints.iter().skip(1).rev() {
            stack = stack.append(self.node(id)?.item().clone())?;
        }
        Ok(Some(stack))
    }

    /// The carried variable framed by its full context.
    pub fn label(&self, varnode: VarNodeId, mode: ContextFormat) -> Result<String> {
        let variable = self.varnode(varnode)?.variable();
        match self.full_context(varnode)? {
            Some(context) => Ok(variable.framed(&context)?.format(mode)),
            None => Ok(variable.format(mode)),
        }
    }
}

fn endpoints<'a>(nodes: impl Iterator<Item = &'a NodeId>, inside: &HashSet<NodeId>) -> Vec<Option<NodeId>> {
    let found: Vec<Option<NodeId>> = nodes.filter(|n| inside.contains(n)).map(|&n| Some(n)).collect();
    if found.is_empty() {
        vec![None]
    } else {
        found
    }
}

// ── Leaf data ───────────────────────────────────────────────────────────────

impl Model {
    fn sealed(&self, node: NodeId) -> Result<&Node> {
        let n = self.node(node)?;
        if !n.is_sealed() {
            return Err(Error::NotSealed { node });
        }
        Ok(n)
    }

    /// Inlet variables framed by the node's path and port.
    pub fn inlet_variables(&self, node: NodeId) -> Result<Vec<Variable>> {
        self.sealed(node)?;
        self.ins(node)?.framed_variables(&self.path(node)?)
    }

    pub fn outlet_variables(&self, node: NodeId) -> Result<Vec<Variable>> {
        self.sealed(node)?;
        self.outs(node)?.framed_variables(&self.path(node)?)
    }

    pub fn inlet_family(&self, node: NodeId) -> Result<Option<Variable>> {
        self.sealed(node)?;
        self.ins(node)?.family_variable(&self.path(node)?)
    }

    pub fn view(&self, node: NodeId) -> NodeView<'_> {
        NodeView { model: self, node }
    }

    /// Equations of every leaf under `root`, in tree order.
    pub fn equations(&self, root: NodeId) -> Result<Vec<Equation>> {
        let mut out = Vec::new();
        for leaf in self.leaves(root)? {
            out.extend(self.leaf_equations(leaf)?);
        }
        Ok(out)
    }

    fn leaf_equations(&self, leaf: NodeId) -> Result<Vec<Equation>> {
        let node = self.sealed(leaf)?;
        match node.phenomenon() {
            Some(p) => p.equations(&self.view(leaf)),
            None => Ok(Vec::new()),
        }
    }

    /// Indented listing of the tree with each leaf's equations.
    ///
    /// ```text
    /// Node(0):
    /// - SurgeTank(0): F[n=0, t=0, i=0] = T[n=0, t=0, o=0]
    /// - SurgeTank(1): T[n=0, t=1, i=0] = P[n=0, t=1, o=0]
    /// ```
    pub fn tree(&self, root: NodeId, mode: ContextFormat) -> Result<String> {
        let mut buf = String::new();
        self.write_tree(&mut buf, root, None, mode)?;
        let lines: Vec<&str> = buf.lines().map(str::trim_end).collect();
        Ok(lines.join("\n"))
    }

    fn write_tree(&self, buf: &mut String, node: NodeId, indent: Option<&str>, mode: ContextFormat) -> Result<()> {
        let n = self.node(node)?;
        let (head, start) = match indent {
            None => (format!("{}: ", n.label()), String::new()),
            Some(start) => (format!("- {}: ", n.label()), format!("{start}  ")),
        };
        let lead = indent.unwrap_or("");
        write!(buf, "{head}").unwrap();
        if n.is_leaf() {
            let align = format!("\n{lead}{}", " ".repeat(head.chars().count()));
            let lines: Vec<String> = self.leaf_equations(node)?.iter().map(|e| e.format(mode)).collect();
            write!(buf, "{}", lines.join(&align)).unwrap();
        } else {
            let child_indent = if indent.is_none() { "" } else { start.as_str() };
            for &child in n.children() {
                write!(buf, "\n{child_indent}").unwrap();
                self.write_tree(buf, child, Some(child_indent), mode)?;
            }
        }
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::phenomena::{self, Composite, SurgeTank};
    use crate::registry::Registry;

    fn session() -> (Model, Registry) {
        (Model::new(), Registry::with_kinds(phenomena::kind_table().unwrap()))
    }

    /// Composite { A: F -> T, B: T -> P }
    fn chain(model: &mut Model, registry: &mut Registry) -> (NodeId, NodeId, NodeId) {
        let mut b = Builder::new(model, registry);
        let mut ab = (NodeId(0), NodeId(0));
        let c = b
            .node(Composite)
            .scoped(|b| {
                let a = b.node(SurgeTank).ins(["F"]).outs(["T"]).build()?;
                let t = b.model().outs(a)?.varnodes()[0];
                let bb = b.node(SurgeTank).ins([t]).outs(["P"]).build()?;
                ab = (a, bb);
                Ok(())
            })
            .unwrap();
        (c, ab.0, ab.1)
    }

    #[test]
    fn tree_shape_queries() {
        let (mut model, mut registry) = session();
        let (c, a, b) = chain(&mut model, &mut registry);
        assert_eq!(model.children(c).unwrap(), &[a, b]);
        assert_eq!(model.parent(a).unwrap(), Some(c));
        assert_eq!(model.depth(c).unwrap(), 1);
        assert_eq!(model.depth(a).unwrap(), 0);
        assert_eq!(model.descendants(c).unwrap(), vec![a, b]);
        assert_eq!(model.leaves(c).unwrap(), vec![a, b]);
        assert_eq!(model.leaves(a).unwrap(), vec![a]);
        assert_eq!(model.roots(), vec![c]);
        assert_eq!(model.path(b).unwrap().format(ContextFormat::Short), "n=0, t=1");
    }

    #[test]
    fn connections_cover_internal_and_boundary_hops() {
        let (mut model, mut registry) = session();
        let (c, a, b) = chain(&mut model, &mut registry);
        let conns = model.connections(c).unwrap();
        let hops: Vec<(Option<NodeId>, Option<NodeId>)> = conns.iter().map(|c| (c.source, c.sink)).collect();
        assert_eq!(hops, vec![(Some(a), Some(b)), (None, Some(a)), (Some(b), None)]);
        assert_eq!(conns[0].source_index, Some(0));
        assert_eq!(conns[0].sink_index, Some(0));
    }

    #[test]
    fn nearest_connection_uses_outermost_observer() {
        let (mut model, mut registry) = session();
        let (c, _, b) = chain(&mut model, &mut registry);
        let p = model.outs(c).unwrap().varnodes()[0];
        let conn = model.connection(p).unwrap();
        assert_eq!(conn.source, Some(c));
        assert_eq!(conn.sink, None);
        assert_eq!(model.varnode(p).unwrap().first_source(), Some(b));
    }

    #[test]
    fn full_context_and_labels() {
        let (mut model, mut registry) = session();
        let (c, a, _) = chain(&mut model, &mut registry);
        let t = model.outs(a).unwrap().varnodes()[0];
        assert_eq!(model.label(t, ContextFormat::Named).unwrap(), "T[o=0]");
        let p = model.outs(c).unwrap().varnodes()[0];
        assert_eq!(model.label(p, ContextFormat::Named).unwrap(), "P[o=0, t=1]");
        assert_eq!(model.label(p, ContextFormat::Formal).unwrap(), "P[o=Outlet(0), t=SurgeTank(1)]");
        let f = model.ins(c).unwrap().varnodes()[0];
        assert_eq!(model.label(f, ContextFormat::Short).unwrap(), "F[i=0, t=0]");
    }

    #[test]
    fn unbound_varnode_has_no_context() {
        let mut model = Model::new();
        let v = model.push_varnode(VarNode::new(Variable::new("X")));
        assert_eq!(model.full_context(v).unwrap(), None);
        assert_eq!(model.label(v, ContextFormat::Named).unwrap(), "X");
    }

    #[test]
    fn proprietary_varnodes_respect_filter() {
        let (mut model, mut registry) = session();
        let (_, a, b) = chain(&mut model, &mut registry);
        let t = model.outs(a).unwrap().varnodes()[0];
        let p = model.outs(b).unwrap().varnodes()[0];
        assert_eq!(model.proprietary_varnodes(b, |_| true).unwrap(), vec![p]);
        assert_eq!(model.proprietary_varnodes(b, |n| n != a).unwrap(), vec![p, t]);
    }

    #[test]
    fn leaf_variables_framed_by_path() {
        let (mut model, mut registry) = session();
        let (_, a, _) = chain(&mut model, &mut registry);
        let ins = model.inlet_variables(a).unwrap();
        assert_eq!(ins[0].to_string(), "F[n=0, t=0, i=0]");
        let outs = model.outlet_variables(a).unwrap();
        assert_eq!(outs[0].format(ContextFormat::Label), "T");
    }

    #[test]
    fn tree_listing() {
        let (mut model, mut registry) = session();
        let (c, _, _) = chain(&mut model, &mut registry);
        let tree = model.tree(c, ContextFormat::Short).unwrap();
        assert_eq!(
            tree,
            "Node(0):\n\
             - SurgeTank(0): F[n=0, t=0, i=0] = T[n=0, t=0, o=0]\n\
             - SurgeTank(1): T[n=0, t=1, i=0] = P[n=0, t=1, o=0]"
        );
        assert_eq!(model.equations(c).unwrap().len(), 2);
    }

    #[test]
    fn unknown_handles() {
        let model = Model::new();
        assert!(matches!(model.node(NodeId(0)), Err(Error::UnknownNode(_))));
        assert!(matches!(model.varnode(VarNodeId(0)), Err(Error::UnknownVarNode(_))));
        assert!(model.ins(NodeId(3)).is_err());
    }
}
