// gate.rs — Role-typed varnode collections bound to one side of a node
//
// A `Gate` is the ordered list of varnodes entering (inlets) or leaving
// (outlets) its owner. Docking keeps the owner at the nearest end of every
// member's sinks (inlets) or sources (outlets).
//
// Read access goes through `GateRef`, edits through `GateMut`; both borrow
// the `Model` so that docking and undocking stay in one place.
//
// Failure modes: every edit validates all of its inputs before touching the
//   model, so a rejected edit leaves gate and varnodes unchanged. Nodes
//   captured by a sealed composite, and sealed composites themselves, take
//   no new entries; removals there fail on the sealed varnodes instead.

use std::fmt;
use std::ops::Deref;

use crate::context::{ContextKind, ContextStack, INLET, OUTLET};
use crate::error::{Error, Result};
use crate::id::{NodeId, VarNodeId};
use crate::model::Model;
use crate::variable::Variable;
use crate::varnode::VarNode;

// ── Data types ──────────────────────────────────────────────────────────────

/// Which side of a node a gate sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Inlet,
    Outlet,
}

impl Role {
    /// Context kind used to address a port on this side.
    pub fn port_kind(self) -> ContextKind {
        match self {
            Role::Inlet => INLET,
            Role::Outlet => OUTLET,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Inlet => f.write_str("inlets"),
            Role::Outlet => f.write_str("outlets"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Gate {
    role: Role,
    owner: NodeId,
    varnodes: Vec<VarNodeId>,
}

impl Gate {
    pub(crate) fn new(role: Role, owner: NodeId) -> Self {
        Gate {
            role,
            owner,
            varnodes: Vec::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn varnodes(&self) -> &[VarNodeId] {
        &self.varnodes
    }

    pub fn get(&self, index: usize) -> Option<VarNodeId> {
        self.varnodes.get(index).copied()
    }

    pub fn position(&self, varnode: VarNodeId) -> Option<usize> {
        self.varnodes.iter().position(|&v| v == varnode)
    }

    pub fn contains(&self, varnode: VarNodeId) -> bool {
        self.varnodes.contains(&varnode)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VarNodeId> {
        self.varnodes.iter()
    }

    pub fn len(&self) -> usize {
        self.varnodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.varnodes.is_empty()
    }

    pub(crate) fn push(&mut self, varnode: VarNodeId) {
        self.varnodes.push(varnode);
    }
}

impl<'a> IntoIterator for &'a Gate {
    type Item = &'a VarNodeId;
    type IntoIter = std::slice::Iter<'a, VarNodeId>;

    fn into_iter(self) -> Self::IntoIter {
        self.varnodes.iter()
    }
}

/// One gate entry: a variable (creates a fresh varnode) or an existing
/// varnode to adopt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateItem {
    Variable(Variable),
    VarNode(VarNodeId),
}

impl From<Variable> for GateItem {
    fn from(v: Variable) -> Self {
        GateItem::Variable(v)
    }
}

impl From<VarNodeId> for GateItem {
    fn from(id: VarNodeId) -> Self {
        GateItem::VarNode(id)
    }
}

impl From<&VarNodeId> for GateItem {
    fn from(id: &VarNodeId) -> Self {
        GateItem::VarNode(*id)
    }
}

impl From<&str> for GateItem {
    fn from(name: &str) -> Self {
        GateItem::Variable(Variable::new(name))
    }
}

// ── Validation and docking ──────────────────────────────────────────────────

/// Check `items` against the model before any of them is resolved.
///
/// `kept` is what remains of the gate after the edit removes entries; an
/// adopted varnode may appear at most once across `kept` and `items`.
pub(crate) fn validate_items(
    model: &Model,
    node: &str,
    role: Role,
    kept: &[VarNodeId],
    items: &[GateItem],
) -> Result<()> {
    let mut seen: Vec<VarNodeId> = kept.to_vec();
    for item in items {
        if let GateItem::VarNode(id) = item {
            if model.get_varnode(*id).is_none() {
                return Err(Error::NotAVarNode {
                    found: *id,
                    node: node.to_string(),
                    role,
                });
            }
            if seen.contains(id) {
                return Err(Error::AliasedVarNode {
                    varnode: *id,
                    node: node.to_string(),
                    role,
                });
            }
            seen.push(*id);
        }
    }
    Ok(())
}

/// Resolve a validated item to a varnode and dock `owner` onto it.
pub(crate) fn dock_item(model: &mut Model, owner: NodeId, role: Role, item: GateItem) -> VarNodeId {
    let id = match item {
        GateItem::Variable(v) => model.push_varnode(VarNode::new(v)),
        GateItem::VarNode(id) => id,
    };
    dock(model, owner, role, id);
    id
}

pub(crate) fn dock(model: &mut Model, owner: NodeId, role: Role, id: VarNodeId) {
    if let Some(vn) = model.varnode_slot(id) {
        match role {
            Role::Inlet => vn.push_sink(owner),
            Role::Outlet => vn.push_source(owner),
        }
    }
}

fn undock(model: &mut Model, owner: NodeId, role: Role, id: VarNodeId) -> Result<()> {
    let vn = model.varnode_slot(id).ok_or(Error::UnknownVarNode(id))?;
    match role {
        Role::Inlet => vn.pop_sink(id, owner),
        Role::Outlet => vn.pop_source(id, owner),
    }
}

// ── Read handle ─────────────────────────────────────────────────────────────

/// Read-only view of a gate together with its model.
#[derive(Clone, Copy)]
pub struct GateRef<'a> {
    pub(crate) model: &'a Model,
    pub(crate) gate: &'a Gate,
}

impl<'a> Deref for GateRef<'a> {
    type Target = Gate;

    fn deref(&self) -> &Gate {
        self.gate
    }
}

impl<'a> GateRef<'a> {
    /// Variables carried by the gate, in gate order.
    pub fn variables(&self) -> Result<Vec<&'a Variable>> {
        self.gate
            .varnodes
            .iter()
            .map(|&id| self.model.varnode(id).map(|vn| vn.variable()))
            .collect()
    }

    /// Each carried variable re-addressed under `context` plus its port.
    pub fn framed_variables(&self, context: &ContextStack) -> Result<Vec<Variable>> {
        let port = self.gate.role.port_kind();
        self.variables()?
            .into_iter()
            .enumerate()
            .map(|(n, v)| v.framed(&context.append(port.item(n))?))
            .collect()
    }

    /// The single variable shared by every entry, addressed by the port
    /// family. `None` for an empty gate.
    pub fn family_variable(&self, context: &ContextStack) -> Result<Option<Variable>> {
        let variables = self.variables()?;
        let Some(first) = variables.first() else {
            return Ok(None);
        };
        if variables.iter().any(|v| v != first) {
            return Err(Error::MixedFamily {
                node: self.gate.owner,
                role: self.gate.role,
            });
        }
        let family = self.gate.role.port_kind().family(0..variables.len() as u32);
        Ok(Some(first.framed(&context.append(family)?)?))
    }
}

impl fmt::Debug for GateRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.gate.varnodes.iter()).finish()
    }
}

// ── Write handle ────────────────────────────────────────────────────────────

/// Positional editing of one gate. Removals undock, insertions dock.
pub struct GateMut<'a> {
    pub(crate) model: &'a mut Model,
    pub(crate) owner: NodeId,
    pub(crate) role: Role,
}

impl<'a> GateMut<'a> {
    fn gate(&self) -> Result<&Gate> {
        Ok(self.model.node(self.owner)?.gate(self.role))
    }

    pub fn len(&self) -> usize {
        self.gate().map(Gate::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn varnodes(&self) -> Vec<VarNodeId> {
        self.gate().map(|g| g.varnodes.clone()).unwrap_or_default()
    }

    /// Swap the entry at `index` for `item`; returns the varnode removed.
    pub fn replace(&mut self, index: usize, item: impl Into<GateItem>) -> Result<VarNodeId> {
        let item = item.into();
        self.check_open()?;
        let mut kept = self.varnodes();
        let old = self.checked_index(index, kept.len())?;
        kept.remove(index);
        self.validate(&kept, std::slice::from_ref(&item))?;
        self.check_undock(old)?;

        undock(self.model, self.owner, self.role, old)?;
        let new = dock_item(self.model, self.owner, self.role, item);
        self.entries_mut()?[index] = new;
        tracing::debug!(node = %self.owner, role = %self.role, index, %old, %new, "gate entry replaced");
        Ok(old)
    }

    pub fn insert(&mut self, index: usize, item: impl Into<GateItem>) -> Result<VarNodeId> {
        let item = item.into();
        self.check_open()?;
        let kept = self.varnodes();
        if index > kept.len() {
            return Err(self.index_error(index, kept.len()));
        }
        self.validate(&kept, std::slice::from_ref(&item))?;

        let new = dock_item(self.model, self.owner, self.role, item);
        self.entries_mut()?.insert(index, new);
        tracing::debug!(node = %self.owner, role = %self.role, index, %new, "gate entry inserted");
        Ok(new)
    }

    /// Drop the entry at `index`, undocking the owner from it.
    pub fn remove(&mut self, index: usize) -> Result<VarNodeId> {
        let kept = self.varnodes();
        let old = self.checked_index(index, kept.len())?;
        self.check_undock(old)?;

        undock(self.model, self.owner, self.role, old)?;
        self.entries_mut()?.remove(index);
        tracing::debug!(node = %self.owner, role = %self.role, index, %old, "gate entry removed");
        Ok(old)
    }

    pub fn append(&mut self, item: impl Into<GateItem>) -> Result<VarNodeId> {
        let index = self.len();
        self.insert(index, item)
    }

    pub fn extend<I, T>(&mut self, items: I) -> Result<Vec<VarNodeId>>
    where
        I: IntoIterator<Item = T>,
        T: Into<GateItem>,
    {
        let items: Vec<GateItem> = items.into_iter().map(Into::into).collect();
        self.check_open()?;
        let kept = self.varnodes();
        self.validate(&kept, &items)?;

        let mut added = Vec::with_capacity(items.len());
        for item in items {
            added.push(dock_item(self.model, self.owner, self.role, item));
        }
        self.entries_mut()?.extend(added.iter().copied());
        Ok(added)
    }

    fn validate(&self, kept: &[VarNodeId], items: &[GateItem]) -> Result<()> {
        let label = self.model.node(self.owner)?.label();
        validate_items(self.model, &label, self.role, kept, items)
    }

    /// Boundaries are fixed once a composite seals over the owner, and a
    /// sealed composite's own gates are exactly its inferred boundary.
    fn check_open(&self) -> Result<()> {
        let node = self.model.node(self.owner)?;
        let reason = if node.parent().is_some() {
            "it is captured by a composite"
        } else if node.is_sealed() && !node.is_leaf() {
            "it is a sealed composite"
        } else {
            return Ok(());
        };
        Err(Error::SealedGate {
            node: self.owner,
            role: self.role,
            reason,
        })
    }

    fn check_undock(&self, id: VarNodeId) -> Result<()> {
        self.model.varnode(id)?.check_undock(id, self.owner)
    }

    fn checked_index(&self, index: usize, len: usize) -> Result<VarNodeId> {
        self.gate()?
            .get(index)
            .ok_or_else(|| self.index_error(index, len))
    }

    fn index_error(&self, index: usize, len: usize) -> Error {
        Error::GateIndex {
            node: self.owner,
            role: self.role,
            index,
            len,
        }
    }

    fn entries_mut(&mut self) -> Result<&mut Vec<VarNodeId>> {
        let role = self.role;
        let node = self.model.node_slot(self.owner).ok_or(Error::UnknownNode(self.owner))?;
        Ok(&mut node.gate_mut(role).varnodes)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::error::ErrorKind;
    use crate::phenomena::{self, Composite, SurgeTank};
    use crate::registry::Registry;

    fn tank(model: &mut Model, ins: Vec<GateItem>, outs: Vec<GateItem>) -> NodeId {
        let mut registry = Registry::with_kinds(phenomena::kind_table().unwrap());
        Builder::new(model, &mut registry)
            .node(SurgeTank)
            .ins(ins)
            .outs(outs)
            .build()
            .unwrap()
    }

    #[test]
    fn docking_keeps_owner_nearest() {
        let mut model = Model::new();
        let a = tank(&mut model, vec!["F".into()], vec!["T".into()]);
        let f = model.ins(a).unwrap().varnodes()[0];
        let t = model.outs(a).unwrap().varnodes()[0];
        assert_eq!(model.varnode(f).unwrap().sink(), Some(a));
        assert_eq!(model.varnode(t).unwrap().source(), Some(a));
    }

    #[test]
    fn replace_redocks() {
        let mut model = Model::new();
        let a = tank(&mut model, vec!["F".into()], vec![]);
        let old = model.ins_mut(a).unwrap().replace(0, "G").unwrap();
        assert!(model.varnode(old).unwrap().sinks().is_empty());
        let new = model.ins(a).unwrap().varnodes()[0];
        assert_eq!(model.varnode(new).unwrap().sink(), Some(a));
        assert_eq!(model.varnode(new).unwrap().variable().name(), "G");
    }

    #[test]
    fn insert_remove_append_extend() {
        let mut model = Model::new();
        let a = tank(&mut model, vec![], vec![]);
        let mut outs = model.outs_mut(a).unwrap();
        outs.append("A").unwrap();
        outs.extend(["C", "D"]).unwrap();
        outs.insert(1, "B").unwrap();
        assert_eq!(outs.len(), 4);
        let removed = outs.remove(3).unwrap();
        drop(outs);
        assert!(model.varnode(removed).unwrap().sources().is_empty());
        let names: Vec<String> = model
            .outs(a)
            .unwrap()
            .variables()
            .unwrap()
            .iter()
            .map(|v| v.name().to_string())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn unknown_varnode_is_type_error() {
        let mut model = Model::new();
        let a = tank(&mut model, vec![], vec![]);
        let err = model.ins_mut(a).unwrap().append(VarNodeId(99)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert!(model.ins(a).unwrap().is_empty());
    }

    #[test]
    fn aliasing_within_gate_is_rejected() {
        let mut model = Model::new();
        let a = tank(&mut model, vec!["F".into()], vec![]);
        let f = model.ins(a).unwrap().varnodes()[0];
        let err = model.ins_mut(a).unwrap().append(f).unwrap_err();
        assert!(matches!(err, Error::AliasedVarNode { .. }));
        // replacing an entry with itself is not aliasing
        assert_eq!(model.ins_mut(a).unwrap().replace(0, f).unwrap(), f);
        assert_eq!(model.varnode(f).unwrap().sink(), Some(a));
    }

    #[test]
    fn index_out_of_range() {
        let mut model = Model::new();
        let a = tank(&mut model, vec![], vec![]);
        let err = model.ins_mut(a).unwrap().remove(0).unwrap_err();
        assert_eq!(err.code(), "E0503");
        assert!(model.ins_mut(a).unwrap().insert(1, "X").is_err());
    }

    #[test]
    fn family_requires_identical_variables() {
        let mut model = Model::new();
        let a = tank(&mut model, vec!["F".into(), "F".into()], vec![]);
        let family = model.ins(a).unwrap().family_variable(&ContextStack::new()).unwrap();
        assert_eq!(family.unwrap().to_string(), "F[i in inlets]");

        model.ins_mut(a).unwrap().append("G").unwrap();
        let err = model.ins(a).unwrap().family_variable(&ContextStack::new()).unwrap_err();
        assert!(matches!(err, Error::MixedFamily { role: Role::Inlet, .. }));
    }

    #[test]
    fn sealed_tree_takes_no_new_entries() {
        let mut model = Model::new();
        let mut registry = Registry::with_kinds(phenomena::kind_table().unwrap());
        let mut a = None;
        let c = Builder::new(&mut model, &mut registry)
            .node(Composite)
            .scoped(|b| {
                a = Some(b.node(SurgeTank).ins(["F"]).outs(["T"]).build()?);
                Ok(())
            })
            .unwrap();
        let a = a.unwrap();
        let varnodes = model.varnode_count();

        let err = model.ins_mut(a).unwrap().append("Q").unwrap_err();
        assert!(matches!(err, Error::SealedGate { role: Role::Inlet, .. }));
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert_eq!(err.code(), "E0510");
        assert!(model.ins_mut(a).unwrap().replace(0, "G").is_err());
        assert!(model.outs_mut(a).unwrap().extend(["U"]).is_err());
        assert!(model.outs_mut(c).unwrap().append("Z").is_err());
        assert!(model.ins_mut(c).unwrap().insert(0, "Z").is_err());

        // boundary still closes over the children
        assert_eq!(model.ins(a).unwrap().varnodes(), model.ins(c).unwrap().varnodes());
        assert_eq!(model.outs(a).unwrap().varnodes(), model.outs(c).unwrap().varnodes());
        assert_eq!(model.varnode_count(), varnodes);
    }

    #[test]
    fn framed_variables_address_ports() {
        let mut model = Model::new();
        let a = tank(&mut model, vec![], vec!["T".into(), "P".into()]);
        let framed = model.outs(a).unwrap().framed_variables(&ContextStack::new()).unwrap();
        let shown: Vec<String> = framed.iter().map(|v| v.to_string()).collect();
        assert_eq!(shown, vec!["T[o=0]", "P[o=1]"]);
    }
}
