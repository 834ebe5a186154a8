// id.rs — Arena handles and scope-local identity tickets
//
// `NodeId` and `VarNodeId` index the `Model` arenas. They are allocated in
// construction order and never reused, so a handle is a stable identity key
// for the lifetime of its model.
//
// `IdentityAllocator` hands out per-kind ordinal tickets. Its counters are
// ordinary fields: `Registry::open_level` snapshots and resets them,
// `Registry::close_level` restores the snapshot.

use std::collections::BTreeMap;
use std::fmt;

use crate::context::{ContextItem, ContextKind, Identity, KindTable};
use crate::error::{Error, Result};

/// Handle of a node in a `Model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Handle of a varnode in a `Model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarNodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for VarNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Saved ticket counters of one registry level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketSnapshot(BTreeMap<char, u32>);

impl TicketSnapshot {
    /// Next ticket that would be issued for `tag` at the time of the snapshot.
    pub fn next(&self, tag: char) -> u32 {
        self.0.get(&tag).copied().unwrap_or(0)
    }
}

/// Per-kind ticket counters plus the table of declared kinds.
#[derive(Debug, Clone)]
pub struct IdentityAllocator {
    kinds: KindTable,
    tickets: BTreeMap<char, u32>,
}

impl Default for IdentityAllocator {
    fn default() -> Self {
        Self::new(KindTable::builtin())
    }
}

impl IdentityAllocator {
    pub fn new(kinds: KindTable) -> Self {
        IdentityAllocator {
            kinds,
            tickets: BTreeMap::new(),
        }
    }

    pub fn kinds(&self) -> &KindTable {
        &self.kinds
    }

    /// Declare a new kind. See [`KindTable::declare`].
    pub fn declare(&mut self, name: &'static str, tag: char) -> Result<ContextKind> {
        self.kinds.declare(name, tag)
    }

    /// Issue the next ticket for `kind` in the current numbering scope.
    pub fn take_ticket(&mut self, kind: ContextKind) -> Result<u32> {
        self.check_declared(kind)?;
        let counter = self.tickets.entry(kind.tag()).or_insert(0);
        let ticket = *counter;
        *counter += 1;
        Ok(ticket)
    }

    /// Ticket the next `take_ticket(kind)` would return.
    pub fn peek(&self, kind: ContextKind) -> u32 {
        self.tickets.get(&kind.tag()).copied().unwrap_or(0)
    }

    pub fn new_item(&mut self, kind: ContextKind) -> Result<ContextItem> {
        let ticket = self.take_ticket(kind)?;
        Ok(ContextItem::new(kind, Identity::Ticket(ticket)))
    }

    /// Item with an explicit name; does not consume a ticket.
    pub fn named_item(&self, kind: ContextKind, name: impl Into<String>) -> Result<ContextItem> {
        self.check_declared(kind)?;
        Ok(ContextItem::new(kind, Identity::Name(name.into())))
    }

    pub fn snapshot(&self) -> TicketSnapshot {
        TicketSnapshot(self.tickets.clone())
    }

    pub fn reset(&mut self) {
        self.tickets.clear();
    }

    pub fn restore(&mut self, snapshot: TicketSnapshot) {
        self.tickets = snapshot.0;
    }

    fn check_declared(&self, kind: ContextKind) -> Result<()> {
        if self.kinds.contains(kind) {
            Ok(())
        } else {
            Err(Error::UndeclaredKind {
                name: kind.name(),
                tag: kind.tag(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{INLET, OUTLET};
    use crate::error::ErrorKind;

    #[test]
    fn tickets_are_per_kind() {
        let mut alloc = IdentityAllocator::default();
        assert_eq!(alloc.take_ticket(INLET).unwrap(), 0);
        assert_eq!(alloc.take_ticket(INLET).unwrap(), 1);
        assert_eq!(alloc.take_ticket(OUTLET).unwrap(), 0);
        assert_eq!(alloc.peek(INLET), 2);
    }

    #[test]
    fn undeclared_kind_is_configuration_error() {
        let mut alloc = IdentityAllocator::default();
        let ghost = ContextKind::new("Ghost", 'g');
        let err = alloc.take_ticket(ghost).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(alloc.named_item(ghost, "x").is_err());
    }

    #[test]
    fn snapshot_reset_restore() {
        let mut alloc = IdentityAllocator::default();
        alloc.take_ticket(INLET).unwrap();
        let snap = alloc.snapshot();
        alloc.reset();
        assert_eq!(alloc.take_ticket(INLET).unwrap(), 0);
        alloc.restore(snap.clone());
        assert_eq!(alloc.snapshot(), snap);
        assert_eq!(snap.next('i'), 1);
        assert_eq!(alloc.take_ticket(INLET).unwrap(), 1);
    }

    #[test]
    fn named_item_keeps_counter() {
        let mut alloc = IdentityAllocator::default();
        let item = alloc.named_item(INLET, "feed").unwrap();
        assert_eq!(item.identity(), &Identity::Name("feed".to_string()));
        assert_eq!(alloc.take_ticket(INLET).unwrap(), 0);
    }

    #[test]
    fn handle_display() {
        assert_eq!(NodeId(4).to_string(), "n4");
        assert_eq!(VarNodeId(0).to_string(), "v0");
    }
}
