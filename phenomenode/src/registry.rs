// registry.rs — Construction-time scope tracker
//
// Captures exactly the direct children built while a scope is open, and owns
// the per-kind ticket counters so that numbering is scope-local.
//
// Preconditions: every `open_level` is matched by one `close_level`.
// Failure modes: an unmatched `close_level` returns `RegistryUnderflow` and
//   leaves the registry untouched.
// Side effects: `open_level` saves and resets both the current contents and
//   the ticket counters; `close_level` restores both together.

use crate::context::{ContextItem, ContextKind, KindTable};
use crate::error::{Error, Result};
use crate::id::{IdentityAllocator, NodeId, TicketSnapshot};

// ── Data types ──────────────────────────────────────────────────────────────

/// One suspended level: the enclosing contents and ticket counters.
#[derive(Debug, Clone)]
struct Level<T> {
    contents: Vec<T>,
    tickets: TicketSnapshot,
}

/// Scope tracker, generic over the registered entity.
#[derive(Debug, Clone)]
pub struct Registry<T = NodeId> {
    contents: Vec<T>,
    levels: Vec<Level<T>>,
    allocator: IdentityAllocator,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Registry::with_kinds(KindTable::builtin())
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kinds(kinds: KindTable) -> Self {
        Registry {
            contents: Vec::new(),
            levels: Vec::new(),
            allocator: IdentityAllocator::new(kinds),
        }
    }
}

// ── Scope discipline ────────────────────────────────────────────────────────

impl<T: PartialEq> Registry<T> {
    /// Suspend the current level and start an empty one with fresh tickets.
    pub fn open_level(&mut self) {
        let contents = std::mem::take(&mut self.contents);
        let tickets = self.allocator.snapshot();
        self.allocator.reset();
        self.levels.push(Level { contents, tickets });
        tracing::trace!(depth = self.levels.len(), "registry level opened");
    }

    /// Close the innermost level and return what was registered in it.
    pub fn close_level(&mut self) -> Result<Vec<T>> {
        let level = self.levels.pop().ok_or(Error::RegistryUnderflow)?;
        let captured = std::mem::replace(&mut self.contents, level.contents);
        self.allocator.restore(level.tickets);
        tracing::trace!(
            depth = self.levels.len(),
            captured = captured.len(),
            "registry level closed"
        );
        Ok(captured)
    }

    /// Append to the current level. Returns `false` if already present.
    pub fn register(&mut self, entity: T) -> bool {
        if self.contents.contains(&entity) {
            return false;
        }
        self.contents.push(entity);
        true
    }

    /// Number of open (suspended) levels.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn contains(&self, entity: &T) -> bool {
        self.contents.contains(entity)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.contents.iter()
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

// ── Identity numbering ──────────────────────────────────────────────────────

impl<T> Registry<T> {
    /// Next ticketed item of `kind` in the innermost scope.
    pub fn new_item(&mut self, kind: ContextKind) -> Result<ContextItem> {
        self.allocator.new_item(kind)
    }

    pub fn named_item(&self, kind: ContextKind, name: impl Into<String>) -> Result<ContextItem> {
        self.allocator.named_item(kind, name)
    }

    pub fn declare(&mut self, name: &'static str, tag: char) -> Result<ContextKind> {
        self.allocator.declare(name, tag)
    }

    pub fn kinds(&self) -> &KindTable {
        self.allocator.kinds()
    }

    pub fn allocator(&self) -> &IdentityAllocator {
        &self.allocator
    }
}

impl<'a, T> IntoIterator for &'a Registry<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.contents.iter()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Identity, PHASE};
    use crate::error::ErrorKind;

    fn tickets(reg: &mut Registry<u32>, n: usize) -> Vec<Identity> {
        (0..n)
            .map(|_| reg.new_item(PHASE).unwrap().identity().clone())
            .collect()
    }

    #[test]
    fn register_is_idempotent() {
        let mut reg: Registry<u32> = Registry::new();
        assert!(reg.register(7));
        assert!(!reg.register(7));
        assert_eq!(reg.len(), 1);
        assert!(reg.contains(&7));
    }

    #[test]
    fn close_returns_level_contents_only() {
        let mut reg: Registry<u32> = Registry::new();
        reg.register(1);
        reg.open_level();
        reg.register(2);
        reg.register(3);
        assert_eq!(reg.close_level().unwrap(), vec![2, 3]);
        assert_eq!(reg.iter().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn underflow_leaves_state_untouched() {
        let mut reg: Registry<u32> = Registry::new();
        reg.register(1);
        tickets(&mut reg, 2);
        let err = reg.close_level().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RegistryUnderflow);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.allocator().peek(PHASE), 2);
        assert_eq!(reg.depth(), 0);
    }

    #[test]
    fn sibling_scopes_restart_numbering() {
        let mut reg: Registry<u32> = Registry::new();
        for _ in 0..2 {
            reg.open_level();
            assert_eq!(
                tickets(&mut reg, 3),
                vec![Identity::Ticket(0), Identity::Ticket(1), Identity::Ticket(2)]
            );
            reg.close_level().unwrap();
        }
    }

    #[test]
    fn open_close_restores_tickets() {
        let mut reg: Registry<u32> = Registry::new();
        tickets(&mut reg, 3);
        reg.open_level();
        tickets(&mut reg, 3);
        reg.close_level().unwrap();
        assert_eq!(tickets(&mut reg, 1), vec![Identity::Ticket(3)]);
    }

    #[test]
    fn nesting_is_reentrant() {
        let mut reg: Registry<u32> = Registry::new();
        for depth in 1..=5 {
            reg.open_level();
            reg.register(depth);
        }
        assert_eq!(reg.depth(), 5);
        for depth in (1..=5).rev() {
            assert_eq!(reg.close_level().unwrap(), vec![depth]);
        }
        assert!(reg.close_level().is_err());
    }
}
