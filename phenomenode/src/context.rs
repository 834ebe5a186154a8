// context.rs — Path-based context addressing
//
// A context address disambiguates a symbolic variable occurrence by the
// construction path it was seen through, instead of by a global name.
//
//   ContextKind    a declared kind: single-letter tag + name (static, Copy)
//   KindTable      the set of declared kinds; tags are unique
//   ContextItem    one concrete segment: kind + identity (ticket or name)
//   ContextFamily  "all items of this kind" wildcard; equal only to itself
//   ContextStack   immutable ordered sequence of segments, no duplicates
//
// Formatting is a pure function of the stack contents (`ContextFormat`).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ── Kinds ───────────────────────────────────────────────────────────────────

/// A declared context kind. Node kinds share this namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextKind {
    name: &'static str,
    tag: char,
}

impl ContextKind {
    pub const fn new(name: &'static str, tag: char) -> Self {
        ContextKind { name, tag }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tag(&self) -> char {
        self.tag
    }

    /// Concrete item of this kind with an explicit identity.
    pub fn item(self, identity: impl Into<Identity>) -> ContextItem {
        ContextItem::new(self, identity.into())
    }

    /// Family of this kind over the given members.
    pub fn family<I, T>(self, members: I) -> ContextFamily
    where
        I: IntoIterator<Item = T>,
        T: Into<Identity>,
    {
        ContextFamily::new(self, members)
    }
}

pub const INLET: ContextKind = ContextKind::new("Inlet", 'i');
pub const OUTLET: ContextKind = ContextKind::new("Outlet", 'o');
pub const PHASE: ContextKind = ContextKind::new("Phase", 'p');
pub const CHEMICAL: ContextKind = ContextKind::new("Chemical", 'c');
/// Generic node kind used by plain scoped composites.
pub const NODE: ContextKind = ContextKind::new("Node", 'n');

/// Declared kinds, keyed by tag.
#[derive(Debug, Clone, Default)]
pub struct KindTable {
    kinds: BTreeMap<char, ContextKind>,
}

impl KindTable {
    /// Empty table; nothing declared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in kinds declared.
    pub fn builtin() -> Self {
        let mut table = KindTable::new();
        for kind in [INLET, OUTLET, PHASE, CHEMICAL, NODE] {
            table.kinds.insert(kind.tag, kind);
        }
        table
    }

    /// Declare a kind. Tags must be a single ASCII letter, unique across the
    /// table; a collision is permanent and reported here, not per instance.
    pub fn declare(&mut self, name: &'static str, tag: char) -> Result<ContextKind> {
        if name.is_empty() {
            return Err(Error::InvalidKind {
                name: name.to_string(),
                tag,
                reason: "kind name is empty",
            });
        }
        if !tag.is_ascii_alphabetic() {
            return Err(Error::InvalidKind {
                name: name.to_string(),
                tag,
                reason: "tag must be a single ASCII letter",
            });
        }
        if let Some(existing) = self.kinds.get(&tag) {
            return Err(Error::DuplicateTag {
                tag,
                existing: existing.name,
                requested: name.to_string(),
            });
        }
        let kind = ContextKind::new(name, tag);
        self.kinds.insert(tag, kind);
        tracing::debug!(kind = name, tag = %tag, "declared context kind");
        Ok(kind)
    }

    /// Declare a kind value built elsewhere (e.g. a phenomenon's constant).
    pub fn declare_kind(&mut self, kind: ContextKind) -> Result<ContextKind> {
        self.declare(kind.name, kind.tag)
    }

    pub fn contains(&self, kind: ContextKind) -> bool {
        self.kinds.get(&kind.tag) == Some(&kind)
    }

    pub fn lookup(&self, tag: char) -> Option<ContextKind> {
        self.kinds.get(&tag).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = ContextKind> + '_ {
        self.kinds.values().copied()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

// ── Format modes ────────────────────────────────────────────────────────────

/// Rendering mode for context stacks and variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextFormat {
    /// Compact: items vanish, families show their tag (`Fi`).
    Label,
    /// `i=0`, families as their tag.
    Short,
    /// `i=0`, families spelled out (`i in inlets`).
    #[default]
    Named,
    /// `i=Inlet(0)`, families with their members (`i in {0, 1}`).
    Formal,
}

impl ContextFormat {
    fn separator(self) -> &'static str {
        match self {
            ContextFormat::Label => "",
            _ => ", ",
        }
    }
}

// ── Identity ────────────────────────────────────────────────────────────────

/// Identity of an item: a scope-local ticket or an explicit name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    Ticket(u32),
    Name(String),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Ticket(n) => write!(f, "{n}"),
            Identity::Name(name) => f.write_str(name),
        }
    }
}

impl From<u32> for Identity {
    fn from(n: u32) -> Self {
        Identity::Ticket(n)
    }
}

impl From<usize> for Identity {
    fn from(n: usize) -> Self {
        Identity::Ticket(n as u32)
    }
}

impl From<&str> for Identity {
    fn from(name: &str) -> Self {
        Identity::Name(name.to_string())
    }
}

impl From<String> for Identity {
    fn from(name: String) -> Self {
        Identity::Name(name)
    }
}

// ── Items and families ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextItem {
    kind: ContextKind,
    identity: Identity,
}

impl ContextItem {
    pub fn new(kind: ContextKind, identity: Identity) -> Self {
        ContextItem { kind, identity }
    }

    pub fn named(kind: ContextKind, name: impl Into<String>) -> Self {
        ContextItem::new(kind, Identity::Name(name.into()))
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn format(&self, mode: ContextFormat) -> String {
        match mode {
            ContextFormat::Label => String::new(),
            ContextFormat::Short | ContextFormat::Named => {
                format!("{}={}", self.kind.tag, self.identity)
            }
            ContextFormat::Formal => {
                format!("{}={}({})", self.kind.tag, self.kind.name, self.identity)
            }
        }
    }
}

impl fmt::Display for ContextItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind.name, self.identity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextFamily {
    kind: ContextKind,
    members: BTreeSet<Identity>,
}

impl ContextFamily {
    pub fn new<I, T>(kind: ContextKind, members: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Identity>,
    {
        ContextFamily {
            kind,
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn members(&self) -> impl Iterator<Item = &Identity> {
        self.members.iter()
    }

    pub fn format(&self, mode: ContextFormat) -> String {
        match mode {
            ContextFormat::Label | ContextFormat::Short => self.kind.tag.to_string(),
            ContextFormat::Named => {
                format!("{} in {}", self.kind.tag, plural_words(self.kind.name))
            }
            ContextFormat::Formal => {
                let members: Vec<String> = self.members.iter().map(|m| m.to_string()).collect();
                format!("{} in {{{}}}", self.kind.tag, members.join(", "))
            }
        }
    }
}

impl fmt::Display for ContextFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(ContextFormat::Formal))
    }
}

/// Split a CamelCase kind name into lowercase words and pluralize the last
/// one: `SurgeTank` → `surge tanks`. All-caps words (acronyms) keep case
/// and end before the capital that starts the next word: `LLEStage` →
/// `LLE stages`.
fn plural_words(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut word = String::new();
    for (i, &c) in chars.iter().enumerate() {
        let last = i.checked_sub(1).map(|j| chars[j]);
        let next = chars.get(i + 1).copied();
        let after_lower = last.is_some_and(|l| l.is_alphabetic() && !l.is_uppercase());
        let acronym_end = last.is_some_and(char::is_uppercase) && next.is_some_and(char::is_lowercase);
        if c.is_uppercase() && (after_lower || acronym_end) && !word.is_empty() {
            words.push(std::mem::take(&mut word));
        }
        word.push(c);
    }
    if !word.is_empty() {
        words.push(word);
    }
    let words: Vec<String> = words
        .into_iter()
        .map(|w| {
            let acronym = w.chars().count() > 1 && w.chars().all(|c| !c.is_alphabetic() || c.is_uppercase());
            if acronym {
                w
            } else {
                w.to_lowercase()
            }
        })
        .collect();
    format!("{}s", words.join(" "))
}

// ── Segments and stacks ─────────────────────────────────────────────────────

/// One position of a context stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContextSegment {
    Item(ContextItem),
    Family(ContextFamily),
}

impl ContextSegment {
    pub fn kind(&self) -> ContextKind {
        match self {
            ContextSegment::Item(item) => item.kind,
            ContextSegment::Family(family) => family.kind,
        }
    }

    pub fn format(&self, mode: ContextFormat) -> String {
        match self {
            ContextSegment::Item(item) => item.format(mode),
            ContextSegment::Family(family) => family.format(mode),
        }
    }
}

impl From<ContextItem> for ContextSegment {
    fn from(item: ContextItem) -> Self {
        ContextSegment::Item(item)
    }
}

impl From<ContextFamily> for ContextSegment {
    fn from(family: ContextFamily) -> Self {
        ContextSegment::Family(family)
    }
}

/// Ordered, duplicate-free sequence of context segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ContextStack {
    segments: Vec<ContextSegment>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stack from segments, rejecting repeats.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<ContextSegment>,
    {
        let mut stack = ContextStack::new();
        for segment in segments {
            stack.push(segment.into())?;
        }
        Ok(stack)
    }

    /// New stack with `segment` appended.
    pub fn append(&self, segment: impl Into<ContextSegment>) -> Result<Self> {
        let mut stack = self.clone();
        stack.push(segment.into())?;
        Ok(stack)
    }

    /// New stack with `segment` in front.
    pub fn prepend(&self, segment: impl Into<ContextSegment>) -> Result<Self> {
        let segment = segment.into();
        self.check_absent(&segment)?;
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.push(segment);
        segments.extend(self.segments.iter().cloned());
        Ok(ContextStack { segments })
    }

    /// New stack with every segment of `other` appended.
    pub fn concat(&self, other: &ContextStack) -> Result<Self> {
        let mut stack = self.clone();
        for segment in &other.segments {
            stack.push(segment.clone())?;
        }
        Ok(stack)
    }

    pub fn contains(&self, segment: &ContextSegment) -> bool {
        self.segments.contains(segment)
    }

    pub fn segments(&self) -> &[ContextSegment] {
        &self.segments
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContextSegment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn format(&self, mode: ContextFormat) -> String {
        let parts: Vec<String> = self.segments.iter().map(|s| s.format(mode)).collect();
        parts.join(mode.separator())
    }

    fn push(&mut self, segment: ContextSegment) -> Result<()> {
        self.check_absent(&segment)?;
        self.segments.push(segment);
        Ok(())
    }

    fn check_absent(&self, segment: &ContextSegment) -> Result<()> {
        if self.contains(segment) {
            return Err(Error::DuplicateContext {
                segment: segment.format(ContextFormat::Formal),
                stack: self.format(ContextFormat::Formal),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ContextStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.format(ContextFormat::Named))
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn declare_rejects_tag_collision() {
        let mut table = KindTable::builtin();
        let err = table.declare("Interface", 'i').unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(err, Error::DuplicateTag { existing: "Inlet", .. }));
        // the original declaration is untouched
        assert_eq!(table.lookup('i'), Some(INLET));
    }

    #[test]
    fn declare_rejects_bad_tags() {
        let mut table = KindTable::new();
        assert!(table.declare("Digit", '1').is_err());
        assert!(table.declare("", 'q').is_err());
        let kind = table.declare("Quantity", 'q').unwrap();
        assert!(table.contains(kind));
        assert!(!table.contains(ContextKind::new("Other", 'q')));
    }

    #[test]
    fn item_equality_is_kind_and_identity() {
        assert_eq!(INLET.item(0u32), INLET.item(0u32));
        assert_ne!(INLET.item(0u32), OUTLET.item(0u32));
        assert_ne!(INLET.item(0u32), INLET.item("0"));
    }

    #[test]
    fn family_never_equals_item() {
        let family = ContextSegment::from(INLET.family([0u32]));
        let item = ContextSegment::from(INLET.item(0u32));
        assert_ne!(family, item);
        assert_eq!(family, ContextSegment::from(INLET.family([0u32])));
    }

    #[test]
    fn append_is_persistent() {
        let empty = ContextStack::new();
        let one = empty.append(INLET.item(0u32)).unwrap();
        assert!(empty.is_empty());
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn duplicate_append_is_reported() {
        let stack = ContextStack::new().append(INLET.item(0u32)).unwrap();
        let err = stack.append(INLET.item(0u32)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateContext);
        // a different identity is fine
        assert!(stack.append(INLET.item(1u32)).is_ok());
        // concat and prepend use the same check
        assert!(stack.concat(&stack).is_err());
        assert!(stack.prepend(INLET.item(0u32)).is_err());
    }

    #[test]
    fn format_modes() {
        let stack = ContextStack::from_segments([
            ContextSegment::from(PHASE.item("l")),
            ContextSegment::from(INLET.family([0u32, 1])),
        ])
        .unwrap();
        assert_eq!(stack.format(ContextFormat::Label), "i");
        assert_eq!(stack.format(ContextFormat::Short), "p=l, i");
        assert_eq!(stack.format(ContextFormat::Named), "p=l, i in inlets");
        assert_eq!(stack.format(ContextFormat::Formal), "p=Phase(l), i in {0, 1}");
        assert_eq!(stack.to_string(), "(p=l, i in inlets)");
    }

    #[test]
    fn plural_words_split_camel_case() {
        assert_eq!(plural_words("Inlet"), "inlets");
        assert_eq!(plural_words("SurgeTank"), "surge tanks");
        assert_eq!(plural_words("LLEStage"), "LLE stages");
        assert_eq!(plural_words("PID"), "PIDs");
        assert_eq!(plural_words("HeatXChanger"), "heat x changers");
    }
}
