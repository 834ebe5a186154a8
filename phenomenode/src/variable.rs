// variable.rs — Symbolic variables addressed by context
//
// A `Variable` is a name plus the `ContextStack` it was observed through.
// Equality and hashing use the fully resolved (name, context) pair.

use std::fmt;

use crate::context::{ContextFormat, ContextStack};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    name: String,
    context: ContextStack,
}

impl Variable {
    /// Variable with an empty context.
    pub fn new(name: impl Into<String>) -> Self {
        Variable {
            name: name.into(),
            context: ContextStack::new(),
        }
    }

    pub fn with_context(name: impl Into<String>, context: ContextStack) -> Self {
        Variable {
            name: name.into(),
            context,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &ContextStack {
        &self.context
    }

    /// Same variable re-addressed under `frame`, appended after its own context.
    pub fn framed(&self, frame: &ContextStack) -> Result<Variable> {
        Ok(Variable {
            name: self.name.clone(),
            context: self.context.concat(frame)?,
        })
    }

    pub fn format(&self, mode: ContextFormat) -> String {
        if self.context.is_empty() {
            return self.name.clone();
        }
        let context = self.context.format(mode);
        match mode {
            ContextFormat::Label => format!("{}{}", self.name, context),
            _ => format!("{}[{}]", self.name, context),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(ContextFormat::Named))
    }
}

impl From<&str> for Variable {
    fn from(name: &str) -> Self {
        Variable::new(name)
    }
}

impl From<String> for Variable {
    fn from(name: String) -> Self {
        Variable::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextSegment, INLET, OUTLET, PHASE};

    fn stack(segments: Vec<ContextSegment>) -> ContextStack {
        ContextStack::from_segments(segments).unwrap()
    }

    #[test]
    fn bare_name_without_context() {
        let t = Variable::new("T");
        assert_eq!(t.format(ContextFormat::Formal), "T");
        assert_eq!(t.to_string(), "T");
    }

    #[test]
    fn formats_with_context() {
        let f = Variable::with_context("F", stack(vec![PHASE.item("l").into(), INLET.family([0u32]).into()]));
        assert_eq!(f.to_string(), "F[p=l, i in inlets]");
        assert_eq!(f.format(ContextFormat::Short), "F[p=l, i]");
        assert_eq!(f.format(ContextFormat::Label), "Fi");
    }

    #[test]
    fn framing_appends_and_checks_duplicates() {
        let t = Variable::new("T");
        let frame = stack(vec![OUTLET.item(0u32).into()]);
        let framed = t.framed(&frame).unwrap();
        assert_eq!(framed.to_string(), "T[o=0]");
        assert_ne!(framed, t);
        assert!(framed.framed(&frame).is_err());
    }

    #[test]
    fn equality_includes_context() {
        let a = Variable::with_context("T", stack(vec![INLET.item(0u32).into()]));
        let b = Variable::with_context("T", stack(vec![INLET.item(1u32).into()]));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
