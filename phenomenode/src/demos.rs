// demos.rs — Bundled demo models
//
// Small, fully built sessions shared by the CLI, the integration tests and
// the benchmark.
//
//   mixer   direct composite: Mixer(F, F) -> F, built through its hook
//   chain   scoped composite: A(F -> T), B(T -> P)
//   nested  scoped "plant" holding a Mixer and a scoped composite with a
//           tank feeding a splitter

use std::fmt;

use crate::builder::Builder;
use crate::error::Result;
use crate::id::NodeId;
use crate::model::Model;
use crate::phenomena::{self, Composite, Mixer, Split, SurgeTank};
use crate::registry::Registry;

/// A built session and the root of its demo tree.
#[derive(Debug)]
pub struct Demo {
    pub model: Model,
    pub registry: Registry,
    pub root: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoName {
    Mixer,
    Chain,
    Nested,
}

impl DemoName {
    pub const ALL: [DemoName; 3] = [DemoName::Mixer, DemoName::Chain, DemoName::Nested];

    pub fn as_str(self) -> &'static str {
        match self {
            DemoName::Mixer => "mixer",
            DemoName::Chain => "chain",
            DemoName::Nested => "nested",
        }
    }
}

impl fmt::Display for DemoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn build(name: DemoName) -> Result<Demo> {
    let mut model = Model::new();
    let mut registry = Registry::with_kinds(phenomena::kind_table()?);
    let root = {
        let mut b = Builder::new(&mut model, &mut registry);
        match name {
            DemoName::Mixer => mixer(&mut b)?,
            DemoName::Chain => chain(&mut b)?,
            DemoName::Nested => nested(&mut b)?,
        }
    };
    tracing::debug!(demo = %name, nodes = model.node_count(), varnodes = model.varnode_count(), "demo built");
    Ok(Demo { model, registry, root })
}

fn mixer(b: &mut Builder<'_>) -> Result<NodeId> {
    b.node(Mixer).ins(["F", "F"]).outs(["F"]).build()
}

fn chain(b: &mut Builder<'_>) -> Result<NodeId> {
    b.node(Composite).scoped(|b| {
        let a = b.node(SurgeTank).ins(["F"]).outs(["T"]).build()?;
        let t = b.model().outs(a)?.varnodes().to_vec();
        b.node(SurgeTank).ins(t).outs(["P"]).build()?;
        Ok(())
    })
}

fn nested(b: &mut Builder<'_>) -> Result<NodeId> {
    b.node(Composite).named("plant").scoped(|b| {
        let x = b.node(Mixer).ins(["F", "F"]).outs(["F"]).build()?;
        let mixed = b.model().outs(x)?.varnodes().to_vec();
        b.node(Composite).scoped(|b| {
            let tank = b.node(SurgeTank).ins(mixed).outs(["F"]).build()?;
            let held = b.model().outs(tank)?.varnodes().to_vec();
            b.node(Split).ins(held).outs(["F", "F"]).build()?;
            Ok(())
        })?;
        Ok(())
    })
}
