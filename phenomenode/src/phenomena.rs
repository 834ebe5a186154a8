// phenomena.rs — A handful of concrete phenomenon kinds
//
// Enough to exercise the builder from tests, the CLI and the benchmark:
//
//   SurgeTank  t  leaf, each inlet equals the outlet at the same position
//   Mix        m  leaf, sum over inlets equals each outlet
//   Split      s  leaf, inlet equals the sum over outlets
//   Mixer      x  direct composite, builds one Mix over its own gates
//   Composite  n  generic scoped composite
//
// None of these kinds are built in; call `declare_all` (or use
// `kind_table`) before building with them.

use crate::builder::Builder;
use crate::context::{ContextKind, KindTable, NODE};
use crate::equation::{Equation, Term};
use crate::error::{Error, Result};
use crate::id::NodeId;
use crate::node::{NodeView, Phenomenon};

pub const SURGE_TANK: ContextKind = ContextKind::new("SurgeTank", 't');
pub const MIX: ContextKind = ContextKind::new("Mix", 'm');
pub const SPLIT: ContextKind = ContextKind::new("Split", 's');
pub const MIXER: ContextKind = ContextKind::new("Mixer", 'x');

/// Declare every kind defined here.
pub fn declare_all(table: &mut KindTable) -> Result<()> {
    for kind in [SURGE_TANK, MIX, SPLIT, MIXER] {
        table.declare_kind(kind)?;
    }
    Ok(())
}

/// Built-in kinds plus every kind defined here.
pub fn kind_table() -> Result<KindTable> {
    let mut table = KindTable::builtin();
    declare_all(&mut table)?;
    Ok(table)
}

fn sum(terms: impl IntoIterator<Item = Term>) -> Term {
    Term::call("sum", terms)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SurgeTank;

impl Phenomenon for SurgeTank {
    fn kind(&self) -> ContextKind {
        SURGE_TANK
    }

    fn equations(&self, view: &NodeView<'_>) -> Result<Vec<Equation>> {
        let ins = view.inlet_variables()?;
        let outs = view.outlet_variables()?;
        Ok(ins
            .into_iter()
            .zip(outs)
            .map(|(i, o)| Equation::new([i, o]))
            .collect())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Mix;

impl Phenomenon for Mix {
    fn kind(&self) -> ContextKind {
        MIX
    }

    fn equations(&self, view: &NodeView<'_>) -> Result<Vec<Equation>> {
        let mixed = match view.inlet_family() {
            Ok(Some(family)) => sum([Term::from(family)]),
            Ok(None) => return Ok(Vec::new()),
            // heterogeneous inlets are summed one by one
            Err(Error::MixedFamily { .. }) => sum(view.inlet_variables()?.into_iter().map(Term::from)),
            Err(e) => return Err(e),
        };
        Ok(view
            .outlet_variables()?
            .into_iter()
            .map(|o| Equation::new([mixed.clone(), Term::from(o)]))
            .collect())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Split;

impl Phenomenon for Split {
    fn kind(&self) -> ContextKind {
        SPLIT
    }

    fn equations(&self, view: &NodeView<'_>) -> Result<Vec<Equation>> {
        let outs: Vec<Term> = view.outlet_variables()?.into_iter().map(Term::from).collect();
        if outs.is_empty() {
            return Ok(Vec::new());
        }
        Ok(view
            .inlet_variables()?
            .into_iter()
            .map(|i| Equation::new([Term::from(i), sum(outs.clone())]))
            .collect())
    }
}

/// Composite that mixes its inlets into its outlets through one `Mix`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mixer;

impl Phenomenon for Mixer {
    fn kind(&self) -> ContextKind {
        MIXER
    }

    fn build(&mut self, b: &mut Builder<'_>, node: NodeId) -> Result<()> {
        let ins = b.model().ins(node)?.varnodes().to_vec();
        let outs = b.model().outs(node)?.varnodes().to_vec();
        b.node(Mix).ins(ins).outs(outs).build()?;
        Ok(())
    }
}

/// Plain scoped composite; its gates come from boundary inference.
#[derive(Debug, Clone, Copy, Default)]
pub struct Composite;

impl Phenomenon for Composite {
    fn kind(&self) -> ContextKind {
        NODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextFormat;
    use crate::model::Model;
    use crate::registry::Registry;

    fn session() -> (Model, Registry) {
        (Model::new(), Registry::with_kinds(kind_table().unwrap()))
    }

    #[test]
    fn declaring_twice_collides() {
        let mut table = kind_table().unwrap();
        let err = declare_all(&mut table).unwrap_err();
        assert!(matches!(err, Error::DuplicateTag { tag: 't', .. }));
    }

    #[test]
    fn mixer_equations_use_inlet_family() {
        let (mut model, mut registry) = session();
        let x = Builder::new(&mut model, &mut registry)
            .node(Mixer)
            .ins(["F", "F"])
            .outs(["F"])
            .build()
            .unwrap();
        let eqs = model.equations(x).unwrap();
        assert_eq!(eqs.len(), 1);
        assert_eq!(
            eqs[0].format(ContextFormat::Short),
            "sum(F[x=0, m=0, i]) = F[x=0, m=0, o=0]"
        );
    }

    #[test]
    fn mix_with_mixed_inlets_sums_each() {
        let (mut model, mut registry) = session();
        let m = Builder::new(&mut model, &mut registry)
            .node(Mix)
            .ins(["A", "B"])
            .outs(["C"])
            .build()
            .unwrap();
        let eqs = model.equations(m).unwrap();
        assert_eq!(eqs[0].to_string(), "sum(A[m=0, i=0], B[m=0, i=1]) = C[m=0, o=0]");
    }

    #[test]
    fn split_sums_outlets() {
        let (mut model, mut registry) = session();
        let s = Builder::new(&mut model, &mut registry)
            .node(Split)
            .ins(["F"])
            .outs(["F", "F"])
            .build()
            .unwrap();
        let eqs = model.equations(s).unwrap();
        assert_eq!(eqs[0].to_string(), "F[s=0, i=0] = sum(F[s=0, o=0], F[s=0, o=1])");
    }

    #[test]
    fn surge_tank_pairs_ports() {
        let (mut model, mut registry) = session();
        let t = Builder::new(&mut model, &mut registry)
            .node(SurgeTank)
            .ins(["F", "T"])
            .outs(["F", "T"])
            .build()
            .unwrap();
        let eqs: Vec<String> = model.equations(t).unwrap().iter().map(|e| e.to_string()).collect();
        assert_eq!(eqs, vec!["F[t=0, i=0] = F[t=0, o=0]", "T[t=0, i=1] = T[t=0, o=1]"]);
    }
}
