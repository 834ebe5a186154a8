// equation.rs — Symbolic equations contributed by leaf nodes
//
// Deliberately minimal: an equation is an ordered chain of terms asserted
// equal, and a term is a variable or a named function applied to terms.
// Nothing here simplifies or solves.

use std::fmt;

use crate::context::ContextFormat;
use crate::variable::Variable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Variable(Variable),
    Call { function: String, args: Vec<Term> },
}

impl Term {
    pub fn call(function: impl Into<String>, args: impl IntoIterator<Item = Term>) -> Self {
        Term::Call {
            function: function.into(),
            args: args.into_iter().collect(),
        }
    }

    pub fn format(&self, mode: ContextFormat) -> String {
        match self {
            Term::Variable(v) => v.format(mode),
            Term::Call { function, args } => {
                let args: Vec<String> = args.iter().map(|a| a.format(mode)).collect();
                format!("{function}({})", args.join(", "))
            }
        }
    }
}

impl From<Variable> for Term {
    fn from(v: Variable) -> Self {
        Term::Variable(v)
    }
}

/// `a = b = ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equation {
    terms: Vec<Term>,
}

impl Equation {
    pub fn new<I, T>(terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Term>,
    {
        Equation {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn format(&self, mode: ContextFormat) -> String {
        let terms: Vec<String> = self.terms.iter().map(|t| t.format(mode)).collect();
        terms.join(" = ")
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(ContextFormat::Named))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_terms_with_equals() {
        let eq = Equation::new([
            Term::call("sum", [Term::from(Variable::new("Fa")), Term::from(Variable::new("Fb"))]),
            Term::from(Variable::new("F")),
        ]);
        assert_eq!(eq.to_string(), "sum(Fa, Fb) = F");
        assert_eq!(eq.terms().len(), 2);
    }
}
