//! CNF emission (`spec.md` §4.M, §6): turns the purely-propositional (or,
//! in tautology-checking mode, purely-universal) residual NNF matrix into
//! DIMACS CNF for the SAT oracle.

pub(crate) mod tseitin;

use std::fmt;

/// A CNF formula in DIMACS form.
#[derive(Debug, Clone)]
pub(crate) struct CnfFormula {
    pub(crate) num_vars: u32,
    pub(crate) clauses: Vec<Vec<i32>>,
}

impl fmt::Display for CnfFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "p cnf {} {}", self.num_vars, self.clauses.len())?;
        for clause in &self.clauses {
            for lit in clause {
                write!(f, "{lit} ")?;
            }
            writeln!(f, "0")?;
        }
        Ok(())
    }
}
