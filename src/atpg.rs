//! The pluggable optimiser seam (`spec.md` §1): the ATPG / global-flow
//! redundancy-removal subsystem is out of scope, but the contract it would
//! implement — consuming and clearing the engine's "changed subformula"
//! view (component E) — is modeled here so the main loop (component K) has
//! somewhere real to call.

use crate::core::engine::Engine;

pub(crate) trait SubformulaOptimizer {
    /// Consumes `engine.changed_subformula`. Implementations that don't
    /// rewrite anything must still clear it — the engine-wide tracker
    /// assumes each optimiser pass drains what it was given (`spec.md`
    /// §4.E).
    fn optimize(&mut self, engine: &mut Engine);
}

/// Selected by `--no-atpg`, `--no-global-flow`, and `--no-optimizations`
/// alike, and used whenever no real optimiser is wired in.
pub(crate) struct NoopOptimizer;

impl SubformulaOptimizer for NoopOptimizer {
    fn optimize(&mut self, engine: &mut Engine) {
        engine.changed_subformula.reset();
    }
}
