//! Identifier types shared across the arena.
//!
//! Mirrors `clausy::core::expr::ExprId` / `clausy::core::var::VarId`: plain
//! index aliases into the arena's dense vectors rather than newtypes, since
//! every arena method already takes `&mut Arena` and the indices never cross
//! between different arenas.

/// Index into [`crate::core::arena::Arena::nodes`].
pub(crate) type NodeId = usize;

/// Index into [`crate::core::arena::Arena::vars`].
pub(crate) type VarId = usize;

/// Index into [`crate::core::arena::Arena::lits`].
///
/// Each [`crate::core::var::Var`] owns exactly two [`crate::core::lit::Lit`]s
/// (negative at index `2*var_id`, positive at `2*var_id + 1`), so a `LitId`
/// can be converted to and from a signed DIMACS-style literal.
pub(crate) type LitId = usize;

/// The quantifier of a [`crate::core::scope::Scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quant {
    /// Existential (`e`) quantification.
    Exists,
    /// Universal (`a`) quantification.
    Forall,
}

impl Quant {
    /// Returns the dual quantifier.
    pub(crate) fn dual(self) -> Self {
        match self {
            Quant::Exists => Quant::Forall,
            Quant::Forall => Quant::Exists,
        }
    }
}

/// The two junctor kinds an operator [`crate::core::node::Node`] can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Junctor {
    And,
    Or,
}

impl Junctor {
    /// The junctor dual to this one (used pervasively by expansion and NNF negation).
    pub(crate) fn dual(self) -> Self {
        match self {
            Junctor::And => Junctor::Or,
            Junctor::Or => Junctor::And,
        }
    }
}
