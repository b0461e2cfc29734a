//! Core data structures and algorithms for the expansion-based QBF solver:
//! the NNF circuit, its LCA/cost-model bookkeeping, simplification, and the
//! expansion operator (including non-innermost universal lifting).

pub(crate) mod arena;
pub(crate) mod cost;
pub(crate) mod engine;
pub(crate) mod expand;
pub(crate) mod flatten;
pub(crate) mod heap;
pub(crate) mod ids;
pub(crate) mod lca;
pub(crate) mod lit;
pub(crate) mod mutate;
pub(crate) mod node;
pub(crate) mod result;
pub(crate) mod scope;
pub(crate) mod simplify;
pub(crate) mod univ;
pub(crate) mod var;
