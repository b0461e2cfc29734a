//! Literals and their occurrence lists.

use super::ids::{NodeId, VarId};

/// One polarity of a variable.
///
/// Each [`super::var::Var`] owns exactly two `Lit`s, reachable as
/// `var.neg_lit` and `var.pos_lit`. A `Lit`'s occurrence list threads through
/// every [`super::node::Node`] of kind `Literal` that refers to it, in the
/// order such nodes were linked in (see
/// [`super::mutate::add_to_occurrence_list`]).
#[derive(Debug, Clone)]
pub(crate) struct Lit {
    pub(crate) var: VarId,
    pub(crate) negated: bool,
    pub(crate) occ_cnt: u32,
    pub(crate) occ_head: Option<NodeId>,
    pub(crate) occ_tail: Option<NodeId>,
}

impl Lit {
    pub(crate) fn new(var: VarId, negated: bool) -> Self {
        Self {
            var,
            negated,
            occ_cnt: 0,
            occ_head: None,
            occ_tail: None,
        }
    }

    pub(crate) fn is_empty_occ(&self) -> bool {
        self.occ_cnt == 0
    }
}
