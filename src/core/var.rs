//! Variables and their expansion bookkeeping.

use super::ids::{LitId, VarId};
use super::lca::LcaObject;

/// Index into [`super::scope::ScopePrefix::scopes`].
pub(crate) type ScopeId = usize;

/// The predicted cost of expanding a variable, plus the LCA object it is
/// derived from.
///
/// See `spec.md` §4.H. `score` is always `inc_score as i64 - dec_score as i64`;
/// it is kept denormalized (rather than computed on read) so the priority
/// heap can compare keys without re-deriving them.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExpCosts {
    pub(crate) lca_object: LcaObject,
    pub(crate) inc_score: u32,
    pub(crate) dec_score: u32,
    pub(crate) score: i64,
}

/// A quantified variable.
///
/// See `spec.md` §3. Dirty flags are set by mutation primitives (component F)
/// and drained exclusively by the score-refresh pass at the top of the main
/// loop (component K), per `spec.md` §5.
#[derive(Debug, Clone)]
pub(crate) struct Var {
    pub(crate) id: VarId,
    pub(crate) scope: ScopeId,
    pub(crate) neg_lit: LitId,
    pub(crate) pos_lit: LitId,
    pub(crate) exp_costs: ExpCosts,

    pub(crate) lca_update_mark: bool,
    pub(crate) inc_score_update_mark: bool,
    pub(crate) dec_score_update_mark: bool,
    pub(crate) collected_for_update: bool,
    pub(crate) collected_as_unate: bool,
    pub(crate) collected_as_depending: bool,

    /// Position in the owning scope's priority heap, or `None` if absent
    /// (already expanded, or not yet inserted).
    pub(crate) heap_pos: Option<usize>,

    /// Doubly-linked membership in `exp_costs.lca_object.lca`'s `var_lca_list`.
    pub(crate) var_lca_prev: Option<VarId>,
    pub(crate) var_lca_next: Option<VarId>,

    /// Parallel to `exp_costs.lca_object.children`: for `children[i]`, the
    /// index of this variable's entry in that child's `lca_child_list_occs`
    /// (and the paired `pos_in_lca_children`), so unlinking is O(1).
    pub(crate) pos_in_lca_child_list_occs: Vec<usize>,

    /// Transient back-reference to this variable's copy, used only during
    /// non-innermost universal expansion (`spec.md` §4.J).
    pub(crate) copied: Option<VarId>,

    pub(crate) eliminated: bool,
}

impl Var {
    pub(crate) fn new(id: VarId, scope: ScopeId, neg_lit: LitId, pos_lit: LitId) -> Self {
        Self {
            id,
            scope,
            neg_lit,
            pos_lit,
            exp_costs: ExpCosts::default(),
            lca_update_mark: true,
            inc_score_update_mark: true,
            dec_score_update_mark: true,
            collected_for_update: false,
            collected_as_unate: false,
            collected_as_depending: false,
            heap_pos: None,
            var_lca_prev: None,
            var_lca_next: None,
            pos_in_lca_child_list_occs: Vec::new(),
            copied: None,
            eliminated: false,
        }
    }

    pub(crate) fn lit(&self, negated: bool) -> LitId {
        if negated {
            self.neg_lit
        } else {
            self.pos_lit
        }
    }

    /// Marks every dirty flag that a structural change near this variable's
    /// occurrences could invalidate (`spec.md` §4.H, last paragraph).
    pub(crate) fn mark_all_dirty(&mut self) {
        self.lca_update_mark = true;
        self.inc_score_update_mark = true;
        self.dec_score_update_mark = true;
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.lca_update_mark || self.inc_score_update_mark || self.dec_score_update_mark
    }
}

/// An existential variable created transiently while copying the dependency
/// set of a non-innermost universal expansion (`spec.md` §4.I/§4.J).
#[derive(Debug, Clone, Copy)]
pub(crate) struct CopiedVar {
    pub(crate) original: VarId,
    pub(crate) copy: VarId,
}
