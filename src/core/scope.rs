//! Quantifier prefix: the ordered sequence of alternating-quantifier scopes.

use super::ids::Quant;
use super::var::{ScopeId, VarId};

/// One block of same-quantifier variables in the prefix, e.g. the `e 1 2 0`
/// or `a 3 4 0` line of a QDIMACS file (`spec.md` §6).
///
/// The not-yet-expanded-variables priority heap for this scope lives
/// alongside it in [`super::engine::Engine::scope_heaps`], not here: keeping
/// it out of `Arena` means scoring a variable (an `Arena` read) and writing
/// back the heap positions it moved (an `Arena` write) never have to borrow
/// the same struct at once.
pub(crate) struct Scope {
    pub(crate) id: ScopeId,
    pub(crate) quant: Quant,
    /// Position of this scope within [`ScopePrefix::scopes`]; outermost is 0.
    pub(crate) depth: u32,
    pub(crate) vars: Vec<VarId>,
}

impl Scope {
    pub(crate) fn new(id: ScopeId, quant: Quant, depth: u32) -> Self {
        Self {
            id,
            quant,
            depth,
            vars: Vec::new(),
        }
    }

    pub(crate) fn is_innermost(&self, prefix: &ScopePrefix) -> bool {
        self.depth as usize + 1 == prefix.scopes.len()
    }
}

/// The full quantifier prefix, outermost scope first.
///
/// A variable with no explicit scope line in the input is placed in the
/// default scope: existential, outermost (`spec.md` §6), created lazily by
/// [`super::arena::Arena::default_scope`] the first time it's needed (that
/// method, not this one, owns the remap of every existing variable's
/// `scope` field the insertion requires).
pub(crate) struct ScopePrefix {
    pub(crate) scopes: Vec<Scope>,
}

impl ScopePrefix {
    pub(crate) fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    pub(crate) fn push_scope(&mut self, quant: Quant) -> ScopeId {
        let id = self.scopes.len();
        self.scopes.push(Scope::new(id, quant, id as u32));
        id
    }

    pub(crate) fn innermost(&self) -> Option<&Scope> {
        self.scopes.last()
    }

    pub(crate) fn innermost_id(&self) -> Option<ScopeId> {
        self.scopes.last().map(|s| s.id)
    }

    pub(crate) fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id]
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.scopes.iter().all(|s| s.vars.is_empty())
    }
}

impl Default for ScopePrefix {
    fn default() -> Self {
        Self::new()
    }
}
