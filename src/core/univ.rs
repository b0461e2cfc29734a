//! Non-innermost universal expansion with dependency copying (`spec.md`
//! §4.I, "Universal expansion", and §4.J).
//!
//! Expanding a universal variable that is not in the innermost scope is only
//! sound if every existential variable whose witness could legitimately
//! depend on it is given two independent copies, one per branch — otherwise
//! the same existential "function" would have to satisfy both of the
//! universal's branches simultaneously, which is exactly what quantifier
//! order forbids. [`collect_dependencies`] finds that set by growing the
//! universal's own LCA until it also covers every depending variable's own
//! LCA (a fixpoint: pulling in one variable's subtree can bring new
//! variables' occurrences into view). [`expand_with_lifting`] then re-homes
//! the universal under the extended LCA and runs the ordinary expansion
//! operator ([`expand::expand_with_subst`]) with a substitution map that
//! sends each depending variable to a freshly allocated copy on one branch
//! only.

use rustc_hash::FxHashMap;

use super::arena::Arena;
use super::cost;
use super::expand;
use super::ids::{Quant, VarId};
use super::lca::{self, LcaObject};
use super::node::Kind;

/// The result of [`collect_dependencies`]: `var`'s LCA, extended to cover
/// every depending variable, and the depending variables themselves in
/// discovery order.
pub(crate) struct Dependencies {
    pub(crate) ext: LcaObject,
    pub(crate) depending: Vec<VarId>,
}

/// Grows `var`'s own LCA object into one that also covers every existential
/// variable, scoped deeper than `var`, that occurs in the growing subtree —
/// iterating until a pass over the current subtree finds nothing new.
///
/// Requires every live variable's `exp_costs.lca_object` to be up to date,
/// which holds for any variable that has gone through at least one
/// [`cost::refresh`]; the main loop refreshes every dirty variable before
/// any variable is selected for expansion, so this is always true by the
/// time a universal is chosen.
pub(crate) fn collect_dependencies(arena: &Arena, var: VarId) -> Dependencies {
    let mut ext = arena.var(var).exp_costs.lca_object.clone();
    let mut depending: Vec<VarId> = Vec::new();
    let var_depth = arena.prefix.scope(arena.var(var).scope).depth;

    loop {
        let Some(root) = ext.lca else { break };
        let mut found_new = false;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            match arena.node(node).kind {
                Kind::Literal(lit) => {
                    let w = arena.lit(lit).var;
                    if w == var || depending.contains(&w) || arena.var(w).eliminated {
                        continue;
                    }
                    if arena.quant_of_var(w) != Quant::Exists {
                        continue;
                    }
                    let w_depth = arena.prefix.scope(arena.var(w).scope).depth;
                    if w_depth <= var_depth {
                        continue;
                    }
                    depending.push(w);
                    found_new = true;
                    if let Some(w_lca) = arena.var(w).exp_costs.lca_object.lca {
                        lca::add_node(arena, &mut ext, w_lca, |_| {}, |_| {});
                    }
                }
                Kind::Op(_) => {
                    for c in arena.children(node) {
                        stack.push(c);
                    }
                }
            }
        }
        if !found_new {
            break;
        }
    }

    Dependencies { ext, depending }
}

/// Outcome of a non-innermost universal expansion: whatever value was
/// determined (if any), plus every variable whose dirty flags and heap
/// membership the engine must now refresh.
pub(crate) struct LiftingOutcome {
    pub(crate) result: Option<bool>,
    /// The depending set plus every variable the substituted expansion
    /// found occupying a node it freed: all already members of their
    /// scope's heap, but with stale LCA bookkeeping that needs a refresh.
    pub(crate) touched_existing: Vec<VarId>,
    /// Freshly allocated copies: need both a score refresh and their first
    /// insertion onto their scope's heap.
    pub(crate) new_copies: Vec<VarId>,
}

/// Eliminates the non-innermost universal `var`, first extending its LCA to
/// cover every existential variable that depends on it and giving each of
/// those a fresh, independent copy for one branch.
pub(crate) fn expand_with_lifting(
    arena: &mut Arena,
    changed: &mut LcaObject,
    var: VarId,
) -> LiftingOutcome {
    debug_assert_eq!(arena.quant_of_var(var), Quant::Forall);
    debug_assert!(!arena.var(var).eliminated);

    let deps = collect_dependencies(arena, var);

    cost::detach_from_lca(arena, var);
    cost::install_lca_object(arena, var, deps.ext);

    let mut subst = FxHashMap::default();
    let mut new_copies = Vec::with_capacity(deps.depending.len());
    for &w in &deps.depending {
        let scope = arena.var(w).scope;
        let copy = arena.add_var(scope);
        arena.var_mut(w).copied = Some(copy);
        subst.insert(w, copy);
        new_copies.push(copy);
    }

    // Convention: the `true` branch keeps every depending variable's
    // original identity, the `false` branch substitutes each for its fresh
    // copy. Either assignment of branches to {original, copy} is sound —
    // the two branches are symmetric under relabeling — so only
    // consistency with [`expand::expand_with_subst`]'s own convention
    // matters here.
    let mut touched = Vec::new();
    let result = expand::expand_with_subst(arena, changed, var, None, Some(&subst), &mut touched);

    for &w in &deps.depending {
        arena.var_mut(w).copied = None;
    }

    let mut touched_existing = deps.depending;
    for v in touched {
        if v != var && !touched_existing.contains(&v) && !new_copies.contains(&v) {
            touched_existing.push(v);
        }
    }

    LiftingOutcome {
        result,
        touched_existing,
        new_copies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::Junctor;
    use crate::core::mutate;

    /// `a x . e y . (x | y) & (-x | -y)`: `y`'s witness must differ across
    /// `x`'s two branches (`y := -x`), so lifting `x` over the innermost `y`
    /// must find `y` as a dependency and give it a copy.
    #[test]
    fn collect_dependencies_finds_inner_existential() {
        let mut arena = Arena::new();
        let a = arena.prefix.push_scope(Quant::Forall);
        let e = arena.prefix.push_scope(Quant::Exists);
        let x = arena.add_var(a);
        let y = arena.add_var(e);

        let root = arena.add_op_node(Junctor::And);
        let c1 = arena.add_op_node(Junctor::Or);
        let c2 = arena.add_op_node(Junctor::Or);
        let x_pos = arena.add_literal_node(x, false);
        let y_pos = arena.add_literal_node(y, false);
        let x_neg = arena.add_literal_node(x, true);
        let y_neg = arena.add_literal_node(y, true);
        for n in [x_pos, y_pos, x_neg, y_neg] {
            mutate::add_to_occurrence_list(&mut arena, n);
        }
        mutate::append_child(&mut arena, c1, x_pos);
        mutate::append_child(&mut arena, c1, y_pos);
        mutate::append_child(&mut arena, c2, x_neg);
        mutate::append_child(&mut arena, c2, y_neg);
        mutate::append_child(&mut arena, root, c1);
        mutate::append_child(&mut arena, root, c2);
        mutate::update_size_subformula(&mut arena, root);
        arena.root = Some(root);
        mutate::update_level(&mut arena, root);

        cost::refresh(&mut arena, x);
        cost::refresh(&mut arena, y);

        let deps = collect_dependencies(&arena, x);
        assert_eq!(deps.depending, vec![y]);
        assert_eq!(deps.ext.lca, Some(root));
    }

    #[test]
    fn expand_with_lifting_creates_one_copy_per_dependency() {
        let mut arena = Arena::new();
        let a = arena.prefix.push_scope(Quant::Forall);
        let e = arena.prefix.push_scope(Quant::Exists);
        let x = arena.add_var(a);
        let y = arena.add_var(e);

        let root = arena.add_op_node(Junctor::And);
        let c1 = arena.add_op_node(Junctor::Or);
        let c2 = arena.add_op_node(Junctor::Or);
        let x_pos = arena.add_literal_node(x, false);
        let y_pos = arena.add_literal_node(y, false);
        let x_neg = arena.add_literal_node(x, true);
        let y_neg = arena.add_literal_node(y, true);
        for n in [x_pos, y_pos, x_neg, y_neg] {
            mutate::add_to_occurrence_list(&mut arena, n);
        }
        mutate::append_child(&mut arena, c1, x_pos);
        mutate::append_child(&mut arena, c1, y_pos);
        mutate::append_child(&mut arena, c2, x_neg);
        mutate::append_child(&mut arena, c2, y_neg);
        mutate::append_child(&mut arena, root, c1);
        mutate::append_child(&mut arena, root, c2);
        mutate::update_size_subformula(&mut arena, root);
        arena.root = Some(root);
        mutate::update_level(&mut arena, root);

        cost::refresh(&mut arena, x);
        cost::refresh(&mut arena, y);

        let vars_before = arena.vars.len();
        let mut changed = LcaObject::default();
        let outcome = expand_with_lifting(&mut arena, &mut changed, x);

        assert_eq!(outcome.touched_existing, vec![y]);
        assert_eq!(outcome.new_copies.len(), 1);
        assert_eq!(arena.vars.len(), vars_before + 1);
        assert!(arena.var(x).eliminated);
        assert!(!arena.var(y).eliminated);
    }
}
