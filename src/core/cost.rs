//! Expansion cost model: `inc_score`, `dec_score`, and LCA refresh.
//!
//! See `spec.md` §4.D and §4.H. `refresh` is the single entry point the main
//! loop (component K) calls for every variable drained off
//! `vars_marked_for_update`; it recomputes exactly the pieces whose dirty
//! flag is set and leaves the others untouched.

use super::arena::Arena;
use super::ids::{Junctor, LitId, NodeId, Quant, VarId};
use super::lca::{self, LcaObject};
use super::node::{Kind, Marks};

/// Recomputes whichever of a variable's LCA / `inc_score` / `dec_score` are
/// currently marked dirty, then recombines `score = inc - dec`. Clears the
/// dirty flags it acted on.
pub(crate) fn refresh(arena: &mut Arena, var: VarId) {
    if arena.var(var).lca_update_mark {
        refresh_lca(arena, var);
        arena.var_mut(var).lca_update_mark = false;
    }
    if arena.var(var).inc_score_update_mark {
        let inc = compute_inc_score(arena, var);
        arena.var_mut(var).exp_costs.inc_score = inc;
        arena.var_mut(var).inc_score_update_mark = false;
    }
    if arena.var(var).dec_score_update_mark {
        let dec = compute_dec_score(arena, var);
        arena.var_mut(var).exp_costs.dec_score = dec;
        arena.var_mut(var).dec_score_update_mark = false;
    }
    let costs = &mut arena.var_mut(var).exp_costs;
    costs.score = costs.inc_score as i64 - costs.dec_score as i64;
}

/// Full recomputation of `var`'s LCA object from its current occurrence
/// list, per `spec.md` §4.D: first unlinks `var` from its previous LCA's
/// `var_lca_list` and every previous LCA-child's back-index, then rebuilds
/// both from scratch via the two-pointer merge in [`super::lca`].
fn refresh_lca(arena: &mut Arena, var: VarId) {
    detach_from_lca(arena, var);

    let mut obj = LcaObject::default();
    let (neg_lit, pos_lit) = {
        let v = arena.var(var);
        (v.neg_lit, v.pos_lit)
    };
    for lit in [neg_lit, pos_lit] {
        let mut cur = arena.lit(lit).occ_head;
        while let Some(node) = cur {
            lca::add_node(arena, &mut obj, node, |_| {}, |_| {});
            cur = arena.node(node).occ_next;
        }
    }

    install_lca_object(arena, var, obj);
}

/// Installs `obj` as `var`'s current LCA object, rebuilding the bidirectional
/// back-indices (`lca_child_list_occs`/`pos_in_lca_children`) and
/// `var_lca_list` membership from scratch. Callers must have already
/// detached `var` from whatever it was linked under before
/// (e.g. via [`detach_from_lca`]). Shared by ordinary refresh and by
/// [`super::univ`]'s dependency-driven LCA extension, which computes `obj`
/// by a different route (unifying several variables' LCAs) but needs the
/// same bookkeeping installed.
pub(crate) fn install_lca_object(arena: &mut Arena, var: VarId, obj: LcaObject) {
    let mut positions = Vec::with_capacity(obj.children.len());
    for (idx, &child) in obj.children.iter().enumerate() {
        let occ_pos = arena.node(child).lca_child_list_occs.len();
        arena.node_mut(child).lca_child_list_occs.push(var);
        arena.node_mut(child).pos_in_lca_children.push(idx);
        positions.push(occ_pos);
    }
    arena.var_mut(var).pos_in_lca_child_list_occs = positions;
    if let Some(lca) = obj.lca {
        link_var_into_lca_list(arena, lca, var);
    }
    arena.var_mut(var).exp_costs.lca_object = obj;
}

pub(crate) fn detach_from_lca(arena: &mut Arena, var: VarId) {
    let old_children = arena.var(var).exp_costs.lca_object.children.clone();
    let old_positions = arena.var(var).pos_in_lca_child_list_occs.clone();
    for (child, pos) in old_children.into_iter().zip(old_positions) {
        remove_lca_child_occ(arena, child, pos);
    }
    arena.var_mut(var).pos_in_lca_child_list_occs.clear();
    if let Some(lca) = arena.var(var).exp_costs.lca_object.lca {
        unlink_var_from_lca_list(arena, lca, var);
    }
}

/// Removes the occurrence-back-index entry at `pos` on `child`, swap-removing
/// and repairing the moved entry's own `pos_in_lca_child_list_occs` so
/// invariant 8 (`spec.md` §3) keeps holding for every other variable.
fn remove_lca_child_occ(arena: &mut Arena, child: NodeId, pos: usize) {
    let last = arena.node(child).lca_child_list_occs.len() - 1;
    arena.node_mut(child).lca_child_list_occs.swap_remove(pos);
    arena.node_mut(child).pos_in_lca_children.swap_remove(pos);
    if pos != last {
        let moved_var = arena.node(child).lca_child_list_occs[pos];
        let moved_child_idx = arena.node(child).pos_in_lca_children[pos];
        arena.var_mut(moved_var).pos_in_lca_child_list_occs[moved_child_idx] = pos;
    }
}

fn unlink_var_from_lca_list(arena: &mut Arena, lca: NodeId, var: VarId) {
    let prev = arena.var(var).var_lca_prev;
    let next = arena.var(var).var_lca_next;
    match prev {
        Some(p) => arena.var_mut(p).var_lca_next = next,
        None => arena.node_mut(lca).var_lca_list_head = next,
    }
    match next {
        Some(n) => arena.var_mut(n).var_lca_prev = prev,
        None => arena.node_mut(lca).var_lca_list_tail = prev,
    }
    arena.var_mut(var).var_lca_prev = None;
    arena.var_mut(var).var_lca_next = None;
}

fn link_var_into_lca_list(arena: &mut Arena, lca: NodeId, var: VarId) {
    let tail = arena.node(lca).var_lca_list_tail;
    arena.var_mut(var).var_lca_prev = tail;
    arena.var_mut(var).var_lca_next = None;
    match tail {
        Some(t) => arena.var_mut(t).var_lca_next = Some(var),
        None => arena.node_mut(lca).var_lca_list_head = Some(var),
    }
    arena.node_mut(lca).var_lca_list_tail = Some(var);
}

/// The 8-case table of `spec.md` §4.H. Returns 0 under the short-circuit:
/// the LCA itself is a literal, or one of the LCA-children is a literal
/// occurrence of `var` (both mean expansion resolves `var` preemptively
/// rather than duplicating any subtree).
fn compute_inc_score(arena: &Arena, var: VarId) -> u32 {
    let obj = &arena.var(var).exp_costs.lca_object;
    let Some(l) = obj.lca else {
        return 0;
    };
    if matches!(arena.node(l).kind, Kind::Literal(_)) {
        return 0;
    }
    for &c in &obj.children {
        if let Kind::Literal(lit) = arena.node(c).kind {
            if arena.lit(lit).var == var {
                return 0;
            }
        }
    }

    let junctor = arena.node(l).junctor().expect("non-literal LCA must be an operator");
    let quant = arena.quant_of_var(var);
    let full = obj.children.len() == arena.node(l).num_children as usize;
    let sum_children: u32 = obj
        .children
        .iter()
        .map(|&c| arena.node(c).size_subformula)
        .sum();
    let size_l = arena.node(l).size_subformula;
    let root_bonus = u32::from(arena.node(l).is_root());

    match (quant, junctor, full) {
        (Quant::Exists, Junctor::And, true) => size_l + root_bonus,
        (Quant::Exists, Junctor::Or, true) => sum_children,
        (Quant::Exists, Junctor::And, false) => sum_children + 3,
        (Quant::Exists, Junctor::Or, false) => sum_children,
        (Quant::Forall, Junctor::Or, true) => size_l + root_bonus,
        (Quant::Forall, Junctor::And, true) => sum_children,
        (Quant::Forall, Junctor::Or, false) => sum_children + 3,
        (Quant::Forall, Junctor::And, false) => sum_children,
    }
}

/// Upper bound on nodes deleted by propagating `var := true` and, separately,
/// `var := false` (`spec.md` §4.H). Each pass climbs from every occurrence
/// to the highest ancestor that assignment would delete wholesale, dedupes
/// ancestors shared by multiple occurrences via [`Marks::DEC_COLLECTED`],
/// and sums their `size_subformula`.
fn compute_dec_score(arena: &mut Arena, var: VarId) -> u32 {
    dec_for_assignment(arena, var, true) + dec_for_assignment(arena, var, false)
}

fn dec_for_assignment(arena: &mut Arena, var: VarId, assign_true: bool) -> u32 {
    let (neg_lit, pos_lit) = {
        let v = arena.var(var);
        (v.neg_lit, v.pos_lit)
    };
    let (satisfied_lit, falsified_lit) = if assign_true {
        (pos_lit, neg_lit)
    } else {
        (neg_lit, pos_lit)
    };

    let mut highests = Vec::new();
    collect_highest_killed(arena, satisfied_lit, true, &mut highests);
    collect_highest_killed(arena, falsified_lit, false, &mut highests);

    let mut total = 0u32;
    for &node in &highests {
        if !arena.node(node).marks.is_set(Marks::DEC_COLLECTED) {
            arena.node_mut(node).marks.set(Marks::DEC_COLLECTED);
            total += arena.node(node).size_subformula;
        }
    }
    for &node in &highests {
        arena.node_mut(node).marks.clear(Marks::DEC_COLLECTED);
    }
    total
}

fn collect_highest_killed(arena: &Arena, lit: LitId, satisfied: bool, out: &mut Vec<NodeId>) {
    let mut cur = arena.lit(lit).occ_head;
    while let Some(node) = cur {
        out.push(highest_killed_ancestor(arena, node, satisfied));
        cur = arena.node(node).occ_next;
    }
}

/// Climbs from a literal occurrence through every ancestor that propagating
/// its value would delete entirely: an `Or` parent when the literal becomes
/// true (the whole disjunction is satisfied), an `And` parent when it
/// becomes false (the whole conjunction is falsified).
fn highest_killed_ancestor(arena: &Arena, node: NodeId, satisfied: bool) -> NodeId {
    let mut highest = node;
    loop {
        match arena.node(highest).parent {
            None => break,
            Some(p) => {
                let junctor = arena.node(p).junctor().expect("literal's ancestor must be an operator");
                let kills = matches!(
                    (junctor, satisfied),
                    (Junctor::Or, true) | (Junctor::And, false)
                );
                if kills {
                    highest = p;
                } else {
                    break;
                }
            }
        }
    }
    highest
}
