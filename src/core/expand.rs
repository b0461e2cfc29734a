//! The expansion operator: eliminating one quantified variable by
//! substituting both of its truth values (`spec.md` §4.I).
//!
//! The eight structural cases of the cost table (`spec.md` §4.H) collapse
//! here into three code paths, dispatched on how the LCA's own junctor
//! relates to the *split junctor* (`Or` for an existential variable, `And`
//! for a universal one — the kind of node expansion introduces to hold the
//! two branches):
//!
//! - [`expand_matching`]: the LCA's junctor already equals the split
//!   junctor, so both branches splice directly into the LCA as new
//!   children — no wrapper node is needed (`spec.md` table rows where `inc`
//!   has no `+3`).
//! - [`expand_wrap_whole`]: the LCA (or, degenerately, a bare literal with
//!   a single occurrence) is replaced wholesale by a new split node over
//!   two full copies (the "full coverage, opposite junctor" rows, `inc =
//!   size(L) [+1 at root]`).
//! - [`expand_wrap_partial`]: only some of the LCA's children are touched;
//!   a new split node, containing two freshly built bodies of the LCA's own
//!   junctor, replaces just that subset (the "partial coverage, opposite
//!   junctor" rows, `inc = Σ size(c) + 3`).
//!
//! The `contained_lit` short-circuit of `spec.md` §4.H needs no special
//! case at all: [`copy_with_assignment`] resolves a literal occurrence of
//! the variable being expanded to a [`CopyResult::Const`] immediately, and
//! [`combine_copies`] folds that straight through, so a cheap expansion
//! simply produces little or no new structure on its own.
//!
//! Each of the two branch copies additionally takes an optional variable
//! substitution map, used only by [`super::univ`]'s non-innermost universal
//! expansion (`spec.md` §4.J): a depending existential variable must end up
//! as two independent variables, one per branch, rather than the same
//! variable shared across both (which every other, non-depending variable
//! correctly is).

use super::arena::Arena;
use super::cost;
use super::ids::{Junctor, NodeId, Quant, VarId};
use super::lca::{self, LcaObject};
use super::mutate;
use super::node::Kind;
use super::simplify;
use rustc_hash::FxHashMap;

/// The result of copying a subtree under a literal assignment: either a
/// freshly built node, or a Boolean the subtree collapsed to because every
/// path through it bottomed out at the assigned variable.
enum CopyResult {
    Node(NodeId),
    Const(bool),
}

/// No variable is substituted; the ordinary case for every expansion except
/// non-innermost universal lifting.
type Subst<'a> = Option<&'a FxHashMap<VarId, VarId>>;

/// Eliminates `var`, which must have a freshly refreshed LCA object
/// ([`cost::refresh`]). Returns `Some(value)` if this expansion determined
/// the truth value of the entire formula (the root collapsed to a
/// constant). `changed` is the engine-wide "changed subformula" tracker
/// (`spec.md` §4.E), updated to include whatever node now stands in the
/// expanded region.
pub(crate) fn expand(
    arena: &mut Arena,
    changed: &mut LcaObject,
    var: VarId,
    touched: &mut Vec<VarId>,
) -> Option<bool> {
    expand_with_subst(arena, changed, var, None, None, touched)
}

/// As [`expand`], but the `true`/`false` branch copies apply `subst_true`/
/// `subst_false` respectively: any non-expanded literal whose variable is a
/// key of the map is copied as an occurrence of the mapped variable instead
/// of the original (`spec.md` §4.J, "depending existential variable copy").
/// Every variable whose LCA bookkeeping referenced a node freed during this
/// expansion is appended to `touched`; the caller must run each one through
/// [`super::engine::Engine::mark_dirty`] before relying on its LCA again.
#[allow(clippy::too_many_arguments)]
pub(crate) fn expand_with_subst(
    arena: &mut Arena,
    changed: &mut LcaObject,
    var: VarId,
    subst_true: Subst,
    subst_false: Subst,
    touched: &mut Vec<VarId>,
) -> Option<bool> {
    debug_assert!(!arena.var(var).eliminated);
    let quant = arena.quant_of_var(var);
    let split_junctor = match quant {
        Quant::Exists => Junctor::Or,
        Quant::Forall => Junctor::And,
    };
    let obj = arena.var(var).exp_costs.lca_object.clone();

    let result = match obj.lca {
        None => None,
        Some(l) => match arena.node(l).kind {
            Kind::Literal(_) => {
                expand_wrap_whole(arena, changed, l, var, split_junctor, subst_true, subst_false, touched)
            }
            Kind::Op(l_junctor) => {
                let full = obj.children.len() == arena.node(l).num_children as usize;
                if l_junctor == split_junctor {
                    expand_matching(arena, changed, l, &obj.children, var, subst_true, subst_false, touched)
                } else if full {
                    expand_wrap_whole(arena, changed, l, var, split_junctor, subst_true, subst_false, touched)
                } else {
                    expand_wrap_partial(
                        arena, changed, l, &obj.children, var, l_junctor, split_junctor,
                        subst_true, subst_false, touched,
                    )
                }
            }
        },
    };

    cost::detach_from_lca(arena, var);
    arena.var_mut(var).eliminated = true;
    result
}

/// Records `node` as part of the region touched by this mutation, merging
/// it into the engine-wide `changed` LCA object and repairing every current
/// child's `changed_ch_list_pos` back-index.
fn touch(arena: &mut Arena, changed: &mut LcaObject, node: NodeId) {
    lca::add_node(&*arena, changed, node, |_| {}, |_| {});
    for (i, &c) in changed.children.clone().iter().enumerate() {
        arena.node_mut(c).changed_ch_list_pos = Some(i);
    }
}

/// Copies `node` under the assignment `var := value`. A literal occurrence
/// of `var` resolves immediately to a constant rather than being copied;
/// every other literal gets a fresh node linked into its own variable's
/// occurrence list (or, if `subst` maps that variable, the substitute's);
/// operator nodes recurse and recombine via [`combine_copies`].
fn copy_with_assignment(
    arena: &mut Arena,
    node: NodeId,
    var: VarId,
    value: bool,
    subst: Subst,
) -> CopyResult {
    match arena.node(node).kind {
        Kind::Literal(lit) => {
            let l_var = arena.lit(lit).var;
            let negated = arena.lit(lit).negated;
            if l_var == var {
                CopyResult::Const(if negated { !value } else { value })
            } else {
                let target_var = subst.and_then(|m| m.get(&l_var).copied()).unwrap_or(l_var);
                let new_node = arena.add_literal_node(target_var, negated);
                mutate::add_to_occurrence_list(arena, new_node);
                CopyResult::Node(new_node)
            }
        }
        Kind::Op(junctor) => {
            let children = arena.children(node);
            let parts: Vec<CopyResult> = children
                .into_iter()
                .map(|c| copy_with_assignment(arena, c, var, value, subst))
                .collect();
            combine_copies(arena, junctor, parts)
        }
    }
}

/// Assembles a list of copy results into a single node of kind `junctor`,
/// applying the same short-circuit/neutral-element rules
/// [`super::simplify`] applies to ordinary literal assignment.
///
/// Every part has already been built as a live node or constant by the time
/// this runs (callers construct the whole `Vec` up front), so a dominant
/// constant discovered partway through must still free every `Node` part in
/// the list, including ones that sort after it — not just the ones already
/// collected.
fn combine_copies(
    arena: &mut Arena,
    junctor: Junctor,
    parts: Vec<CopyResult>,
    touched: &mut Vec<VarId>,
) -> CopyResult {
    let dominant = matches!(junctor, Junctor::Or);
    let mut shorted = false;
    let mut nodes = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            CopyResult::Const(v) if v == dominant => shorted = true,
            CopyResult::Const(_) => {
                // the neutral element for this junctor: drop it silently
            }
            CopyResult::Node(n) => nodes.push(n),
        }
    }
    if shorted {
        for n in nodes {
            mutate::free_subformula(arena, n, touched);
        }
        return CopyResult::Const(dominant);
    }
    if nodes.is_empty() {
        return CopyResult::Const(matches!(junctor, Junctor::And));
    }
    if nodes.len() == 1 {
        return CopyResult::Node(nodes.into_iter().next().unwrap());
    }
    let op = arena.add_op_node(junctor);
    for n in nodes {
        mutate::append_child(arena, op, n);
    }
    mutate::update_size_subformula(arena, op);
    CopyResult::Node(op)
}

/// Places `result` into the slot that `old`'s subtree used to occupy —
/// `old` must already be detached and freed. If `result` is constant, the
/// cascade continues into `old`'s former parent via
/// [`simplify::resolve_constant_child`]; if `old` had no parent, the whole
/// formula is now determined.
fn place_in_slot(
    arena: &mut Arena,
    changed: &mut LcaObject,
    old_parent: Option<NodeId>,
    result: CopyResult,
    touched: &mut Vec<VarId>,
) -> Option<bool> {
    match result {
        CopyResult::Node(n) => match old_parent {
            Some(p) => {
                mutate::append_child(arena, p, n);
                mutate::update_size_subformula(arena, p);
                touch(arena, changed, p);
                None
            }
            None => {
                arena.node_mut(n).parent = None;
                arena.root = Some(n);
                mutate::update_level(arena, n);
                touch(arena, changed, n);
                None
            }
        },
        CopyResult::Const(v) => match old_parent {
            Some(p) => simplify::resolve_constant_child(arena, p, v, touched),
            None => {
                arena.root = None;
                Some(v)
            }
        },
    }
}

/// Case (b): the LCA's own junctor is the dual of the split junctor (or it
/// has none, being a bare literal) and every occurrence lies under it — the
/// whole LCA is replaced by `split_junctor(copy_true(L), copy_false(L))`.
#[allow(clippy::too_many_arguments)]
fn expand_wrap_whole(
    arena: &mut Arena,
    changed: &mut LcaObject,
    l: NodeId,
    var: VarId,
    split_junctor: Junctor,
    subst_true: Subst,
    subst_false: Subst,
    touched: &mut Vec<VarId>,
) -> Option<bool> {
    let true_copy = copy_with_assignment(arena, l, var, true, subst_true);
    let false_copy = copy_with_assignment(arena, l, var, false, subst_false);
    let combined = combine_copies(arena, split_junctor, vec![true_copy, false_copy], touched);

    let parent = arena.node(l).parent;
    if parent.is_some() {
        mutate::unlink_child(arena, l);
    }
    mutate::free_subformula(arena, l, touched);

    place_in_slot(arena, changed, parent, combined, touched)
}

/// Case (a): the LCA's own junctor already equals the split junctor, so
/// both copies of each touched child splice directly into the LCA as new
/// siblings — no wrapper node. Covers both full and partial coverage rows
/// of the cost table that have no `+3` term.
#[allow(clippy::too_many_arguments)]
fn expand_matching(
    arena: &mut Arena,
    changed: &mut LcaObject,
    l: NodeId,
    children_c: &[NodeId],
    var: VarId,
    subst_true: Subst,
    subst_false: Subst,
    touched: &mut Vec<VarId>,
) -> Option<bool> {
    for &c in children_c {
        let true_copy = copy_with_assignment(arena, c, var, true, subst_true);
        let false_copy = copy_with_assignment(arena, c, var, false, subst_false);
        mutate::unlink_child(arena, c);
        mutate::free_subformula(arena, c, touched);
        for copy in [true_copy, false_copy] {
            if let Some(done) = append_or_shortcircuit(arena, changed, l, copy, touched) {
                return Some(done);
            }
        }
    }
    touch(arena, changed, l);
    None
}

/// Case (c): the LCA's own junctor is the dual of the split junctor and
/// only a subset of its children are touched. Builds two new bodies of the
/// LCA's own junctor (one per branch), wraps them in a new split node, and
/// splices that single node into the LCA in place of the touched subset.
#[allow(clippy::too_many_arguments)]
fn expand_wrap_partial(
    arena: &mut Arena,
    changed: &mut LcaObject,
    l: NodeId,
    children_c: &[NodeId],
    var: VarId,
    l_junctor: Junctor,
    split_junctor: Junctor,
    subst_true: Subst,
    subst_false: Subst,
    touched: &mut Vec<VarId>,
) -> Option<bool> {
    let true_parts: Vec<CopyResult> = children_c
        .iter()
        .map(|&c| copy_with_assignment(arena, c, var, true, subst_true))
        .collect();
    let false_parts: Vec<CopyResult> = children_c
        .iter()
        .map(|&c| copy_with_assignment(arena, c, var, false, subst_false))
        .collect();
    let true_body = combine_copies(arena, l_junctor, true_parts, touched);
    let false_body = combine_copies(arena, l_junctor, false_parts, touched);
    let split = combine_copies(arena, split_junctor, vec![true_body, false_body], touched);

    for &c in children_c {
        mutate::unlink_child(arena, c);
        mutate::free_subformula(arena, c, touched);
    }

    match append_or_shortcircuit(arena, changed, l, split, touched) {
        Some(done) => Some(done),
        None => {
            touch(arena, changed, l);
            None
        }
    }
}

/// Appends `result` as a new child of `l` (already known to have `l`'s own
/// junctor as its combining kind), unless it is constant and dominant for
/// `l`'s junctor, in which case `l` itself collapses and the cascade
/// continues into `l`'s parent.
fn append_or_shortcircuit(
    arena: &mut Arena,
    changed: &mut LcaObject,
    l: NodeId,
    result: CopyResult,
    touched: &mut Vec<VarId>,
) -> Option<bool> {
    match result {
        CopyResult::Node(n) => {
            mutate::append_child(arena, l, n);
            mutate::update_size_subformula(arena, l);
            None
        }
        CopyResult::Const(v) => {
            let junctor = arena
                .node(l)
                .junctor()
                .expect("expansion target must be an operator");
            let shorts = matches!((junctor, v), (Junctor::And, false) | (Junctor::Or, true));
            if !shorts {
                return None;
            }
            for child in arena.children(l) {
                mutate::unlink_child(arena, child);
                mutate::free_subformula(arena, child, touched);
            }
            let parent = arena.node(l).parent;
            if parent.is_some() {
                mutate::unlink_child(arena, l);
            }
            mutate::free_node(arena, l, touched);
            match parent {
                Some(p) => simplify::resolve_constant_child(arena, p, v, touched),
                None => {
                    arena.root = None;
                    Some(v)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds `e x y . (x | y) & (-x | y)`: expanding `y` (existential)
    /// must resolve the whole formula, since `y := true` already satisfies
    /// both clauses independent of `x`.
    #[test]
    fn expand_existential_resolves_tautological_residual() {
        let mut arena = Arena::new();
        let e = arena.prefix.push_scope(Quant::Exists);
        let x = arena.add_var(e);
        let y = arena.add_var(e);

        let root = arena.add_op_node(Junctor::And);
        let c1 = arena.add_op_node(Junctor::Or);
        let c2 = arena.add_op_node(Junctor::Or);
        let x_pos = arena.add_literal_node(x, false);
        let y_pos_1 = arena.add_literal_node(y, false);
        let x_neg = arena.add_literal_node(x, true);
        let y_pos_2 = arena.add_literal_node(y, false);
        for n in [x_pos, y_pos_1, x_neg, y_pos_2] {
            mutate::add_to_occurrence_list(&mut arena, n);
        }
        mutate::append_child(&mut arena, c1, x_pos);
        mutate::append_child(&mut arena, c1, y_pos_1);
        mutate::append_child(&mut arena, c2, x_neg);
        mutate::append_child(&mut arena, c2, y_pos_2);
        mutate::append_child(&mut arena, root, c1);
        mutate::append_child(&mut arena, root, c2);
        mutate::update_size_subformula(&mut arena, root);
        arena.root = Some(root);
        mutate::update_level(&mut arena, root);

        cost::refresh(&mut arena, x);
        cost::refresh(&mut arena, y);

        let mut changed = LcaObject::default();
        let mut touched = Vec::new();
        let result = expand(&mut arena, &mut changed, y, &mut touched);
        assert_eq!(result, Some(true));
    }
}
