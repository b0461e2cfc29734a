//! Incremental Boolean simplification: unit/unate elimination, literal
//! assignment propagation, and singleton-operator collapsing.
//!
//! These are the "propagation" side of `spec.md` §4 (component F):
//! whenever expansion or parsing determines a literal's truth value, every
//! occurrence of it (and of its negation) is resolved out of the tree, and
//! operator nodes left with zero or one child are collapsed, possibly
//! cascading all the way to the root.

use super::arena::Arena;
use super::ids::{Junctor, LitId, NodeId, VarId};
use super::mutate::{free_subformula, unlink_child};
use super::node::Kind;

/// Assigns `lit` to true: every occurrence of `lit` itself is treated as a
/// satisfied conjunct/disjunct and removed, every occurrence of its
/// negation is treated as falsified and removed (cascading a parent to a
/// constant where that makes it determined). Returns `Some(value)` if this
/// assignment determined the value of the whole formula. Every variable
/// whose LCA bookkeeping referenced a freed node is appended to `touched`;
/// the caller must run each one through
/// [`super::engine::Engine::mark_dirty`].
pub(crate) fn assign_literal(arena: &mut Arena, lit: LitId, touched: &mut Vec<VarId>) -> Option<bool> {
    let dual = arena.dual_lit(lit);
    let mut result = None;
    while let Some(node) = arena.lit(lit).occ_head {
        if let Some(v) = eliminate_occurrence(arena, node, true, touched) {
            result = Some(v);
        }
    }
    while let Some(node) = arena.lit(dual).occ_head {
        if let Some(v) = eliminate_occurrence(arena, node, false, touched) {
            result = Some(v);
        }
    }
    result
}

/// If `var` occurs in only one polarity in the whole tree (a "unate" or
/// "pure" variable), assigns that polarity to true and reports the result
/// of [`assign_literal`]. Returns `None` (no-op) if both polarities occur.
pub(crate) fn eliminate_unate(
    arena: &mut Arena,
    var: super::ids::VarId,
    touched: &mut Vec<VarId>,
) -> Option<bool> {
    let v = arena.var(var);
    let (neg, pos) = (v.neg_lit, v.pos_lit);
    if arena.lit(neg).is_empty_occ() && !arena.lit(pos).is_empty_occ() {
        assign_literal(arena, pos, touched)
    } else if arena.lit(pos).is_empty_occ() && !arena.lit(neg).is_empty_occ() {
        assign_literal(arena, neg, touched)
    } else {
        None
    }
}

/// Removes a single literal occurrence node, whose truth value has just
/// been fixed to `satisfied`, and cascades the consequence up through its
/// ancestors. Returns `Some(value)` if the cascade reaches an unparented
/// (root) node, determining the whole formula.
fn eliminate_occurrence(
    arena: &mut Arena,
    node: NodeId,
    satisfied: bool,
    touched: &mut Vec<VarId>,
) -> Option<bool> {
    match arena.node(node).parent {
        None => {
            // The occurrence node is itself the whole formula.
            arena.root = None;
            Some(satisfied)
        }
        Some(parent) => {
            unlink_child(arena, node);
            free_subformula(arena, node, touched);
            resolve_constant_child(arena, parent, satisfied, touched)
        }
    }
}

/// `parent` has just lost a child whose value was `value`; determines
/// whether that fully determines `parent`, and if so cascades further up.
pub(crate) fn resolve_constant_child(
    arena: &mut Arena,
    parent: NodeId,
    value: bool,
    touched: &mut Vec<VarId>,
) -> Option<bool> {
    let junctor = arena
        .node(parent)
        .junctor()
        .expect("parent of a literal occurrence must be an operator node");
    let short_circuits = match junctor {
        Junctor::And => !value,
        Junctor::Or => value,
    };
    if short_circuits {
        clear_children(arena, parent, touched);
        return propagate_constant(arena, parent, value, touched);
    }
    if arena.node(parent).num_children == 0 {
        // The neutral element (true for And, false for Or) was the only child.
        let neutral = matches!(junctor, Junctor::And);
        return propagate_constant(arena, parent, neutral, touched);
    }
    super::mutate::update_size_subformula(arena, parent);
    collapse_if_singleton(arena, parent, touched)
}

/// `node` has just been determined to be constant `value`; removes it from
/// the tree and cascades into its parent, or reports it as the formula's
/// value if it has none.
pub(crate) fn propagate_constant(
    arena: &mut Arena,
    node: NodeId,
    value: bool,
    touched: &mut Vec<VarId>,
) -> Option<bool> {
    match arena.node(node).parent {
        None => {
            arena.root = None;
            Some(value)
        }
        Some(parent) => {
            unlink_child(arena, node);
            free_subformula(arena, node, touched);
            resolve_constant_child(arena, parent, value, touched)
        }
    }
}

fn clear_children(arena: &mut Arena, node: NodeId, touched: &mut Vec<VarId>) {
    for child in arena.children(node) {
        unlink_child(arena, child);
        free_subformula(arena, child, touched);
    }
}

/// Replaces an operator node with exactly one child by that child, the
/// one-level Boolean simplification `AND(x) = x` / `OR(x) = x`
/// (`spec.md` §4.F, `merge_parent`). If the hoisted child is a literal, the
/// grandparent it now sits in may have gained a sibling that duplicates or
/// contradicts one of its own existing literal children, so it is run
/// through [`simplify_one_level`] per `spec.md`'s explicit callout ("the
/// grandparent is then put through simplify_one_level in case the new
/// sibling collides").
pub(crate) fn collapse_if_singleton(
    arena: &mut Arena,
    node: NodeId,
    touched: &mut Vec<VarId>,
) -> Option<bool> {
    if !matches!(arena.node(node).kind, Kind::Op(_)) {
        return None;
    }
    if arena.node(node).num_children != 1 {
        return None;
    }
    let only_child = arena.node(node).child_head.unwrap();
    let parent = arena.node(node).parent;
    unlink_child(arena, only_child);
    let result = match parent {
        None => {
            arena.node_mut(only_child).parent = None;
            arena.root = Some(only_child);
            super::mutate::update_level(arena, only_child);
            None
        }
        Some(p) => {
            super::mutate::insert_child_before(arena, node, only_child);
            unlink_child(arena, node);
            super::mutate::update_size_subformula(arena, p);
            if matches!(arena.node(only_child).kind, Kind::Literal(_)) {
                simplify_one_level(arena, p, touched)
            } else {
                None
            }
        }
    };
    super::mutate::free_node(arena, node, touched);
    result
}

/// Component G "one-level Boolean simplification" (`spec.md` §4.G): scans
/// `node`'s literal children for a variable occurring twice. A repeated
/// occurrence of the same polarity is a redundant duplicate and is simply
/// dropped; a repeated occurrence of the opposite polarity is complementary
/// and annihilates the whole node (`And` with complementary literals is
/// `false`, `Or` is `true`), cascading into its parent exactly as any other
/// constant child does. Returns `Some(value)` if the cascade reached the
/// root, determining the whole formula.
pub(crate) fn simplify_one_level(
    arena: &mut Arena,
    node: NodeId,
    touched: &mut Vec<VarId>,
) -> Option<bool> {
    let Kind::Op(junctor) = arena.node(node).kind else {
        return None;
    };
    let mut seen: rustc_hash::FxHashMap<super::ids::VarId, bool> = rustc_hash::FxHashMap::default();
    let mut duplicates = Vec::new();
    for c in arena.children(node) {
        let Kind::Literal(lit) = arena.node(c).kind else {
            continue;
        };
        let var = arena.lit(lit).var;
        let negated = arena.lit(lit).negated;
        match seen.get(&var) {
            None => {
                seen.insert(var, negated);
            }
            Some(&prev_negated) if prev_negated == negated => duplicates.push(c),
            Some(_) => {
                // complementary occurrence: And -> false, Or -> true.
                let dominant = matches!(junctor, Junctor::Or);
                return propagate_constant(arena, node, dominant, touched);
            }
        }
    }
    if duplicates.is_empty() {
        return None;
    }
    for c in duplicates {
        unlink_child(arena, c);
        free_subformula(arena, c, touched);
    }
    super::mutate::update_size_subformula(arena, node);
    collapse_if_singleton(arena, node, touched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arena::Arena;
    use crate::core::ids::Quant;
    use crate::core::mutate;

    /// `And(x, x, y)`: the repeated occurrence of `x` is dropped, leaving
    /// `And(x, y)` with two children rather than three.
    #[test]
    fn drops_duplicate_literal_sibling() {
        let mut arena = Arena::new();
        let scope = arena.prefix.push_scope(Quant::Exists);
        let x = arena.add_var(scope);
        let y = arena.add_var(scope);
        let and = arena.add_op_node(Junctor::And);
        for (var, negated) in [(x, false), (x, false), (y, false)] {
            let n = arena.add_literal_node(var, negated);
            mutate::add_to_occurrence_list(&mut arena, n);
            mutate::append_child(&mut arena, and, n);
        }
        mutate::recompute_size_subtree(&mut arena, and);
        arena.root = Some(and);
        mutate::update_level(&mut arena, and);

        let mut touched = Vec::new();
        assert_eq!(simplify_one_level(&mut arena, and, &mut touched), None);
        assert_eq!(arena.node(and).num_children, 2);
    }

    /// `Or(x, -x)`: a complementary pair annihilates the whole `Or` to
    /// `true`, and since it is the root, that determines the formula.
    #[test]
    fn complementary_literal_siblings_annihilate_to_constant() {
        let mut arena = Arena::new();
        let scope = arena.prefix.push_scope(Quant::Exists);
        let x = arena.add_var(scope);
        let or = arena.add_op_node(Junctor::Or);
        for negated in [false, true] {
            let n = arena.add_literal_node(x, negated);
            mutate::add_to_occurrence_list(&mut arena, n);
            mutate::append_child(&mut arena, or, n);
        }
        mutate::recompute_size_subtree(&mut arena, or);
        arena.root = Some(or);
        mutate::update_level(&mut arena, or);

        let mut touched = Vec::new();
        assert_eq!(simplify_one_level(&mut arena, or, &mut touched), Some(true));
        assert!(arena.root.is_none());
    }
}
