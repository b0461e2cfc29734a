//! Post-expansion flattening (`spec.md` §4.I step 6, `--post-expansion-
//! flattening`): distributes `Or` over `And` on a freshly split subgraph
//! that is still CNF-shaped (every literal within 3 levels of the split
//! node), the way resolution would, dropping trivial and duplicate
//! clauses. Off by default; best-effort, the same way the "changed
//! subformula" tracking it piggybacks on is best-effort (`spec.md` §4.E).

use rustc_hash::FxHashSet;

use super::arena::Arena;
use super::ids::{Junctor, NodeId, VarId};
use super::mutate;
use super::node::Kind;

/// Caps the cartesian product this pass is willing to build; beyond this,
/// distributing would risk a worse blowup than the expansion it exists to
/// shrink, so the region is left as-is.
const MAX_CLAUSES: usize = 4096;

/// `node` qualifies when it is itself `Or`-shaped and every child is either
/// a literal or an `And` of literals only (`spec.md`'s "CNF-shaped", i.e.
/// depth <= 2 below `node`).
fn is_cnf_shaped_or(arena: &Arena, node: NodeId) -> bool {
    if arena.node(node).junctor() != Some(Junctor::Or) {
        return false;
    }
    arena.children(node).into_iter().all(|c| match arena.node(c).kind {
        Kind::Literal(_) => true,
        Kind::Op(Junctor::And) => arena
            .children(c)
            .into_iter()
            .all(|gc| matches!(arena.node(gc).kind, Kind::Literal(_))),
        Kind::Op(Junctor::Or) => false,
    })
}

/// Distributes `node` into an equivalent `And`-of-`Or`s in place. Returns
/// `false` (no-op, tree unchanged) if `node` isn't CNF-shaped, has fewer
/// than two factors, or the cartesian product would exceed [`MAX_CLAUSES`].
/// Every variable whose LCA bookkeeping referenced a node freed by this pass
/// is appended to `touched`; the caller must run each one through
/// [`super::engine::Engine::mark_dirty`].
pub(crate) fn flatten_if_cnf_shaped(arena: &mut Arena, node: NodeId, touched: &mut Vec<VarId>) -> bool {
    if !is_cnf_shaped_or(arena, node) {
        return false;
    }

    let mut factors: Vec<Vec<NodeId>> = Vec::new();
    for c in arena.children(node) {
        match arena.node(c).kind {
            Kind::Literal(_) => factors.push(vec![c]),
            Kind::Op(Junctor::And) => factors.push(arena.children(c)),
            Kind::Op(Junctor::Or) => unreachable!("excluded by is_cnf_shaped_or"),
        }
    }
    if factors.len() <= 1 {
        return false;
    }

    let mut clauses: Vec<Vec<(VarId, bool)>> = vec![Vec::new()];
    for factor in &factors {
        let mut next = Vec::with_capacity(clauses.len() * factor.len());
        for partial in &clauses {
            for &lit_node in factor {
                let Kind::Literal(lit) = arena.node(lit_node).kind else {
                    unreachable!("factors are built only from literal nodes");
                };
                let mut extended = partial.clone();
                extended.push((arena.lit(lit).var, arena.lit(lit).negated));
                next.push(extended);
            }
        }
        if next.len() > MAX_CLAUSES {
            return false;
        }
        clauses = next;
    }

    let mut seen = FxHashSet::default();
    let mut kept: Vec<Vec<(VarId, bool)>> = Vec::new();
    'clauses: for mut clause in clauses {
        clause.sort_unstable();
        clause.dedup();
        for i in 0..clause.len() {
            for j in (i + 1)..clause.len() {
                if clause[i].0 == clause[j].0 && clause[i].1 != clause[j].1 {
                    continue 'clauses; // tautological clause, drop
                }
            }
        }
        if seen.insert(clause.clone()) {
            kept.push(clause);
        }
    }

    let parent = arena.node(node).parent;
    for c in arena.children(node) {
        mutate::unlink_child(arena, c);
        mutate::free_subformula(arena, c, touched);
    }
    let replacement = build_and_of_ors(arena, &kept);

    match parent {
        Some(p) => {
            mutate::insert_child_before(arena, node, replacement);
            mutate::unlink_child(arena, node);
            mutate::free_node(arena, node, touched);
            mutate::update_size_subformula(arena, p);
        }
        None => {
            arena.node_mut(replacement).parent = None;
            arena.root = Some(replacement);
            mutate::update_level(arena, replacement);
        }
    }
    true
}

fn build_and_of_ors(arena: &mut Arena, clauses: &[Vec<(VarId, bool)>]) -> NodeId {
    let or_nodes: Vec<NodeId> = clauses
        .iter()
        .map(|clause| {
            if clause.len() == 1 {
                let (var, negated) = clause[0];
                let n = arena.add_literal_node(var, negated);
                mutate::add_to_occurrence_list(arena, n);
                n
            } else {
                let or = arena.add_op_node(Junctor::Or);
                for &(var, negated) in clause {
                    let n = arena.add_literal_node(var, negated);
                    mutate::add_to_occurrence_list(arena, n);
                    mutate::append_child(arena, or, n);
                }
                mutate::recompute_size_subtree(arena, or);
                or
            }
        })
        .collect();

    if or_nodes.len() == 1 {
        return or_nodes.into_iter().next().unwrap();
    }
    let and = arena.add_op_node(Junctor::And);
    for n in or_nodes {
        mutate::append_child(arena, and, n);
    }
    mutate::recompute_size_subtree(arena, and);
    and
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::Quant;

    /// `(a & b) | (c & d)` distributes into `(a|c)&(a|d)&(b|c)&(b|d)`.
    #[test]
    fn distributes_or_of_ands() {
        let mut arena = Arena::new();
        let scope = arena.prefix.push_scope(Quant::Exists);
        let a = arena.add_var(scope);
        let b = arena.add_var(scope);
        let c = arena.add_var(scope);
        let d = arena.add_var(scope);

        let or = arena.add_op_node(Junctor::Or);
        let and1 = arena.add_op_node(Junctor::And);
        let and2 = arena.add_op_node(Junctor::And);
        for (parent, var) in [(and1, a), (and1, b), (and2, c), (and2, d)] {
            let n = arena.add_literal_node(var, false);
            mutate::add_to_occurrence_list(&mut arena, n);
            mutate::append_child(&mut arena, parent, n);
        }
        mutate::recompute_size_subtree(&mut arena, and1);
        mutate::recompute_size_subtree(&mut arena, and2);
        mutate::append_child(&mut arena, or, and1);
        mutate::append_child(&mut arena, or, and2);
        mutate::recompute_size_subtree(&mut arena, or);
        arena.root = Some(or);
        mutate::update_level(&mut arena, or);

        let mut touched = Vec::new();
        assert!(flatten_if_cnf_shaped(&mut arena, arena.root.unwrap(), &mut touched));
        let new_root = arena.root.unwrap();
        assert_eq!(arena.node(new_root).junctor(), Some(Junctor::And));
        assert_eq!(arena.node(new_root).num_children, 4);
    }

    #[test]
    fn leaves_non_cnf_shaped_node_untouched() {
        let mut arena = Arena::new();
        let scope = arena.prefix.push_scope(Quant::Exists);
        let a = arena.add_var(scope);
        let b = arena.add_var(scope);
        let or = arena.add_op_node(Junctor::Or);
        let inner_or = arena.add_op_node(Junctor::Or);
        let a_lit = arena.add_literal_node(a, false);
        let b_lit = arena.add_literal_node(b, false);
        mutate::add_to_occurrence_list(&mut arena, a_lit);
        mutate::add_to_occurrence_list(&mut arena, b_lit);
        mutate::append_child(&mut arena, inner_or, a_lit);
        mutate::append_child(&mut arena, inner_or, b_lit);
        mutate::recompute_size_subtree(&mut arena, inner_or);
        mutate::append_child(&mut arena, or, inner_or);
        mutate::recompute_size_subtree(&mut arena, or);
        arena.root = Some(or);
        mutate::update_level(&mut arena, or);

        let mut touched = Vec::new();
        assert!(!flatten_if_cnf_shaped(&mut arena, arena.root.unwrap(), &mut touched));
    }
}
