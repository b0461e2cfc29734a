//! Low-level structural mutation primitives.
//!
//! Every higher-level operation on the tree (parsing, simplification,
//! expansion) is built out of the functions in this module rather than
//! touching sibling/occurrence links directly, so the bookkeeping invariants
//! of `spec.md` §3 (consistent `level`/`size_subformula`, occurrence lists
//! matching tree membership) only need to be proven correct in one place.

use super::arena::Arena;
use super::ids::{NodeId, VarId};
use super::node::Kind;

/// Appends `child` as the last child of `parent`. `child` must currently be
/// detached (no `parent`, no siblings).
pub(crate) fn append_child(arena: &mut Arena, parent: NodeId, child: NodeId) {
    let old_tail = arena.node(parent).child_tail;
    arena.node_mut(child).parent = Some(parent);
    arena.node_mut(child).prev_sibling = old_tail;
    arena.node_mut(child).next_sibling = None;
    match old_tail {
        Some(tail) => arena.node_mut(tail).next_sibling = Some(child),
        None => arena.node_mut(parent).child_head = Some(child),
    }
    arena.node_mut(parent).child_tail = Some(child);
    arena.node_mut(parent).num_children += 1;
    update_level(arena, child);
}

/// Inserts `child` immediately before `before` in `before`'s parent's child
/// list. `before` must already be linked under some parent.
pub(crate) fn insert_child_before(arena: &mut Arena, before: NodeId, child: NodeId) {
    let parent = arena
        .node(before)
        .parent
        .expect("insert_child_before target must have a parent");
    let prev = arena.node(before).prev_sibling;
    arena.node_mut(child).parent = Some(parent);
    arena.node_mut(child).prev_sibling = prev;
    arena.node_mut(child).next_sibling = Some(before);
    arena.node_mut(before).prev_sibling = Some(child);
    match prev {
        Some(p) => arena.node_mut(p).next_sibling = Some(child),
        None => arena.node_mut(parent).child_head = Some(child),
    }
    arena.node_mut(parent).num_children += 1;
    update_level(arena, child);
}

/// Detaches `node` from its parent's child list. Does not free it and does
/// not touch the occurrence list; callers that are discarding the subtree
/// should follow up with [`free_subformula`].
pub(crate) fn unlink_child(arena: &mut Arena, node: NodeId) {
    let parent = arena.node(node).parent;
    let prev = arena.node(node).prev_sibling;
    let next = arena.node(node).next_sibling;
    match prev {
        Some(p) => arena.node_mut(p).next_sibling = next,
        None => {
            if let Some(parent) = parent {
                arena.node_mut(parent).child_head = next;
            }
        }
    }
    match next {
        Some(n) => arena.node_mut(n).prev_sibling = prev,
        None => {
            if let Some(parent) = parent {
                arena.node_mut(parent).child_tail = prev;
            }
        }
    }
    if let Some(parent) = parent {
        arena.node_mut(parent).num_children -= 1;
    }
    arena.node_mut(node).parent = None;
    arena.node_mut(node).prev_sibling = None;
    arena.node_mut(node).next_sibling = None;
}

/// Recomputes `node.level` from its (already correctly leveled) parent and
/// propagates the new level down to its subtree.
pub(crate) fn update_level(arena: &mut Arena, node: NodeId) {
    let level = match arena.node(node).parent {
        Some(p) => arena.node(p).level + 1,
        None => 0,
    };
    set_level_recursive(arena, node, level);
}

fn set_level_recursive(arena: &mut Arena, node: NodeId, level: u32) {
    arena.node_mut(node).level = level;
    for child in arena.children(node) {
        set_level_recursive(arena, child, level + 1);
    }
}

/// Recomputes `node.size_subformula` bottom-up from its children's already
/// correct sizes, then propagates the delta up through its ancestors.
pub(crate) fn update_size_subformula(arena: &mut Arena, node: NodeId) {
    let old = arena.node(node).size_subformula;
    let new = 1 + arena
        .children(node)
        .into_iter()
        .map(|c| arena.node(c).size_subformula)
        .sum::<u32>();
    arena.node_mut(node).size_subformula = new;
    if new == old {
        return;
    }
    let delta = new as i64 - old as i64;
    let mut cur = arena.node(node).parent;
    while let Some(p) = cur {
        let size = &mut arena.node_mut(p).size_subformula;
        *size = (*size as i64 + delta) as u32;
        cur = arena.node(p).parent;
    }
}

/// Recomputes `size_subformula` bottom-up for an entire freshly built
/// subtree, without touching anything above `node` (unlike
/// [`update_size_subformula`], which assumes `node`'s old size was already
/// accounted for in its ancestors and propagates only the delta — not true
/// the first time a subtree is assembled, e.g. by [`crate::parser`]).
pub(crate) fn recompute_size_subtree(arena: &mut Arena, node: NodeId) -> u32 {
    let size = 1 + arena
        .children(node)
        .into_iter()
        .map(|c| recompute_size_subtree(arena, c))
        .sum::<u32>();
    arena.node_mut(node).size_subformula = size;
    size
}

/// Splices `child`'s own children directly into `child`'s parent in
/// `child`'s place, then frees `child` itself. Used to flatten an operator
/// node of the same junctor as its parent (`AND(AND(a, b), c)` ->
/// `AND(a, b, c)`), which both the CNF-shaped post-expansion flattening pass
/// (`spec.md` §4.J) and ordinary simplification rely on.
pub(crate) fn merge_into_parent(arena: &mut Arena, child: NodeId, touched: &mut Vec<VarId>) {
    let parent = arena
        .node(child)
        .parent
        .expect("merge_into_parent requires child to have a parent");
    debug_assert_eq!(arena.node(parent).junctor(), arena.node(child).junctor());
    let grandchildren = arena.children(child);
    for gc in &grandchildren {
        unlink_child(arena, *gc);
    }
    for gc in grandchildren {
        insert_child_before(arena, child, gc);
    }
    unlink_child(arena, child);
    free_node(arena, child, touched);
}

/// Returns `node`'s slot to the arena's free list, first collecting into
/// `touched` every variable whose LCA bookkeeping (`spec.md` §3 invariant 8)
/// still points at it: variables whose LCA is exactly `node`
/// (`var_lca_list_head`/`_tail`), and variables for whom `node` is one of
/// their LCA-children (`lca_child_list_occs`). Both back-indices would
/// otherwise go stale the moment this slot is handed to
/// [`super::arena::Arena::alloc_node`] for an unrelated node — the caller is
/// responsible for eventually running every collected variable through
/// [`super::engine::Engine::mark_dirty`] so its LCA gets recomputed before
/// anything reads the stale reference.
pub(crate) fn free_node(arena: &mut Arena, node: NodeId, touched: &mut Vec<VarId>) {
    touched.extend_from_slice(&arena.node(node).lca_child_list_occs);
    let mut cur = arena.node(node).var_lca_list_head;
    while let Some(v) = cur {
        touched.push(v);
        cur = arena.var(v).var_lca_next;
    }
    arena.free_node(node);
}

/// Unlinks and frees an entire subtree rooted at `node`, removing every
/// literal leaf in it from its variable's occurrence list. Does not touch
/// `node`'s parent's child-count bookkeeping of nodes above `node` itself;
/// callers must call [`unlink_child`] on `node` first if it is still
/// attached. Collects into `touched` every variable whose LCA bookkeeping
/// referenced a node in this subtree; see [`free_node`].
pub(crate) fn free_subformula(arena: &mut Arena, node: NodeId, touched: &mut Vec<VarId>) {
    let children = arena.children(node);
    for child in children {
        free_subformula(arena, child, touched);
    }
    if let Kind::Literal(lit) = arena.node(node).kind {
        unlink_from_occurrence_list(arena, node, lit);
    }
    free_node(arena, node, touched);
}

/// Links a freshly allocated literal node of kind `Literal(lit)` onto the
/// tail of that literal's occurrence list.
pub(crate) fn add_to_occurrence_list(arena: &mut Arena, node: NodeId) {
    let lit = match arena.node(node).kind {
        Kind::Literal(l) => l,
        Kind::Op(_) => panic!("add_to_occurrence_list requires a literal node"),
    };
    let old_tail = arena.lit(lit).occ_tail;
    arena.node_mut(node).occ_prev = old_tail;
    arena.node_mut(node).occ_next = None;
    match old_tail {
        Some(tail) => arena.node_mut(tail).occ_next = Some(node),
        None => arena.lit_mut(lit).occ_head = Some(node),
    }
    arena.lit_mut(lit).occ_tail = Some(node);
    arena.lit_mut(lit).occ_cnt += 1;
}

fn unlink_from_occurrence_list(arena: &mut Arena, node: NodeId, lit: super::ids::LitId) {
    let prev = arena.node(node).occ_prev;
    let next = arena.node(node).occ_next;
    match prev {
        Some(p) => arena.node_mut(p).occ_next = next,
        None => arena.lit_mut(lit).occ_head = next,
    }
    match next {
        Some(n) => arena.node_mut(n).occ_prev = prev,
        None => arena.lit_mut(lit).occ_tail = prev,
    }
    arena.lit_mut(lit).occ_cnt -= 1;
    arena.node_mut(node).occ_prev = None;
    arena.node_mut(node).occ_next = None;
}
