//! Lowest-common-ancestor tracking, incrementally maintained.
//!
//! The same object shape backs two different trackers (`spec.md` §3, §4.E):
//! each variable's LCA over its literal occurrences, and the engine-wide
//! "changed subformula" LCA over every node touched since the last score
//! refresh. Both only ever grow by one node at a time (a new occurrence, or
//! a newly touched node) and are read far more often than they are updated,
//! so recomputing from scratch is avoided in favor of the two-pointer
//! level-balanced climb below.

use super::arena::Arena;
use super::ids::NodeId;

/// An incrementally maintained lowest common ancestor plus the set of its
/// immediate children that lie on a path to a tracked node.
///
/// `children` has no duplicates and no defined order; callers needing
/// positional stability keep their own parallel index (see
/// [`super::node::Node::lca_child_list_occs`] /
/// [`super::var::Var::pos_in_lca_child_list_occs`]).
#[derive(Debug, Clone, Default)]
pub(crate) struct LcaObject {
    pub(crate) lca: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl LcaObject {
    pub(crate) fn is_empty(&self) -> bool {
        self.lca.is_none()
    }

    pub(crate) fn reset(&mut self) {
        self.lca = None;
        self.children.clear();
    }
}

fn level(arena: &Arena, node: NodeId) -> u32 {
    arena.node(node).level
}

fn parent(arena: &Arena, node: NodeId) -> Option<NodeId> {
    arena.node(node).parent
}

/// Climbs `node` up until it reaches `target_level`. `target_level` must not
/// exceed `node`'s own level.
fn climb_to_level(arena: &Arena, mut node: NodeId, target_level: u32) -> NodeId {
    while level(arena, node) > target_level {
        node = parent(arena, node).expect("node above target level must have a parent");
    }
    node
}

/// Returns the lowest common ancestor of `a` and `b`, and, when `a != b`,
/// the two children of that ancestor lying on the path to each of `a` and
/// `b` respectively (`None` when the ancestor is `a` or `b` itself).
fn lca_two(arena: &Arena, a: NodeId, b: NodeId) -> (NodeId, Option<NodeId>, Option<NodeId>) {
    if a == b {
        return (a, None, None);
    }
    let a_is_deeper = level(arena, a) >= level(arena, b);
    let (mut deep, shallow) = if a_is_deeper { (a, b) } else { (b, a) };
    let mut child_of_deep = None;
    while level(arena, deep) > level(arena, shallow) {
        child_of_deep = Some(deep);
        deep = parent(arena, deep).expect("deeper node must have a parent above the shallower one");
    }
    if deep == shallow {
        let ancestor = deep;
        return if a_is_deeper {
            (ancestor, child_of_deep, None)
        } else {
            (ancestor, None, child_of_deep)
        };
    }
    let mut child_shallow = shallow;
    let mut child_deep = child_of_deep.unwrap_or(deep);
    loop {
        let p_shallow = parent(arena, child_shallow).expect("no common ancestor found below root");
        let p_deep = parent(arena, child_deep).expect("no common ancestor found below root");
        if p_shallow == p_deep {
            let ancestor = p_shallow;
            return if a_is_deeper {
                (ancestor, Some(child_deep), Some(child_shallow))
            } else {
                (ancestor, Some(child_shallow), Some(child_deep))
            };
        }
        child_shallow = p_shallow;
        child_deep = p_deep;
    }
}

/// Merges a newly tracked node into `obj`, updating `obj.lca` and
/// `obj.children` in place. `push_child`/`remove_child` let the caller keep
/// a node's per-variable back-index (`pos_in_lca_children`) consistent as
/// children are added to or displaced from the set.
pub(crate) fn add_node(
    arena: &Arena,
    obj: &mut LcaObject,
    node: NodeId,
    mut push_child: impl FnMut(NodeId),
    mut remove_child: impl FnMut(NodeId),
) {
    let Some(old_lca) = obj.lca else {
        obj.lca = Some(node);
        return;
    };
    if old_lca == node {
        return;
    }
    let (new_lca, child_toward_old, child_toward_new) = lca_two(arena, old_lca, node);
    if new_lca == old_lca {
        if let Some(c) = child_toward_new {
            if !obj.children.contains(&c) {
                obj.children.push(c);
                push_child(c);
            }
        }
        return;
    }
    for c in obj.children.drain(..) {
        remove_child(c);
    }
    obj.lca = Some(new_lca);
    if let Some(c) = child_toward_old {
        obj.children.push(c);
        push_child(c);
    }
    if let Some(c) = child_toward_new {
        if Some(c) != child_toward_old {
            obj.children.push(c);
            push_child(c);
        }
    }
}

/// Climbs both `a` and `b` to a common level, for callers that only need
/// the pair's meeting level rather than a full `LcaObject` merge.
pub(crate) fn common_level(arena: &Arena, a: NodeId, b: NodeId) -> u32 {
    let (hi, lo) = if level(arena, a) >= level(arena, b) {
        (a, b)
    } else {
        (b, a)
    };
    level(arena, climb_to_level(arena, hi, level(arena, lo)))
}
