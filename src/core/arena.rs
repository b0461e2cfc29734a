//! The node/var/lit arena backing one NNF circuit.
//!
//! Plays the role `clausy::core::arena::Arena` plays for its DAG: a set of
//! dense, index-addressed pools (`nodes`, `vars`, `lits`) that every other
//! `core` module borrows into rather than owning references directly
//! (`spec.md` §9, "Arena/index representation"). Unlike `clausy`'s arena,
//! there is no hash-consing (`exprs_inv`) — the NNF tree is not shared
//! structure, and expansion routinely needs two structurally identical but
//! distinct copies of a subformula.

use std::fmt;

use super::ids::{Junctor, LitId, NodeId, Quant, VarId};
use super::lca::LcaObject;
use super::lit::Lit;
use super::node::{Kind, Node};
use super::scope::{Scope, ScopePrefix};
use super::var::{ScopeId, Var};

/// Owns every node, variable, and literal of one formula, plus the
/// quantifier prefix over its variables.
///
/// There is exactly one `Arena` per [`super::engine::Engine`] (Design Note
/// 9, "Global mutable state" / "Single source of truth").
pub(crate) struct Arena {
    pub(crate) nodes: Vec<Node>,
    /// Slots in `nodes` freed by [`super::mutate::free_subformula`]/
    /// [`super::mutate::free_node`] and available for reuse; avoids the
    /// vector growing unboundedly across a long expansion run.
    free_nodes: Vec<NodeId>,
    pub(crate) vars: Vec<Var>,
    pub(crate) lits: Vec<Lit>,
    pub(crate) root: Option<NodeId>,
    pub(crate) prefix: ScopePrefix,
}

impl Arena {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free_nodes: Vec::new(),
            vars: Vec::new(),
            lits: Vec::new(),
            root: None,
            prefix: ScopePrefix::new(),
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub(crate) fn var(&self, id: VarId) -> &Var {
        &self.vars[id]
    }

    pub(crate) fn var_mut(&mut self, id: VarId) -> &mut Var {
        &mut self.vars[id]
    }

    pub(crate) fn lit(&self, id: LitId) -> &Lit {
        &self.lits[id]
    }

    pub(crate) fn lit_mut(&mut self, id: LitId) -> &mut Lit {
        &mut self.lits[id]
    }

    /// Allocates a fresh variable in `scope`, together with its two literals.
    pub(crate) fn add_var(&mut self, scope: ScopeId) -> VarId {
        let id = self.vars.len();
        let neg_lit = self.lits.len();
        self.lits.push(Lit::new(id, true));
        let pos_lit = self.lits.len();
        self.lits.push(Lit::new(id, false));
        self.vars.push(Var::new(id, scope, neg_lit, pos_lit));
        self.prefix.scope_mut(scope).vars.push(id);
        id
    }

    /// Allocates a detached `And`/`Or` node (no parent, no children).
    pub(crate) fn add_op_node(&mut self, junctor: Junctor) -> NodeId {
        self.alloc_node(Node::new_op(0, junctor))
    }

    /// Allocates a detached literal leaf referencing `var` with the given
    /// polarity. Does not link the node into `var`'s occurrence list; see
    /// [`super::mutate::add_lit_node_to_occurrence_list`].
    pub(crate) fn add_literal_node(&mut self, var: VarId, negated: bool) -> NodeId {
        let lit = self.var(var).lit(negated);
        self.alloc_node(Node::new_literal(0, lit))
    }

    fn alloc_node(&mut self, mut node: Node) -> NodeId {
        if let Some(id) = self.free_nodes.pop() {
            node.id = id;
            self.nodes[id] = node;
            id
        } else {
            let id = self.nodes.len();
            node.id = id;
            self.nodes.push(node);
            id
        }
    }

    /// Returns a node's slot to the free list. Callers must have already
    /// unlinked it from every sibling/occurrence/LCA list it belonged to.
    pub(crate) fn free_node(&mut self, id: NodeId) {
        self.free_nodes.push(id);
    }

    /// Number of nodes currently live (allocated minus freed), the figure
    /// `--show-graph-size` reports (`spec.md` §9, "Manual memory
    /// accounting").
    pub(crate) fn live_node_count(&self) -> usize {
        self.nodes.len() - self.free_nodes.len()
    }

    pub(crate) fn live_var_count(&self) -> usize {
        self.vars.iter().filter(|v| !v.eliminated).count()
    }

    /// Children of `node`, in sibling-list order.
    pub(crate) fn children(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.node(node).num_children as usize);
        let mut cur = self.node(node).child_head;
        while let Some(c) = cur {
            out.push(c);
            cur = self.node(c).next_sibling;
        }
        out
    }

    pub(crate) fn dual_lit(&self, lit: LitId) -> LitId {
        let l = self.lit(lit);
        self.var(l.var).lit(!l.negated)
    }

    pub(crate) fn quant_of_var(&self, var: VarId) -> Quant {
        self.prefix.scope(self.var(var).scope).quant
    }

    pub(crate) fn fresh_lca_object(&self) -> LcaObject {
        LcaObject::default()
    }

    /// Returns the existing outermost scope if it is already existential;
    /// otherwise inserts a fresh existential scope ahead of everything else
    /// (`spec.md` §6: a variable with no scope line lands in the default,
    /// outermost existential scope). Every scope's `id`/`depth` shifts by
    /// one when this happens, so every variable already allocated — not
    /// just `self.prefix`'s own bookkeeping — has its `scope` field bumped
    /// to match; `default_scope` lives here rather than on `ScopePrefix`
    /// because only `Arena` can see both sides of that remap.
    pub(crate) fn default_scope(&mut self) -> ScopeId {
        if let Some(first) = self.prefix.scopes.first() {
            if first.quant == Quant::Exists {
                return first.id;
            }
        }
        self.prefix.scopes.insert(0, Scope::new(0, Quant::Exists, 0));
        for (depth, scope) in self.prefix.scopes.iter_mut().enumerate().skip(1) {
            scope.id = depth;
            scope.depth = depth as u32;
        }
        for var in &mut self.vars {
            var.scope += 1;
        }
        0
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Arena {
    /// Renders the tree rooted at [`Arena::root`] as a fully parenthesized
    /// infix expression, the same debugging shape `clausy::core::arena::Arena::format_expr`
    /// produces for its own DAG.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            Some(root) => self.format_node(f, root),
            None => write!(f, "<empty>"),
        }
    }
}

impl Arena {
    fn format_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId) -> fmt::Result {
        match self.node(id).kind {
            Kind::Literal(lit) => {
                let l = self.lit(lit);
                if l.negated {
                    write!(f, "-")?;
                }
                write!(f, "{}", l.var + 1)
            }
            Kind::Op(junctor) => {
                let sep = match junctor {
                    Junctor::And => " & ",
                    Junctor::Or => " | ",
                };
                write!(f, "(")?;
                for (i, child) in self.children(id).into_iter().enumerate() {
                    if i > 0 {
                        write!(f, "{sep}")?;
                    }
                    self.format_node(f, child)?;
                }
                write!(f, ")")
            }
        }
    }
}
