//! Tseitin and "revised Tseitin" CNF emitters (`spec.md` §4.M, §6).
//!
//! Structurally mirrors `clausy::core::formula::Formula::cnf_tseitin_visitor`'s
//! `def_and`/`def_or` pair, adapted from a hash-consed DAG (one definition
//! per *shared* sub-expression) to the NNF tree's occurrence-list
//! representation (one definition per *node*, since nothing here is
//! shared).

use rustc_hash::FxHashMap;

use super::CnfFormula;
use crate::core::arena::Arena;
use crate::core::ids::{Junctor, NodeId};
use crate::core::node::Kind;

/// Ordinary Tseitin transformation: every operator node gets a fresh
/// auxiliary variable `g` with defining clauses `g <-> op(children)`, and a
/// final unit clause fixes the root's polarity (`spec.md` §6).
pub(crate) fn generate(arena: &Arena, tautology_mode: bool) -> CnfFormula {
    let mut clauses = Vec::new();
    let mut labels = FxHashMap::default();
    let mut next_var = arena.vars.len() as i32 + 1;

    let Some(root) = arena.root else {
        // An empty matrix is vacuously true; in sat-solving mode that's
        // trivially SAT, in tautology mode trivially a tautology (neither
        // needs a clause to express).
        return CnfFormula {
            num_vars: arena.vars.len() as u32,
            clauses,
        };
    };

    let root_lit = assign(arena, root, &mut labels, &mut next_var, &mut clauses);
    let top = if tautology_mode { -root_lit } else { root_lit };
    clauses.push(vec![top]);

    CnfFormula {
        num_vars: (next_var - 1) as u32,
        clauses,
    }
}

/// `spec.md` §6's "revised Tseitin": when the root is an `And` (the common
/// case for a CNF/QBF matrix), its children need no auxiliary variable of
/// their own — asserting `root` true already means each child must hold,
/// so an `Or` child can be emitted directly as a plain clause instead of
/// being defined and then asserted. This is sound precisely when the top
/// two levels alternate in kind, which `spec.md` §3 invariant 5 (no
/// same-kind parent/child) guarantees by construction rather than merely
/// asserting it (`spec.md` §9, Open Question i) — checked here regardless,
/// since invariants are a property of well-formed states, not a proof
/// obligation callers are trusted to have discharged.
pub(crate) fn generate_revised(arena: &Arena, tautology_mode: bool) -> CnfFormula {
    let Some(root) = arena.root else {
        return CnfFormula {
            num_vars: arena.vars.len() as u32,
            clauses: Vec::new(),
        };
    };

    if tautology_mode || arena.node(root).junctor() != Some(Junctor::And) {
        // The fusion only shortens the common "assert this conjunction"
        // case. In tautology mode the asserted polarity is the root's
        // negation, which is no longer a plain conjunction of fused
        // clauses, so correctness requires falling back to the ordinary
        // emitter rather than guessing at a dual fusion.
        return generate(arena, tautology_mode);
    }
    if !fuses_cleanly(arena, root) {
        return generate(arena, tautology_mode);
    }

    let mut clauses = Vec::new();
    let mut labels = FxHashMap::default();
    let mut next_var = arena.vars.len() as i32 + 1;

    for child in arena.children(root) {
        match arena.node(child).kind {
            Kind::Literal(lit) => {
                let l = arena.lit(lit);
                let n = (l.var + 1) as i32;
                clauses.push(vec![if l.negated { -n } else { n }]);
            }
            Kind::Op(Junctor::Or) => {
                let clause: Vec<i32> = arena
                    .children(child)
                    .into_iter()
                    .map(|gc| assign(arena, gc, &mut labels, &mut next_var, &mut clauses))
                    .collect();
                clauses.push(clause);
            }
            Kind::Op(Junctor::And) => unreachable!(
                "NNF invariant 5 forbids an And directly under another And"
            ),
        }
    }

    CnfFormula {
        num_vars: (next_var - 1) as u32,
        clauses,
    }
}

/// Verifies the precondition the fused emitter relies on: every child of
/// `root` differs in kind from `root` itself. True by invariant 5 for any
/// tree that reached this point through the ordinary mutation primitives;
/// checked anyway rather than assumed.
fn fuses_cleanly(arena: &Arena, root: NodeId) -> bool {
    let root_junctor = arena.node(root).junctor();
    arena
        .children(root)
        .into_iter()
        .all(|c| arena.node(c).junctor() != root_junctor || root_junctor.is_none())
}

/// Recursively assigns a DIMACS literal to `node`: the literal's own
/// variable number for a leaf, or a freshly minted auxiliary variable (with
/// its defining clauses emitted into `clauses`) for an operator node.
fn assign(
    arena: &Arena,
    node: NodeId,
    labels: &mut FxHashMap<NodeId, i32>,
    next_var: &mut i32,
    clauses: &mut Vec<Vec<i32>>,
) -> i32 {
    if let Some(&g) = labels.get(&node) {
        return g;
    }
    match arena.node(node).kind {
        Kind::Literal(lit) => {
            let l = arena.lit(lit);
            let n = (l.var + 1) as i32;
            if l.negated {
                -n
            } else {
                n
            }
        }
        Kind::Op(junctor) => {
            let child_lits: Vec<i32> = arena
                .children(node)
                .into_iter()
                .map(|c| assign(arena, c, labels, next_var, clauses))
                .collect();
            let g = *next_var;
            *next_var += 1;
            labels.insert(node, g);
            match junctor {
                Junctor::And => {
                    // g -> each conjunct
                    for &c in &child_lits {
                        clauses.push(vec![-g, c]);
                    }
                    // (all conjuncts) -> g
                    let mut clause = vec![g];
                    clause.extend(child_lits.iter().map(|c| -c));
                    clauses.push(clause);
                }
                Junctor::Or => {
                    // each disjunct -> g
                    for &c in &child_lits {
                        clauses.push(vec![-c, g]);
                    }
                    // g -> (some disjunct)
                    let mut clause = vec![-g];
                    clause.extend(child_lits.iter().copied());
                    clauses.push(clause);
                }
            }
            g
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mutate;

    /// `e x y . (x | y) & (-x | -y)`, asserted satisfiable: root is `And`
    /// of two `Or`s, so the ordinary and revised emitters both produce a
    /// satisfiable CNF with a unit clause fixing the root's polarity true.
    fn build_small_cnf() -> Arena {
        let mut arena = Arena::new();
        let e = arena.prefix.push_scope(crate::core::ids::Quant::Exists);
        let x = arena.add_var(e);
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
        mutate::recompute_size_subtree(&mut arena, root);
        arena.root = Some(root);
        mutate::update_level(&mut arena, root);
        arena
    }

    #[test]
    fn ordinary_tseitin_adds_one_clause_per_operator_plus_unit() {
        let arena = build_small_cnf();
        let cnf = generate(&arena, false);
        // 1 (root And) + 2 (two Or children) = 3 defined nodes, each
        // contributing (children + 1) clauses, plus one unit clause.
        assert_eq!(cnf.clauses.len(), 3 + 3 + 3 + 1);
        assert_eq!(*cnf.clauses.last().unwrap(), vec![5]); // root label asserted true
    }

    #[test]
    fn revised_tseitin_skips_top_level_auxiliary_variables() {
        let arena = build_small_cnf();
        let cnf = generate_revised(&arena, false);
        // Each Or child becomes one plain clause directly; no root
        // variable, no per-child defining implications.
        assert_eq!(cnf.clauses.len(), 2);
        assert!(cnf.clauses.contains(&vec![1, 2]));
        assert!(cnf.clauses.contains(&vec![-1, -2]));
    }

    #[test]
    fn tautology_mode_falls_back_to_ordinary_emitter() {
        let arena = build_small_cnf();
        let revised = generate_revised(&arena, true);
        let ordinary = generate(&arena, true);
        assert_eq!(revised.clauses.len(), ordinary.clauses.len());
    }
}
