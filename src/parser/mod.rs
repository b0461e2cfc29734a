//! QDIMACS/DIMACS front-end: turns a `.qdimacs` file (or stdin) into an
//! [`Arena`] whose root is the clausal NNF tree and whose
//! [`crate::core::scope::ScopePrefix`] reflects the input's quantifier
//! prefix (`spec.md` §4.L, §6).
//!
//! Modeled on `clausy::parser::cnf::CnfFormulaParser`: a `pest` grammar
//! (`qdimacs.pest`) parsed into a flat stream of header/scope/clause
//! pairs, then folded into the arena one clause at a time. Unlike
//! `clausy`'s parsers, which build a shared (hash-consed) DAG, expansion
//! needs an un-shared tree, so every literal occurrence gets its own
//! [`crate::core::node::Node`].

use std::fmt;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::core::arena::Arena;
use crate::core::ids::{Junctor, Quant};
use crate::core::mutate;
use crate::core::var::VarId;

#[derive(Parser)]
#[grammar = "parser/qdimacs.pest"]
struct QdimacsParser;

/// `spec.md` §7's Input-format error taxonomy: malformed preamble, a
/// literal or scope variable out of the declared range, a variable
/// quantified twice, or too many/few clauses. All are fatal; `shell::main`
/// prints the message and exits non-zero.
#[derive(Debug)]
pub(crate) enum InputError {
    Io(String),
    Syntax(String),
    VarOutOfRange { var: u32, max: u32 },
    VarQuantifiedTwice(u32),
    ClauseCountMismatch { declared: u32, actual: usize },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Io(msg) => write!(f, "{msg}"),
            InputError::Syntax(msg) => write!(f, "syntax error: {msg}"),
            InputError::VarOutOfRange { var, max } => {
                write!(f, "variable {var} exceeds declared maximum {max}")
            }
            InputError::VarQuantifiedTwice(var) => {
                write!(f, "variable {var} is quantified more than once")
            }
            InputError::ClauseCountMismatch { declared, actual } => write!(
                f,
                "preamble declared {declared} clauses, found {actual}"
            ),
        }
    }
}

impl From<std::io::Error> for InputError {
    fn from(e: std::io::Error) -> Self {
        InputError::Io(e.to_string())
    }
}

impl std::error::Error for InputError {}

/// The parsed result: a populated [`Arena`] plus the preamble's declared
/// variable/clause counts, which the CLI echoes back in the result line
/// (`spec.md` §6, "`s cnf {1|0|-1} V C`").
pub(crate) struct ParsedInput {
    pub(crate) arena: Arena,
    pub(crate) declared_vars: u32,
    pub(crate) declared_clauses: u32,
}

/// Parses `text` as QDIMACS, building the initial NNF tree directly as a
/// root `And` of per-clause `Or` nodes (`spec.md` §4.L).
pub(crate) fn parse(text: &str) -> Result<ParsedInput, InputError> {
    let mut pairs = QdimacsParser::parse(Rule::file, text)
        .map_err(|e| InputError::Syntax(e.to_string()))?;
    let file = pairs.next().expect("file rule always produces one pair");

    let mut arena = Arena::new();
    let mut declared_vars = 0u32;
    let mut declared_clauses = 0u32;
    let mut var_by_dimacs: Vec<Option<VarId>> = Vec::new();
    let mut any_scope_seen = false;
    let mut clause_nodes = Vec::new();
    let mut parsed_clause_count = 0usize;

    for pair in file.into_inner() {
        match pair.as_rule() {
            Rule::header => {
                let mut nums = pair.into_inner();
                declared_vars = parse_u32(nums.next().unwrap())?;
                declared_clauses = parse_u32(nums.next().unwrap())?;
                var_by_dimacs = vec![None; declared_vars as usize + 1];
            }
            Rule::scope_line => {
                any_scope_seen = true;
                parse_scope_line(pair, &mut arena, &mut var_by_dimacs, declared_vars)?;
            }
            Rule::clause => {
                parsed_clause_count += 1;
                if let Some(node) =
                    parse_clause(pair, &mut arena, &mut var_by_dimacs, declared_vars)?
                {
                    clause_nodes.push(node);
                }
            }
            Rule::EOI => {}
            _ => unreachable!("grammar only emits header/scope_line/clause/EOI at the top level"),
        }
    }

    if declared_clauses as usize != parsed_clause_count {
        return Err(InputError::ClauseCountMismatch {
            declared: declared_clauses,
            actual: parsed_clause_count,
        });
    }

    // Variables mentioned in no scope line land in the default scope:
    // existential, outermost, with a warning on genuine QBF input
    // (`spec.md` §6).
    for num in 1..=declared_vars {
        if var_by_dimacs[num as usize].is_none() {
            if any_scope_seen {
                log::warn!(
                    "variable {num} has no quantifier; treating it as outermost existential"
                );
            }
            let scope = arena.default_scope();
            let var = arena.add_var(scope);
            var_by_dimacs[num as usize] = Some(var);
        }
    }

    assemble_matrix(&mut arena, clause_nodes);

    Ok(ParsedInput {
        arena,
        declared_vars,
        declared_clauses,
    })
}

fn parse_u32(pair: Pair<Rule>) -> Result<u32, InputError> {
    pair.as_str()
        .parse()
        .map_err(|_| InputError::Syntax(format!("not a valid number: {}", pair.as_str())))
}

fn parse_scope_line(
    pair: Pair<Rule>,
    arena: &mut Arena,
    var_by_dimacs: &mut Vec<Option<VarId>>,
    declared_vars: u32,
) -> Result<(), InputError> {
    let mut inner = pair.into_inner();
    let kind = inner.next().unwrap();
    let quant = match kind.as_str() {
        "e" => Quant::Exists,
        "a" => Quant::Forall,
        other => unreachable!("scope_kind only matches e/a, got {other}"),
    };
    let scope = arena.prefix.push_scope(quant);
    for num_pair in inner {
        let num: u32 = parse_u32(num_pair)?;
        if num == 0 || num > declared_vars {
            return Err(InputError::VarOutOfRange {
                var: num,
                max: declared_vars,
            });
        }
        if var_by_dimacs[num as usize].is_some() {
            return Err(InputError::VarQuantifiedTwice(num));
        }
        let var = arena.add_var(scope);
        var_by_dimacs[num as usize] = Some(var);
    }
    Ok(())
}

/// Resolves a clause's literals into a fresh subtree: a bare literal node
/// for a unit clause, or an `Or` of literal nodes otherwise. Does not
/// attach the result to anything yet — the caller assembles the root once
/// every clause has been built, so that the all-unit-clauses and
/// single-clause edge cases (`spec.md` §3 invariant 4, "an operator node
/// has >= 2 children") never produce a singleton operator.
///
/// Applies one-level simplification (`spec.md` §4.G) to the clause's own
/// literals as they're read: a variable repeated with the same polarity is
/// a redundant duplicate and is dropped; repeated with the opposite
/// polarity makes the clause a tautology, so the whole clause is dropped
/// (`Ok(None)`) rather than added to the matrix.
fn parse_clause(
    pair: Pair<Rule>,
    arena: &mut Arena,
    var_by_dimacs: &mut Vec<Option<VarId>>,
    declared_vars: u32,
) -> Result<Option<crate::core::ids::NodeId>, InputError> {
    let mut lit_nodes = Vec::new();
    let mut seen: rustc_hash::FxHashMap<VarId, bool> = rustc_hash::FxHashMap::default();
    let mut tautology = false;
    for lit_pair in pair.into_inner() {
        let text = lit_pair.as_str();
        let negated = text.starts_with('-');
        let num: u32 = text.trim_start_matches('-').parse().unwrap();
        if num == 0 || num > declared_vars {
            return Err(InputError::VarOutOfRange {
                var: num,
                max: declared_vars,
            });
        }
        let var = match var_by_dimacs[num as usize] {
            Some(v) => v,
            None => {
                // first appearance of a variable absent from any scope
                // line; lazily land it in the default scope (`spec.md` §6).
                let scope = arena.default_scope();
                let v = arena.add_var(scope);
                var_by_dimacs[num as usize] = Some(v);
                v
            }
        };
        match seen.get(&var) {
            Some(&prev_negated) if prev_negated == negated => continue, // duplicate, drop silently
            Some(_) => tautology = true,
            None => {
                seen.insert(var, negated);
            }
        }
        let node = arena.add_literal_node(var, negated);
        mutate::add_to_occurrence_list(arena, node);
        lit_nodes.push(node);
    }
    if tautology {
        // No variable has an LCA yet at parse time (that's installed lazily
        // by the first `cost::refresh`), so there is nothing to collect.
        let mut touched = Vec::new();
        for n in lit_nodes {
            mutate::free_subformula(arena, n, &mut touched);
        }
        return Ok(None);
    }
    if lit_nodes.len() == 1 {
        Ok(Some(lit_nodes.into_iter().next().unwrap()))
    } else {
        let or_node = arena.add_op_node(Junctor::Or);
        for n in &lit_nodes {
            mutate::append_child(arena, or_node, *n);
        }
        mutate::recompute_size_subtree(arena, or_node);
        Ok(Some(or_node))
    }
}

/// Attaches every clause subtree under a single root, skipping the
/// wrapping `And` entirely when there is only one clause (again to avoid a
/// singleton operator node). An empty clause list (`declared_clauses == 0`)
/// leaves the arena without a root: the formula is vacuously true.
fn assemble_matrix(arena: &mut Arena, clause_nodes: Vec<crate::core::ids::NodeId>) {
    match clause_nodes.len() {
        0 => arena.root = None,
        1 => {
            let root = clause_nodes[0];
            arena.root = Some(root);
            mutate::update_level(arena, root);
        }
        _ => {
            let root = arena.add_op_node(Junctor::And);
            for n in &clause_nodes {
                mutate::append_child(arena, root, *n);
            }
            arena.root = Some(root);
            mutate::update_level(arena, root);
            mutate::recompute_size_subtree(arena, root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::Kind;

    #[test]
    fn parses_propositional_cnf() {
        let parsed = parse("p cnf 2 2\n1 2 0\n-1 -2 0\n").unwrap();
        assert_eq!(parsed.declared_vars, 2);
        assert_eq!(parsed.declared_clauses, 2);
        assert_eq!(parsed.arena.vars.len(), 2);
        assert!(parsed.arena.root.is_some());
    }

    #[test]
    fn parses_qbf_prefix() {
        let parsed = parse("p cnf 2 2\na 1 0\ne 2 0\n1 2 0\n-1 2 0\n").unwrap();
        assert_eq!(parsed.arena.prefix.scopes.len(), 2);
        assert_eq!(
            parsed.arena.prefix.scope(0).quant,
            crate::core::ids::Quant::Forall
        );
        assert_eq!(
            parsed.arena.prefix.scope(1).quant,
            crate::core::ids::Quant::Exists
        );
    }

    #[test]
    fn rejects_double_quantification() {
        let err = parse("p cnf 1 1\ne 1 0\na 1 0\n1 0\n").unwrap_err();
        assert!(matches!(err, InputError::VarQuantifiedTwice(1)));
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let parsed = parse("c a comment\np cnf 1 1\n\nc another\n1 0\n").unwrap();
        assert_eq!(parsed.declared_vars, 1);
    }

    #[test]
    fn unit_clause_has_no_singleton_or() {
        let parsed = parse("p cnf 1 1\n1 0\n").unwrap();
        let root = parsed.arena.root.unwrap();
        assert!(matches!(parsed.arena.node(root).kind, Kind::Literal(_)));
    }

    /// `1 1 2 0` drops the duplicate `1`, becoming `(1 | 2)`.
    #[test]
    fn duplicate_literal_in_clause_is_dropped() {
        let parsed = parse("p cnf 2 1\n1 1 2 0\n").unwrap();
        let root = parsed.arena.root.unwrap();
        assert_eq!(parsed.arena.node(root).num_children, 2);
    }

    /// A tautological clause (`1 -1 0`) is dropped from the matrix entirely;
    /// with no other clauses, the formula is vacuously true.
    #[test]
    fn tautological_clause_is_dropped() {
        let parsed = parse("p cnf 1 1\n1 -1 0\n").unwrap();
        assert!(parsed.arena.root.is_none());
    }
}
