//! The main loop: scope selection, cutoff checks, and the expand/simplify
//! cycle (`spec.md` §4.K).

use super::arena::Arena;
use super::cost;
use super::expand;
use super::flatten;
use super::heap::ScoreHeap;
use super::ids::{Quant, VarId};
use super::lca::LcaObject;
use super::result::SolveResult;
use super::simplify;
use super::univ;
use crate::atpg::SubformulaOptimizer;
use crate::oracle::SatOracle;

/// `--size-cutoff`: relative (`|x| < 1`, a fraction of the pre-expansion
/// size) or additive (an integer node-count delta).
#[derive(Debug, Clone, Copy)]
pub(crate) enum SizeCutoff {
    Relative(f64),
    Additive(i64),
}

/// `--univ-trigger`.
#[derive(Debug, Clone, Copy)]
pub(crate) enum UnivTrigger {
    Relative(u32),
    Absolute(u32),
}

/// `--cnf-generator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CnfGeneratorKind {
    Tseitin,
    TseitinRevised,
}

/// Every option in `spec.md` §6's CLI surface that shapes solving (as
/// opposed to pure I/O flags like `-v`, handled by the CLI shell itself).
#[derive(Debug, Clone)]
pub(crate) struct Options {
    pub(crate) max_expansions: Option<u32>,
    pub(crate) full_expansion: bool,
    pub(crate) size_cutoff: Option<SizeCutoff>,
    pub(crate) cost_cutoff: Option<i64>,
    pub(crate) univ_trigger: UnivTrigger,
    pub(crate) univ_delta: u32,
    pub(crate) no_sat_solving: bool,
    pub(crate) dump_cnf: bool,
    pub(crate) cnf_generator: CnfGeneratorKind,
    pub(crate) no_optimizations: bool,
    pub(crate) no_atpg: bool,
    pub(crate) no_global_flow: bool,
    pub(crate) opt_subgraph_limit: usize,
    pub(crate) propagation_limit: Option<u32>,
    pub(crate) post_expansion_flattening: bool,
    pub(crate) show_progress: bool,
    pub(crate) show_graph_size: bool,
    pub(crate) show_opt_info: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_expansions: None,
            full_expansion: false,
            size_cutoff: None,
            cost_cutoff: None,
            univ_trigger: UnivTrigger::Relative(10),
            univ_delta: 10,
            no_sat_solving: false,
            dump_cnf: false,
            cnf_generator: CnfGeneratorKind::Tseitin,
            no_optimizations: false,
            no_atpg: false,
            no_global_flow: false,
            opt_subgraph_limit: 500,
            propagation_limit: None,
            post_expansion_flattening: false,
            show_progress: false,
            show_graph_size: false,
            show_opt_info: false,
        }
    }
}

/// Outcome of running the expansion loop to completion, before any SAT
/// phase: either a verdict is already known, or the matrix became
/// one-sided (purely existential or, with `--full-expansion`, exhausted)
/// and is ready to hand to the SAT oracle.
pub(crate) enum LoopOutcome {
    Decided(SolveResult),
    ReadyForSat,
}

/// The single, explicit solver context (Design Note 9, "Global mutable
/// state"): every operation in `core` takes `&mut Engine` rather than
/// touching process-wide statics.
pub(crate) struct Engine {
    pub(crate) arena: Arena,
    pub(crate) options: Options,
    pub(crate) changed_subformula: LcaObject,
    pub(crate) unates: Vec<VarId>,
    pub(crate) vars_marked_for_update: Vec<VarId>,
    /// Per-scope not-yet-expanded-variable heaps, indexed the same as
    /// `arena.prefix.scopes`. Kept as a field sibling to `arena` rather than
    /// inside each `Scope` so that scoring a variable (reads `arena`) and
    /// writing back the positions a heap operation moved (writes `arena`)
    /// are always disjoint borrows of `self`, never both of `arena` at once.
    scope_heaps: Vec<ScoreHeap>,
    cur_scope: usize,
    univ_trigger_cur: u32,
    growth_since_trigger: u32,
    expansions_done: u32,
    pub(crate) result: Option<SolveResult>,
}

impl Engine {
    pub(crate) fn new(arena: Arena, options: Options) -> Self {
        let univ_trigger_cur = match options.univ_trigger {
            UnivTrigger::Relative(n) | UnivTrigger::Absolute(n) => n,
        };
        let cur_scope = arena.prefix.scopes.len().saturating_sub(1);
        let scope_heaps = arena.prefix.scopes.iter().map(|_| ScoreHeap::new()).collect();
        Self {
            arena,
            options,
            changed_subformula: LcaObject::default(),
            unates: Vec::new(),
            vars_marked_for_update: Vec::new(),
            scope_heaps,
            cur_scope,
            univ_trigger_cur,
            growth_since_trigger: 0,
            expansions_done: 0,
            result: None,
        }
    }

    /// Places a freshly created variable onto its scope's heap and queues
    /// its first score refresh. Used by the front-end for every variable it
    /// parses, and by [`Engine::expand_var`] for universal-lifting's
    /// dependency copies.
    pub(crate) fn register_var(&mut self, var: VarId) {
        let scope = self.arena.var(var).scope;
        self.push_var_onto_heap(scope, var);
        self.mark_dirty(var);
    }

    /// Marks `var` for a score refresh at the top of the next loop
    /// iteration, the single producer side of `vars_marked_for_update`
    /// (`spec.md` §5).
    pub(crate) fn mark_dirty(&mut self, var: VarId) {
        if !self.arena.var(var).collected_for_update {
            self.arena.var_mut(var).collected_for_update = true;
            self.vars_marked_for_update.push(var);
        }
        self.arena.var_mut(var).mark_all_dirty();
    }

    fn drain_score_refresh(&mut self) {
        for var in self.vars_marked_for_update.drain(..) {
            self.arena.var_mut(var).collected_for_update = false;
            if self.arena.var(var).eliminated {
                continue;
            }
            let had_pos = self.arena.var(var).heap_pos;
            cost::refresh(&mut self.arena, var);
            let scope = self.arena.var(var).scope;
            if let Some(pos) = had_pos {
                self.reheapify(scope, pos);
            }
        }
    }

    fn drain_unates(&mut self) {
        while let Some(var) = self.unates.pop() {
            if self.arena.var(var).eliminated {
                continue;
            }
            let mut touched = Vec::new();
            let outcome = simplify::eliminate_unate(&mut self.arena, var, &mut touched);
            for w in touched {
                self.mark_dirty(w);
            }
            if let Some(value) = outcome {
                self.result = Some(value.into());
                return;
            }
            self.arena.var_mut(var).eliminated = true;
            remove_from_scope(&mut self.arena, var);
        }
    }

    /// Moves `cur_scope` outward past scopes with no remaining variables —
    /// innermost scopes are expanded first, so once one empties out,
    /// processing continues with whatever scope is next-innermost,
    /// effectively merging adjacent scopes of the same quantifier type once
    /// the scope separating them is spent (`spec.md` §4.C/§4.K step 2).
    fn advance_scope(&mut self) {
        while self.cur_scope > 0 && self.arena.prefix.scope(self.cur_scope).vars.is_empty() {
            self.cur_scope -= 1;
        }
    }

    /// Whether every scope still holding variables shares one quantifier —
    /// the matrix is purely existential or purely universal and, absent
    /// `--full-expansion`, ready to hand to the SAT oracle (`spec.md` §4.K
    /// step 6).
    fn is_one_sided(&self) -> bool {
        let mut seen = None;
        for s in &self.arena.prefix.scopes {
            if s.vars.is_empty() {
                continue;
            }
            match seen {
                None => seen = Some(s.quant),
                Some(q) if q == s.quant => {}
                Some(_) => return false,
            }
        }
        true
    }

    fn cheapest_in_scope(&self, scope: usize) -> Option<VarId> {
        self.scope_heaps[scope].peek()
    }

    fn tree_size(&self) -> u32 {
        self.arena.root.map_or(0, |r| self.arena.node(r).size_subformula)
    }

    fn size_cutoff_hit(&self, before: u32) -> bool {
        match self.options.size_cutoff {
            None => false,
            Some(SizeCutoff::Additive(x)) => self.tree_size() as i64 > before as i64 + x,
            Some(SizeCutoff::Relative(x)) => {
                (self.tree_size() as f64) > (before as f64) * (1.0 + x)
            }
        }
    }

    fn cost_cutoff_hit(&self, var: VarId) -> bool {
        match self.options.cost_cutoff {
            None => false,
            Some(limit) => self.arena.var(var).exp_costs.score > limit,
        }
    }

    /// Runs the expansion loop to completion: component K's control flow.
    /// Does not invoke the SAT oracle; callers drive that phase separately
    /// once [`LoopOutcome::ReadyForSat`] is returned.
    pub(crate) fn run_expansion_loop(&mut self, optimizer: &mut dyn SubformulaOptimizer) -> LoopOutcome {
        loop {
            self.drain_score_refresh();
            self.drain_unates();
            if let Some(result) = self.result {
                return LoopOutcome::Decided(result);
            }

            self.advance_scope();

            if self.arena.prefix.is_empty() {
                return LoopOutcome::ReadyForSat;
            }
            if !self.options.full_expansion && self.is_one_sided() {
                return LoopOutcome::ReadyForSat;
            }
            if let Some(limit) = self.options.max_expansions {
                if self.expansions_done >= limit {
                    self.result = Some(SolveResult::Unknown);
                    continue;
                }
            }

            if !self.options.no_optimizations && !self.changed_subformula.is_empty() {
                optimizer.optimize(self);
                self.shrink_changed_subformula_if_needed();
            }

            let scope_to_use = self.select_scope();
            let Some(var) = self.cheapest_in_scope(scope_to_use) else {
                // scope is non-empty in vars but heap is empty: every var eliminated already.
                self.arena.prefix.scope_mut(scope_to_use).vars.clear();
                continue;
            };

            if self.cost_cutoff_hit(var) {
                self.result = Some(SolveResult::Unknown);
                continue;
            }

            let before = self.tree_size();
            self.pop_from_heap(scope_to_use, var);
            let lifted = scope_to_use != self.cur_scope;
            let grown = self.expand_var(var, lifted);

            self.expansions_done += 1;
            if self.size_cutoff_hit(before) {
                self.result = Some(SolveResult::Unknown);
            }
            if lifted {
                self.univ_trigger_cur += self.options.univ_delta;
                self.growth_since_trigger = 0;
            } else {
                self.growth_since_trigger = self.growth_since_trigger.saturating_add(grown);
            }
        }
    }

    /// Decides whether the cheapest move is in the current (innermost
    /// unexpanded) scope, or whether the universal-lifting trigger fires,
    /// reaching past it to the cheapest variable of some non-innermost
    /// universal scope instead (`spec.md` §4.J). The trigger compares either
    /// the whole tree's size against an absolute threshold, or the growth
    /// accumulated since the last time it fired against a relative one; both
    /// thresholds grow by `--univ-delta` each time lifting actually happens.
    fn select_scope(&self) -> usize {
        if self.arena.prefix.scope(self.cur_scope).quant == Quant::Forall {
            return self.cur_scope;
        }
        let fires = match self.options.univ_trigger {
            UnivTrigger::Absolute(_) => self.tree_size() >= self.univ_trigger_cur,
            UnivTrigger::Relative(_) => self.growth_since_trigger > self.univ_trigger_cur,
        };
        if !fires {
            return self.cur_scope;
        }
        let mut best: Option<(usize, i64)> = None;
        for s in 0..self.cur_scope {
            if self.arena.prefix.scope(s).quant != Quant::Forall {
                continue;
            }
            let Some(var) = self.scope_heaps[s].peek() else {
                continue;
            };
            let score = self.arena.var(var).exp_costs.score;
            if best.map_or(true, |(_, best_score)| score < best_score) {
                best = Some((s, score));
            }
        }
        best.map_or(self.cur_scope, |(s, _)| s)
    }

    fn pop_from_heap(&mut self, scope: usize, var: VarId) {
        let pos = self.arena.var(var).heap_pos.expect("selected variable must be on its scope heap");
        let score_of = |v: VarId| self.arena.var(v).exp_costs.score;
        let moved = self.scope_heaps[scope].remove_at(pos, &score_of);
        for (v, p) in moved {
            self.arena.var_mut(v).heap_pos = Some(p);
        }
        self.arena.var_mut(var).heap_pos = None;
    }

    /// Inserts a freshly allocated variable onto its scope's heap for the
    /// first time (the parser does this for every parsed variable;
    /// universal lifting does it for each dependency copy it mints). The
    /// variable's score need not be accurate yet — the caller is expected to
    /// follow up with [`Engine::mark_dirty`], and the next
    /// `drain_score_refresh` pass will reheapify it once [`cost::refresh`]
    /// has run.
    fn push_var_onto_heap(&mut self, scope: usize, var: VarId) {
        let score_of = |v: VarId| self.arena.var(v).exp_costs.score;
        let moved = self.scope_heaps[scope].push(var, &score_of);
        for (v, p) in moved {
            self.arena.var_mut(v).heap_pos = Some(p);
        }
    }

    fn reheapify(&mut self, scope: usize, pos: usize) {
        let score_of = |v: VarId| self.arena.var(v).exp_costs.score;
        let moved = self.scope_heaps[scope].reheapify_at(pos, &score_of);
        for (v, p) in moved {
            self.arena.var_mut(v).heap_pos = Some(p);
        }
    }

    /// Applies expansion to `var`, either the ordinary innermost operator
    /// (`lifted = false`) or, when the universal-lifting trigger selected a
    /// non-innermost universal (`lifted = true`), [`univ::expand_with_lifting`]
    /// — which additionally mints dependency copies that must be registered
    /// on their scope's heap and marked dirty for their first score refresh.
    fn expand_var(&mut self, var: VarId, lifted: bool) -> u32 {
        let before = self.tree_size();
        if lifted {
            let outcome = univ::expand_with_lifting(&mut self.arena, &mut self.changed_subformula, var);
            if let Some(value) = outcome.result {
                self.result = Some(value.into());
            }
            remove_from_scope(&mut self.arena, var);
            for w in outcome.touched_existing {
                self.mark_dirty(w);
            }
            for copy in outcome.new_copies {
                self.register_var(copy);
            }
        } else {
            let mut touched = Vec::new();
            let result = expand::expand(&mut self.arena, &mut self.changed_subformula, var, &mut touched);
            if let Some(value) = result {
                self.result = Some(value.into());
            }
            remove_from_scope(&mut self.arena, var);
            for w in touched {
                if w != var {
                    self.mark_dirty(w);
                }
            }
            if self.options.post_expansion_flattening && self.arena.quant_of_var(var) == Quant::Exists {
                self.flatten_changed_region();
            }
        }
        self.tree_size().saturating_sub(before)
    }

    /// Best-effort `--post-expansion-flattening` (`spec.md` §4.I step 6):
    /// tries to distribute the node at the changed region's LCA, the way
    /// [`Engine::shrink_changed_subformula_if_needed`] is allowed to miss
    /// some of the changed set rather than chase full precision.
    fn flatten_changed_region(&mut self) {
        if let Some(node) = self.changed_subformula.lca {
            let mut touched = Vec::new();
            flatten::flatten_if_cnf_shaped(&mut self.arena, node, &mut touched);
            for w in touched {
                self.mark_dirty(w);
            }
        }
    }

    fn shrink_changed_subformula_if_needed(&mut self) {
        if self.changed_subformula.children.len() <= self.options.opt_subgraph_limit {
            return;
        }
        // Best-effort: drop to the single largest child that fits; the
        // optimiser is allowed to miss some changes (`spec.md` §4.E).
        if let Some(&biggest) = self
            .changed_subformula
            .children
            .iter()
            .max_by_key(|&&c| self.arena.node(c).size_subformula)
        {
            for &c in &self.changed_subformula.children {
                self.arena.node_mut(c).changed_ch_list_pos = None;
            }
            self.changed_subformula.children.clear();
            self.changed_subformula.children.push(biggest);
            self.arena.node_mut(biggest).changed_ch_list_pos = Some(0);
        }
    }

    /// Builds the DIMACS CNF for the (by now purely propositional, or purely
    /// universal) residual matrix, in the correct top-level polarity
    /// (`spec.md` §6): the root's id in sat-solving mode, its negation in
    /// tautology-checking mode. Shared by [`Engine::discharge_to_oracle`]
    /// and `--dump-cnf`, which both need the same formula.
    pub(crate) fn build_cnf(&self) -> crate::cnf::CnfFormula {
        use crate::cnf;
        let tautology_mode = self.arena.prefix.innermost().map(|s| s.quant) == Some(Quant::Forall)
            && self
                .arena
                .prefix
                .scopes
                .iter()
                .all(|s| s.vars.is_empty() || s.quant == Quant::Forall);
        let generator = match self.options.cnf_generator {
            CnfGeneratorKind::Tseitin => cnf::tseitin::generate,
            CnfGeneratorKind::TseitinRevised => cnf::tseitin::generate_revised,
        };
        generator(&self.arena, tautology_mode)
    }

    /// Hands [`Engine::build_cnf`]'s formula to the SAT oracle and maps its
    /// verdict back onto [`SolveResult`].
    pub(crate) fn discharge_to_oracle(&self, oracle: &dyn SatOracle) -> SolveResult {
        let cnf = self.build_cnf();
        match oracle.solve(&cnf) {
            crate::oracle::OracleVerdict::Sat(_) => SolveResult::Sat,
            crate::oracle::OracleVerdict::Unsat => SolveResult::Unsat,
            crate::oracle::OracleVerdict::Unknown => SolveResult::Unknown,
        }
    }
}

fn remove_from_scope(arena: &mut Arena, var: VarId) {
    let scope = arena.var(var).scope;
    arena.prefix.scope_mut(scope).vars.retain(|&v| v != var);
}
