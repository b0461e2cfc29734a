//! Imperative shell (`spec.md` §4.N): parses CLI options, drives the
//! parser -> engine -> (optional) SAT oracle pipeline, and prints the
//! one-line QDIMACS result, mirroring `clausy::shell::main`'s role as the
//! single place that turns a command line into a run of the solver.

use std::process::ExitCode;

use clap::Parser;

use crate::atpg::NoopOptimizer;
use crate::core::engine::{CnfGeneratorKind, Engine, LoopOutcome, Options, SizeCutoff, UnivTrigger};
use crate::core::result::SolveResult;
use crate::oracle::KissatOracle;
use crate::parser::{self, InputError};
use crate::util;

/// An expansion-based solver for quantified Boolean formulas in QDIMACS.
#[derive(Parser, Debug)]
#[command(name = "nenofex", version, about)]
pub struct Cli {
    /// Input file in QDIMACS/DIMACS format, or `-` for standard input.
    #[arg(default_value = "-")]
    input: String,

    /// Hard cap on the number of expansions performed.
    #[arg(short = 'n', value_name = "N")]
    max_expansions: Option<u32>,

    /// Keep expanding past the point the matrix becomes purely
    /// existential/universal.
    #[arg(long)]
    full_expansion: bool,

    /// Abort if post-expansion tree size exceeds `old*(1+X)` (for `|X|<1`)
    /// or `old+X` (for integer `X`).
    #[arg(long, value_name = "X")]
    size_cutoff: Option<f64>,

    /// Abort if the minimum available score exceeds N.
    #[arg(long, value_name = "N")]
    cost_cutoff: Option<i64>,

    /// Growth that triggers a non-innermost universal expansion: a plain
    /// integer for a relative (growth-since-last-trigger) threshold, or
    /// `abs:N` for an absolute tree-size threshold.
    #[arg(long, value_name = "N|abs:N", default_value = "10")]
    univ_trigger: String,

    /// Amount by which `--univ-trigger`'s threshold grows after each
    /// universal expansion it fires.
    #[arg(long, value_name = "N", default_value_t = 10)]
    univ_delta: u32,

    /// Skip the SAT phase; stop once the expansion loop decides the matrix
    /// is ready for it, reporting UNKNOWN.
    #[arg(long)]
    no_sat_solving: bool,

    /// Print the generated CNF to standard output instead of solving it.
    #[arg(long)]
    dump_cnf: bool,

    /// CNF generator used once the matrix is one-sided.
    #[arg(long, value_enum, default_value_t = CnfGeneratorArg::Tseitin)]
    cnf_generator: CnfGeneratorArg,

    /// Disable the ATPG/global-flow optimiser pass entirely.
    #[arg(long)]
    no_optimizations: bool,
    /// Disable the ATPG-based redundancy removal specifically.
    #[arg(long)]
    no_atpg: bool,
    /// Disable the global-flow optimisation pass specifically.
    #[arg(long)]
    no_global_flow: bool,
    /// Cap on the number of nodes the optimiser's changed-subformula view
    /// tracks before it is shrunk to the single largest candidate.
    #[arg(long, value_name = "N", default_value_t = 500)]
    opt_subgraph_limit: usize,
    /// Cap on propagation steps per simplification pass (accepted for
    /// parity with the original tool; the bundled simplification passes
    /// already terminate on their own and do not consult this limit).
    #[arg(long, value_name = "N")]
    propagation_limit: Option<u32>,
    /// Distribute OR over AND on freshly split CNF-shaped subgraphs after
    /// an existential expansion.
    #[arg(long)]
    post_expansion_flattening: bool,

    /// Log one line per expansion to standard error.
    #[arg(long)]
    show_progress: bool,
    /// Report the live node count at the end of the run.
    #[arg(long)]
    show_graph_size: bool,
    /// Report optimiser statistics at the end of the run.
    #[arg(long)]
    show_opt_info: bool,

    /// Increase diagnostic verbosity (`-v`, `-vv`).
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum CnfGeneratorArg {
    Tseitin,
    TseitinRevised,
}

/// Parses `--univ-trigger`'s `N | abs:N` syntax.
fn parse_univ_trigger(raw: &str) -> Result<UnivTrigger, String> {
    match raw.strip_prefix("abs:") {
        Some(n) => n
            .parse()
            .map(UnivTrigger::Absolute)
            .map_err(|_| format!("invalid --univ-trigger value: {raw}")),
        None => raw
            .parse()
            .map(UnivTrigger::Relative)
            .map_err(|_| format!("invalid --univ-trigger value: {raw}")),
    }
}

fn parse_size_cutoff(x: f64) -> SizeCutoff {
    if x.abs() < 1.0 {
        SizeCutoff::Relative(x)
    } else {
        SizeCutoff::Additive(x as i64)
    }
}

fn build_options(cli: &Cli) -> Result<Options, String> {
    Ok(Options {
        max_expansions: cli.max_expansions,
        full_expansion: cli.full_expansion,
        size_cutoff: cli.size_cutoff.map(parse_size_cutoff),
        cost_cutoff: cli.cost_cutoff,
        univ_trigger: parse_univ_trigger(&cli.univ_trigger)?,
        univ_delta: cli.univ_delta,
        no_sat_solving: cli.no_sat_solving,
        dump_cnf: cli.dump_cnf,
        cnf_generator: match cli.cnf_generator {
            CnfGeneratorArg::Tseitin => CnfGeneratorKind::Tseitin,
            CnfGeneratorArg::TseitinRevised => CnfGeneratorKind::TseitinRevised,
        },
        no_optimizations: cli.no_optimizations,
        no_atpg: cli.no_atpg,
        no_global_flow: cli.no_global_flow,
        opt_subgraph_limit: cli.opt_subgraph_limit,
        propagation_limit: cli.propagation_limit,
        post_expansion_flattening: cli.post_expansion_flattening,
        show_progress: cli.show_progress,
        show_graph_size: cli.show_graph_size,
        show_opt_info: cli.show_opt_info,
    })
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

/// Main entry point: parses the command line, solves the input, and prints
/// the `spec.md` §6 result line. Returns the process exit code rather than
/// calling [`std::process::exit`] directly, so panics still run Rust's own
/// unwinding/cleanup machinery before the process exits.
pub fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    crate::panic::install_panic_hook();

    let options = match build_options(&cli) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("nenofex: {msg}");
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, options) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("nenofex: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, options: Options) -> Result<ExitCode, InputError> {
    let text = util::read_file(&cli.input)?;
    let parsed = parser::parse(&text)?;
    let declared_vars = parsed.declared_vars;
    let declared_clauses = parsed.declared_clauses;

    let mut engine = Engine::new(parsed.arena, options);
    let var_ids: Vec<_> = (0..engine.arena.vars.len()).collect();
    for var in var_ids {
        engine.register_var(var);
    }

    let mut optimizer = NoopOptimizer;
    let result = match engine.run_expansion_loop(&mut optimizer) {
        LoopOutcome::Decided(result) => result,
        LoopOutcome::ReadyForSat => {
            if cli.dump_cnf {
                print!("{}", engine.build_cnf());
            }
            if engine.options.no_sat_solving {
                SolveResult::Unknown
            } else {
                let oracle = KissatOracle {
                    binary: util::exec::path("kissat"),
                    timeout: None,
                };
                engine.discharge_to_oracle(&oracle)
            }
        }
    };

    if cli.show_graph_size {
        log::info!("live node count: {}", engine.arena.live_node_count());
    }
    if cli.show_opt_info {
        log::info!("optimiser: no-op (ATPG/global-flow out of scope)");
    }

    println!("s cnf {} {declared_vars} {declared_clauses}", result.code());
    Ok(ExitCode::SUCCESS)
}
