//! nenofex is an expansion-based solver for quantified Boolean formulas
//! (QBF) in QDIMACS/DIMACS format.
//!
//! * Call it from a binary crate via [shell::main]; use as a library is not intended.
//! * As a starting point in this documentation, see [core::arena::Arena] and [core::engine::Engine].

#![allow(rustdoc::private_intra_doc_links)]

mod atpg;
mod cnf;
mod core;
mod oracle;
mod panic;
mod parser;
pub mod shell;
mod tests;
mod util;
