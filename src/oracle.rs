//! The SAT oracle contract (`spec.md` §1): consumed as a black box
//! returning SAT/UNSAT/UNKNOWN. [`KissatOracle`] shells out to the
//! `kissat` binary, mirroring the stdin/stdout piping idiom of
//! `clausy::util::exec::kissat`.

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::cnf::CnfFormula;

/// The oracle's verdict on a CNF formula, pre-translation back into
/// [`crate::core::result::SolveResult`] (which additionally knows whether
/// the query was posed in sat-solving or tautology-checking polarity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OracleVerdict {
    Sat(Vec<i32>),
    Unsat,
    Unknown,
}

pub(crate) trait SatOracle {
    fn solve(&self, cnf: &CnfFormula) -> OracleVerdict;
}

/// Selected by `--no-sat-solving`'s absence; shells out to an external
/// `kissat` process exactly as `clausy::util::exec::kissat` does, except it
/// reports `Unknown` rather than panicking when the binary is missing or a
/// deadline (`spec.md` §5, "a single SIGALRM-style deadline") elapses.
pub(crate) struct KissatOracle {
    pub(crate) binary: String,
    pub(crate) timeout: Option<Duration>,
}

impl Default for KissatOracle {
    fn default() -> Self {
        Self {
            binary: "kissat".to_string(),
            timeout: None,
        }
    }
}

impl SatOracle for KissatOracle {
    fn solve(&self, cnf: &CnfFormula) -> OracleVerdict {
        let mut child = match Command::new(&self.binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                log::warn!("could not start `{}`: {e}; reporting UNKNOWN", self.binary);
                return OracleVerdict::Unknown;
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(cnf.to_string().as_bytes()) {
                log::warn!("failed writing CNF to `{}`: {e}", self.binary);
            }
        }

        let status = match self.timeout {
            Some(deadline) => match child.wait_timeout(deadline) {
                Ok(Some(status)) => Some(status),
                Ok(None) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    None
                }
                Err(_) => None,
            },
            None => child.wait().ok(),
        };

        let Some(status) = status else {
            return OracleVerdict::Unknown;
        };

        let mut output = String::new();
        if let Some(mut stdout) = child.stdout.take() {
            let _ = stdout.read_to_string(&mut output);
        }

        // kissat's documented exit codes: 10 = SAT, 20 = UNSAT.
        match status.code() {
            Some(10) => OracleVerdict::Sat(parse_model(&output)),
            Some(20) => OracleVerdict::Unsat,
            _ => OracleVerdict::Unknown,
        }
    }
}

fn parse_model(output: &str) -> Vec<i32> {
    output
        .lines()
        .filter(|line| line.starts_with('v'))
        .flat_map(|line| line[1..].split_whitespace())
        .filter_map(|tok| tok.parse::<i32>().ok())
        .filter(|&lit| lit != 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_reports_unknown_rather_than_panicking() {
        let oracle = KissatOracle {
            binary: "this-binary-should-not-exist-anywhere".to_string(),
            timeout: None,
        };
        let cnf = CnfFormula {
            num_vars: 1,
            clauses: vec![vec![1]],
        };
        assert_eq!(oracle.solve(&cnf), OracleVerdict::Unknown);
    }
}
