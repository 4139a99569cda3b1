//! Result rendering: plain AIGER literals or a single JSON document.

use serde::Serialize;
use sisi_core::{Options, StatsSnapshot};
use sisi_engine::{IvcKind, MinimizerKind};
use std::io::{self, Write};

/// What a run produced, in AIGER literals.
#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Outcome {
    /// Minimal safe inductive subsets of the input proof
    Minimize {
        minimizer: MinimizerKind,
        msis: Vec<Vec<Vec<u64>>>,
    },
    /// Minimal inductive validity cores
    Ivc { extractor: IvcKind, mivcs: Vec<Vec<u64>> },
    /// Verdict on a user-supplied gate set
    CheckIvc { gates: Vec<u64>, safe: bool, minimal: bool },
}

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    outcome: &'a Outcome,
    options: &'a Options,
    stats: StatsSnapshot,
}

fn write_lits(out: &mut impl Write, lits: &[u64]) -> io::Result<()> {
    let line: Vec<String> = lits.iter().map(u64::to_string).collect();
    writeln!(out, "{}", line.join(" "))
}

impl Outcome {
    /// One clause or gate set per line. MSISes are separated by a blank line.
    pub fn write_plain(&self, out: &mut impl Write) -> io::Result<()> {
        match self {
            Outcome::Minimize { msis, .. } => {
                for (i, clauses) in msis.iter().enumerate() {
                    if i > 0 {
                        writeln!(out)?;
                    }
                    for clause in clauses {
                        write_lits(out, clause)?;
                    }
                }
            }
            Outcome::Ivc { mivcs, .. } => {
                for mivc in mivcs {
                    write_lits(out, mivc)?;
                }
            }
            Outcome::CheckIvc { safe, minimal, .. } => {
                let verdict = match (safe, minimal) {
                    (true, true) => "mivc",
                    (true, false) => "ivc",
                    (false, _) => "unsafe",
                };
                writeln!(out, "{verdict}")?;
            }
        }
        Ok(())
    }

    /// The outcome with the effective options and statistics.
    pub fn write_json(
        &self,
        out: &mut impl Write,
        options: &Options,
        stats: StatsSnapshot,
    ) -> serde_json::Result<()> {
        let report = Report {
            outcome: self,
            options,
            stats,
        };
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out).map_err(serde_json::Error::io)
    }
}
