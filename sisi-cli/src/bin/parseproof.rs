//! parseproof - print a proof file as AIGER literals
//!
//! Resolves every name of the proof against the circuit and prints one
//! clause per line, space separated (even literals positive, odd negated).
//! Clauses naming something the circuit lacks are skipped with a warning.

use clap::Parser;
use sisi_core::proof_file::read_proof;
use sisi_core::{Aig, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::FmtSubscriber;

/// Print a proof file as AIGER literals
#[derive(Parser, Debug)]
#[command(name = "parseproof")]
#[command(version)]
struct Args {
    /// Circuit in AIGER format (aag or aig)
    #[arg(value_name = "AIG")]
    aig: PathBuf,

    /// Proof: one clause per line over input and latch names
    #[arg(value_name = "PROOF")]
    proof: PathBuf,
}

fn run(args: &Args) -> Result<()> {
    let aig = Aig::from_file(&args.aig)?;
    let clauses = read_proof(&args.proof, &aig)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for clause in &clauses {
        let line: Vec<String> = clause.iter().map(u64::to_string).collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::WARN)
        .with_writer(io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("parseproof: {e}");
            ExitCode::FAILURE
        }
    }
}
