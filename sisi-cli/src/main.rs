//! sisi - proof minimization and inductive validity cores for AIGER circuits
//!
//! Given a circuit and an inductive strengthening of one of its safety
//! properties, `sisi` reports minimal safe inductive subsets of that proof.
//! With `--ivc` it extracts minimal inductive validity cores (sets of AND
//! gates sufficient for the property) instead, and with `--check-ivc` it
//! judges a given gate set.

mod report;

use clap::{Parser, ValueEnum};
use report::Outcome;
use sisi_core::proof_file::read_proof;
use sisi_core::{Aig, Context, Lit, Options, Result, SisiError};
use sisi_engine::{IvcChecker, IvcKind, MinimizerKind, Proof, new_extractor, new_minimizer};
use sisi_ts::TransitionRelation;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Verbosity level
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
enum Verbosity {
    /// Errors only
    Quiet,
    /// Warnings about the inputs
    Normal,
    /// Progress of the algorithms
    Verbose,
    /// Per-query results
    Debug,
    /// Individual solver calls
    Trace,
}

impl Verbosity {
    fn directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        }
    }
}

/// Minimal safe inductive subsets and inductive validity cores
#[derive(Parser, Debug)]
#[command(name = "sisi")]
#[command(version)]
#[command(about = "Proof minimization and inductive validity core extraction for AIGER circuits")]
struct Args {
    /// Circuit in AIGER format (aag or aig)
    #[arg(value_name = "AIG", required_unless_present = "list_options")]
    aig: Option<PathBuf>,

    /// Proof: one clause per line over input and latch names
    #[arg(value_name = "PROOF")]
    proof: Option<PathBuf>,

    /// Proof minimizer: brute, sisi or camsis
    #[arg(short, long, value_name = "ALGO", conflicts_with_all = ["ivc", "check_ivc"])]
    minimizer: Option<MinimizerKind>,

    /// Extract MIVCs with caivc, cbvc, marco or uivc
    #[arg(long, value_name = "ALGO", conflicts_with = "check_ivc")]
    ivc: Option<IvcKind>,

    /// Check whether the AND gates in GATES (AIGER literals, comma or space separated) form an MIVC
    #[arg(long, value_name = "GATES")]
    check_ivc: Option<String>,

    /// Index of the checked property (among bad-state properties, or outputs if there are none)
    #[arg(short, long, value_name = "N", default_value = "0")]
    property: usize,

    /// Set an option, as key=value (repeatable)
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
    option: Vec<String>,

    /// Read options from a file, one key=value per line
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    /// List every option with its default and exit
    #[arg(long)]
    list_options: bool,

    /// Stop after N results
    #[arg(long, value_name = "N")]
    max_results: Option<usize>,

    /// Print one JSON document with results, options and statistics
    #[arg(long)]
    json: bool,

    /// Print statistics to stderr
    #[arg(long)]
    stats: bool,

    /// Verbosity level
    #[arg(short, long, value_enum, default_value = "normal")]
    verbosity: Verbosity,
}

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("sisi: failed to set tracing subscriber: {e}");
    }
}

/// Defaults, then the options file, then `-o` assignments in order.
fn load_options(args: &Args) -> Result<Options> {
    let mut options = match &args.options {
        Some(path) => Options::from_file(path)?,
        None => Options::default(),
    };
    for assignment in &args.option {
        options.parse_assignment(assignment)?;
    }
    Ok(options)
}

fn to_external(tr: &TransitionRelation, lits: &[Lit]) -> Result<Vec<u64>> {
    tr.context()
        .vars
        .make_external(lits)
        .ok_or_else(|| SisiError::config("result mentions a literal without an AIGER counterpart"))
}

/// Parse `--check-ivc` into AND-gate outputs of `tr`.
fn parse_gates(tr: &TransitionRelation, text: &str) -> Result<Vec<Lit>> {
    let mut gates = Vec::new();
    for token in text.split(|c: char| c == ',' || c.is_whitespace()).filter(|t| !t.is_empty()) {
        let ext: u64 = token
            .parse()
            .map_err(|_| SisiError::config(format!("'{token}' is not an AIGER literal")))?;
        let gate = tr
            .context()
            .vars
            .to_internal(ext)
            .filter(|&lit| tr.gate(lit).is_some())
            .ok_or_else(|| SisiError::config(format!("{ext} is not the output of an AND gate")))?;
        gates.push(gate);
    }
    gates.sort_unstable();
    gates.dedup();
    Ok(gates)
}

fn minimize(
    args: &Args,
    tr: &Rc<TransitionRelation>,
    aig: &Aig,
    kind: MinimizerKind,
) -> Result<Outcome> {
    let path = args
        .proof
        .as_ref()
        .ok_or_else(|| SisiError::config("proof minimization needs a PROOF file"))?;
    let proof = Proof::from_external(tr, &read_proof(path, aig)?)?;
    info!(clauses = proof.len(), minimizer = ?kind, "minimizing proof");
    let mut found = new_minimizer(kind, Rc::clone(tr), &proof, args.max_results).minimize()?;
    if let Some(limit) = args.max_results {
        found.truncate(limit);
    }
    if found.is_empty() {
        warn!("no safe inductive subset: the proof does not establish the property");
    }
    let msis = found
        .iter()
        .map(|ids| {
            proof
                .to_external(tr, ids)
                .ok_or_else(|| SisiError::config("proof clause without an AIGER counterpart"))
        })
        .collect::<Result<_>>()?;
    Ok(Outcome::Minimize { minimizer: kind, msis })
}

fn extract(args: &Args, tr: &Rc<TransitionRelation>, kind: IvcKind) -> Result<Outcome> {
    if args.proof.is_some() {
        warn!("IVC extraction ignores the proof file");
    }
    info!(gates = tr.gates().len(), extractor = ?kind, "extracting MIVCs");
    let found = new_extractor(kind, Rc::clone(tr), args.max_results).extract()?;
    let mivcs = found.iter().map(|mivc| to_external(tr, mivc)).collect::<Result<_>>()?;
    Ok(Outcome::Ivc { extractor: kind, mivcs })
}

fn check(tr: &Rc<TransitionRelation>, text: &str) -> Result<Outcome> {
    let gates = parse_gates(tr, text)?;
    let verdict = IvcChecker::new(Rc::clone(tr)).check(&gates)?;
    Ok(Outcome::CheckIvc {
        gates: to_external(tr, &gates)?,
        safe: verdict.safe,
        minimal: verdict.minimal,
    })
}

fn run(args: &Args) -> Result<()> {
    if args.list_options {
        print!("{}", Options::describe());
        return Ok(());
    }
    let options = load_options(args)?;
    let path = args
        .aig
        .as_ref()
        .ok_or_else(|| SisiError::config("missing AIG file"))?;
    let aig = Aig::from_file(path)?;
    let ctx = Context::new(options);
    let tr = Rc::new(TransitionRelation::from_aig(Rc::clone(&ctx), &aig, args.property)?);

    let outcome = if let Some(text) = &args.check_ivc {
        check(&tr, text)?
    } else if let Some(kind) = args.ivc {
        extract(args, &tr, kind)?
    } else if args.proof.is_some() || args.minimizer.is_some() {
        minimize(args, &tr, &aig, args.minimizer.unwrap_or(MinimizerKind::Sisi))?
    } else {
        return Err(SisiError::config(
            "nothing to do: give a PROOF, --ivc ALGO or --check-ivc GATES",
        ));
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        outcome.write_json(&mut out, &ctx.options, ctx.stats.snapshot())?;
    } else {
        outcome.write_plain(&mut out)?;
    }
    out.flush()?;
    if args.stats {
        eprint!("{}", ctx.stats.summary());
    }
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
    init_tracing(args.verbosity);
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sisi: {e}");
            ExitCode::FAILURE
        }
    }
}
