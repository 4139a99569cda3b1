//! Proof file reader.
//!
//! A proof is UTF-8 text with one clause per line:
//!
//! ```text
//! One-step Inductive Strengthening of Property (in CNF):
//! Clause 0: !l0 !l1
//! Clause 1: l2 !enable
//! ```
//!
//! Names resolve against the circuit: inputs by symbol or `iK`, latches by
//! symbol or `lK`. A `!` prefix negates. Lines naming something unknown are
//! skipped with a warning; the header line and blank lines are ignored;
//! anything else is a format error.

use crate::aiger::Aig;
use crate::error::{Result, SisiError};
use rustc_hash::FxHashMap;
use std::path::Path;
use tracing::warn;

const HEADER: &str = "One-step Inductive Strengthening of Property (in CNF):";

/// Name table for inputs and latches of a circuit.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: FxHashMap<String, u64>,
}

impl NameTable {
    /// Build the table from a circuit; symbols win over default names.
    pub fn new(aig: &Aig) -> Self {
        let mut names = FxHashMap::default();
        for (k, input) in aig.inputs.iter().enumerate() {
            names.insert(format!("i{k}"), input.lit);
        }
        for (k, latch) in aig.latches.iter().enumerate() {
            names.insert(format!("l{k}"), latch.lit);
        }
        for input in &aig.inputs {
            if let Some(name) = &input.name {
                names.insert(name.clone(), input.lit);
            }
        }
        for latch in &aig.latches {
            if let Some(name) = &latch.name {
                names.insert(name.clone(), latch.lit);
            }
        }
        Self { names }
    }

    /// AIGER literal named by `token` (`name` or `!name`).
    pub fn resolve(&self, token: &str) -> Option<u64> {
        let (negated, name) = match token.strip_prefix('!') {
            Some(name) => (true, name),
            None => (false, token),
        };
        self.names.get(name).map(|&lit| lit ^ u64::from(negated))
    }
}

/// Parse proof text into clauses of AIGER literals, in file order.
pub fn parse_proof(text: &str, aig: &Aig) -> Result<Vec<Vec<u64>>> {
    let table = NameTable::new(aig);
    let mut clauses = Vec::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line == HEADER {
            continue;
        }
        let body = clause_body(line)
            .ok_or_else(|| SisiError::format(lineno + 1, format!("unrecognized line '{line}'")))?;
        let clause: Option<Vec<u64>> = body
            .split_ascii_whitespace()
            .map(|token| {
                let lit = table.resolve(token);
                if lit.is_none() {
                    warn!(
                        line = lineno + 1,
                        name = token,
                        "unmapped name in proof, skipping clause"
                    );
                }
                lit
            })
            .collect();
        if let Some(clause) = clause {
            clauses.push(clause);
        }
    }
    Ok(clauses)
}

/// Read and parse a proof file.
pub fn read_proof(path: impl AsRef<Path>, aig: &Aig) -> Result<Vec<Vec<u64>>> {
    let text = std::fs::read_to_string(path)?;
    parse_proof(&text, aig)
}

/// Literal section of a `Clause N:` line.
fn clause_body(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("Clause")?;
    let (number, body) = rest.split_once(':')?;
    let number = number.trim();
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotator() -> Aig {
        let text = "aag 7 0 4 1 3\n2 8\n4 2\n6 4\n8 6\n14\n10 8 7\n12 5 2\n14 12 10\nl2 third\n";
        Aig::parse(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_clauses() {
        let aig = rotator();
        let text = format!("{HEADER}\n\nClause 0: !l0 !l1\nClause 1: l3 !third\n");
        let clauses = parse_proof(&text, &aig).unwrap();
        assert_eq!(clauses, vec![vec![3, 5], vec![8, 7]]);
    }

    #[test]
    fn test_unmapped_name_skips_line() {
        let aig = rotator();
        let clauses = parse_proof("Clause 0: !l0 !l9\nClause 1: l1\n", &aig).unwrap();
        assert_eq!(clauses, vec![vec![4]]);
    }

    #[test]
    fn test_empty_clause_line() {
        let aig = rotator();
        assert_eq!(parse_proof("Clause 4:\n", &aig).unwrap(), vec![Vec::<u64>::new()]);
    }

    #[test]
    fn test_garbage_is_fatal() {
        let aig = rotator();
        let err = parse_proof("Clause 0: l0\nnonsense here\n", &aig).unwrap_err();
        assert!(matches!(err, SisiError::Format { line: 2, .. }));
        assert!(parse_proof("Clause x: l0\n", &aig).is_err());
    }
}
