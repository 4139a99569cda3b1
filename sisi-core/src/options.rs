//! Options record.
//!
//! A flat, typed record of every tunable with a static registry that
//! drives parsing and help output. Values are set through
//! `key=value` assignments, either one at a time or from an options file.

use crate::error::{Result, SisiError};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Value type of a registered option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// `true/false/1/0/yes/no/on/off`
    Bool,
    /// Unsigned integer
    Uint,
    /// One of a fixed set of names
    Enum(&'static [&'static str]),
}

/// Registry entry for an option.
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    /// Assignment key
    pub key: &'static str,
    /// Group the option belongs to
    pub group: &'static str,
    /// Value type
    pub kind: OptionKind,
    /// Default, as it would be written in an assignment
    pub default: &'static str,
    /// One-line description
    pub description: &'static str,
}

/// Every recognized option.
pub const OPTION_TABLE: &[OptionSpec] = &[
    OptionSpec {
        key: "simplify",
        group: "global",
        kind: OptionKind::Bool,
        default: "true",
        description: "run the simplifying SAT preprocessor before consecution queries",
    },
    OptionSpec {
        key: "hybrid_ic3_bmc_kmax",
        group: "global",
        kind: OptionKind::Uint,
        default: "0",
        description: "BMC depth tried before switching to IC3 in safety checks",
    },
    OptionSpec {
        key: "maxsat_solver",
        group: "global",
        kind: OptionKind::Enum(&["linear", "msu4"]),
        default: "linear",
        description: "MaxSAT algorithm",
    },
    OptionSpec {
        key: "ic3_mic_attempts",
        group: "global",
        kind: OptionKind::Uint,
        default: "3",
        description: "failed literal drops tolerated during IC3 generalization",
    },
    OptionSpec {
        key: "msu4_reset_solver_period",
        group: "maxsat",
        kind: OptionKind::Uint,
        default: "0",
        description: "rebuild the MSU4 SAT instance every N calls (0 = never)",
    },
    OptionSpec {
        key: "msu4_reset_context_period",
        group: "maxsat",
        kind: OptionKind::Uint,
        default: "0",
        description: "retire an MSU4 relaxation context after N uses (0 = never)",
    },
    OptionSpec {
        key: "mcs_bmc_kmax",
        group: "mcs",
        kind: OptionKind::Uint,
        default: "10",
        description: "BMC depth used by BMC-based correction-set finders",
    },
    OptionSpec {
        key: "mcs_bmc_nmax",
        group: "mcs",
        kind: OptionKind::Uint,
        default: "0",
        description: "maximum correction sets produced by the approximate finder (0 = unbounded)",
    },
    OptionSpec {
        key: "caivc_use_bmc",
        group: "caivc",
        kind: OptionKind::Bool,
        default: "false",
        description: "seed CAIVC with BMC-found correction sets",
    },
    OptionSpec {
        key: "caivc_approx_mcs",
        group: "caivc",
        kind: OptionKind::Bool,
        default: "false",
        description: "seed CAIVC with approximate correction sets",
    },
    OptionSpec {
        key: "caivc_presweep_cardinality",
        group: "caivc",
        kind: OptionKind::Uint,
        default: "1",
        description: "enumerate all exact MCSes up to this size before the main loop",
    },
    OptionSpec {
        key: "marco_direction_up",
        group: "marco-ivc",
        kind: OptionKind::Bool,
        default: "false",
        description: "bias MARCO seeds towards large gate sets",
    },
    OptionSpec {
        key: "marco_direction_down",
        group: "marco-ivc",
        kind: OptionKind::Bool,
        default: "true",
        description: "bias MARCO seeds towards small gate sets",
    },
    OptionSpec {
        key: "marco_mcs",
        group: "marco-ivc",
        kind: OptionKind::Bool,
        default: "true",
        description: "use the debugger to block unsafe seeds with an MCS",
    },
    OptionSpec {
        key: "uivc_mcs_finder",
        group: "uivc",
        kind: OptionKind::Enum(&["basic", "bmc"]),
        default: "basic",
        description: "correction-set strategy",
    },
    OptionSpec {
        key: "uivc_map_solver",
        group: "uivc",
        kind: OptionKind::Enum(&["sat", "maxsat"]),
        default: "maxsat",
        description: "map-solver strategy",
    },
];

/// MaxSAT algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxSatAlgorithm {
    /// Linear search over a cardinality network
    Linear,
    /// Core-guided MSU4
    Msu4,
}

/// Correction-set strategy for UIVC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum McsStrategy {
    /// Exact, IC3-based cardinality sweep
    Basic,
    /// BMC-based, shrunk afterwards
    Bmc,
}

/// Map-solver strategy for UIVC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MapSolverKind {
    /// Plain SAT, any unexplored seed
    Sat,
    /// MaxSAT, minimum unexplored seed
    MaxSat,
}

/// Effective configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Options {
    /// Run the simplifying SAT preprocessor
    pub simplify: bool,
    /// BMC depth before IC3 in safety checks
    pub hybrid_ic3_bmc_kmax: usize,
    /// MaxSAT algorithm
    pub maxsat_solver: MaxSatAlgorithm,
    /// Literal drops tolerated in IC3 generalization
    pub ic3_mic_attempts: usize,
    /// MSU4 solver rebuild period
    pub msu4_reset_solver_period: usize,
    /// MSU4 context retirement period
    pub msu4_reset_context_period: usize,
    /// BMC depth for correction-set search
    pub mcs_bmc_kmax: usize,
    /// Cap on approximate correction sets
    pub mcs_bmc_nmax: usize,
    /// CAIVC: seed with BMC
    pub caivc_use_bmc: bool,
    /// CAIVC: seed with approximate MCSes
    pub caivc_approx_mcs: bool,
    /// CAIVC: exact presweep bound
    pub caivc_presweep_cardinality: usize,
    /// MARCO: explore upwards
    pub marco_direction_up: bool,
    /// MARCO: explore downwards
    pub marco_direction_down: bool,
    /// MARCO: block with debugger MCSes
    pub marco_mcs: bool,
    /// UIVC correction-set strategy
    pub uivc_mcs_finder: McsStrategy,
    /// UIVC map solver
    pub uivc_map_solver: MapSolverKind,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            simplify: true,
            hybrid_ic3_bmc_kmax: 0,
            maxsat_solver: MaxSatAlgorithm::Linear,
            ic3_mic_attempts: 3,
            msu4_reset_solver_period: 0,
            msu4_reset_context_period: 0,
            mcs_bmc_kmax: 10,
            mcs_bmc_nmax: 0,
            caivc_use_bmc: false,
            caivc_approx_mcs: false,
            caivc_presweep_cardinality: 1,
            marco_direction_up: false,
            marco_direction_down: true,
            marco_mcs: true,
            uivc_mcs_finder: McsStrategy::Basic,
            uivc_map_solver: MapSolverKind::MaxSat,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(SisiError::config(format!(
            "option '{key}' expects a Boolean, got '{value}'"
        ))),
    }
}

fn parse_uint(key: &str, value: &str) -> Result<usize> {
    value.parse::<usize>().map_err(|_| {
        SisiError::config(format!(
            "option '{key}' expects an unsigned integer, got '{value}'"
        ))
    })
}

fn parse_enum<'a>(key: &str, value: &'a str, allowed: &[&str]) -> Result<&'a str> {
    if allowed.contains(&value) {
        Ok(value)
    } else {
        Err(SisiError::config(format!(
            "option '{key}' expects one of {}, got '{value}'",
            allowed.join("|")
        )))
    }
}

impl Options {
    /// Look up the registry entry of a key.
    pub fn spec(key: &str) -> Option<&'static OptionSpec> {
        OPTION_TABLE.iter().find(|s| s.key == key)
    }

    /// Set a single option from its textual value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let spec = Self::spec(key)
            .ok_or_else(|| SisiError::config(format!("unknown option '{key}'")))?;
        let value = value.trim();
        match spec.kind {
            OptionKind::Bool => {
                let b = parse_bool(key, value)?;
                match key {
                    "simplify" => self.simplify = b,
                    "caivc_use_bmc" => self.caivc_use_bmc = b,
                    "caivc_approx_mcs" => self.caivc_approx_mcs = b,
                    "marco_direction_up" => self.marco_direction_up = b,
                    "marco_direction_down" => self.marco_direction_down = b,
                    "marco_mcs" => self.marco_mcs = b,
                    _ => unreachable!("Boolean option '{key}' has no field"),
                }
            }
            OptionKind::Uint => {
                let n = parse_uint(key, value)?;
                match key {
                    "hybrid_ic3_bmc_kmax" => self.hybrid_ic3_bmc_kmax = n,
                    "ic3_mic_attempts" => self.ic3_mic_attempts = n,
                    "msu4_reset_solver_period" => self.msu4_reset_solver_period = n,
                    "msu4_reset_context_period" => self.msu4_reset_context_period = n,
                    "mcs_bmc_kmax" => self.mcs_bmc_kmax = n,
                    "mcs_bmc_nmax" => self.mcs_bmc_nmax = n,
                    "caivc_presweep_cardinality" => self.caivc_presweep_cardinality = n,
                    _ => unreachable!("integer option '{key}' has no field"),
                }
            }
            OptionKind::Enum(allowed) => match (key, parse_enum(key, value, allowed)?) {
                ("maxsat_solver", "linear") => self.maxsat_solver = MaxSatAlgorithm::Linear,
                ("maxsat_solver", _) => self.maxsat_solver = MaxSatAlgorithm::Msu4,
                ("uivc_mcs_finder", "basic") => self.uivc_mcs_finder = McsStrategy::Basic,
                ("uivc_mcs_finder", _) => self.uivc_mcs_finder = McsStrategy::Bmc,
                ("uivc_map_solver", "sat") => self.uivc_map_solver = MapSolverKind::Sat,
                ("uivc_map_solver", _) => self.uivc_map_solver = MapSolverKind::MaxSat,
                _ => unreachable!("enum option '{key}' has no field"),
            },
        }
        Ok(())
    }

    /// Apply a `key=value` assignment.
    pub fn parse_assignment(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            SisiError::config(format!("expected key=value, got '{assignment}'"))
        })?;
        self.set(key.trim(), value)
    }

    /// Apply every assignment in `text`: one per line, `#` starts a comment.
    pub fn apply_text(&mut self, text: &str) -> Result<()> {
        for (lineno, line) in text.lines().enumerate() {
            let line = match line.split_once('#') {
                Some((before, _)) => before,
                None => line,
            }
            .trim();
            if line.is_empty() {
                continue;
            }
            self.parse_assignment(line).map_err(|e| match e {
                SisiError::Config(msg) => SisiError::config(format!("line {}: {msg}", lineno + 1)),
                other => other,
            })?;
        }
        Ok(())
    }

    /// Load defaults overridden by the assignments in an options file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut options = Self::default();
        options.apply_text(&text)?;
        Ok(options)
    }

    /// Help text listing every option, grouped.
    pub fn describe() -> String {
        let mut out = String::new();
        let mut group = "";
        for spec in OPTION_TABLE {
            if spec.group != group {
                group = spec.group;
                out.push_str(&format!("[{group}]\n"));
            }
            let kind = match spec.kind {
                OptionKind::Bool => "bool".to_string(),
                OptionKind::Uint => "uint".to_string(),
                OptionKind::Enum(names) => names.join("|"),
            };
            out.push_str(&format!(
                "  {:<28} {:<12} (default {:<6}) {}\n",
                spec.key, kind, spec.default, spec.description
            ));
        }
        out
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_table() {
        let mut options = Options::default();
        for spec in OPTION_TABLE {
            options
                .set(spec.key, spec.default)
                .expect("registered default parses");
        }
        let fresh = Options::default();
        assert_eq!(options.to_string(), fresh.to_string());
    }

    #[test]
    fn test_set_typed_values() {
        let mut options = Options::default();
        options.parse_assignment("simplify=off").unwrap();
        options.parse_assignment("mcs_bmc_kmax = 25").unwrap();
        options.parse_assignment("uivc_map_solver=sat").unwrap();
        options.parse_assignment("maxsat_solver=msu4").unwrap();
        assert!(!options.simplify);
        assert_eq!(options.mcs_bmc_kmax, 25);
        assert_eq!(options.uivc_map_solver, MapSolverKind::Sat);
        assert_eq!(options.maxsat_solver, MaxSatAlgorithm::Msu4);
    }

    #[test]
    fn test_unknown_key() {
        let mut options = Options::default();
        let err = options.set("no_such_option", "1").unwrap_err();
        assert!(matches!(err, SisiError::Config(_)));
    }

    #[test]
    fn test_bad_values() {
        let mut options = Options::default();
        assert!(options.set("simplify", "maybe").is_err());
        assert!(options.set("mcs_bmc_kmax", "-3").is_err());
        assert!(options.set("uivc_mcs_finder", "exact").is_err());
        assert!(options.parse_assignment("simplify").is_err());
    }

    #[test]
    fn test_apply_text() {
        let mut options = Options::default();
        options
            .apply_text("# tuning\nmarco_mcs=false\n\ncaivc_use_bmc=yes # seed\n")
            .unwrap();
        assert!(!options.marco_mcs);
        assert!(options.caivc_use_bmc);
        let err = options.apply_text("ok=1").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_describe_lists_every_key() {
        let help = Options::describe();
        for spec in OPTION_TABLE {
            assert!(help.contains(spec.key));
        }
    }
}
