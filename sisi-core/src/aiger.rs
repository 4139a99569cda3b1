//! AIGER reader.
//!
//! Reads the ASCII (`aag`) and binary (`aig`) formats of AIGER 1.9:
//! inputs, latches with reset values, outputs, bad-state properties,
//! invariant constraints, AND gates and the symbol table. Justice and
//! fairness sections are parsed and dropped.
//!
//! Literals stay in AIGER encoding (`var << 1 | sign`); translation into
//! internal literals happens when a transition relation is built.

use crate::error::{Result, SisiError};
use std::path::Path;

/// Reset value of a latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AigReset {
    /// Starts at 0
    Zero,
    /// Starts at 1
    One,
    /// Starts with an arbitrary value
    Uninit,
}

/// A primary input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AigInput {
    /// Positive literal
    pub lit: u64,
    /// Symbol, if any
    pub name: Option<String>,
}

/// A latch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AigLatch {
    /// Positive literal
    pub lit: u64,
    /// Next-state literal
    pub next: u64,
    /// Reset value
    pub reset: AigReset,
    /// Symbol, if any
    pub name: Option<String>,
}

/// An output, bad-state property or constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AigSignal {
    /// Literal
    pub lit: u64,
    /// Symbol, if any
    pub name: Option<String>,
}

/// A two-input AND gate `lhs = rhs0 & rhs1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AigAnd {
    /// Positive output literal
    pub lhs: u64,
    /// First operand
    pub rhs0: u64,
    /// Second operand
    pub rhs1: u64,
}

/// A parsed and-inverter graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aig {
    /// Maximum variable index
    pub max_var: u64,
    /// Primary inputs
    pub inputs: Vec<AigInput>,
    /// Latches
    pub latches: Vec<AigLatch>,
    /// Outputs
    pub outputs: Vec<AigSignal>,
    /// Bad-state properties
    pub bad: Vec<AigSignal>,
    /// Invariant constraints
    pub constraints: Vec<AigSignal>,
    /// AND gates in definition order
    pub ands: Vec<AigAnd>,
    /// Comment lines after the symbol table
    pub comments: Vec<String>,
}

impl Aig {
    /// Read an AIGER file in either format.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::parse(&data)
    }

    /// Parse AIGER data in either format.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Parser::new(data).parse()
    }

    /// Literal whose truth is the property violation: the selected
    /// bad-state property if the model has any, else the selected output.
    pub fn bad_literal(&self, property_index: usize) -> Option<u64> {
        if self.bad.is_empty() {
            self.outputs.get(property_index).map(|o| o.lit)
        } else {
            self.bad.get(property_index).map(|b| b.lit)
        }
    }

    /// Number of properties (bad states, or outputs when there are none).
    pub fn num_properties(&self) -> usize {
        if self.bad.is_empty() {
            self.outputs.len()
        } else {
            self.bad.len()
        }
    }
}

struct Header {
    binary: bool,
    m: u64,
    i: usize,
    l: usize,
    o: usize,
    a: usize,
    b: usize,
    c: usize,
    j: usize,
    f: usize,
}

struct Parser<'a> {
    data: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Parser<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            line: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> SisiError {
        SisiError::format(self.line, message)
    }

    /// Next text line without its terminator, or `None` at end of input.
    fn next_line(&mut self) -> Option<&'a str> {
        if self.pos >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.pos..];
        let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        self.pos += (end + 1).min(rest.len());
        self.line += 1;
        let bytes = rest[..end].strip_suffix(b"\r").unwrap_or(&rest[..end]);
        Some(std::str::from_utf8(bytes).unwrap_or(""))
    }

    fn expect_line(&mut self, what: &str) -> Result<&'a str> {
        match self.next_line() {
            Some(line) => Ok(line),
            None => Err(SisiError::format(
                self.line + 1,
                format!("unexpected end of file, expected {what}"),
            )),
        }
    }

    fn numbers(
        &self,
        line: &str,
        expected: std::ops::RangeInclusive<usize>,
        what: &str,
    ) -> Result<Vec<u64>> {
        let nums = line
            .split_ascii_whitespace()
            .map(|t| {
                t.parse::<u64>()
                    .map_err(|_| self.error(format!("invalid number '{t}' in {what}")))
            })
            .collect::<Result<Vec<_>>>()?;
        if !expected.contains(&nums.len()) {
            return Err(self.error(format!(
                "{what} expects {}..={} fields, found {}",
                expected.start(),
                expected.end(),
                nums.len()
            )));
        }
        Ok(nums)
    }

    fn check_lit(&self, lit: u64, m: u64) -> Result<u64> {
        if lit > 2 * m + 1 {
            return Err(self.error(format!("literal {lit} exceeds maximum variable {m}")));
        }
        Ok(lit)
    }

    fn header(&mut self) -> Result<Header> {
        let line = self.expect_line("header")?;
        let mut fields = line.split_ascii_whitespace();
        let binary = match fields.next() {
            Some("aag") => false,
            Some("aig") => true,
            _ => return Err(self.error("expected 'aag' or 'aig' header")),
        };
        let rest: Vec<&str> = fields.collect();
        let nums = self.numbers(&rest.join(" "), 5..=9, "header")?;
        let get = |i: usize| nums.get(i).copied().unwrap_or(0) as usize;
        let header = Header {
            binary,
            m: nums[0],
            i: get(1),
            l: get(2),
            o: get(3),
            a: get(4),
            b: get(5),
            c: get(6),
            j: get(7),
            f: get(8),
        };
        if header.m >= u64::from(u32::MAX) {
            return Err(self.error(format!("M = {} exceeds the supported size", header.m)));
        }
        let defined = (header.i as u64)
            .saturating_add(header.l as u64)
            .saturating_add(header.a as u64);
        if defined > header.m {
            return Err(self.error("M is smaller than I + L + A"));
        }
        Ok(header)
    }

    fn parse(mut self) -> Result<Aig> {
        let h = self.header()?;
        let mut aig = Aig {
            max_var: h.m,
            ..Aig::default()
        };

        for k in 0..h.i {
            let lit = if h.binary {
                2 * (k as u64 + 1)
            } else {
                let line = self.expect_line("input")?;
                let lit = self.numbers(line, 1..=1, "input")?[0];
                if lit < 2 || lit & 1 == 1 {
                    return Err(self.error(format!("invalid input literal {lit}")));
                }
                self.check_lit(lit, h.m)?
            };
            aig.inputs.push(AigInput { lit, name: None });
        }

        for k in 0..h.l {
            let line = self.expect_line("latch")?;
            let (lit, next, reset) = if h.binary {
                let nums = self.numbers(line, 1..=2, "latch")?;
                (2 * (h.i + k + 1) as u64, nums[0], nums.get(1).copied())
            } else {
                let nums = self.numbers(line, 2..=3, "latch")?;
                if nums[0] < 2 || nums[0] & 1 == 1 {
                    return Err(self.error(format!("invalid latch literal {}", nums[0])));
                }
                (nums[0], nums[1], nums.get(2).copied())
            };
            let reset = match reset {
                None | Some(0) => AigReset::Zero,
                Some(1) => AigReset::One,
                Some(r) if r == lit => AigReset::Uninit,
                Some(r) => return Err(self.error(format!("invalid reset value {r}"))),
            };
            aig.latches.push(AigLatch {
                lit: self.check_lit(lit, h.m)?,
                next: self.check_lit(next, h.m)?,
                reset,
                name: None,
            });
        }

        for (count, what) in [(h.o, "output"), (h.b, "bad"), (h.c, "constraint")] {
            for _ in 0..count {
                let line = self.expect_line(what)?;
                let lit = self.check_lit(self.numbers(line, 1..=1, what)?[0], h.m)?;
                let signal = AigSignal { lit, name: None };
                match what {
                    "output" => aig.outputs.push(signal),
                    "bad" => aig.bad.push(signal),
                    _ => aig.constraints.push(signal),
                }
            }
        }

        // Justice: J size lines followed by the literals; fairness: F lines.
        let mut justice_lits = 0u64;
        for _ in 0..h.j {
            let line = self.expect_line("justice size")?;
            let size = self.numbers(line, 1..=1, "justice size")?[0];
            justice_lits = justice_lits
                .checked_add(size)
                .ok_or_else(|| self.error("too many justice literals"))?;
        }
        let trailing = justice_lits
            .checked_add(h.f as u64)
            .ok_or_else(|| self.error("too many justice and fairness literals"))?;
        for _ in 0..trailing {
            let line = self.expect_line("justice or fairness literal")?;
            self.numbers(line, 1..=1, "justice or fairness literal")?;
        }

        for k in 0..h.a {
            let gate = if h.binary {
                let lhs = 2 * (h.i + h.l + k + 1) as u64;
                let d0 = self.delta()?;
                let d1 = self.delta()?;
                let rhs0 = lhs
                    .checked_sub(d0)
                    .ok_or_else(|| self.error("invalid delta in binary AND"))?;
                let rhs1 = rhs0
                    .checked_sub(d1)
                    .ok_or_else(|| self.error("invalid delta in binary AND"))?;
                AigAnd { lhs, rhs0, rhs1 }
            } else {
                let line = self.expect_line("and gate")?;
                let nums = self.numbers(line, 3..=3, "and gate")?;
                if nums[0] < 2 || nums[0] & 1 == 1 {
                    return Err(self.error(format!("invalid AND literal {}", nums[0])));
                }
                AigAnd {
                    lhs: nums[0],
                    rhs0: nums[1],
                    rhs1: nums[2],
                }
            };
            for lit in [gate.lhs, gate.rhs0, gate.rhs1] {
                self.check_lit(lit, h.m)?;
            }
            aig.ands.push(gate);
        }

        self.symbols(&mut aig)?;
        Ok(aig)
    }

    fn delta(&mut self) -> Result<u64> {
        let mut value = 0u64;
        let mut shift = 0;
        loop {
            let byte = *self
                .data
                .get(self.pos)
                .ok_or_else(|| self.error("unexpected end of binary AND section"))?;
            self.pos += 1;
            if shift > 63 {
                return Err(self.error("delta encoding overflows"));
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    fn symbols(&mut self, aig: &mut Aig) -> Result<()> {
        while let Some(line) = self.next_line() {
            if line == "c" {
                while let Some(comment) = self.next_line() {
                    aig.comments.push(comment.to_string());
                }
                break;
            }
            if line.is_empty() {
                continue;
            }
            let (tag, name) = line
                .split_once(' ')
                .ok_or_else(|| self.error(format!("invalid symbol line '{line}'")))?;
            let kind = tag.as_bytes().first().copied().unwrap_or(b' ');
            let index: usize = tag
                .get(1..)
                .and_then(|pos| pos.parse().ok())
                .ok_or_else(|| self.error(format!("invalid symbol position in '{tag}'")))?;
            let name = Some(name.to_string());
            let slot = match kind {
                b'i' => aig.inputs.get_mut(index).map(|s| &mut s.name),
                b'l' => aig.latches.get_mut(index).map(|s| &mut s.name),
                b'o' => aig.outputs.get_mut(index).map(|s| &mut s.name),
                b'b' => aig.bad.get_mut(index).map(|s| &mut s.name),
                b'c' => aig.constraints.get_mut(index).map(|s| &mut s.name),
                b'j' | b'f' => continue,
                _ => return Err(self.error(format!("unknown symbol kind in '{tag}'"))),
            };
            *slot.ok_or_else(|| self.error(format!("symbol position {tag} out of range")))? = name;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROTATOR: &str = "aag 7 0 4 1 3\n2 8\n4 2\n6 4\n8 6\n14\n10 8 7\n12 5 2\n14 12 10\n";

    #[test]
    fn test_parse_ascii_rotator() {
        let aig = Aig::parse(ROTATOR.as_bytes()).unwrap();
        assert_eq!(aig.max_var, 7);
        assert_eq!(aig.latches.len(), 4);
        assert_eq!(aig.latches[0].next, 8);
        assert_eq!(aig.latches[0].reset, AigReset::Zero);
        assert_eq!(aig.ands[2], AigAnd { lhs: 14, rhs0: 12, rhs1: 10 });
        assert_eq!(aig.bad_literal(0), Some(14));
        assert_eq!(aig.bad_literal(1), None);
    }

    #[test]
    fn test_parse_resets_and_symbols() {
        let text = concat!(
            "aag 3 1 2 0 0 1\n2\n4 2 1\n6 4 6\n6\n",
            "i0 enable\nl1 state\nb0 overflow\nc\nmade by hand\n"
        );
        let aig = Aig::parse(text.as_bytes()).unwrap();
        assert_eq!(aig.latches[0].reset, AigReset::One);
        assert_eq!(aig.latches[1].reset, AigReset::Uninit);
        assert_eq!(aig.inputs[0].name.as_deref(), Some("enable"));
        assert_eq!(aig.latches[1].name.as_deref(), Some("state"));
        assert_eq!(aig.bad[0].name.as_deref(), Some("overflow"));
        assert_eq!(aig.bad_literal(0), Some(6));
        assert_eq!(aig.comments, vec!["made by hand".to_string()]);
    }

    #[test]
    fn test_parse_binary() {
        // Same structure as the ASCII rotator: latches 2,4,6,8 and gates 10,12,14.
        let mut data = b"aig 7 0 4 1 3\n8\n2\n4\n6\n14\n".to_vec();
        // 10 = 8 & 7: deltas 2, 1.  12 = 5 & 2: deltas 7, 3.  14 = 12 & 10: deltas 2, 2.
        data.extend_from_slice(&[2, 1, 7, 3, 2, 2]);
        let binary = Aig::parse(&data).unwrap();
        let ascii = Aig::parse(ROTATOR.as_bytes()).unwrap();
        assert_eq!(binary.ands, ascii.ands);
        assert_eq!(binary.latches, ascii.latches);
        assert_eq!(binary.outputs, ascii.outputs);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = Aig::parse(b"aag 1 0 1 0 0\n2 9\n").unwrap_err();
        match err {
            SisiError::Format { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other}"),
        }
        assert!(Aig::parse(b"aag 3 0 0 1 0\n").is_err());
        assert!(Aig::parse(b"bogus").is_err());
        assert!(Aig::parse(b"").is_err());
    }

    #[test]
    fn test_justice_sizes_overflow() {
        let justice = b"aag 0 0 0 0 0 0 0 2\n18446744073709551615\n1\n";
        let err = Aig::parse(justice).unwrap_err();
        assert!(err.to_string().contains("too many justice literals"), "{err}");
        let fairness = b"aag 0 0 0 0 0 0 0 1 1\n18446744073709551615\n";
        let err = Aig::parse(fairness).unwrap_err();
        assert!(err.to_string().contains("justice and fairness"), "{err}");
    }

    #[test]
    fn test_invalid_reset() {
        assert!(Aig::parse(b"aag 2 0 2 0 0\n2 2 4\n4 4\n").is_err());
    }
}
