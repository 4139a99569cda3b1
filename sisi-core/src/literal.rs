//! Literal and variable identifiers.
//!
//! A [`Var`] packs a *base index* (low 32 bits) and a *prime count* (high
//! bits). A [`Lit`] is a variable shifted left by one with the polarity in
//! the low bit, the same packing AIGER uses, so constant `FALSE` is `0` and
//! `TRUE` is `1`.
//!
//! Priming is a pure function of the literal: priming `n` times shifts the
//! prime count by `n`. Priming commutes with negation and priming zero times
//! is the identity. The constants are frame independent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Not;

/// Number of bits reserved for the base index of a variable.
const BASE_BITS: u32 = 32;
const BASE_MASK: u64 = (1 << BASE_BITS) - 1;

/// Largest prime count a literal may carry.
pub const MAX_PRIMES: u32 = (1 << 31) - 1;

/// A Boolean variable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Var(pub u64);

impl Var {
    /// The constant variable. Its positive literal is `FALSE`.
    pub const CONST: Var = Var(0);

    /// Create an unprimed variable from a base index.
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        Self(index as u64)
    }

    /// Base index with the frame information stripped.
    #[must_use]
    pub const fn index(self) -> u32 {
        (self.0 & BASE_MASK) as u32
    }

    /// Number of primes carried by this variable.
    #[must_use]
    pub const fn nprimes(self) -> u32 {
        (self.0 >> BASE_BITS) as u32
    }

    /// Positive literal of this variable.
    #[must_use]
    pub const fn pos(self) -> Lit {
        Lit(self.0 << 1)
    }

    /// Negative literal of this variable.
    #[must_use]
    pub const fn neg(self) -> Lit {
        Lit((self.0 << 1) | 1)
    }

    /// Literal of this variable with the given polarity.
    #[must_use]
    pub const fn lit(self, positive: bool) -> Lit {
        if positive { self.pos() } else { self.neg() }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.index())?;
        for _ in 0..self.nprimes().min(3) {
            f.write_str("'")?;
        }
        if self.nprimes() > 3 {
            write!(f, "^{}", self.nprimes())?;
        }
        Ok(())
    }
}

/// A literal (signed, possibly primed variable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Lit(u64);

impl Lit {
    /// Constant false.
    pub const FALSE: Lit = Lit(0);
    /// Constant true.
    pub const TRUE: Lit = Lit(1);

    /// Create a literal from a variable and a polarity.
    #[must_use]
    pub const fn new(var: Var, positive: bool) -> Self {
        var.lit(positive)
    }

    /// Variable of this literal, including its prime count.
    #[must_use]
    pub const fn var(self) -> Var {
        Var(self.0 >> 1)
    }

    /// Check if this literal is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        (self.0 & 1) == 0
    }

    /// Check if this literal is negated.
    #[must_use]
    pub const fn is_negated(self) -> bool {
        (self.0 & 1) != 0
    }

    /// Get the negation of this literal.
    #[must_use]
    pub const fn negate(self) -> Self {
        Self(self.0 ^ 1)
    }

    /// Remove the negation, if any.
    #[must_use]
    pub const fn strip(self) -> Self {
        Self(self.0 & !1)
    }

    /// Whether this is `TRUE` or `FALSE`.
    #[must_use]
    pub const fn is_constant(self) -> bool {
        self.0 <= 1
    }

    /// Number of primes carried by this literal.
    #[must_use]
    pub const fn nprimes(self) -> u32 {
        self.var().nprimes()
    }

    /// Shift this literal `n` frames forward.
    ///
    /// # Panics
    ///
    /// Panics if the resulting prime count exceeds [`MAX_PRIMES`].
    #[must_use]
    pub fn primed(self, n: u32) -> Self {
        if self.is_constant() || n == 0 {
            return self;
        }
        let total = self.nprimes() as u64 + n as u64;
        assert!(
            total <= MAX_PRIMES as u64,
            "priming {self} by {n} exceeds the maximum of {MAX_PRIMES} primes"
        );
        Self(self.0 + ((n as u64) << (BASE_BITS + 1)))
    }

    /// Shift this literal one frame forward.
    #[must_use]
    pub fn prime(self) -> Self {
        self.primed(1)
    }

    /// Map this literal back to frame 0.
    #[must_use]
    pub const fn unprimed(self) -> Self {
        let base = (self.0 >> 1) & BASE_MASK;
        Self((base << 1) | (self.0 & 1))
    }

    /// Set the frame of this literal to exactly `n`.
    #[must_use]
    pub fn at_frame(self, n: u32) -> Self {
        self.unprimed().primed(n)
    }

    /// Get the raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Create from raw value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        self.negate()
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Lit::FALSE => f.write_str("false"),
            Lit::TRUE => f.write_str("true"),
            lit if lit.is_negated() => write!(f, "!{}", lit.var()),
            lit => write!(f, "{}", lit.var()),
        }
    }
}

/// Three-valued assignment returned by model queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LBool {
    /// Assigned true.
    True,
    /// Assigned false.
    False,
    /// Unassigned or unknown to the solver.
    Undef,
}

impl LBool {
    /// Convert from a Boolean value.
    #[must_use]
    pub const fn from_bool(b: bool) -> Self {
        if b { LBool::True } else { LBool::False }
    }

    /// Negate, keeping `Undef` as is.
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            LBool::True => LBool::False,
            LBool::False => LBool::True,
            LBool::Undef => LBool::Undef,
        }
    }

    /// Check if true.
    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, LBool::True)
    }

    /// Check if false.
    #[must_use]
    pub const fn is_false(self) -> bool {
        matches!(self, LBool::False)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_constants() {
        assert_eq!(Lit::FALSE.negate(), Lit::TRUE);
        assert_eq!(!Lit::TRUE, Lit::FALSE);
        assert!(Lit::FALSE.is_constant());
        assert_eq!(Lit::TRUE.primed(7), Lit::TRUE);
        assert_eq!(Lit::FALSE.var(), Var::CONST);
    }

    #[test]
    fn test_polarity() {
        let v = Var::from_index(5);
        assert!(v.pos().is_positive());
        assert!(v.neg().is_negated());
        assert_eq!(v.neg().strip(), v.pos());
        assert_eq!(v.pos().raw(), 10);
        assert_eq!(v.neg().raw(), 11);
    }

    #[test]
    fn test_priming_frames() {
        let l = Var::from_index(3).neg();
        let l2 = l.primed(2);
        assert_ne!(l, l2);
        assert_ne!(l.prime(), l2);
        assert_eq!(l2.nprimes(), 2);
        assert_eq!(l2.var().index(), 3);
        assert_eq!(l2.unprimed(), l);
        assert_eq!(l2.at_frame(1), l.prime());
        assert!(l2.is_negated());
    }

    #[test]
    #[should_panic(expected = "exceeds the maximum")]
    fn test_priming_overflow() {
        let _ = Var::from_index(1).pos().primed(MAX_PRIMES).prime();
    }

    #[test]
    fn test_display() {
        assert_eq!(Var::from_index(4).neg().prime().to_string(), "!v4'");
        assert_eq!(Lit::TRUE.to_string(), "true");
    }

    proptest! {
        #[test]
        fn prop_prime_unprime_roundtrip(index in 1u32..1_000_000, neg: bool, k in 0u32..10_000) {
            let lit = Var::from_index(index).lit(!neg);
            prop_assert_eq!(lit.primed(k).unprimed(), lit);
            prop_assert_eq!(lit.primed(k).nprimes(), k);
        }

        #[test]
        fn prop_priming_commutes_with_negation(
            index in 1u32..1_000_000,
            neg: bool,
            k in 0u32..10_000,
        ) {
            let lit = Var::from_index(index).lit(!neg);
            prop_assert_eq!(lit.negate().primed(k), lit.primed(k).negate());
            prop_assert_eq!(lit.primed(k).strip(), lit.strip().primed(k));
        }

        #[test]
        fn prop_priming_is_additive(index in 1u32..1_000_000, a in 0u32..1000, b in 0u32..1000) {
            let lit = Var::from_index(index).pos();
            prop_assert_eq!(lit.primed(a).primed(b), lit.primed(a + b));
        }
    }
}
