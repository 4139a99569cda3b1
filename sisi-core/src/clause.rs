//! Clauses and cubes.
//!
//! Both are plain literal vectors. A clause is kept sorted and
//! duplicate-free so that equality and subsumption are plain slice
//! operations; a cube keeps whatever order its producer used.

use crate::literal::Lit;

/// A disjunction of literals, sorted and duplicate-free.
pub type Clause = Vec<Lit>;

/// A conjunction of literals.
pub type Cube = Vec<Lit>;

/// Sort and deduplicate a clause in place.
pub fn canonicalize(clause: &mut Clause) {
    clause.sort_unstable();
    clause.dedup();
}

/// Sorted, duplicate-free copy of `lits`.
#[must_use]
pub fn canonical(lits: &[Lit]) -> Clause {
    let mut clause = lits.to_vec();
    canonicalize(&mut clause);
    clause
}

/// Whether a canonical clause contains both a literal and its negation.
#[must_use]
pub fn is_tautology(clause: &[Lit]) -> bool {
    // In a sorted clause, complementary literals are adjacent.
    clause.windows(2).any(|w| w[0] == w[1].negate()) || clause.contains(&Lit::TRUE)
}

/// Whether sorted `small` is a subset of sorted `large`.
#[must_use]
pub fn subsumes(small: &[Lit], large: &[Lit]) -> bool {
    if small.len() > large.len() {
        return false;
    }
    let mut it = large.iter();
    'outer: for lit in small {
        for other in it.by_ref() {
            if other == lit {
                continue 'outer;
            }
            if other > lit {
                return false;
            }
        }
        return false;
    }
    true
}

/// Negate every literal, turning a clause into the cube of its
/// counterexamples and vice versa.
#[must_use]
pub fn negate(lits: &[Lit]) -> Vec<Lit> {
    lits.iter().map(|l| l.negate()).collect()
}

/// Prime every literal `n` times.
#[must_use]
pub fn primed(lits: &[Lit], n: u32) -> Vec<Lit> {
    lits.iter().map(|l| l.primed(n)).collect()
}

/// Canonical form of the clause `¬cube`.
#[must_use]
pub fn clause_of_cube(cube: &[Lit]) -> Clause {
    let mut clause = negate(cube);
    canonicalize(&mut clause);
    clause
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::Var;

    fn lit(i: u32, pos: bool) -> Lit {
        Var::from_index(i).lit(pos)
    }

    #[test]
    fn test_canonicalize() {
        let mut c = vec![lit(3, true), lit(1, false), lit(3, true)];
        canonicalize(&mut c);
        assert_eq!(c, vec![lit(1, false), lit(3, true)]);
    }

    #[test]
    fn test_subsumes() {
        let a = canonical(&[lit(1, true), lit(4, false)]);
        let b = canonical(&[lit(1, true), lit(2, true), lit(4, false)]);
        assert!(subsumes(&a, &b));
        assert!(!subsumes(&b, &a));
        assert!(subsumes(&[], &a));
        let c = canonical(&[lit(1, true), lit(4, true)]);
        assert!(!subsumes(&c, &b));
    }

    #[test]
    fn test_tautology() {
        assert!(is_tautology(&canonical(&[lit(2, true), lit(2, false)])));
        assert!(!is_tautology(&canonical(&[lit(2, true), lit(3, false)])));
        assert!(is_tautology(&canonical(&[Lit::TRUE, lit(3, false)])));
    }

    #[test]
    fn test_clause_of_cube() {
        let cube = vec![lit(5, true), lit(2, false)];
        assert_eq!(clause_of_cube(&cube), vec![lit(2, true), lit(5, false)]);
    }
}
