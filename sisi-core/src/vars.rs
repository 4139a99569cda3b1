//! Variable manager.
//!
//! Mints unprimed internal variables and keeps the mapping between the
//! external identifier space (AIGER variables) and internal variables.
//! Allocation is monotone and never recycles identifiers. The manager is
//! shared by every component through the [`Context`](crate::Context), so
//! its state lives behind `Cell`/`RefCell`.

use crate::clause::Clause;
use crate::literal::{Lit, Var};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};

/// Allocator for internal variables and the external/internal bijection.
#[derive(Debug)]
pub struct VarManager {
    next: Cell<u32>,
    names: RefCell<FxHashMap<u32, String>>,
    ext_to_int: RefCell<FxHashMap<u64, u32>>,
    int_to_ext: RefCell<FxHashMap<u32, u64>>,
}

impl Default for VarManager {
    fn default() -> Self {
        Self::new()
    }
}

impl VarManager {
    /// Create a manager with only the constant variable allocated.
    pub fn new() -> Self {
        let mut ext_to_int = FxHashMap::default();
        let mut int_to_ext = FxHashMap::default();
        // The constant maps to itself so AIGER literals 0/1 become FALSE/TRUE.
        ext_to_int.insert(0, 0);
        int_to_ext.insert(0, 0);
        Self {
            next: Cell::new(1),
            names: RefCell::new(FxHashMap::default()),
            ext_to_int: RefCell::new(ext_to_int),
            int_to_ext: RefCell::new(int_to_ext),
        }
    }

    /// Mint a fresh anonymous variable.
    pub fn new_var(&self) -> Var {
        let index = self.next.get();
        assert!(index < u32::MAX, "variable space exhausted");
        self.next.set(index + 1);
        Var::from_index(index)
    }

    /// Mint a fresh variable and return its positive literal.
    pub fn new_lit(&self) -> Lit {
        self.new_var().pos()
    }

    /// Mint a fresh named variable.
    pub fn new_named(&self, name: impl Into<String>) -> Var {
        let var = self.new_var();
        self.names.borrow_mut().insert(var.index(), name.into());
        var
    }

    /// Mint a fresh variable standing for the external variable `ext_var`.
    ///
    /// # Panics
    ///
    /// Panics if `ext_var` already has an internal counterpart.
    pub fn new_external(&self, ext_var: u64, name: Option<&str>) -> Var {
        assert!(
            !self.ext_to_int.borrow().contains_key(&ext_var),
            "external variable {ext_var} registered twice"
        );
        let var = match name {
            Some(name) => self.new_named(name),
            None => self.new_var(),
        };
        self.ext_to_int.borrow_mut().insert(ext_var, var.index());
        self.int_to_ext.borrow_mut().insert(var.index(), ext_var);
        var
    }

    /// Translate an external literal (`var << 1 | sign`).
    pub fn to_internal(&self, ext_lit: u64) -> Option<Lit> {
        let index = *self.ext_to_int.borrow().get(&(ext_lit >> 1))?;
        Some(Var::from_index(index).lit(ext_lit & 1 == 0))
    }

    /// Translate an unprimed internal literal to its external literal.
    pub fn to_external(&self, lit: Lit) -> Option<u64> {
        if lit.nprimes() != 0 {
            return None;
        }
        let ext_var = *self.int_to_ext.borrow().get(&lit.var().index())?;
        Some((ext_var << 1) | u64::from(lit.is_negated()))
    }

    /// Variable of a literal.
    pub fn var_of(&self, lit: Lit) -> Var {
        lit.var()
    }

    /// Whether `ext_var` has an internal counterpart.
    pub fn is_known_external(&self, ext_var: u64) -> bool {
        self.ext_to_int.borrow().contains_key(&ext_var)
    }

    /// Name given to the base variable of `var`, if any.
    pub fn name_of(&self, var: Var) -> Option<String> {
        self.names.borrow().get(&var.index()).cloned()
    }

    /// Human-readable rendering of a literal, using names when known.
    pub fn render(&self, lit: Lit) -> String {
        match self.name_of(lit.var()) {
            Some(name) if !lit.is_constant() => {
                let mut s = String::new();
                if lit.is_negated() {
                    s.push('!');
                }
                s.push_str(&name);
                for _ in 0..lit.nprimes() {
                    s.push('\'');
                }
                s
            }
            _ => lit.to_string(),
        }
    }

    /// Translate a vector of external literals. Returns `None` if any is
    /// unknown.
    pub fn make_internal(&self, ext: &[u64]) -> Option<Clause> {
        ext.iter().map(|&e| self.to_internal(e)).collect()
    }

    /// Translate a vector of internal literals. Returns `None` if any has no
    /// external counterpart.
    pub fn make_external(&self, lits: &[Lit]) -> Option<Vec<u64>> {
        lits.iter().map(|&l| self.to_external(l)).collect()
    }

    /// Number of variables allocated so far, the constant included.
    pub fn num_vars(&self) -> u32 {
        self.next.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_monotone_allocation() {
        let vm = VarManager::new();
        let a = vm.new_var();
        let b = vm.new_var();
        assert!(a < b);
        assert_eq!(a.index(), 1);
        assert_eq!(vm.num_vars(), 3);
    }

    #[test]
    fn test_constants_map_through() {
        let vm = VarManager::new();
        assert_eq!(vm.to_internal(0), Some(Lit::FALSE));
        assert_eq!(vm.to_internal(1), Some(Lit::TRUE));
        assert_eq!(vm.to_external(Lit::TRUE), Some(1));
    }

    #[test]
    fn test_external_mapping() {
        let vm = VarManager::new();
        let _pad = vm.new_var();
        let v = vm.new_external(7, Some("l2"));
        assert!(vm.is_known_external(7));
        assert!(!vm.is_known_external(8));
        assert_eq!(vm.to_internal(15), Some(v.neg()));
        assert_eq!(vm.to_internal(15), vm.to_internal(15));
        assert_eq!(vm.to_external(v.pos()), Some(14));
        assert_eq!(vm.to_external(v.pos().prime()), None);
        assert_eq!(vm.name_of(v).as_deref(), Some("l2"));
        assert_eq!(vm.render(v.neg().prime()), "!l2'");
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_external_injective() {
        let vm = VarManager::new();
        vm.new_external(3, None);
        vm.new_external(3, None);
    }

    proptest! {
        #[test]
        fn prop_clause_roundtrip(ext in proptest::collection::vec(2u64..200, 0..12)) {
            let vm = VarManager::new();
            for e in 1..100 {
                vm.new_external(e, None);
            }
            let internal = vm.make_internal(&ext).expect("all known");
            prop_assert_eq!(vm.make_external(&internal), Some(ext.clone()));
            for &lit in &internal {
                prop_assert_eq!(vm.to_internal(vm.to_external(lit).expect("known")), Some(lit));
            }
        }
    }
}
