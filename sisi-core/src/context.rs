//! Shared run context.

use crate::options::Options;
use crate::statistics::Statistics;
use crate::vars::VarManager;
use std::rc::Rc;

/// Variable manager, configuration and statistics for one run.
///
/// Every component receives an `Rc<Context>` at construction. Options are
/// fixed once the context exists.
#[derive(Debug, Default)]
pub struct Context {
    /// Identifier allocation
    pub vars: VarManager,
    /// Effective configuration
    pub options: Options,
    /// Run statistics
    pub stats: Statistics,
}

impl Context {
    /// Create a shared context with the given options.
    pub fn new(options: Options) -> Rc<Self> {
        Rc::new(Self {
            vars: VarManager::new(),
            options,
            stats: Statistics::new(),
        })
    }

    /// Create a shared context with default options.
    pub fn with_defaults() -> Rc<Self> {
        Self::new(Options::default())
    }
}
