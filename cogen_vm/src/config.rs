//! Engine configuration.

/// Default context pool capacity.
pub const DEFAULT_MAX_CONTEXTS: usize = 1024;

/// Default nested call limit per context.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of contexts checked out of the pool at once.
    pub max_contexts: usize,
    /// Maximum procedure frames on one context.
    pub max_call_depth: usize,
    /// Instructions one `execute` may run before the context is aborted.
    pub instruction_budget: Option<u64>,
    /// Run heap collection after every generator step.
    pub collect_after_step: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_contexts: DEFAULT_MAX_CONTEXTS,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            instruction_budget: None,
            collect_after_step: true,
        }
    }
}

impl EngineConfig {
    /// Create a configuration for testing (small pool, bounded execution).
    pub fn for_testing() -> Self {
        Self {
            max_contexts: 8,
            max_call_depth: 32,
            instruction_budget: Some(100_000),
            collect_after_step: true,
        }
    }

    /// Set the pool capacity.
    #[inline]
    pub fn with_max_contexts(mut self, max_contexts: usize) -> Self {
        self.max_contexts = max_contexts;
        self
    }

    /// Set the call depth limit.
    #[inline]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Set or clear the per-execute instruction budget.
    #[inline]
    pub fn with_instruction_budget(mut self, budget: Option<u64>) -> Self {
        self.instruction_budget = budget;
        self
    }

    /// Enable or disable collection after each generator step.
    #[inline]
    pub fn with_collect_after_step(mut self, enabled: bool) -> Self {
        self.collect_after_step = enabled;
        self
    }
}
