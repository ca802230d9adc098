//! Built-in semantic analysis passes for ISL domains.
//!
//! Each pass implements checks in one category and is exposed as a
//! constructor returning a [`SemanticPass`].

mod consistency_checker;
mod cyclic_dependencies;
mod intent_coherence;
mod redundant_conditions;
mod type_coherence;
mod unreachable_clauses;
mod unsatisfiable_preconditions;
mod unused_symbols;

pub use consistency_checker::consistency_checker_pass;
pub use cyclic_dependencies::cyclic_dependencies_pass;
pub use intent_coherence::intent_coherence_pass;
pub use redundant_conditions::redundant_conditions_pass;
pub use type_coherence::type_coherence_pass;
pub use unreachable_clauses::unreachable_clauses_pass;
pub use unsatisfiable_preconditions::unsatisfiable_preconditions_pass;
pub use unused_symbols::unused_symbols_pass;

use indexmap::IndexMap;

use crate::semantic::SemanticPass;

/// All built-in passes, in registration order
pub fn builtin_passes() -> Vec<SemanticPass> {
    vec![
        unreachable_clauses_pass(),
        unused_symbols_pass(),
        consistency_checker_pass(),
        unsatisfiable_preconditions_pass(),
        intent_coherence_pass(),
        type_coherence_pass(),
        redundant_conditions_pass(),
        cyclic_dependencies_pass(),
    ]
}

/// Registry of semantic passes, keyed by id in registration order
#[derive(Debug, Default)]
pub struct PassRegistry {
    passes: IndexMap<String, SemanticPass>,
}

impl PassRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all built-in passes
    pub fn with_builtin_passes() -> Self {
        let mut registry = Self::new();
        registry.register_all(builtin_passes());
        registry
    }

    /// Register a pass. A pass with the same id is replaced in place.
    pub fn register(&mut self, pass: SemanticPass) {
        self.passes.insert(pass.id.clone(), pass);
    }

    pub fn register_all(&mut self, passes: impl IntoIterator<Item = SemanticPass>) {
        for pass in passes {
            self.register(pass);
        }
    }

    pub fn get_pass(&self, id: &str) -> Option<&SemanticPass> {
        self.passes.get(id)
    }

    pub fn all_passes(&self) -> impl Iterator<Item = &SemanticPass> {
        self.passes.values()
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_registry_creation() {
        let registry = PassRegistry::with_builtin_passes();
        assert_eq!(registry.len(), 8);
        let unsat = registry
            .get_pass("unsatisfiable-preconditions")
            .expect("registered");
        assert_eq!(unsat.priority, 80);
        assert_eq!(unsat.depends_on, vec!["unreachable-clauses".to_string()]);
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut registry = PassRegistry::new();
        registry.register(SemanticPass::from_fn("first", |_| Vec::new()));
        registry.register(SemanticPass::from_fn("second", |_| Vec::new()));
        registry.register(SemanticPass::from_fn("first", |_| Vec::new()).with_priority(9));

        let ids: Vec<_> = registry.all_passes().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
        assert_eq!(registry.get_pass("first").map(|p| p.priority), Some(9));
        assert!(registry.get_pass("third").is_none());
    }
}
