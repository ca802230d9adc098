//! Semantic analysis framework for ISL domains.
//!
//! Provides the pass type, the shared read-only context, the registry of
//! passes and the runner that orders, isolates and aggregates them.

pub mod constraints;
pub mod context;
pub mod passes;
pub mod resolver;
pub mod runner;

use std::fmt;
use std::sync::Arc;

use isl_ast::Domain;
use thiserror::Error;

pub use context::PassContext;
pub use passes::PassRegistry;
pub use runner::{AnalysisResult, PassRunner, Stats};

use crate::Diagnostic;

/// Failure inside a pass implementation (not a finding about the domain)
#[derive(Debug, Error)]
pub enum PassError {
    #[error("{0}")]
    Failed(String),
    #[error("unexpected input shape: {0}")]
    UnexpectedShape(String),
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Signature of a pass body
pub type AnalyzeFn =
    Arc<dyn Fn(&Domain, &PassContext) -> Result<Vec<Diagnostic>, PassError> + Send + Sync>;

/// A semantic analysis pass.
///
/// Passes are plain values: an id, scheduling metadata and an analyze
/// function. Higher `priority` runs earlier; `depends_on` names passes that
/// must run first when both are selected.
#[derive(Clone)]
pub struct SemanticPass {
    pub id: String,
    pub name: String,
    pub description: String,
    pub priority: i32,
    pub depends_on: Vec<String>,
    analyze: AnalyzeFn,
}

impl SemanticPass {
    pub fn new<F>(id: impl Into<String>, name: impl Into<String>, analyze: F) -> Self
    where
        F: Fn(&Domain, &PassContext) -> Result<Vec<Diagnostic>, PassError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            priority: 0,
            depends_on: Vec::new(),
            analyze: Arc::new(analyze),
        }
    }

    /// Adapt a simple `Domain -> Vec<Diagnostic>` check into a pass
    pub fn from_fn<F>(id: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Domain) -> Vec<Diagnostic> + Send + Sync + 'static,
    {
        let id = id.into();
        Self::new(id.clone(), id, move |domain, _ctx| Ok(check(domain)))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(id.into());
        self
    }

    /// Run the pass body
    pub fn analyze(&self, domain: &Domain, ctx: &PassContext) -> Result<Vec<Diagnostic>, PassError> {
        (self.analyze)(domain, ctx)
    }
}

impl fmt::Debug for SemanticPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticPass")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}
