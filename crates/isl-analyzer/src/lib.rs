//! Multi-pass semantic analyzer for ISL domain specifications.
//!
//! Builds a [`SymbolTable`] and [`TypeEnvironment`] for a [`Domain`] and runs
//! the registered [`SemanticPass`]es over it through a [`PassRunner`].

pub mod config;
pub mod diagnostics;
pub mod semantic;
pub mod symbols;
pub mod types;

#[cfg(test)]
mod test_helpers;

pub use config::{AnalyzeOptions, ConfigError};
pub use diagnostics::{Diagnostic, Severity};
pub use semantic::passes::builtin_passes;
pub use semantic::{
    AnalysisResult, PassContext, PassError, PassRegistry, PassRunner, SemanticPass, Stats,
};
pub use symbols::SymbolTable;
pub use types::{TypeEnvironment, TypeInfo};

use isl_ast::Domain;

/// Analyze a domain with the built-in passes
pub fn analyze(domain: &Domain, options: &AnalyzeOptions) -> AnalysisResult {
    PassRunner::global().analyze(domain, options)
}
