//! Pass runner: selection, ordering, isolated execution and aggregation.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use isl_ast::{Domain, Span};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AnalyzeOptions;
use crate::diagnostics::Severity;
use crate::semantic::{PassContext, PassRegistry, SemanticPass};
use crate::Diagnostic;

/// Summary counts for one `analyze` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_passes: usize,
    pub passes_run: usize,
    pub errors: usize,
    pub warnings: usize,
    pub hints: usize,
}

/// Output of [`PassRunner::analyze`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub diagnostics: Vec<Diagnostic>,
    pub success: bool,
    pub stats: Stats,
}

static GLOBAL: LazyLock<PassRunner> = LazyLock::new(PassRunner::with_builtin_passes);

/// Runs registered passes over a domain
#[derive(Debug, Default)]
pub struct PassRunner {
    registry: PassRegistry,
}

impl PassRunner {
    pub fn new(registry: PassRegistry) -> Self {
        Self { registry }
    }

    /// Runner holding the eight built-in passes
    pub fn with_builtin_passes() -> Self {
        Self::new(PassRegistry::with_builtin_passes())
    }

    /// Process-wide default runner. Never mutated; build a separate runner
    /// to add custom passes.
    pub fn global() -> &'static PassRunner {
        &GLOBAL
    }

    pub fn registry(&self) -> &PassRegistry {
        &self.registry
    }

    pub fn register(&mut self, pass: SemanticPass) {
        self.registry.register(pass);
    }

    pub fn register_all(&mut self, passes: impl IntoIterator<Item = SemanticPass>) {
        self.registry.register_all(passes);
    }

    /// Selected passes in execution order.
    ///
    /// Dependencies first, then descending priority, then ascending id.
    /// Dependencies on passes outside the selection are ignored.
    pub fn execution_order(&self, options: &AnalyzeOptions) -> Vec<&SemanticPass> {
        let selected: Vec<&SemanticPass> = self
            .registry
            .all_passes()
            .filter(|pass| options.selects(&pass.id))
            .collect();

        let mut pending: Vec<Vec<usize>> = selected
            .iter()
            .map(|pass| {
                let mut deps: Vec<usize> = pass
                    .depends_on
                    .iter()
                    .filter_map(|dep| selected.iter().position(|p| &p.id == dep))
                    .collect();
                deps.sort_unstable();
                deps.dedup();
                deps
            })
            .collect();

        let mut done = vec![false; selected.len()];
        let mut order = Vec::with_capacity(selected.len());

        while order.len() < selected.len() {
            let next = (0..selected.len())
                .filter(|&i| !done[i] && pending[i].is_empty())
                .min_by(|&a, &b| rank(selected[a], selected[b]));

            let Some(next) = next else {
                let stuck: Vec<&str> = (0..selected.len())
                    .filter(|&i| !done[i])
                    .map(|i| selected[i].id.as_str())
                    .collect();
                warn!(passes = ?stuck, "dependency cycle between passes; falling back to priority order");
                let mut rest: Vec<usize> = (0..selected.len()).filter(|&i| !done[i]).collect();
                rest.sort_by(|&a, &b| rank(selected[a], selected[b]));
                order.extend(rest);
                break;
            };

            done[next] = true;
            order.push(next);
            for deps in &mut pending {
                deps.retain(|&d| d != next);
            }
        }

        order.into_iter().map(|i| selected[i]).collect()
    }

    /// Analyze a domain with the selected passes
    pub fn analyze(&self, domain: &Domain, options: &AnalyzeOptions) -> AnalysisResult {
        let ctx = PassContext::build(domain);
        let order = self.execution_order(options);

        let mut diagnostics = Vec::new();
        for pass in &order {
            debug!(pass = %pass.id, "running pass");
            let produced = match run_isolated(pass, domain, &ctx) {
                Ok(produced) => produced,
                Err(failure) => {
                    warn!(pass = %pass.id, error = %failure, "pass failed");
                    vec![Diagnostic::error(
                        format!("Pass '{}' failed: {failure}", pass.id),
                        Span::default(),
                    )
                    .with_code("E0500")]
                }
            };
            debug!(pass = %pass.id, diagnostics = produced.len(), "pass finished");
            diagnostics.extend(produced.into_iter().map(|d| d.with_source(pass.id.as_str())));
        }

        let count = |severity: Severity| diagnostics.iter().filter(|d| d.severity == severity).count();
        let stats = Stats {
            total_passes: self.registry.len(),
            passes_run: order.len(),
            errors: count(Severity::Error),
            warnings: count(Severity::Warning),
            hints: count(Severity::Hint),
        };

        if !options.include_hints {
            diagnostics.retain(|d| d.severity != Severity::Hint);
        }

        info!(
            domain = %domain.name,
            passes = stats.passes_run,
            errors = stats.errors,
            warnings = stats.warnings,
            hints = stats.hints,
            "analysis complete"
        );

        AnalysisResult {
            diagnostics,
            success: stats.errors == 0,
            stats,
        }
    }
}

fn rank(a: &SemanticPass, b: &SemanticPass) -> std::cmp::Ordering {
    b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id))
}

/// Run one pass, turning an error or a panic into a message
fn run_isolated(pass: &SemanticPass, domain: &Domain, ctx: &PassContext) -> Result<Vec<Diagnostic>, String> {
    match panic::catch_unwind(AssertUnwindSafe(|| pass.analyze(domain, ctx))) {
        Ok(Ok(diagnostics)) => Ok(diagnostics),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::PassError;
    use crate::test_helpers::{user_domain, with_preconditions};
    use isl_ast::{BinaryOp, Entity, Expr};
    use pretty_assertions::assert_eq;

    fn marker(id: &str, priority: i32) -> SemanticPass {
        let message = id.to_string();
        SemanticPass::new(id, id, move |_, _| {
            Ok(vec![Diagnostic::warning(message.clone(), Span::default())])
        })
        .with_priority(priority)
    }

    fn runner(passes: Vec<SemanticPass>) -> PassRunner {
        let mut runner = PassRunner::default();
        runner.register_all(passes);
        runner
    }

    fn order(runner: &PassRunner, options: &AnalyzeOptions) -> Vec<String> {
        runner
            .execution_order(options)
            .into_iter()
            .map(|p| p.id.clone())
            .collect()
    }

    #[test]
    fn test_builtin_order() {
        let ids = order(PassRunner::global(), &AnalyzeOptions::default());
        assert_eq!(
            ids,
            vec![
                "unreachable-clauses",
                "unused-symbols",
                "consistency-checker",
                "unsatisfiable-preconditions",
                "intent-coherence",
                "type-coherence",
                "redundant-conditions",
                "cyclic-dependencies",
            ]
        );
    }

    #[test]
    fn test_priority_ties_break_by_id() {
        let runner = runner(vec![marker("zeta", 5), marker("alpha", 5), marker("mid", 9)]);
        assert_eq!(order(&runner, &AnalyzeOptions::default()), vec!["mid", "alpha", "zeta"]);
    }

    #[test]
    fn test_depends_on_overrides_priority() {
        let runner = runner(vec![
            marker("high", 100).depends_on("low"),
            marker("low", 1),
            marker("middle", 50),
        ]);
        assert_eq!(order(&runner, &AnalyzeOptions::default()), vec!["middle", "low", "high"]);
    }

    #[test]
    fn test_unselected_dependency_ignored() {
        let runner = runner(vec![marker("high", 100).depends_on("low"), marker("low", 1)]);
        let options = AnalyzeOptions::new().skip("low");
        assert_eq!(order(&runner, &options), vec!["high"]);

        let runner = self::runner(vec![marker("solo", 1).depends_on("missing")]);
        assert_eq!(order(&runner, &AnalyzeOptions::default()), vec!["solo"]);
    }

    #[test]
    fn test_dependency_cycle_falls_back_to_priority() {
        let runner = runner(vec![
            marker("a", 1).depends_on("b"),
            marker("b", 2).depends_on("a"),
            marker("free", 0),
        ]);
        assert_eq!(order(&runner, &AnalyzeOptions::default()), vec!["free", "b", "a"]);
        assert_eq!(runner.analyze(&user_domain(), &AnalyzeOptions::default()).stats.passes_run, 3);
    }

    #[test]
    fn test_selection_and_skip() {
        let runner = runner(vec![marker("one", 3), marker("two", 2), marker("three", 1)]);

        let only = AnalyzeOptions::new().only(["two", "unknown"]);
        let result = runner.analyze(&user_domain(), &only);
        assert_eq!(result.stats.passes_run, 1);
        assert_eq!(result.stats.total_passes, 3);
        assert!(result.diagnostics.iter().all(|d| d.source == "two"));

        let skip = AnalyzeOptions::new().skip("one");
        let result = runner.analyze(&user_domain(), &skip);
        let sources: Vec<_> = result.diagnostics.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, vec!["two", "three"]);
    }

    #[test]
    fn test_failing_pass_is_isolated() {
        let failing = SemanticPass::new("always-fails", "Always fails", |_, _| {
            Err(PassError::Failed("boom".to_string()))
        })
        .with_priority(1000);
        let runner = runner(vec![failing, marker("after", 1)]);

        let result = runner.analyze(&user_domain(), &AnalyzeOptions::default());
        assert_eq!(result.diagnostics.len(), 2);
        let internal = &result.diagnostics[0];
        assert_eq!(internal.code.as_deref(), Some("E0500"));
        assert_eq!(internal.source, "always-fails");
        assert!(internal.message.contains("always-fails"));
        assert!(internal.message.contains("boom"));
        assert_eq!(result.diagnostics[1].source, "after");
        assert!(!result.success);
        assert_eq!(result.stats.errors, 1);
    }

    #[test]
    fn test_panicking_pass_is_isolated() {
        let panicking = SemanticPass::new("panics", "Panics", |_, _| -> Result<Vec<Diagnostic>, PassError> {
            panic!("index out of range")
        });
        let runner = runner(vec![panicking, marker("other", 5)]);

        let result = runner.analyze(&user_domain(), &AnalyzeOptions::default());
        let internal: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.code.as_deref() == Some("E0500"))
            .collect();
        assert_eq!(internal.len(), 1);
        assert!(internal[0].message.contains("index out of range"));
        assert_eq!(result.stats.passes_run, 2);
    }

    #[test]
    fn test_hints_filtered_but_counted() {
        let hinting = SemanticPass::new("hinting", "Hinting", |_, _| {
            Ok(vec![
                Diagnostic::hint("consider this", Span::default()),
                Diagnostic::warning("and this", Span::default()),
            ])
        });
        let runner = runner(vec![hinting]);

        let result = runner.analyze(&user_domain(), &AnalyzeOptions::default());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.stats.hints, 1);
        assert_eq!(result.stats.warnings, 1);
        assert!(result.success);

        let result = runner.analyze(&user_domain(), &AnalyzeOptions::new().include_hints(true));
        assert_eq!(result.diagnostics.len(), 2);
    }

    #[test]
    fn test_global_runner_is_deterministic() {
        let domain = with_preconditions(vec![
            Expr::compare("x", BinaryOp::Gt, 5),
            Expr::compare("x", BinaryOp::Lt, 2),
            Expr::compare("x", BinaryOp::Gt, 3),
        ])
        .with_entity(Entity::new("Empty"));
        let options = AnalyzeOptions::new().include_hints(true);
        let first = PassRunner::global().analyze(&domain, &options);
        let second = PassRunner::global().analyze(&domain, &options);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).expect("serializable"),
            serde_json::to_string(&second).expect("serializable")
        );
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = PassRunner::global().analyze(&user_domain(), &AnalyzeOptions::default());
        let json = serde_json::to_value(&result).expect("serializable");
        assert_eq!(json["stats"]["totalPasses"], 8);
        assert_eq!(json["stats"]["passesRun"], 8);
        assert_eq!(json["success"], true);
    }
}
