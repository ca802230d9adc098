//! Unsatisfiable preconditions pass (E04xx).
//!
//! Interval reasoning over comparisons on a single field. Cross-field
//! predicates are not considered.
//! - E0400: Preconditions on one field can never hold together
//! - H0401: Field skipped, too many predicates to analyze

use isl_ast::Domain;

use crate::semantic::constraints::{atoms, group_by_path, is_unsatisfiable, MAX_ATOMS_PER_FIELD};
use crate::semantic::{PassContext, PassError, SemanticPass};
use crate::Diagnostic;

pub const ID: &str = "unsatisfiable-preconditions";

pub fn unsatisfiable_preconditions_pass() -> SemanticPass {
    SemanticPass::new(ID, "Unsatisfiable Preconditions", analyze)
        .with_description("Finds preconditions on one field that no value can satisfy")
        .with_priority(80)
        .depends_on(super::unreachable_clauses::ID)
}

fn analyze(domain: &Domain, _ctx: &PassContext) -> Result<Vec<Diagnostic>, PassError> {
    let mut diagnostics = Vec::new();

    for behavior in &domain.behaviors {
        let all: Vec<_> = behavior.preconditions.iter().flat_map(atoms).collect();
        for (path, group) in group_by_path(&all) {
            let span = group
                .iter()
                .map(|atom| atom.span)
                .reduce(|a, b| a.merge(b))
                .unwrap_or_default();

            if group.len() > MAX_ATOMS_PER_FIELD {
                diagnostics.push(
                    Diagnostic::hint(
                        format!(
                            "Analysis truncated: '{path}' in '{}' has {} predicates (limit {MAX_ATOMS_PER_FIELD})",
                            behavior.name.name,
                            group.len()
                        ),
                        span,
                    )
                    .with_code("H0401"),
                );
                continue;
            }

            if is_unsatisfiable(&group) {
                let listed: Vec<String> = group.iter().map(|atom| format!("'{atom}'")).collect();
                diagnostics.push(
                    Diagnostic::error(
                        format!(
                            "Preconditions of '{}' can never all hold for '{path}': {}",
                            behavior.name.name,
                            listed.join(", ")
                        ),
                        span,
                    )
                    .with_code("E0400"),
                );
            }
        }
    }

    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{codes, run_pass, user_domain, with_preconditions};
    use isl_ast::{BinaryOp, Expr};
    use pretty_assertions::assert_eq;

    fn check(domain: &Domain) -> Vec<Diagnostic> {
        run_pass(&unsatisfiable_preconditions_pass(), domain)
    }

    #[test]
    fn test_empty_interval_is_error() {
        let domain = with_preconditions(vec![
            Expr::compare("x", BinaryOp::Gt, 5),
            Expr::compare("x", BinaryOp::Lt, 2),
        ]);
        let diags = check(&domain);
        assert_eq!(codes(&diags), vec!["E0400"]);
        assert!(diags[0].message.contains("'x > 5', 'x < 2'"));
    }

    #[test]
    fn test_nonempty_interval_is_fine() {
        let domain = with_preconditions(vec![
            Expr::compare("x", BinaryOp::Gt, 5),
            Expr::compare("x", BinaryOp::Lt, 10),
        ]);
        assert!(check(&domain).is_empty());
        assert!(check(&user_domain()).is_empty());
    }

    #[test]
    fn test_conjunction_inside_one_clause() {
        let domain = with_preconditions(vec![Expr::and(
            Expr::compare("input.amount", BinaryOp::GtEq, 100),
            Expr::compare("input.amount", BinaryOp::Eq, 50),
        )]);
        assert_eq!(codes(&check(&domain)), vec!["E0400"]);
    }

    #[test]
    fn test_cross_field_not_reasoned_about() {
        let domain = with_preconditions(vec![
            Expr::binary(Expr::ident("x"), BinaryOp::Gt, Expr::ident("y")),
            Expr::binary(Expr::ident("y"), BinaryOp::Gt, Expr::ident("x")),
        ]);
        assert!(check(&domain).is_empty());
    }

    #[test]
    fn test_one_error_per_field() {
        let domain = with_preconditions(vec![
            Expr::compare("x", BinaryOp::Gt, 5),
            Expr::compare("x", BinaryOp::Lt, 2),
            Expr::compare("x", BinaryOp::Lt, 1),
            Expr::compare("y", BinaryOp::Eq, "a"),
            Expr::compare("y", BinaryOp::Eq, "b"),
        ]);
        assert_eq!(codes(&check(&domain)), vec!["E0400", "E0400"]);
    }

    #[test]
    fn test_complexity_cutoff() {
        let many = (0..=MAX_ATOMS_PER_FIELD as i32)
            .map(|n| Expr::compare("x", BinaryOp::NotEq, n))
            .collect();
        let diags = check(&with_preconditions(many));
        assert_eq!(codes(&diags), vec!["H0401"]);
    }
}
