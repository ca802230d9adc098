//! Redundant conditions pass (W08xx).
//!
//! - W0800: Condition implied by another condition on the same field

use isl_ast::{Domain, Expr};

use crate::semantic::constraints::{atoms, group_by_path, is_unsatisfiable, Atom, MAX_ATOMS_PER_FIELD};
use crate::semantic::{PassContext, PassError, SemanticPass};
use crate::Diagnostic;

pub const ID: &str = "redundant-conditions";

pub fn redundant_conditions_pass() -> SemanticPass {
    SemanticPass::new(ID, "Redundant Conditions", analyze)
        .with_description("Finds conditions already implied by a stronger one")
        .with_priority(50)
}

fn analyze(domain: &Domain, _ctx: &PassContext) -> Result<Vec<Diagnostic>, PassError> {
    let mut diagnostics = Vec::new();

    for behavior in &domain.behaviors {
        let name = &behavior.name.name;
        check_conjunction(&behavior.preconditions, &format!("preconditions of '{name}'"), &mut diagnostics);
        check_conjunction(&behavior.postconditions, &format!("postconditions of '{name}'"), &mut diagnostics);
    }
    for block in &domain.invariants {
        check_conjunction(
            &block.predicates,
            &format!("invariants '{}'", block.name.name),
            &mut diagnostics,
        );
    }

    Ok(diagnostics)
}

fn check_conjunction(predicates: &[Expr], context: &str, diagnostics: &mut Vec<Diagnostic>) {
    let all: Vec<Atom> = predicates.iter().flat_map(atoms).collect();

    for (_, group) in group_by_path(&all) {
        // Contradictions are reported elsewhere; implication is meaningless there
        if group.len() > MAX_ATOMS_PER_FIELD || is_unsatisfiable(&group) {
            continue;
        }
        for (i, atom) in group.iter().enumerate() {
            let stronger = group.iter().enumerate().find(|&(j, other)| {
                j != i && other.implies(atom) && (!atom.implies(other) || j < i)
            });
            if let Some((_, other)) = stronger {
                diagnostics.push(
                    Diagnostic::warning(
                        format!("Condition '{atom}' is implied by '{other}' in {context}"),
                        atom.span,
                    )
                    .with_code("W0800"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{codes, run_pass, user_domain, with_preconditions};
    use isl_ast::{BinaryOp, InvariantBlock};
    use pretty_assertions::assert_eq;

    fn check(domain: &Domain) -> Vec<Diagnostic> {
        run_pass(&redundant_conditions_pass(), domain)
    }

    #[test]
    fn test_weaker_bound_is_redundant() {
        let domain = with_preconditions(vec![
            Expr::compare("x", BinaryOp::Gt, 3),
            Expr::compare("x", BinaryOp::Gt, 5),
        ]);
        let diags = check(&domain);
        assert_eq!(codes(&diags), vec!["W0800"]);
        assert!(diags[0].message.contains("'x > 3' is implied by 'x > 5'"));
    }

    #[test]
    fn test_duplicate_reported_once() {
        let domain = with_preconditions(vec![
            Expr::compare("x", BinaryOp::LtEq, 10),
            Expr::compare("x", BinaryOp::LtEq, 10),
        ]);
        assert_eq!(codes(&check(&domain)), vec!["W0800"]);
    }

    #[test]
    fn test_independent_bounds() {
        let domain = with_preconditions(vec![
            Expr::compare("x", BinaryOp::Gt, 3),
            Expr::compare("x", BinaryOp::Lt, 10),
        ]);
        assert!(check(&domain).is_empty());
        assert!(check(&user_domain()).is_empty());
    }

    #[test]
    fn test_contradictions_left_alone() {
        let domain = with_preconditions(vec![
            Expr::compare("x", BinaryOp::Gt, 5),
            Expr::compare("x", BinaryOp::Lt, 2),
            Expr::compare("x", BinaryOp::Lt, 1),
        ]);
        assert!(check(&domain).is_empty());
    }

    #[test]
    fn test_invariant_block_is_a_conjunction() {
        let domain = user_domain().with_invariants(InvariantBlock::new(
            "Limits",
            vec![Expr::and(
                Expr::compare("balance", BinaryOp::GtEq, 0),
                Expr::compare("balance", BinaryOp::Gt, -1),
            )],
        ));
        let diags = check(&domain);
        assert_eq!(codes(&diags), vec!["W0800"]);
        assert!(diags[0].message.contains("invariants 'Limits'"));
    }
}
