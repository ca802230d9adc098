//! Unreachable clauses pass (W01xx).
//!
//! - W0100: Clause guard contradicts the guards before it

use isl_ast::{BinaryOp, Domain, Expr};

use crate::semantic::constraints::{atoms, group_by_path, is_unsatisfiable, Atom, MAX_ATOMS_PER_FIELD};
use crate::semantic::{PassContext, PassError, SemanticPass};
use crate::Diagnostic;

pub const ID: &str = "unreachable-clauses";

pub fn unreachable_clauses_pass() -> SemanticPass {
    SemanticPass::new(ID, "Unreachable Clauses", analyze)
        .with_description("Finds clauses whose guard can never hold given earlier clauses")
        .with_priority(100)
}

fn analyze(domain: &Domain, _ctx: &PassContext) -> Result<Vec<Diagnostic>, PassError> {
    let mut diagnostics = Vec::new();
    for behavior in &domain.behaviors {
        check_clauses(&behavior.name.name, "precondition", &behavior.preconditions, &mut diagnostics);
        check_clauses(&behavior.name.name, "postcondition", &behavior.postconditions, &mut diagnostics);
    }
    Ok(diagnostics)
}

/// The condition under which a clause applies
fn guard(clause: &Expr) -> &Expr {
    match clause {
        Expr::Binary(binary) if binary.op == BinaryOp::Implies => &binary.left,
        other => other,
    }
}

fn check_clauses(behavior: &str, kind: &str, clauses: &[Expr], diagnostics: &mut Vec<Diagnostic>) {
    let mut earlier: Vec<Atom> = Vec::new();

    for (index, clause) in clauses.iter().enumerate() {
        let own = atoms(guard(clause));
        if own.is_empty() {
            continue;
        }

        let conflicting = group_by_path(&own).into_iter().find_map(|(path, own_atoms)| {
            let before: Vec<&Atom> = earlier.iter().filter(|a| a.path == path).collect();
            if before.is_empty() || before.len() + own_atoms.len() > MAX_ATOMS_PER_FIELD {
                return None;
            }
            if is_unsatisfiable(&before) || is_unsatisfiable(&own_atoms) {
                return None;
            }
            let combined: Vec<&Atom> = before.iter().chain(own_atoms.iter()).copied().collect();
            is_unsatisfiable(&combined).then_some(path.to_string())
        });

        if let Some(path) = conflicting {
            diagnostics.push(
                Diagnostic::warning(
                    format!(
                        "{kind} {} of '{behavior}' is unreachable: its condition on '{path}' contradicts earlier {kind}s",
                        index + 1
                    ),
                    clause.span(),
                )
                .with_code("W0100"),
            );
        }

        earlier.extend(own);
    }
}
