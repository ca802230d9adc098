//! Consistency checker pass (E03xx/W03xx).
//!
//! A coarse net over declarations and preconditions:
//! - W0301: Contradictory precondition pair
//! - W0302: Input unused in its own behavior
//! - W0303: Behavior with no preconditions or postconditions
//! - W0304: Entity with no fields
//! - E0305: Duplicate declaration
//! - W0306: Declaration shadows a built-in
//! - W0307: Side effect targets an unknown entity

use isl_ast::{Behavior, Domain, Expr};

use crate::semantic::constraints::{atoms, group_by_path, is_unsatisfiable, MAX_ATOMS_PER_FIELD};
use crate::semantic::{PassContext, PassError, SemanticPass};
use crate::symbols::{DeclarationIssue, Scope};
use crate::Diagnostic;

pub const ID: &str = "consistency-checker";

pub fn consistency_checker_pass() -> SemanticPass {
    SemanticPass::new(ID, "Consistency Checker", analyze)
        .with_description("Contradictory preconditions, unused locals and structural gaps")
        .with_priority(85)
}

fn analyze(domain: &Domain, ctx: &PassContext) -> Result<Vec<Diagnostic>, PassError> {
    let mut diagnostics = Vec::new();

    check_declarations(ctx, &mut diagnostics);

    for entity in &domain.entities {
        if entity.fields.is_empty() {
            diagnostics.push(
                Diagnostic::warning(
                    format!("Entity '{}' declares no fields", entity.name.name),
                    entity.name.span,
                )
                .with_code("W0304"),
            );
        }
    }

    for behavior in &domain.behaviors {
        check_contradictions(behavior, &mut diagnostics);
        check_local_usage(behavior, &mut diagnostics);

        if behavior.preconditions.is_empty() && behavior.postconditions.is_empty() {
            diagnostics.push(
                Diagnostic::warning(
                    format!(
                        "Behavior '{}' has neither preconditions nor postconditions",
                        behavior.name.name
                    ),
                    behavior.name.span,
                )
                .with_code("W0303"),
            );
        }

        for effect in &behavior.side_effects {
            if domain.entity(&effect.target.name).is_none() {
                diagnostics.push(
                    Diagnostic::warning(
                        format!(
                            "Side effect of '{}' targets unknown entity '{}'",
                            behavior.name.name, effect.target.name
                        ),
                        effect.target.span,
                    )
                    .with_code("W0307"),
                );
            }
        }
    }

    Ok(diagnostics)
}

fn check_declarations(ctx: &PassContext, diagnostics: &mut Vec<Diagnostic>) {
    for issue in ctx.symbols.issues() {
        let diagnostic = match issue {
            DeclarationIssue::ShadowsBuiltin { name, kind, span } => Diagnostic::warning(
                format!("{} '{name}' shadows the built-in type of the same name", capitalized(kind.as_str())),
                *span,
            )
            .with_code("W0306"),
            DeclarationIssue::Duplicate {
                name, kind, scope, span, ..
            } => {
                let place = match scope {
                    Scope::Global => "this domain".to_string(),
                    Scope::Entity(owner) => format!("'{owner}'"),
                    Scope::Behavior(owner) => format!("the inputs of '{owner}'"),
                };
                Diagnostic::error(
                    format!("Duplicate {} '{name}' in {place}", kind.as_str()),
                    *span,
                )
                .with_code("E0305")
            }
        };
        diagnostics.push(diagnostic);
    }
}

fn check_contradictions(behavior: &Behavior, diagnostics: &mut Vec<Diagnostic>) {
    let all: Vec<_> = behavior.preconditions.iter().flat_map(atoms).collect();
    for (_, group) in group_by_path(&all) {
        if group.len() > MAX_ATOMS_PER_FIELD {
            continue;
        }
        for (i, first) in group.iter().enumerate() {
            for second in &group[i + 1..] {
                if is_unsatisfiable(&[*first, *second]) {
                    diagnostics.push(
                        Diagnostic::warning(
                            format!(
                                "Preconditions '{first}' and '{second}' of '{}' contradict each other",
                                behavior.name.name
                            ),
                            first.span.merge(second.span),
                        )
                        .with_code("W0301"),
                    );
                }
            }
        }
    }
}

fn check_local_usage(behavior: &Behavior, diagnostics: &mut Vec<Diagnostic>) {
    for input in &behavior.inputs {
        let name = input.name.name.as_str();
        let mut used = false;
        for predicate in behavior.predicates() {
            predicate.walk(&mut |node| match node {
                Expr::Identifier(ident) if ident.name == name => used = true,
                Expr::FieldAccess(access) if access.field.name == name => {
                    if matches!(access.object.as_ref(), Expr::Identifier(obj) if obj.name == "input") {
                        used = true;
                    }
                }
                _ => {}
            });
        }
        if !used {
            diagnostics.push(
                Diagnostic::warning(
                    format!("Input '{name}' is not used by '{}'", behavior.name.name),
                    input.name.span,
                )
                .with_code("W0302"),
            );
        }
    }
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
