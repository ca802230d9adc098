//! Unused symbols pass (W02xx).
//!
//! - W0200: Entity field never referenced
//! - W0201: Behavior input never referenced
//! - W0202: Behavior output never referenced

use std::collections::HashSet;

use isl_ast::{Behavior, Domain, Expr};

use crate::semantic::context::is_input_record;
use crate::semantic::{PassContext, PassError, SemanticPass};
use crate::types::TypeInfo;
use crate::Diagnostic;

pub const ID: &str = "unused-symbols";

pub fn unused_symbols_pass() -> SemanticPass {
    SemanticPass::new(ID, "Unused Symbols", analyze)
        .with_description("Finds fields, inputs and outputs no predicate refers to")
        .with_priority(90)
}

/// Field accesses seen anywhere in the domain
#[derive(Default)]
struct FieldUsage {
    /// (owning entity, field); `None` when the object type is unknown
    accessed: HashSet<(Option<String>, String)>,
}

impl FieldUsage {
    fn record(&mut self, owner: Option<String>, field: &str) {
        self.accessed.insert((owner, field.to_string()));
    }

    fn is_used(&self, entity: &str, field: &str) -> bool {
        self.accessed.contains(&(Some(entity.to_string()), field.to_string()))
            || self.accessed.contains(&(None, field.to_string()))
    }
}

fn analyze(domain: &Domain, ctx: &PassContext) -> Result<Vec<Diagnostic>, PassError> {
    let mut usage = FieldUsage::default();
    for behavior in &domain.behaviors {
        for predicate in behavior.predicates() {
            track_fields(predicate, Some(behavior), ctx, &mut usage);
        }
    }
    for block in &domain.invariants {
        for predicate in &block.predicates {
            track_fields(predicate, None, ctx, &mut usage);
        }
    }

    let mut diagnostics = Vec::new();

    for entity in &domain.entities {
        for field in &entity.fields {
            if !usage.is_used(&entity.name.name, &field.name.name) {
                diagnostics.push(
                    Diagnostic::warning(
                        format!(
                            "Field '{}' of '{}' is never referenced",
                            field.name.name, entity.name.name
                        ),
                        field.name.span,
                    )
                    .with_code("W0200"),
                );
            }
        }
    }

    for behavior in &domain.behaviors {
        let used = local_names(behavior);
        for input in &behavior.inputs {
            if !used.contains(input.name.name.as_str()) {
                diagnostics.push(
                    Diagnostic::warning(
                        format!(
                            "Input '{}' of '{}' is never referenced",
                            input.name.name, behavior.name.name
                        ),
                        input.name.span,
                    )
                    .with_code("W0201"),
                );
            }
        }
        if let Some(output) = &behavior.output {
            if !used.contains("result") {
                diagnostics.push(
                    Diagnostic::warning(
                        format!(
                            "Output of '{}' is never referenced by a postcondition",
                            behavior.name.name
                        ),
                        output.span(),
                    )
                    .with_code("W0202"),
                );
            }
        }
    }

    Ok(diagnostics)
}

fn track_fields(expr: &Expr, behavior: Option<&Behavior>, ctx: &PassContext, usage: &mut FieldUsage) {
    expr.walk(&mut |node| match node {
        Expr::FieldAccess(access) => {
            let owner = match ctx.type_of(&access.object, behavior) {
                TypeInfo::Unknown => None,
                ty => match ty.entity_name() {
                    Some(name) => Some(name.to_string()),
                    // Accesses on primitives or enums never reach an entity field
                    None => return,
                },
            };
            usage.record(owner, &access.field.name);
        }
        // Invariants may name fields directly
        Expr::Identifier(ident) if behavior.is_none() => usage.record(None, &ident.name),
        _ => {}
    });
}

/// Inputs and `result` mentioned in a behavior's own predicates
fn local_names(behavior: &Behavior) -> HashSet<&str> {
    let mut used = HashSet::new();
    for predicate in behavior.predicates() {
        predicate.walk(&mut |node| match node {
            Expr::Identifier(ident) => {
                used.insert(ident.name.as_str());
            }
            Expr::ResultRef(_) => {
                used.insert("result");
            }
            Expr::FieldAccess(access) if is_input_record(&access.object, Some(behavior)) => {
                used.insert(access.field.name.as_str());
            }
            _ => {}
        });
    }
    used
}
