//! Reference resolution over every predicate in a domain.
//!
//! - E0700: Undefined reference
//! - E0701: Unknown field on a typed value or unknown input
//! - E0703: Unknown type name in a declaration
//! - E0704: Unknown variant in `Enum.VARIANT`

use isl_ast::{Behavior, Domain, Expr, FieldAccessExpr};

use crate::semantic::context::{is_input_record, PassContext};
use crate::types::TypeInfo;
use crate::Diagnostic;

/// Report every reference in `domain` that does not resolve
pub fn resolve_references(domain: &Domain, ctx: &PassContext) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for unresolved in ctx.types.unresolved() {
        diagnostics.push(
            Diagnostic::error(
                format!(
                    "Unknown type '{}' in '{}'",
                    unresolved.name, unresolved.owner
                ),
                unresolved.span,
            )
            .with_code("E0703"),
        );
    }

    for behavior in &domain.behaviors {
        for predicate in behavior.predicates() {
            check_expr(predicate, Some(behavior), ctx, &mut diagnostics);
        }
    }
    for block in &domain.invariants {
        for predicate in &block.predicates {
            check_expr(predicate, None, ctx, &mut diagnostics);
        }
    }

    diagnostics
}

fn check_expr(
    expr: &Expr,
    behavior: Option<&Behavior>,
    ctx: &PassContext,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Identifier(ident) => {
            if !resolves(&ident.name, behavior, ctx) {
                diagnostics.push(
                    Diagnostic::error(format!("Undefined reference '{}'", ident.name), ident.span)
                        .with_code("E0700"),
                );
            }
        }
        Expr::ResultRef(result) => match behavior {
            None => diagnostics.push(
                Diagnostic::error("'result' used outside a behavior", result.span)
                    .with_code("E0700"),
            ),
            Some(b) if b.output.is_none() => diagnostics.push(
                Diagnostic::error(
                    format!("'result' used in '{}', which declares no output", b.name.name),
                    result.span,
                )
                .with_code("E0700"),
            ),
            Some(_) => {}
        },
        Expr::FieldAccess(access) => check_access(access, behavior, ctx, diagnostics),
        Expr::Binary(binary) => {
            check_expr(&binary.left, behavior, ctx, diagnostics);
            check_expr(&binary.right, behavior, ctx, diagnostics);
        }
        Expr::Unary(unary) => check_expr(&unary.operand, behavior, ctx, diagnostics),
        Expr::Call(call) => {
            match call.callee.as_ref() {
                // `User.exists(...)`: the entity must exist, the operation is not checked
                Expr::FieldAccess(access) => check_expr(&access.object, behavior, ctx, diagnostics),
                // Free functions (`old`, `now`, ...) are provided by the runtime
                Expr::Identifier(_) => {}
                other => check_expr(other, behavior, ctx, diagnostics),
            }
            for arg in &call.args {
                check_expr(arg, behavior, ctx, diagnostics);
            }
        }
    }
}

fn check_access(
    access: &FieldAccessExpr,
    behavior: Option<&Behavior>,
    ctx: &PassContext,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let field = access.field.name.as_str();

    if is_input_record(&access.object, behavior) {
        if let Some(b) = behavior.filter(|b| b.get_input(field).is_none()) {
            diagnostics.push(
                Diagnostic::error(
                    format!("Behavior '{}' has no input '{field}'", b.name.name),
                    access.span,
                )
                .with_code("E0701"),
            );
        }
        return;
    }

    check_expr(&access.object, behavior, ctx, diagnostics);

    match ctx.type_of(&access.object, behavior).unwrap_optional() {
        TypeInfo::Entity { name } if ctx.types.field_type(name, field).is_none() => {
            diagnostics.push(
                Diagnostic::error(format!("Unknown field '{field}' on '{name}'"), access.span)
                    .with_code("E0701"),
            );
        }
        TypeInfo::Enum { name } if names_type(&access.object, ctx) => {
            let known = ctx
                .types
                .enum_variants(name)
                .is_some_and(|variants| variants.iter().any(|v| v == field));
            if !known {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Unknown variant '{field}' of enum '{name}'"),
                        access.span,
                    )
                    .with_code("E0704"),
                );
            }
        }
        _ => {}
    }
}

/// Behavior-local scope, then global scope, then enum variants
fn resolves(name: &str, behavior: Option<&Behavior>, ctx: &PassContext) -> bool {
    let scope = behavior.map(|b| b.name.name.as_str());
    if ctx.symbols.lookup(scope, name).is_some() {
        return true;
    }
    if ctx.types.enum_for_variant(name).is_some() {
        return true;
    }
    // Invariants range over the whole domain and may name entity fields directly
    behavior.is_none() && ctx.entity_field(name).is_some()
}

/// Whether `expr` is a bare type name such as `Status`
fn names_type(expr: &Expr, ctx: &PassContext) -> bool {
    matches!(expr, Expr::Identifier(ident) if ctx.types.contains(&ident.name))
}
