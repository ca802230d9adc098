//! Type coherence pass (E07xx).
//!
//! Runs reference resolution first, then checks operand types:
//! - E0700: Undefined reference
//! - E0701: Unknown field or input
//! - E0702: Operand type mismatch
//! - E0703: Unknown type name in a declaration
//! - E0704: Unknown enum variant

use isl_ast::{Behavior, BinaryExpr, Domain, Expr, LiteralValue};

use crate::semantic::resolver::resolve_references;
use crate::semantic::{PassContext, PassError, SemanticPass};
use crate::types::{PrimitiveType, TypeInfo};
use crate::Diagnostic;

pub const ID: &str = "type-coherence";

pub fn type_coherence_pass() -> SemanticPass {
    SemanticPass::new(ID, "Type Coherence", analyze)
        .with_description("Resolves references and checks operand types in predicates")
        .with_priority(60)
}

fn analyze(domain: &Domain, ctx: &PassContext) -> Result<Vec<Diagnostic>, PassError> {
    let mut diagnostics = resolve_references(domain, ctx);

    for behavior in &domain.behaviors {
        for predicate in behavior.predicates() {
            check_predicate(predicate, Some(behavior), ctx, &mut diagnostics);
        }
    }
    for block in &domain.invariants {
        for predicate in &block.predicates {
            check_predicate(predicate, None, ctx, &mut diagnostics);
        }
    }

    Ok(diagnostics)
}

fn check_predicate(
    predicate: &Expr,
    behavior: Option<&Behavior>,
    ctx: &PassContext,
    diagnostics: &mut Vec<Diagnostic>,
) {
    predicate.walk(&mut |node| match node {
        Expr::Binary(binary) if binary.op.is_logical() => {
            check_boolean_operand(&binary.left, binary.op.as_str(), behavior, ctx, diagnostics);
            check_boolean_operand(&binary.right, binary.op.as_str(), behavior, ctx, diagnostics);
        }
        Expr::Binary(binary) => check_comparison(binary, behavior, ctx, diagnostics),
        Expr::Unary(unary) => {
            check_boolean_operand(&unary.operand, "not", behavior, ctx, diagnostics);
        }
        _ => {}
    });
}

fn check_comparison(
    binary: &BinaryExpr,
    behavior: Option<&Behavior>,
    ctx: &PassContext,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let left = ctx.type_of(&binary.left, behavior);
    let right = ctx.type_of(&binary.right, behavior);

    if !left.can_compare_with(&right, binary.op) {
        diagnostics.push(
            Diagnostic::error(
                format!(
                    "Cannot compare '{left}' with '{right}' using '{}'",
                    binary.op.as_str()
                ),
                binary.span,
            )
            .with_code("E0702"),
        );
        return;
    }

    // A string literal compared against an enum must name one of its variants
    let sides = [(&left, binary.right.as_ref()), (&right, binary.left.as_ref())];
    for (ty, other) in sides {
        let (TypeInfo::Enum { name }, Expr::Literal(lit)) = (ty.unwrap_optional(), other) else {
            continue;
        };
        let LiteralValue::String(value) = &lit.value else {
            continue;
        };
        let known = ctx
            .types
            .enum_variants(name)
            .is_some_and(|variants| variants.iter().any(|v| v == value));
        if !known {
            diagnostics.push(
                Diagnostic::error(
                    format!("Unknown variant '{value}' of enum '{name}'"),
                    lit.span,
                )
                .with_code("E0704"),
            );
        }
    }
}

fn check_boolean_operand(
    operand: &Expr,
    op: &str,
    behavior: Option<&Behavior>,
    ctx: &PassContext,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let ty = ctx.type_of(operand, behavior);
    let ty = ty.unwrap_optional();
    if ty.is_unknown() || *ty == TypeInfo::Primitive(PrimitiveType::Boolean) {
        return;
    }
    diagnostics.push(
        Diagnostic::error(
            format!("Operand of '{op}' must be Boolean, found '{ty}'"),
            operand.span(),
        )
        .with_code("E0702"),
    );
}
