//! Shared domain builders for unit tests.

use isl_ast::{
    Behavior, BinaryOp, Domain, Entity, Expr, Identifier, LiteralValue, TypeDecl, TypeDefinition,
};

use crate::semantic::{PassContext, SemanticPass};
use crate::Diagnostic;

/// `User {id, email}` with `CreateUser(email) -> User`
pub fn user_domain() -> Domain {
    Domain::new("Auth", "1.0.0")
        .with_entity(Entity::new("User").field("id", "string").field("email", "string"))
        .with_behavior(
            Behavior::new("CreateUser")
                .description("Create a new user account")
                .input("email", "string")
                .output("User")
                .pre(Expr::compare("email", BinaryOp::NotEq, LiteralValue::Null))
                .post(Expr::compare("result.id", BinaryOp::NotEq, LiteralValue::Null)),
        )
}

/// `Status` enum and an `Account` entity using it
pub fn status_domain() -> Domain {
    Domain::new("Accounts", "1.0.0")
        .with_type(TypeDecl::new(
            "Status",
            TypeDefinition::Enum {
                variants: vec![Identifier::new("ACTIVE"), Identifier::new("LOCKED")],
            },
        ))
        .with_entity(
            Entity::new("Account")
                .field("id", "UUID")
                .field("status", "Status")
                .field("balance", "Decimal"),
        )
}

/// A domain with one behavior holding the given preconditions
pub fn with_preconditions(preconditions: Vec<Expr>) -> Domain {
    let behavior = preconditions
        .into_iter()
        .fold(Behavior::new("Check").input("x", "Int"), Behavior::pre);
    Domain::new("Checks", "1.0.0").with_behavior(behavior)
}

/// Run a single pass against a domain
pub fn run_pass(pass: &SemanticPass, domain: &Domain) -> Vec<Diagnostic> {
    let ctx = PassContext::build(domain);
    pass.analyze(domain, &ctx).expect("built-in passes do not fail")
}

/// Codes of the given diagnostics, in order
pub fn codes(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics.iter().filter_map(|d| d.code.as_deref()).collect()
}
