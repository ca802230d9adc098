//! Semantic analysis context.
//!
//! The read-only symbol table and type environment shared by every pass of
//! one `analyze` call.

use isl_ast::{Behavior, Expr};

use crate::symbols::{Scope, SymbolKind, SymbolTable};
use crate::types::{PrimitiveType, TypeEnvironment, TypeInfo};

/// Context passed to all semantic passes
#[derive(Debug)]
pub struct PassContext {
    pub symbols: SymbolTable,
    pub types: TypeEnvironment,
}

impl PassContext {
    /// Build the symbol table and type environment for a domain
    pub fn build(domain: &isl_ast::Domain) -> Self {
        Self {
            symbols: SymbolTable::build(domain),
            types: TypeEnvironment::build(domain),
        }
    }

    /// Infer the type of a predicate expression.
    ///
    /// `behavior` is the enclosing behavior, `None` inside invariant blocks.
    pub fn type_of(&self, expr: &Expr, behavior: Option<&Behavior>) -> TypeInfo {
        match expr {
            Expr::Literal(lit) => TypeInfo::of_literal(&lit.value),
            Expr::Identifier(ident) => self.identifier_type(&ident.name, behavior),
            Expr::ResultRef(_) => behavior
                .and_then(|b| b.output.as_ref())
                .map_or(TypeInfo::Unknown, |output| self.types.resolve_ref(output)),
            Expr::FieldAccess(access) => {
                let field = access.field.name.as_str();
                if is_input_record(&access.object, behavior) {
                    return behavior
                        .and_then(|b| b.get_input(field))
                        .map_or(TypeInfo::Unknown, |input| self.types.resolve_ref(&input.ty));
                }
                match self.type_of(&access.object, behavior).unwrap_optional() {
                    TypeInfo::Entity { name } => self
                        .types
                        .field_type(name, field)
                        .map_or(TypeInfo::Unknown, |f| f.ty.clone()),
                    TypeInfo::Enum { name } => TypeInfo::Enum { name: name.clone() },
                    _ => TypeInfo::Unknown,
                }
            }
            Expr::Binary(_) | Expr::Unary(_) => TypeInfo::Primitive(PrimitiveType::Boolean),
            Expr::Call(call) => match call.callee_name() {
                Some("old") if call.args.len() == 1 => self.type_of(&call.args[0], behavior),
                Some("exists" | "contains" | "any" | "all" | "matches") => {
                    TypeInfo::Primitive(PrimitiveType::Boolean)
                }
                Some("length" | "count" | "size" | "len") => TypeInfo::Primitive(PrimitiveType::Int),
                _ => TypeInfo::Unknown,
            },
        }
    }

    fn identifier_type(&self, name: &str, behavior: Option<&Behavior>) -> TypeInfo {
        if let Some(input) = behavior.and_then(|b| b.get_input(name)) {
            return self.types.resolve_ref(&input.ty);
        }
        if name == "result" {
            return self.type_of(&Expr::result(), behavior);
        }
        match self.symbols.get_global(name).map(|s| s.kind) {
            Some(SymbolKind::Entity | SymbolKind::Type) => return self.types.resolve_name(name),
            Some(_) => return TypeInfo::Unknown,
            None => {}
        }
        if let Some(enum_name) = self.types.enum_for_variant(name) {
            return TypeInfo::Enum {
                name: enum_name.to_string(),
            };
        }
        if behavior.is_none() {
            // Invariants may name entity fields directly
            if let Some(field) = self.entity_field(name) {
                return field;
            }
        }
        TypeInfo::Unknown
    }

    /// Type of the first entity field with this name, in declaration order
    pub fn entity_field(&self, name: &str) -> Option<TypeInfo> {
        self.symbols
            .iter()
            .find(|s| s.kind == SymbolKind::Field && s.name == name)
            .and_then(|s| match &s.scope {
                Scope::Entity(owner) => self.types.field_type(owner, name).map(|f| f.ty.clone()),
                _ => None,
            })
    }
}

/// Whether `expr` is the implicit `input` record of `behavior`
pub fn is_input_record(expr: &Expr, behavior: Option<&Behavior>) -> bool {
    match (expr, behavior) {
        (Expr::Identifier(ident), Some(b)) => ident.name == "input" && b.get_input("input").is_none(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{status_domain, user_domain};
    use isl_ast::Domain;

    #[test]
    fn test_type_of_references() {
        let domain = user_domain();
        let ctx = PassContext::build(&domain);
        let behavior = domain.behavior("CreateUser");

        assert_eq!(
            ctx.type_of(&Expr::ident("email"), behavior),
            TypeInfo::Primitive(PrimitiveType::String)
        );
        assert_eq!(
            ctx.type_of(&Expr::path("input.email"), behavior),
            TypeInfo::Primitive(PrimitiveType::String)
        );
        assert_eq!(
            ctx.type_of(&Expr::result(), behavior),
            TypeInfo::Entity { name: "User".to_string() }
        );
        assert_eq!(
            ctx.type_of(&Expr::path("result.id"), behavior),
            TypeInfo::Primitive(PrimitiveType::String)
        );
        assert!(ctx.type_of(&Expr::path("result.missing"), behavior).is_unknown());
        assert!(ctx.type_of(&Expr::ident("nothing"), behavior).is_unknown());
    }

    #[test]
    fn test_type_of_enum_values() {
        let domain = status_domain();
        let ctx = PassContext::build(&domain);
        let status = TypeInfo::Enum { name: "Status".to_string() };
        assert_eq!(ctx.type_of(&Expr::ident("ACTIVE"), None), status);
        assert_eq!(ctx.type_of(&Expr::path("Status.ACTIVE"), None), status);
    }

    #[test]
    fn test_invariant_field_lookup() {
        let domain = user_domain();
        let ctx = PassContext::build(&domain);
        assert_eq!(
            ctx.type_of(&Expr::ident("email"), None),
            TypeInfo::Primitive(PrimitiveType::String)
        );
    }

    #[test]
    fn test_old_call_keeps_argument_type() {
        let domain = Domain::new("D", "1");
        let ctx = PassContext::build(&domain);
        let call = Expr::call(Expr::ident("old"), vec![Expr::literal(3)]);
        assert!(ctx.type_of(&call, None).is_numeric());
    }
}
