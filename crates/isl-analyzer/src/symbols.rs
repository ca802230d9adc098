use indexmap::IndexMap;
use isl_ast::{Behavior, Domain, Field, Span, TypeDefinition, TypeRef};

use crate::types::{BUILTIN_GENERICS, BUILTIN_PRIMITIVES};

/// Symbol kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Type,
    Entity,
    Behavior,
    Field,
    Variable,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Type => "type",
            SymbolKind::Entity => "entity",
            SymbolKind::Behavior => "behavior",
            SymbolKind::Field => "field",
            SymbolKind::Variable => "variable",
        }
    }
}

/// Where a symbol is visible
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    /// Fields of an entity or struct type
    Entity(String),
    /// Inputs, `input` and `result` of a behavior
    Behavior(String),
}

/// How a symbol came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolOrigin {
    Builtin,
    Declared,
    /// `input` and `result` inside a behavior
    Implicit,
}

/// A symbol in the symbol table
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub span: Span,
    pub scope: Scope,
    pub origin: SymbolOrigin,
    pub type_name: Option<String>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, scope: Scope, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            span,
            scope,
            origin: SymbolOrigin::Declared,
            type_name: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_origin(mut self, origin: SymbolOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn is_builtin(&self) -> bool {
        self.origin == SymbolOrigin::Builtin
    }
}

/// A declaration problem found while building the table
#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationIssue {
    /// A user declaration reuses a built-in name
    ShadowsBuiltin {
        name: String,
        kind: SymbolKind,
        span: Span,
    },
    /// The same name is declared twice in one scope
    Duplicate {
        name: String,
        kind: SymbolKind,
        scope: Scope,
        span: Span,
        first_span: Span,
    },
}

/// Symbol table for one domain.
///
/// Keyed by `(scope, name)` and kept in declaration order.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: IndexMap<(Scope, String), Symbol>,
    issues: Vec<DeclarationIssue>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table in a single traversal of the domain
    pub fn build(domain: &Domain) -> Self {
        let mut table = Self::new();
        table.add_builtins();

        // Members of a rejected declaration are not merged into the first one
        for decl in &domain.types {
            let defined = table.define(
                Symbol::new(&decl.name.name, SymbolKind::Type, Scope::Global, decl.name.span),
            );
            if let (true, TypeDefinition::Struct { fields }) = (defined, &decl.definition) {
                table.define_fields(&decl.name.name, fields);
            }
        }

        for entity in &domain.entities {
            let defined = table.define(Symbol::new(
                &entity.name.name,
                SymbolKind::Entity,
                Scope::Global,
                entity.name.span,
            ));
            if defined {
                table.define_fields(&entity.name.name, &entity.fields);
            }
        }

        for behavior in &domain.behaviors {
            let defined = table.define(Symbol::new(
                &behavior.name.name,
                SymbolKind::Behavior,
                Scope::Global,
                behavior.name.span,
            ));
            if defined {
                table.define_behavior_scope(behavior);
            }
        }

        table
    }

    fn add_builtins(&mut self) {
        let names = BUILTIN_PRIMITIVES
            .iter()
            .map(|(name, _)| *name)
            .chain(BUILTIN_GENERICS.iter().map(|(name, _)| *name));
        for name in names {
            let symbol = Symbol::new(name, SymbolKind::Type, Scope::Global, Span::default())
                .with_origin(SymbolOrigin::Builtin);
            self.symbols
                .insert((Scope::Global, name.to_string()), symbol);
        }
    }

    fn define_fields(&mut self, owner: &str, fields: &[Field]) {
        let scope = Scope::Entity(owner.to_string());
        for field in fields {
            self.define(
                Symbol::new(&field.name.name, SymbolKind::Field, scope.clone(), field.name.span)
                    .with_type(type_label(&field.ty)),
            );
        }
    }

    fn define_behavior_scope(&mut self, behavior: &Behavior) {
        let scope = Scope::Behavior(behavior.name.name.clone());
        for input in &behavior.inputs {
            self.define(
                Symbol::new(&input.name.name, SymbolKind::Variable, scope.clone(), input.name.span)
                    .with_type(type_label(&input.ty)),
            );
        }

        let implicit = Symbol::new("input", SymbolKind::Variable, scope.clone(), behavior.name.span)
            .with_origin(SymbolOrigin::Implicit);
        self.symbols
            .entry((scope.clone(), "input".to_string()))
            .or_insert(implicit);

        if let Some(output) = &behavior.output {
            let result = Symbol::new("result", SymbolKind::Variable, scope.clone(), output.span())
                .with_type(type_label(output))
                .with_origin(SymbolOrigin::Implicit);
            self.symbols
                .entry((scope, "result".to_string()))
                .or_insert(result);
        }
    }

    /// Define a symbol, recording shadowing and duplicates instead of failing.
    /// Returns whether the symbol was added.
    fn define(&mut self, symbol: Symbol) -> bool {
        let key = (symbol.scope.clone(), symbol.name.clone());
        match self.symbols.get(&key) {
            Some(existing) if existing.is_builtin() => {
                self.issues.push(DeclarationIssue::ShadowsBuiltin {
                    name: symbol.name,
                    kind: symbol.kind,
                    span: symbol.span,
                });
            }
            Some(existing) => {
                self.issues.push(DeclarationIssue::Duplicate {
                    name: symbol.name.clone(),
                    kind: symbol.kind,
                    scope: symbol.scope.clone(),
                    span: symbol.span,
                    first_span: existing.span,
                });
            }
            None => {
                self.symbols.insert(key, symbol);
                return true;
            }
        }
        false
    }

    /// Get a symbol in a specific scope
    pub fn get(&self, scope: &Scope, name: &str) -> Option<&Symbol> {
        self.symbols.get(&(scope.clone(), name.to_string()))
    }

    /// Get a global symbol by name
    pub fn get_global(&self, name: &str) -> Option<&Symbol> {
        self.get(&Scope::Global, name)
    }

    /// Resolve a name: behavior-local scope first, then global
    pub fn lookup(&self, behavior: Option<&str>, name: &str) -> Option<&Symbol> {
        behavior
            .and_then(|b| self.get(&Scope::Behavior(b.to_string()), name))
            .or_else(|| self.get_global(name))
    }

    /// All symbols declared in a scope, in declaration order
    pub fn in_scope<'a>(&'a self, scope: &'a Scope) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.symbols
            .iter()
            .filter(move |((s, _), _)| s == scope)
            .map(|(_, symbol)| symbol)
    }

    /// Get all global symbols, built-ins included
    pub fn all_globals(&self) -> Vec<&Symbol> {
        self.in_scope(&Scope::Global).collect()
    }

    /// All symbols in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Declaration problems recorded during the build
    pub fn issues(&self) -> &[DeclarationIssue] {
        &self.issues
    }
}

fn type_label(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Named { name, .. } => name.clone(),
        TypeRef::Generic { name, args, .. } => {
            let args: Vec<_> = args.iter().map(type_label).collect();
            format!("{name}<{}>", args.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isl_ast::{Entity, TypeDecl};

    fn user_domain() -> Domain {
        Domain::new("Auth", "1.0.0")
            .with_entity(Entity::new("User").field("id", "UUID").field("email", "String"))
            .with_behavior(
                Behavior::new("CreateUser")
                    .input("email", "String")
                    .output("User"),
            )
    }

    #[test]
    fn test_builtins_registered() {
        let table = SymbolTable::build(&Domain::new("Empty", "1"));
        let string = table.get_global("String").expect("builtin String");
        assert!(string.is_builtin());
        assert_eq!(string.kind, SymbolKind::Type);
        assert!(table.get_global("List").is_some());
    }

    #[test]
    fn test_globals_fields_and_locals() {
        let table = SymbolTable::build(&user_domain());
        assert_eq!(table.get_global("User").map(|s| s.kind), Some(SymbolKind::Entity));
        assert_eq!(table.get_global("CreateUser").map(|s| s.kind), Some(SymbolKind::Behavior));
        assert_eq!(
            table.get(&Scope::Entity("User".into()), "email").and_then(|s| s.type_name.as_deref()),
            Some("String")
        );
        assert!(table.issues().is_empty());
    }

    #[test]
    fn test_lookup_prefers_local_scope() {
        let table = SymbolTable::build(&user_domain());
        let email = table.lookup(Some("CreateUser"), "email").expect("input");
        assert_eq!(email.scope, Scope::Behavior("CreateUser".to_string()));
        let result = table.lookup(Some("CreateUser"), "result").expect("result");
        assert_eq!(result.origin, SymbolOrigin::Implicit);
        assert_eq!(result.type_name.as_deref(), Some("User"));
        assert!(table.lookup(None, "email").is_none());
        assert!(table.lookup(Some("CreateUser"), "User").is_some());
    }

    #[test]
    fn test_no_result_without_output() {
        let domain = Domain::new("D", "1").with_behavior(Behavior::new("Ping"));
        let table = SymbolTable::build(&domain);
        assert!(table.lookup(Some("Ping"), "result").is_none());
        assert!(table.lookup(Some("Ping"), "input").is_some());
    }

    #[test]
    fn test_shadowing_builtin_is_recorded() {
        let domain = Domain::new("D", "1").with_type(TypeDecl::new(
            "String",
            TypeDefinition::Alias {
                target: TypeRef::named("Int"),
            },
        ));
        let table = SymbolTable::build(&domain);
        assert!(matches!(
            table.issues(),
            [DeclarationIssue::ShadowsBuiltin { name, .. }] if name == "String"
        ));
        assert!(table.get_global("String").is_some_and(Symbol::is_builtin));
    }

    #[test]
    fn test_duplicates_are_recorded() {
        let domain = Domain::new("D", "1")
            .with_entity(Entity::new("User").field("id", "UUID").field("id", "String"))
            .with_entity(Entity::new("User").field("id", "UUID").field("nickname", "String"));
        let table = SymbolTable::build(&domain);
        let duplicates: Vec<_> = table
            .issues()
            .iter()
            .filter_map(|issue| match issue {
                DeclarationIssue::Duplicate { name, scope, .. } => Some((name.as_str(), scope.clone())),
                DeclarationIssue::ShadowsBuiltin { .. } => None,
            })
            .collect();
        assert_eq!(
            duplicates,
            vec![
                ("id", Scope::Entity("User".to_string())),
                ("User", Scope::Global),
            ]
        );
    }

    #[test]
    fn test_duplicate_entity_fields_not_merged() {
        let domain = Domain::new("D", "1")
            .with_entity(Entity::new("User").field("id", "UUID"))
            .with_entity(Entity::new("User").field("nickname", "String"));
        let table = SymbolTable::build(&domain);
        let user = Scope::Entity("User".into());
        assert!(table.get(&user, "id").is_some());
        assert!(table.get(&user, "nickname").is_none());
    }

    #[test]
    fn test_in_scope_keeps_declaration_order() {
        let table = SymbolTable::build(&user_domain());
        let scope = Scope::Entity("User".to_string());
        let names: Vec<_> = table
            .in_scope(&scope)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["id", "email"]);
    }
}
