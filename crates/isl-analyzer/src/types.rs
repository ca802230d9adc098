//! Type environment for ISL semantic analysis.
//!
//! Resolves every declared type name to a [`TypeDescriptor`], flattening
//! aliases, and provides the value-level [`TypeInfo`] used by predicate checks.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use isl_ast::{BinaryOp, Domain, Field, LiteralValue, Span, TypeDefinition, TypeRef};

/// Primitive types known to every domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    String,
    Int,
    Decimal,
    Boolean,
    Uuid,
    Timestamp,
    Duration,
}

/// Built-in primitive names, including the lowercase spellings parsers emit
pub const BUILTIN_PRIMITIVES: &[(&str, PrimitiveType)] = &[
    ("String", PrimitiveType::String),
    ("Int", PrimitiveType::Int),
    ("Decimal", PrimitiveType::Decimal),
    ("Boolean", PrimitiveType::Boolean),
    ("UUID", PrimitiveType::Uuid),
    ("Timestamp", PrimitiveType::Timestamp),
    ("Duration", PrimitiveType::Duration),
    ("string", PrimitiveType::String),
    ("int", PrimitiveType::Int),
    ("number", PrimitiveType::Decimal),
    ("decimal", PrimitiveType::Decimal),
    ("boolean", PrimitiveType::Boolean),
    ("bool", PrimitiveType::Boolean),
];

/// Built-in generic type constructors and their arity
pub const BUILTIN_GENERICS: &[(&str, usize)] =
    &[("List", 1), ("Set", 1), ("Map", 2), ("Optional", 1)];

impl PrimitiveType {
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveType::String => "String",
            PrimitiveType::Int => "Int",
            PrimitiveType::Decimal => "Decimal",
            PrimitiveType::Boolean => "Boolean",
            PrimitiveType::Uuid => "UUID",
            PrimitiveType::Timestamp => "Timestamp",
            PrimitiveType::Duration => "Duration",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, PrimitiveType::Int | PrimitiveType::Decimal)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, PrimitiveType::Timestamp | PrimitiveType::Duration)
    }
}

/// A resolved field of an entity-shaped type
#[derive(Debug, Clone, PartialEq)]
pub struct FieldType {
    pub ty: TypeInfo,
    pub optional: bool,
}

/// What a declared type name stands for, after alias flattening
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Primitive(PrimitiveType),
    /// Entities and struct type declarations
    Entity {
        name: String,
        fields: IndexMap<String, FieldType>,
    },
    Enum {
        name: String,
        variants: Vec<String>,
    },
    /// A built-in generic constructor such as `List`
    GenericConstructor { name: String, arity: usize },
    /// Alias of an applied generic, e.g. `Members = List<User>`
    Instance(TypeInfo),
}

/// Type of a value appearing in a predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeInfo {
    Primitive(PrimitiveType),
    Entity { name: String },
    Enum { name: String },
    Generic { name: String, args: Vec<TypeInfo> },
    /// Type of the `null` literal
    Null,
    /// Unknown type (for error recovery)
    Unknown,
}

impl TypeInfo {
    pub fn is_unknown(&self) -> bool {
        matches!(self, TypeInfo::Unknown)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeInfo::Primitive(p) if p.is_numeric())
    }

    /// Whether `<`, `>`, `<=`, `>=` are meaningful for this type
    pub fn is_ordered(&self) -> bool {
        match self {
            TypeInfo::Primitive(p) => p.is_numeric() || p.is_temporal() || *p == PrimitiveType::String,
            _ => false,
        }
    }

    /// Type of a literal value
    pub fn of_literal(value: &LiteralValue) -> Self {
        match value {
            LiteralValue::Null => TypeInfo::Null,
            LiteralValue::Bool(_) => TypeInfo::Primitive(PrimitiveType::Boolean),
            LiteralValue::Number(_) => TypeInfo::Primitive(PrimitiveType::Decimal),
            LiteralValue::String(_) => TypeInfo::Primitive(PrimitiveType::String),
        }
    }

    /// Strip `Optional<T>` down to `T`
    pub fn unwrap_optional(&self) -> &TypeInfo {
        match self {
            TypeInfo::Generic { name, args } if name == "Optional" && args.len() == 1 => {
                args[0].unwrap_optional()
            }
            other => other,
        }
    }

    /// Name of the entity this type refers to, looking through `Optional`
    pub fn entity_name(&self) -> Option<&str> {
        match self.unwrap_optional() {
            TypeInfo::Entity { name } => Some(name),
            _ => None,
        }
    }

    /// Check if this type can be compared with another using `op`.
    pub fn can_compare_with(&self, other: &TypeInfo, op: BinaryOp) -> bool {
        let (a, b) = (self.unwrap_optional(), other.unwrap_optional());

        // Unknown types are permissive for error recovery
        if a.is_unknown() || b.is_unknown() {
            return true;
        }

        // null is only meaningful for (in)equality
        if matches!(a, TypeInfo::Null) || matches!(b, TypeInfo::Null) {
            return !op.is_ordering();
        }

        if a.is_numeric() && b.is_numeric() {
            return true;
        }

        match (a, b) {
            (TypeInfo::Primitive(p), TypeInfo::Primitive(q)) if p.is_temporal() || q.is_temporal() => {
                // Timestamps and durations are written as numbers or ISO strings
                let other = if p.is_temporal() { q } else { p };
                other.is_temporal() || other.is_numeric() || *other == PrimitiveType::String
            }
            (TypeInfo::Primitive(PrimitiveType::Uuid), TypeInfo::Primitive(PrimitiveType::String))
            | (TypeInfo::Primitive(PrimitiveType::String), TypeInfo::Primitive(PrimitiveType::Uuid)) => {
                !op.is_ordering()
            }
            // Enum values are written as strings or bare variant names
            (TypeInfo::Enum { .. }, TypeInfo::Primitive(PrimitiveType::String))
            | (TypeInfo::Primitive(PrimitiveType::String), TypeInfo::Enum { .. }) => !op.is_ordering(),
            _ if a == b => !op.is_ordering() || a.is_ordered(),
            _ => false,
        }
    }

    /// Get the type name as it would appear in a spec
    pub fn type_name(&self) -> String {
        match self {
            TypeInfo::Primitive(p) => p.name().to_string(),
            TypeInfo::Entity { name } | TypeInfo::Enum { name } => name.clone(),
            TypeInfo::Generic { name, args } if args.is_empty() => name.clone(),
            TypeInfo::Generic { name, args } => {
                let args: Vec<_> = args.iter().map(TypeInfo::type_name).collect();
                format!("{name}<{}>", args.join(", "))
            }
            TypeInfo::Null => "null".to_string(),
            TypeInfo::Unknown => "unknown".to_string(),
        }
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// A type name that did not resolve while building the environment
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedType {
    pub name: String,
    pub span: Span,
    /// Declaration that mentions the type (`User.email`, `CreateUser.input`)
    pub owner: String,
}

/// Resolved mapping from type names to descriptors.
///
/// Built once per analysis and never mutated by passes.
#[derive(Debug, Clone, Default)]
pub struct TypeEnvironment {
    descriptors: IndexMap<String, TypeDescriptor>,
    unresolved: Vec<UnresolvedType>,
}

impl TypeEnvironment {
    /// Build the environment for a domain
    pub fn build(domain: &Domain) -> Self {
        let mut env = Self::default();

        for (name, prim) in BUILTIN_PRIMITIVES {
            env.descriptors
                .insert((*name).to_string(), TypeDescriptor::Primitive(*prim));
        }
        for (name, arity) in BUILTIN_GENERICS {
            env.descriptors.insert(
                (*name).to_string(),
                TypeDescriptor::GenericConstructor {
                    name: (*name).to_string(),
                    arity: *arity,
                },
            );
        }

        // Register shapes first so fields can refer to any declared name
        let mut aliases: IndexMap<String, &TypeRef> = IndexMap::new();
        for decl in &domain.types {
            let name = decl.name.name.clone();
            if env.descriptors.contains_key(&name) {
                // Built-ins keep precedence; the shadowing itself is reported elsewhere
                continue;
            }
            match &decl.definition {
                TypeDefinition::Enum { variants } => {
                    let variants = variants.iter().map(|v| v.name.clone()).collect();
                    env.descriptors
                        .insert(name.clone(), TypeDescriptor::Enum { name, variants });
                }
                TypeDefinition::Struct { .. } => {
                    env.descriptors.insert(
                        name.clone(),
                        TypeDescriptor::Entity {
                            name,
                            fields: IndexMap::new(),
                        },
                    );
                }
                TypeDefinition::Alias { target } => {
                    aliases.insert(name, target);
                }
                TypeDefinition::Constrained { base, .. } => {
                    aliases.insert(name, base);
                }
            }
        }
        for entity in &domain.entities {
            let name = entity.name.name.clone();
            if env.descriptors.contains_key(&name) {
                continue;
            }
            env.descriptors.insert(
                name.clone(),
                TypeDescriptor::Entity {
                    name,
                    fields: IndexMap::new(),
                },
            );
        }

        env.flatten_aliases(&aliases);

        // Resolve field lists now that every name is known; the first declaration wins
        let mut filled = HashSet::new();
        for decl in &domain.types {
            if let TypeDefinition::Struct { fields } = &decl.definition {
                if filled.insert(decl.name.name.as_str()) {
                    env.fill_fields(&decl.name.name, fields);
                }
            }
        }
        for entity in &domain.entities {
            if filled.insert(entity.name.name.as_str()) {
                env.fill_fields(&entity.name.name, &entity.fields);
            }
        }

        for behavior in &domain.behaviors {
            let owner = behavior.name.name.as_str();
            for input in &behavior.inputs {
                env.check_ref(&input.ty, &format!("{owner}.{}", input.name.name));
            }
            if let Some(output) = &behavior.output {
                env.check_ref(output, &format!("{owner}.result"));
            }
        }

        env
    }

    fn flatten_aliases(&mut self, aliases: &IndexMap<String, &TypeRef>) {
        // Chains ending in a generic wait until every plain alias is known
        let mut instances: Vec<(&str, &TypeRef)> = Vec::new();
        for (name, target) in aliases {
            let mut seen = vec![name.as_str()];
            let mut current = *target;
            let resolved = loop {
                if let TypeRef::Generic { .. } = current {
                    instances.push((name.as_str(), current));
                    break Ok(None);
                }
                let target_name = current.name();
                if let Some(desc) = self.descriptors.get(target_name) {
                    break Ok(Some(desc.clone()));
                }
                match aliases.get(target_name) {
                    Some(next) if !seen.contains(&target_name) => {
                        seen.push(target_name);
                        current = *next;
                    }
                    _ => break Err(current),
                }
            };

            match resolved {
                Ok(Some(desc)) => {
                    self.descriptors.insert(name.clone(), desc);
                }
                Ok(None) => {}
                Err(missing) => self.unresolved.push(UnresolvedType {
                    name: missing.name().to_string(),
                    span: missing.span(),
                    owner: name.clone(),
                }),
            }
        }

        // Instances whose arguments name other instance aliases resolve once those are in
        let mut pending = instances;
        loop {
            let (ready, waiting): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|(_, ty)| ty.names().iter().all(|n| self.descriptors.contains_key(*n)));
            pending = waiting;
            if ready.is_empty() {
                break;
            }
            for (name, ty) in ready {
                let info = self.resolve_ref(ty);
                self.descriptors.insert(name.to_string(), TypeDescriptor::Instance(info));
            }
        }

        for (name, ty) in pending {
            self.check_ref(ty, name);
            let info = self.resolve_ref(ty);
            self.descriptors.insert(name.to_string(), TypeDescriptor::Instance(info));
        }
    }

    fn fill_fields(&mut self, owner: &str, fields: &[Field]) {
        let mut resolved = IndexMap::new();
        for field in fields {
            self.check_ref(&field.ty, &format!("{owner}.{}", field.name.name));
            let ty = self.resolve_ref(&field.ty);
            resolved
                .entry(field.name.name.clone())
                .or_insert(FieldType {
                    ty,
                    optional: field.optional,
                });
        }
        if let Some(TypeDescriptor::Entity { name, fields }) = self.descriptors.get_mut(owner) {
            // Aliases of this shape were cloned before fields were known
            if name == owner {
                *fields = resolved;
            }
        }
    }

    fn check_ref(&mut self, ty: &TypeRef, owner: &str) {
        for name in ty.names() {
            if !self.descriptors.contains_key(name) {
                self.unresolved.push(UnresolvedType {
                    name: name.to_string(),
                    span: ty.span(),
                    owner: owner.to_string(),
                });
            }
        }
    }

    /// Look up the descriptor for a type name
    pub fn lookup(&self, name: &str) -> Option<&TypeDescriptor> {
        match self.descriptors.get(name)? {
            // Aliases of entity shapes point at the canonical declaration
            TypeDescriptor::Entity { name: canonical, .. } if canonical != name => {
                self.descriptors.get(canonical.as_str())
            }
            desc => Some(desc),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    /// Resolve a type reference to a value type
    pub fn resolve_ref(&self, ty: &TypeRef) -> TypeInfo {
        match ty {
            TypeRef::Named { name, .. } => self.resolve_name(name),
            TypeRef::Generic { name, args, .. } => match self.lookup(name) {
                Some(TypeDescriptor::GenericConstructor { name, .. }) => TypeInfo::Generic {
                    name: name.clone(),
                    args: args.iter().map(|a| self.resolve_ref(a)).collect(),
                },
                _ => TypeInfo::Unknown,
            },
        }
    }

    /// Resolve a bare type name to a value type
    pub fn resolve_name(&self, name: &str) -> TypeInfo {
        match self.lookup(name) {
            Some(TypeDescriptor::Primitive(p)) => TypeInfo::Primitive(*p),
            Some(TypeDescriptor::Entity { name, .. }) => TypeInfo::Entity { name: name.clone() },
            Some(TypeDescriptor::Enum { name, .. }) => TypeInfo::Enum { name: name.clone() },
            Some(TypeDescriptor::GenericConstructor { name, .. }) => TypeInfo::Generic {
                name: name.clone(),
                args: Vec::new(),
            },
            Some(TypeDescriptor::Instance(ty)) => ty.clone(),
            None => TypeInfo::Unknown,
        }
    }

    /// Get a field of an entity-shaped type
    pub fn field_type(&self, type_name: &str, field: &str) -> Option<&FieldType> {
        match self.lookup(type_name)? {
            TypeDescriptor::Entity { fields, .. } => fields.get(field),
            _ => None,
        }
    }

    /// Get the variants of an enum
    pub fn enum_variants(&self, name: &str) -> Option<&[String]> {
        match self.lookup(name)? {
            TypeDescriptor::Enum { variants, .. } => Some(variants),
            _ => None,
        }
    }

    /// First declared enum that has a variant with this name
    pub fn enum_for_variant(&self, variant: &str) -> Option<&str> {
        self.descriptors.values().find_map(|desc| match desc {
            TypeDescriptor::Enum { name, variants } if variants.iter().any(|v| v == variant) => {
                Some(name.as_str())
            }
            _ => None,
        })
    }

    /// Type names that failed to resolve during construction
    pub fn unresolved(&self) -> &[UnresolvedType] {
        &self.unresolved
    }
}
