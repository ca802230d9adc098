use serde::{Deserialize, Serialize};

/// Span representing a range in the original spec text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Identifier with span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    #[serde(default)]
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: Span::default(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// Tag carried by the root node of every parsed spec
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainKind {
    #[default]
    Domain,
}

/// Root of the AST - one domain specification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub kind: DomainKind,
    pub name: String,
    pub version: String,
    pub imports: Vec<Import>,
    pub types: Vec<TypeDecl>,
    pub entities: Vec<Entity>,
    pub behaviors: Vec<Behavior>,
    pub invariants: Vec<InvariantBlock>,
    #[serde(default)]
    pub span: Span,
}

impl Domain {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: DomainKind::Domain,
            name: name.into(),
            version: version.into(),
            imports: Vec::new(),
            types: Vec::new(),
            entities: Vec::new(),
            behaviors: Vec::new(),
            invariants: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn with_type(mut self, decl: TypeDecl) -> Self {
        self.types.push(decl);
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behaviors.push(behavior);
        self
    }

    pub fn with_invariants(mut self, block: InvariantBlock) -> Self {
        self.invariants.push(block);
        self
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name.name == name)
    }

    pub fn behavior(&self, name: &str) -> Option<&Behavior> {
        self.behaviors.iter().find(|b| b.name.name == name)
    }
}

/// `use { A, B } from "module"`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Import {
    pub items: Vec<Identifier>,
    pub from: String,
    #[serde(default)]
    pub span: Span,
}

/// Named type declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDecl {
    pub name: Identifier,
    pub definition: TypeDefinition,
    #[serde(default)]
    pub span: Span,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>, definition: TypeDefinition) -> Self {
        Self {
            name: Identifier::new(name),
            definition,
            span: Span::default(),
        }
    }
}

/// Right-hand side of a type declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TypeDefinition {
    Alias { target: TypeRef },
    Enum { variants: Vec<Identifier> },
    Struct { fields: Vec<Field> },
    /// Refinement of a base type, e.g. `Email = String { max_length: 254 }`
    Constrained {
        base: TypeRef,
        #[serde(default)]
        constraints: Vec<TypeConstraint>,
    },
}

/// A single refinement on a constrained type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeConstraint {
    pub name: String,
    pub value: LiteralValue,
}

/// Reference to a type by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TypeRef {
    Named {
        name: String,
        #[serde(default)]
        span: Span,
    },
    /// Generic type like `List<User>` or `Map<String, Int>`
    Generic {
        name: String,
        args: Vec<TypeRef>,
        #[serde(default)]
        span: Span,
    },
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named {
            name: name.into(),
            span: Span::default(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef::Generic {
            name: name.into(),
            args,
            span: Span::default(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeRef::Named { name, .. } | TypeRef::Generic { name, .. } => name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TypeRef::Named { span, .. } | TypeRef::Generic { span, .. } => *span,
        }
    }

    /// Every type name mentioned, outermost first
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeRef::Named { name, .. } => out.push(name),
            TypeRef::Generic { name, args, .. } => {
                out.push(name);
                for arg in args {
                    arg.collect_names(out);
                }
            }
        }
    }
}

/// Field in an entity, struct type, or behavior input list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: Identifier,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub span: Span,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: Identifier::new(name),
            ty,
            optional: false,
            span: Span::default(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Entity definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub name: Identifier,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub span: Span,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Identifier::new(name),
            fields: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.fields.push(Field::new(name, TypeRef::named(ty)));
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.name == name)
    }
}

/// Behavior definition: a named operation with guards and effects
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Behavior {
    pub name: Identifier,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub inputs: Vec<Field>,
    #[serde(default)]
    pub output: Option<TypeRef>,
    #[serde(default)]
    pub preconditions: Vec<Expr>,
    #[serde(default)]
    pub postconditions: Vec<Expr>,
    #[serde(default)]
    pub side_effects: Vec<SideEffect>,
    #[serde(default)]
    pub span: Span,
}

impl Behavior {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Identifier::new(name),
            description: None,
            inputs: Vec::new(),
            output: None,
            preconditions: Vec::new(),
            postconditions: Vec::new(),
            side_effects: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn input(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.inputs.push(Field::new(name, TypeRef::named(ty)));
        self
    }

    pub fn output(mut self, ty: impl Into<String>) -> Self {
        self.output = Some(TypeRef::named(ty));
        self
    }

    pub fn pre(mut self, predicate: Expr) -> Self {
        self.preconditions.push(predicate);
        self
    }

    pub fn post(mut self, predicate: Expr) -> Self {
        self.postconditions.push(predicate);
        self
    }

    pub fn side_effect(mut self, target: impl Into<String>) -> Self {
        self.side_effects.push(SideEffect {
            target: Identifier::new(target),
            description: None,
            span: Span::default(),
        });
        self
    }

    pub fn get_input(&self, name: &str) -> Option<&Field> {
        self.inputs.iter().find(|f| f.name.name == name)
    }

    /// All predicates of this behavior, preconditions first
    pub fn predicates(&self) -> impl Iterator<Item = &Expr> {
        self.preconditions.iter().chain(self.postconditions.iter())
    }
}

/// Declared mutation of an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideEffect {
    pub target: Identifier,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub span: Span,
}

/// Domain-wide invariants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvariantBlock {
    pub name: Identifier,
    pub predicates: Vec<Expr>,
    #[serde(default)]
    pub span: Span,
}

impl InvariantBlock {
    pub fn new(name: impl Into<String>, predicates: Vec<Expr>) -> Self {
        Self {
            name: Identifier::new(name),
            predicates,
            span: Span::default(),
        }
    }
}

/// Predicate expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Expr {
    Literal(LiteralExpr),
    Identifier(Identifier),
    FieldAccess(FieldAccessExpr),
    #[serde(rename = "Result")]
    ResultRef(ResultRef),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Call(CallExpr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(l) => l.span,
            Expr::Identifier(i) => i.span,
            Expr::FieldAccess(f) => f.span,
            Expr::ResultRef(r) => r.span,
            Expr::Binary(b) => b.span,
            Expr::Unary(u) => u.span,
            Expr::Call(c) => c.span,
        }
    }

    /// Pre-order traversal of this expression and all sub-expressions
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::FieldAccess(access) => access.object.walk(f),
            Expr::Binary(binary) => {
                binary.left.walk(f);
                binary.right.walk(f);
            }
            Expr::Unary(unary) => unary.operand.walk(f),
            Expr::Call(call) => {
                call.callee.walk(f);
                for arg in &call.args {
                    arg.walk(f);
                }
            }
            Expr::Literal(_) | Expr::Identifier(_) | Expr::ResultRef(_) => {}
        }
    }

    /// Dotted path for plain references (`x`, `input.amount`, `result.status`)
    pub fn reference_path(&self) -> Option<String> {
        match self {
            Expr::Identifier(ident) => Some(ident.name.clone()),
            Expr::ResultRef(_) => Some("result".to_string()),
            Expr::FieldAccess(access) => access
                .object
                .reference_path()
                .map(|base| format!("{base}.{}", access.field.name)),
            _ => None,
        }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(Identifier::new(name))
    }

    pub fn result() -> Self {
        Expr::ResultRef(ResultRef::default())
    }

    pub fn access(object: Expr, field: impl Into<String>) -> Self {
        Expr::FieldAccess(FieldAccessExpr {
            object: Box::new(object),
            field: Identifier::new(field),
            span: Span::default(),
        })
    }

    /// Build a reference from a dotted path; a leading `result` becomes a result reference
    pub fn path(path: &str) -> Self {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let root = if first == "result" {
            Expr::result()
        } else {
            Expr::ident(first)
        };
        segments.fold(root, |object, field| Expr::access(object, field))
    }

    pub fn literal(value: impl Into<LiteralValue>) -> Self {
        Expr::Literal(LiteralExpr {
            value: value.into(),
            span: Span::default(),
        })
    }

    pub fn null() -> Self {
        Expr::literal(LiteralValue::Null)
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary(BinaryExpr {
            left: Box::new(left),
            op,
            right: Box::new(right),
            span: Span::default(),
        })
    }

    /// `path op literal`
    pub fn compare(path: &str, op: BinaryOp, value: impl Into<LiteralValue>) -> Self {
        Expr::binary(Expr::path(path), op, Expr::literal(value))
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::And, right)
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::Or, right)
    }

    pub fn implies(left: Expr, right: Expr) -> Self {
        Expr::binary(left, BinaryOp::Implies, right)
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Unary(UnaryExpr {
            op: UnaryOp::Not,
            operand: Box::new(operand),
            span: Span::default(),
        })
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call(CallExpr {
            callee: Box::new(callee),
            args,
            span: Span::default(),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        match &mut self {
            Expr::Literal(l) => l.span = span,
            Expr::Identifier(i) => i.span = span,
            Expr::FieldAccess(f) => f.span = span,
            Expr::ResultRef(r) => r.span = span,
            Expr::Binary(b) => b.span = span,
            Expr::Unary(u) => u.span = span,
            Expr::Call(c) => c.span = span,
        }
        self
    }
}

/// Literal expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralExpr {
    pub value: LiteralValue,
    #[serde(default)]
    pub span: Span,
}

/// Literal values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl LiteralValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            LiteralValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            LiteralValue::Null => "null",
            LiteralValue::Bool(_) => "boolean",
            LiteralValue::Number(_) => "number",
            LiteralValue::String(_) => "string",
        }
    }
}

impl std::fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiteralValue::Null => write!(f, "null"),
            LiteralValue::Bool(b) => write!(f, "{b}"),
            LiteralValue::Number(n) => write!(f, "{n}"),
            LiteralValue::String(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<f64> for LiteralValue {
    fn from(value: f64) -> Self {
        LiteralValue::Number(value)
    }
}

impl From<i32> for LiteralValue {
    fn from(value: i32) -> Self {
        LiteralValue::Number(f64::from(value))
    }
}

impl From<bool> for LiteralValue {
    fn from(value: bool) -> Self {
        LiteralValue::Bool(value)
    }
}

impl From<&str> for LiteralValue {
    fn from(value: &str) -> Self {
        LiteralValue::String(value.to_string())
    }
}

impl From<String> for LiteralValue {
    fn from(value: String) -> Self {
        LiteralValue::String(value)
    }
}

/// The `result` reference inside a behavior
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRef {
    #[serde(default)]
    pub span: Span,
}

/// Field access expression (`user.email`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAccessExpr {
    pub object: Box<Expr>,
    pub field: Identifier,
    #[serde(default)]
    pub span: Span,
}

/// Binary expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinaryOp,
    pub right: Box<Expr>,
    #[serde(default)]
    pub span: Span,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Comparison
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = ">=")]
    GtEq,
    // Logical
    #[serde(rename = "and")]
    And,
    #[serde(rename = "or")]
    Or,
    #[serde(rename = "implies")]
    Implies,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Implies => "implies",
        }
    }

    pub fn is_comparison(&self) -> bool {
        !self.is_logical()
    }

    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Implies)
    }

    /// Operator with its operands swapped (`5 < x` is `x > 5`)
    pub fn flipped(&self) -> BinaryOp {
        match self {
            BinaryOp::Lt => BinaryOp::Gt,
            BinaryOp::Gt => BinaryOp::Lt,
            BinaryOp::LtEq => BinaryOp::GtEq,
            BinaryOp::GtEq => BinaryOp::LtEq,
            other => *other,
        }
    }
}

/// Unary expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    #[serde(default)]
    pub span: Span,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "not")]
    Not,
}

/// Call expression (`User.exists(email)`, `old(balance)`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    #[serde(default)]
    pub args: Vec<Expr>,
    #[serde(default)]
    pub span: Span,
}

impl CallExpr {
    /// Final name segment of the callee (`exists` for `User.exists`)
    pub fn callee_name(&self) -> Option<&str> {
        match self.callee.as_ref() {
            Expr::Identifier(ident) => Some(&ident.name),
            Expr::FieldAccess(access) => Some(&access.field.name),
            _ => None,
        }
    }
}
