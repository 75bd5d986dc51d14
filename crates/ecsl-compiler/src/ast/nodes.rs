use ecsl_common::Span;

// ============================================================================
// Program (top-level)
// ============================================================================

/// A complete ecsl program: aggregates and functions in source order.
#[derive(Debug, Clone)]
pub struct Program {
    pub items: Vec<Item>,
    pub span: Span,
}

/// A top-level declaration.
#[derive(Debug, Clone)]
pub enum Item {
    Struct(AggregateDecl),
    Component(AggregateDecl),
    Function(FunctionDecl),
}

/// A name together with where it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// `struct NAME { … };` or `component NAME { … };`
///
/// `component_id` is `Some` exactly for components; ids are dense and follow
/// first-seen declaration order.
#[derive(Debug, Clone)]
pub struct AggregateDecl {
    pub name: Ident,
    pub component_id: Option<usize>,
    pub members: Vec<MemberDecl>,
    pub span: Span,
}

/// `TYPE NAME;` inside an aggregate body.
#[derive(Debug, Clone)]
pub struct MemberDecl {
    pub type_name: Ident,
    pub name: Ident,
}

// ============================================================================
// Functions and statements
// ============================================================================

/// `~RET NAME();` (forward declaration, `body == None`) or `~RET NAME() { … }`.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub return_type: Ident,
    pub name: Ident,
    pub body: Option<Block>,
    pub span: Span,
}

impl FunctionDecl {
    pub fn is_forward(&self) -> bool {
        self.body.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `ent NAME;`
    CreateEntity(Ident),
    /// `NAME.add<C1, C2>();`
    AddComponents {
        binding: Ident,
        components: Vec<Ident>,
    },
    /// `NAME.destroy();`
    DestroyEntity(Ident),
    /// `foreach NAME C1 C2 { … }`
    Foreach(ForeachStmt),
}

/// Iteration over live entities. An empty filter visits every live entity.
#[derive(Debug, Clone)]
pub struct ForeachStmt {
    pub iterator: Ident,
    pub filter: Vec<Ident>,
    pub body: Block,
}

// ============================================================================
// Queries
// ============================================================================

impl Program {
    pub fn aggregates(&self) -> impl Iterator<Item = &AggregateDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Struct(decl) | Item::Component(decl) => Some(decl),
            Item::Function(_) => None,
        })
    }

    /// Components in id order.
    pub fn components(&self) -> impl Iterator<Item = &AggregateDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Component(decl) => Some(decl),
            _ => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(decl) => Some(decl),
            _ => None,
        })
    }

    pub fn component_count(&self) -> usize {
        self.components().count()
    }

    pub fn aggregate(&self, name: &str) -> Option<&AggregateDecl> {
        self.aggregates().find(|decl| decl.name.name == name)
    }

    pub fn component(&self, name: &str) -> Option<&AggregateDecl> {
        self.components().find(|decl| decl.name.name == name)
    }
}

impl Block {
    /// Visit every statement in this block and all nested foreach bodies, pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Stmt)) {
        for stmt in &self.stmts {
            visit(stmt);
            if let Stmt::Foreach(foreach) = stmt {
                foreach.body.walk(visit);
            }
        }
    }
}
