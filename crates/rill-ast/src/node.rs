//! AST node definitions.
//!
//! Nodes carry their source span and reference other nodes by id. Every
//! list that is almost always short (type arguments, attribute arguments)
//! uses `SmallVec` so a typical node allocates nothing beyond its arena
//! slot.

use crate::ids::{ExprId, StmtId, TypeExprId};
use rill_common::{Atom, Span};
use smallvec::SmallVec;

// =============================================================================
// Items
// =============================================================================

/// A top-level declaration.
#[derive(Clone, Debug)]
pub struct Item {
    pub kind: ItemKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ItemKind {
    Struct(StructDecl),
    Alias(AliasDecl),
    Union(UnionDecl),
    Tag(TagDecl),
    Contract(ContractDecl),
    Function(FunctionDecl),
    Const(ConstDecl),
    Extern(ExternBlock),
    Import(ImportDecl),
}

/// `type Name<T, U> = { field: T, ... }`
#[derive(Clone, Debug)]
pub struct StructDecl {
    pub name: Atom,
    pub type_params: Vec<TypeParam>,
    pub fields: Vec<FieldDef>,
    pub attrs: AttrList,
}

/// `alias Name<T> = Target`
#[derive(Clone, Debug)]
pub struct AliasDecl {
    pub name: Atom,
    pub type_params: Vec<TypeParam>,
    pub target: TypeExprId,
}

/// `union Name<T> = Tag(T) | OtherType | nothing`
#[derive(Clone, Debug)]
pub struct UnionDecl {
    pub name: Atom,
    pub type_params: Vec<TypeParam>,
    pub members: Vec<UnionMember>,
}

#[derive(Clone, Debug)]
pub enum UnionMember {
    /// A plain type member.
    Type(TypeExprId),
    /// A tag member with payload types, e.g. `Some(T)`.
    Tag {
        name: Atom,
        args: SmallVec<[TypeExprId; 2]>,
        span: Span,
    },
    /// The `nothing` member.
    Nothing(Span),
}

/// `tag Name(T, U)` - a named constructor usable inside unions.
#[derive(Clone, Debug)]
pub struct TagDecl {
    pub name: Atom,
    /// Number of payload positions the tag accepts.
    pub arity: u32,
}

/// `contract Name<T> { field n: int; fn m(x: T) -> T; }`
#[derive(Clone, Debug)]
pub struct ContractDecl {
    pub name: Atom,
    pub type_params: Vec<TypeParam>,
    pub items: Vec<ContractItem>,
}

#[derive(Clone, Debug)]
pub enum ContractItem {
    Field {
        name: Atom,
        ty: TypeExprId,
        attrs: AttrList,
        span: Span,
    },
    Method {
        name: Atom,
        params: Vec<TypeExprId>,
        result: Option<TypeExprId>,
        attrs: AttrList,
        is_public: bool,
        is_async: bool,
        /// Contract methods are requirements; a body is an error.
        has_body: bool,
        span: Span,
    },
}

/// `fn name<T: Bound>(a: int, b: string = "x") -> T? { ... }`
#[derive(Clone, Debug)]
pub struct FunctionDecl {
    pub name: Atom,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    /// Trailing `...` parameter pack.
    pub variadic: bool,
    pub result: Option<TypeExprId>,
    /// Body block statement. `None` for extern declarations.
    pub body: Option<StmtId>,
    pub is_async: bool,
    pub is_public: bool,
    pub entry: Option<EntryMode>,
}

/// How an entrypoint receives its arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryMode {
    None,
    Argv,
    Stdin,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: Atom,
    pub ty: TypeExprId,
    pub default: Option<ExprId>,
    pub span: Span,
}

/// `const NAME: type = expr`
#[derive(Clone, Debug)]
pub struct ConstDecl {
    pub name: Atom,
    pub ty: Option<TypeExprId>,
    pub value: ExprId,
}

/// `extern Type { field f: int; }` - foreign fields attached to a type.
#[derive(Clone, Debug)]
pub struct ExternBlock {
    pub target: TypeExprId,
    pub fields: Vec<FieldDef>,
}

/// `import path::to::module as alias`
#[derive(Clone, Debug)]
pub struct ImportDecl {
    pub path: Vec<Atom>,
    pub alias: Option<Atom>,
}

/// A struct or extern field.
#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: Atom,
    pub ty: TypeExprId,
    pub attrs: AttrList,
    pub span: Span,
}

/// A declared type parameter with its bounds.
#[derive(Clone, Debug)]
pub struct TypeParam {
    pub name: Atom,
    pub bounds: Vec<BoundExpr>,
    /// `const N` parameters accept `Const<_>` arguments only.
    pub is_const: bool,
    pub span: Span,
}

/// A contract bound as written: `Contract<Args>`.
#[derive(Clone, Debug)]
pub struct BoundExpr {
    /// Possibly module-qualified contract path.
    pub path: Vec<Atom>,
    pub args: SmallVec<[TypeExprId; 2]>,
    pub span: Span,
}

// =============================================================================
// Attributes
// =============================================================================

/// `@readonly`, `@align(8)`, `@guarded_by("lock")`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attr {
    pub name: Atom,
    pub args: SmallVec<[AttrArg; 1]>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttrArg {
    Str(Atom),
    Int(i64),
}

pub type AttrList = SmallVec<[Attr; 1]>;

// =============================================================================
// Statements
// =============================================================================

#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    /// `let name: ty = value` / `let mut name = value`
    Let {
        name: Atom,
        mutable: bool,
        ty: Option<TypeExprId>,
        value: Option<ExprId>,
    },
    /// `target = value`
    Assign { target: ExprId, value: ExprId },
    /// A bare expression statement.
    Expr(ExprId),
    /// `return expr`
    Return { value: Option<ExprId> },
    /// `if cond { .. } else { .. }`
    If {
        cond: ExprId,
        then_block: StmtId,
        else_block: Option<StmtId>,
    },
    /// `while cond { .. }`
    While { cond: ExprId, body: StmtId },
    /// `for name in iterable { .. }`
    For {
        binding: Atom,
        iterable: ExprId,
        body: StmtId,
    },
    /// `{ .. }` - owns a scope.
    Block { stmts: Vec<StmtId> },
    /// `drop expr` - explicit early destruction.
    Drop { expr: ExprId },
    Break,
    Continue,
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Literal(Literal),
    /// A name reference.
    Ident(Atom),
    /// `base.name` - struct field, module member, or method callee.
    Field { base: ExprId, name: Atom },
    /// `base[index]`
    Index { base: ExprId, index: ExprId },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// `&expr` / `&mut expr`
    Borrow { mutable: bool, operand: ExprId },
    /// `callee(args...)` with optional explicit type arguments.
    Call {
        callee: ExprId,
        type_args: SmallVec<[TypeExprId; 2]>,
        args: Vec<CallArg>,
    },
    /// `(a, b, c)`
    Tuple(Vec<ExprId>),
    /// `[a, b, c]`
    Array(Vec<ExprId>),
    /// `Name{ field: value, ... }` with optional type arguments.
    StructLit {
        path: Vec<Atom>,
        type_args: SmallVec<[TypeExprId; 2]>,
        fields: Vec<StructLitField>,
    },
    /// `expr to Type`
    Cast { operand: ExprId, ty: TypeExprId },
    /// `expr.await()`
    Await { operand: ExprId },
    /// `spawn call(...)`
    Spawn { call: ExprId },
    /// `async { ... }` - value is the block's collected return payload.
    AsyncBlock { body: StmtId },
    /// `(expr)`
    Paren(ExprId),
}

#[derive(Clone, Debug)]
pub struct CallArg {
    /// Present for named arguments: `f(count: 3)`.
    pub name: Option<Atom>,
    pub value: ExprId,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct StructLitField {
    pub name: Atom,
    pub value: ExprId,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Literal {
    /// Integer literals are pre-parsed by the literal parser; out-of-range
    /// source text never reaches the AST.
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(Atom),
    Bool(bool),
    Nothing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    Deref,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    /// The magic method this operator dispatches through.
    pub const fn magic_name(self) -> &'static str {
        match self {
            BinaryOp::Add => "__add",
            BinaryOp::Sub => "__sub",
            BinaryOp::Mul => "__mul",
            BinaryOp::Div => "__div",
            BinaryOp::Mod => "__mod",
            BinaryOp::Eq => "__eq",
            BinaryOp::Ne => "__ne",
            BinaryOp::Lt => "__lt",
            BinaryOp::Le => "__le",
            BinaryOp::Gt => "__gt",
            BinaryOp::Ge => "__ge",
            BinaryOp::And => "__and",
            BinaryOp::Or => "__or",
            BinaryOp::BitAnd => "__band",
            BinaryOp::BitOr => "__bor",
            BinaryOp::BitXor => "__bxor",
            BinaryOp::Shl => "__shl",
            BinaryOp::Shr => "__shr",
        }
    }

    /// Comparison operators always yield `bool`.
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

impl UnaryOp {
    pub const fn magic_name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "__neg",
            UnaryOp::Plus => "__pos",
            UnaryOp::Not => "__not",
            UnaryOp::Deref => "__deref",
        }
    }
}

// =============================================================================
// Type expressions
// =============================================================================

#[derive(Clone, Debug)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum TypeExprKind {
    /// `Name` or `a::b::Name`, with optional generic arguments.
    Path {
        segments: Vec<Atom>,
        args: SmallVec<[TypeExprId; 2]>,
    },
    /// `&T` / `&mut T`
    Reference { mutable: bool, inner: TypeExprId },
    /// `own T`
    Own { inner: TypeExprId },
    /// `*T`
    Pointer { inner: TypeExprId },
    /// `T[]` (dynamic) or `T[N]` (fixed, `N` a const expression).
    Array {
        elem: TypeExprId,
        len: Option<ExprId>,
    },
    /// `T?` - sugar for `Option<T>`.
    Optional { inner: TypeExprId },
    /// `T!E` - sugar for `Result<T, E>`; `E` defaults to `Error`.
    Errorable {
        ok: TypeExprId,
        err: Option<TypeExprId>,
    },
    /// `(T, U)`
    Tuple(Vec<TypeExprId>),
    /// `fn(T, U) -> R`
    Fn {
        params: Vec<TypeExprId>,
        result: Option<TypeExprId>,
    },
    /// A bare integer used in type position, e.g. the `3` in `Buf<3>`.
    ConstInt(u32),
}
