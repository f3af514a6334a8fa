use super::{pattern::Pattern, statement::Block, Ident, NodeId};
use crate::span::Span;
use crate::symbols::SymbolId;

#[derive(Debug, Clone)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: Span) -> Self {
        Expression { kind, span }
    }
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Identifier(Identifier),
    Literal(Literal),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Unary(UnaryOp, Box<Expression>),
    Assignment(AssignmentOp, Box<Expression>, Box<Expression>),
    Member(MemberExpression),
    Call(Box<Expression>, Vec<Argument>),
    New(Box<Expression>, Vec<Argument>),
    Object(ObjectExpression),
    Array(Vec<ArrayElement>),
    Function(FunctionExpression),
    Arrow(ArrowFunction),
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
    Sequence(Vec<Expression>),
    Parenthesized(Box<Expression>),
    /// Any node kind the analysis does not model. Always treated as
    /// effectful with unknown shape.
    Opaque(String),
}

/// Identifier in expression position. `symbol` is `None` when the resolver
/// could not tie the name to a declaration in this unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub symbol: Option<SymbolId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Exponent,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LogicalAnd,
    LogicalOr,
    NullishCoalesce,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
    ShiftRightUnsigned,
    In,
    Instanceof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    BitwiseNot,
    TypeOf,
    Void,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOp {
    Assign,           // =
    AddAssign,        // +=
    SubtractAssign,   // -=
    MultiplyAssign,   // *=
    DivideAssign,     // /=
    RemainderAssign,  // %=
    ExponentAssign,   // **=
    LogicalAndAssign, // &&=
    LogicalOrAssign,  // ||=
    NullishAssign,    // ??=
}

impl AssignmentOp {
    /// Compound operators read the target before writing it.
    pub fn reads_target(self) -> bool {
        self != AssignmentOp::Assign
    }
}

/// Key of an object member, a member access, or a pattern property.
/// Numeric and string literal keys are normalized to their string form by
/// the parser, so `Static` covers `a`, `"a"`, and `1` alike.
#[derive(Debug, Clone)]
pub enum PropertyKey {
    Static(Ident),
    Computed(Box<Expression>),
}

impl PropertyKey {
    pub fn as_static(&self) -> Option<&str> {
        match self {
            PropertyKey::Static(ident) => Some(&ident.node),
            PropertyKey::Computed(_) => None,
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, PropertyKey::Computed(_))
    }

    pub fn span(&self) -> Span {
        match self {
            PropertyKey::Static(ident) => ident.span,
            PropertyKey::Computed(expr) => expr.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemberExpression {
    pub object: Box<Expression>,
    pub property: PropertyKey,
}

#[derive(Debug, Clone)]
pub struct Argument {
    pub value: Expression,
    pub is_spread: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ArrayElement {
    Expression(Expression),
    Spread(Expression),
    Hole,
}

#[derive(Debug, Clone)]
pub struct ObjectExpression {
    pub id: NodeId,
    pub members: Vec<ObjectMember>,
    pub span: Span,
}

/// One member of an object literal.
///
/// Defining a `Getter`/`Setter` does not invoke it; accessors only run on a
/// later read/write of their key. A later member with the same key replaces
/// the earlier definition for subsequent reads (accessor pairs of one key
/// merge instead of replacing each other).
#[derive(Debug, Clone)]
pub enum ObjectMember {
    Data {
        id: NodeId,
        key: PropertyKey,
        value: Expression,
        span: Span,
    },
    /// `{ a }`, a data member whose value is the binding `a`.
    Shorthand {
        id: NodeId,
        name: Identifier,
        span: Span,
    },
    Getter {
        id: NodeId,
        key: PropertyKey,
        body: Block,
        span: Span,
    },
    Setter {
        id: NodeId,
        key: PropertyKey,
        param: Ident,
        body: Block,
        span: Span,
    },
    Spread {
        id: NodeId,
        value: Expression,
        span: Span,
    },
}

impl ObjectMember {
    pub fn id(&self) -> NodeId {
        match self {
            ObjectMember::Data { id, .. }
            | ObjectMember::Shorthand { id, .. }
            | ObjectMember::Getter { id, .. }
            | ObjectMember::Setter { id, .. }
            | ObjectMember::Spread { id, .. } => *id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ObjectMember::Data { span, .. }
            | ObjectMember::Shorthand { span, .. }
            | ObjectMember::Getter { span, .. }
            | ObjectMember::Setter { span, .. }
            | ObjectMember::Spread { span, .. } => *span,
        }
    }

    /// Statically known key string, if this member has one.
    pub fn static_key(&self) -> Option<&str> {
        match self {
            ObjectMember::Data { key, .. }
            | ObjectMember::Getter { key, .. }
            | ObjectMember::Setter { key, .. } => key.as_static(),
            ObjectMember::Shorthand { name, .. } => Some(&name.name),
            ObjectMember::Spread { .. } => None,
        }
    }

    pub fn is_accessor(&self) -> bool {
        matches!(
            self,
            ObjectMember::Getter { .. } | ObjectMember::Setter { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub pattern: Pattern,
    pub default: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionExpression {
    pub name: Option<Ident>,
    pub parameters: Vec<Parameter>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ArrowFunction {
    pub parameters: Vec<Parameter>,
    pub body: ArrowBody,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ArrowBody {
    Expression(Box<Expression>),
    Block(Block),
}
