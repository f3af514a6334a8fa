use super::expression::{Expression, Parameter};
use super::{pattern::Pattern, Ident, NodeId};
use crate::span::Span;
use crate::symbols::SymbolId;

#[derive(Debug, Clone)]
pub enum Statement {
    Variable(VariableDeclaration),
    Function(FunctionDeclaration),
    Expression(ExpressionStatement),
    If(IfStatement),
    While(WhileStatement),
    Return(ReturnStatement),
    Block(Block),
    /// Statement kind the analysis does not model; kept untouched.
    Opaque(OpaqueStatement),
}

#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub kind: VariableKind,
    pub declarators: Vec<VariableDeclarator>,
    pub is_exported: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Let,
    Const,
    Var,
}

#[derive(Debug, Clone)]
pub struct VariableDeclarator {
    pub id: NodeId,
    pub pattern: Pattern,
    pub initializer: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub id: NodeId,
    pub name: Ident,
    pub symbol: SymbolId,
    pub parameters: Vec<Parameter>,
    pub body: Block,
    pub is_exported: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExpressionStatement {
    pub id: NodeId,
    pub expression: Expression,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_block: Block,
    pub else_block: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ReturnStatement {
    pub value: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct OpaqueStatement {
    pub kind: String,
    pub span: Span,
}
