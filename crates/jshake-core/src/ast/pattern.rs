use super::expression::{Expression, PropertyKey};
use super::NodeId;
use crate::span::Span;
use crate::symbols::SymbolId;

#[derive(Debug, Clone)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: Span,
}

impl Pattern {
    pub fn new(kind: PatternKind, span: Span) -> Self {
        Pattern { kind, span }
    }
}

#[derive(Debug, Clone)]
pub enum PatternKind {
    Identifier(BindingIdentifier),
    Object(ObjectPattern),
    Array(ArrayPattern),
}

/// Identifier in binding position. Unlike expression identifiers, a binding
/// always has a symbol: the resolver declared it.
#[derive(Debug, Clone)]
pub struct BindingIdentifier {
    pub name: String,
    pub symbol: SymbolId,
}

#[derive(Debug, Clone)]
pub struct ObjectPattern {
    pub properties: Vec<PatternProperty>,
    /// `...rest` target, binding every key not named by `properties`.
    pub rest: Option<Box<Pattern>>,
    pub span: Span,
}

/// One `key: target = default` entry of an object pattern.
///
/// When the key is computed, its expression must be evaluated exactly once,
/// in source order, even if the target is later eliminated.
#[derive(Debug, Clone)]
pub struct PatternProperty {
    pub id: NodeId,
    pub key: PropertyKey,
    pub value: Box<Pattern>,
    pub default: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ArrayPattern {
    /// `None` entries are holes (`[, x]`).
    pub elements: Vec<Option<ArrayPatternElement>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ArrayPatternElement {
    pub id: NodeId,
    pub pattern: Box<Pattern>,
    pub default: Option<Expression>,
    pub is_rest: bool,
    pub span: Span,
}
