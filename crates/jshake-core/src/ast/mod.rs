pub mod expression;
pub mod pattern;
pub mod statement;

use crate::span::Span;
use serde::Serialize;

/// Wrapper for AST nodes with span information
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Spanned { node, span }
    }
}

/// Identifier
pub type Ident = Spanned<String>;

/// Dense integer id on every node an elimination decision can target
/// (declarators, pattern properties, object members, object literals,
/// expression statements). Plans and reports are keyed by `NodeId`; the tree
/// itself carries no parent links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Allocator for [`NodeId`]s. The producer of the AST (the external parser,
/// or test builders) numbers nodes with one of these; the rewriter resumes
/// from [`Program::next_node_id`] when it synthesizes statements.
#[derive(Debug, Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(next: u32) -> Self {
        Self { next }
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    pub fn watermark(&self) -> u32 {
        self.next
    }
}

/// Top-level program for one compilation unit.
#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Vec<statement::Statement>,
    pub span: Span,
    /// One past the highest `NodeId` allocated by the producer. Lets the
    /// rewriter mint fresh ids without colliding with existing ones.
    pub next_node_id: u32,
}

impl Program {
    pub fn new(statements: Vec<statement::Statement>, span: Span, ids: &NodeIdGen) -> Self {
        Program {
            statements,
            span,
            next_node_id: ids.watermark(),
        }
    }
}
