//! Symbol table handed in by the external parser/resolver.
//!
//! The shaker never resolves names itself; it only asks two questions about a
//! symbol: where was it declared, and is its declared value opaque (a
//! parameter or an unresolved external reference, whose shape can never be
//! known statically).

use crate::span::Span;
use serde::Serialize;

/// Index into a [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SymbolKind {
    Let,
    Const,
    Var,
    Function,
    Parameter,
    /// Reference the resolver could not tie to a declaration in this unit.
    External,
}

/// Static shape knowledge about a value: either a structure the analysis can
/// see through (an object literal with known keys), or an opaque runtime
/// value on which every property access may run arbitrary code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueShape {
    Known,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub span: Span,
    pub is_exported: bool,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            span,
            is_exported: false,
        }
    }

    pub fn exported(mut self) -> Self {
        self.is_exported = true;
        self
    }

    /// True when the value behind this symbol can never have a known shape:
    /// parameters and unresolved externals arrive from outside the unit.
    pub fn is_opaque_value(&self) -> bool {
        matches!(self.kind, SymbolKind::Parameter | SymbolKind::External)
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }
}
