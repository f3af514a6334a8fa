pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod shaker;
pub mod span;
pub mod symbols;

pub use ast::{Ident, NodeId, NodeIdGen, Program, Spanned};
pub use config::ShakeOptions;
pub use diagnostics::{
    CollectingDiagnosticHandler, ConsoleDiagnosticHandler, Diagnostic, DiagnosticHandler,
    DiagnosticLevel,
};
pub use errors::ShakeError;
pub use shaker::classify::{Classification, Classifier, Effect};
pub use shaker::plan::{EliminationDecision, ReportEntry, ShakeReport};
pub use shaker::{ShakeOutput, TreeShaker};
pub use span::Span;
pub use symbols::{Symbol, SymbolId, SymbolKind, SymbolTable, ValueShape};
