use crate::span::Span;
use thiserror::Error;

/// Failures the shaker can surface to its caller.
///
/// Structural errors are recovered locally: the enclosing declaration is left
/// untouched and the pass continues, reporting the span through the
/// diagnostic handler. Internal consistency violations are bugs and abort the
/// whole shake so a mismatched tree is never handed to the code generator.
#[derive(Debug, Error)]
pub enum ShakeError {
    #[error("malformed pattern at {span}: {message}")]
    Structural { span: Span, message: String },

    #[error("internal consistency violation: {0}")]
    InternalConsistency(String),
}
