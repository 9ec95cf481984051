//! Error taxonomy for the redaction pipeline.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, RedactError>;

/// Fatal conditions surfaced at the public interface.
///
/// Recoverable conditions (unknown operators, malformed operand lists, font
/// fallback) never appear here; they accumulate as [`crate::diag::Diagnostic`]
/// records on the output instead.
#[derive(Debug, Error)]
pub enum RedactError {
    /// A token that cannot be resynchronized. Fatal for the current page.
    #[error("malformed token at byte {pos}: {msg}")]
    Token { pos: usize, msg: String },

    /// The content stream ended inside a string, hex string or inline image.
    #[error("unexpected end of content stream")]
    UnexpectedEof,

    /// Save/restore imbalance beyond the recoverable margin.
    #[error("graphics state imbalance at byte {pos}: {msg}")]
    UnbalancedState { pos: usize, msg: String },

    /// Cooperative abort via [`crate::interp::CancelToken`].
    #[error("interpretation cancelled")]
    Cancelled,

    /// A bug in the redactor or writer, not in the input.
    #[error("internal invariant violated: {0}")]
    InvariantViolated(String),
}
