//! expunge - true content-level redaction of PDF pages.
//!
//! The crate removes selected text, graphics and image operations from a
//! page's decoded content stream, so the removed information is physically
//! absent rather than hidden, then re-serializes the page.
//!
//! The pipeline has four stages over one page:
//!
//! 1. [`parser`] - byte-exact tokenizer for content-stream objects
//! 2. [`interp`] - stateful interpreter producing bbox-annotated operations
//! 3. [`redact`] - keep/drop/split filtering against redaction rectangles
//! 4. [`writer`] - deterministic re-serialization to content-stream bytes
//!
//! File-level PDF structure (xref, filters, encryption) stays outside: the
//! core consumes decoded bytes plus a font-metrics capability and produces
//! new bytes plus the set of resource names that lost their last reference.
//!
//! ```no_run
//! use expunge_core::{NoopResolver, RedactConfig, Rotation, interpret, redact, serialize};
//!
//! # fn main() -> expunge_core::Result<()> {
//! let content = b"BT /F1 12 Tf 100 700 Td (Hello) Tj ET";
//! let seq = interpret(content, &NoopResolver, Rotation::None, (612.0, 792.0))?;
//! let (seq, removed) = redact(seq, &[(80.0, 690.0, 200.0, 720.0)], &RedactConfig::default())?;
//! let bytes = serialize(&seq)?;
//! # let _ = (bytes, removed);
//! # Ok(())
//! # }
//! ```

pub mod diag;
pub mod error;
pub mod font;
pub mod interp;
pub mod model;
pub mod parser;
pub mod redact;
pub mod utils;
pub mod writer;

pub use diag::{DiagKind, Diagnostic, Severity};
pub use error::{RedactError, Result};
pub use font::{FontMetrics, FontResolver, MapResolver, NoopResolver, ToUnicodeMap};
pub use interp::{
    CancelToken, PageInterpreter, interpret, interpret_segments, interpret_with_cancel,
};
pub use model::{Glyph, OpKind, Operation, OperationSeq, TextShow};
pub use parser::{ContentLexer, Keyword, Lexeme, Token, find_text_operators};
pub use redact::{
    PartialImagePolicy, RedactConfig, RemovedResources, Rotation, redact, user_point_to_visual,
    user_to_visual, visual_point_to_user, visual_to_user,
};
pub use writer::{format_number, serialize};
