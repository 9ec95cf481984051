//! Data model: operations, glyphs, and graphics/text state.

pub mod ops;
pub mod state;

pub use ops::{Glyph, InlineImage, OpKind, Operands, Operation, OperationSeq, TextShow};
pub use state::{ClipHandle, Color, GraphicsState, PaintState, TextState};
