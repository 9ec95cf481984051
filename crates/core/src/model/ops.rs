//! The annotated operation model produced by the interpreter.
//!
//! Every operation keeps its original keyword and operand tokens so the
//! writer can reproduce it byte-faithfully; the `kind` carries whatever the
//! redactor needs to decide keep/drop/split.

use smallvec::SmallVec;

use crate::diag::Diagnostic;
use crate::parser::lexer::{Keyword, Token};
use crate::redact::rotate::Rotation;
use crate::utils::{Matrix, Rect};

/// Operand list; almost every operator has at most six.
pub type Operands = SmallVec<[Token; 6]>;

/// One placed glyph of a text-showing operation.
#[derive(Debug, Clone)]
pub struct Glyph {
    /// Character code (byte-level font model).
    pub code: u8,
    /// Decoded character, when the font resolver could map it.
    pub ch: Option<char>,
    /// Text matrix at placement, before the advance. A glyph-split rewrite
    /// emits this verbatim as an explicit `Tm`.
    pub origin_tm: Matrix,
    /// Advance applied after placement, in text space.
    pub advance: f64,
    /// Axis-aligned bounds in user space.
    pub bbox: Rect,
    /// Index of the show-string this byte came from (TJ array element; 0
    /// for `Tj`, `'`, `"`).
    pub seq_index: usize,
    /// Byte offset within that string.
    pub byte_index: usize,
}

/// Derived data of a text-showing operation.
#[derive(Debug, Clone)]
pub struct TextShow {
    /// Decoded text in original byte order.
    pub text: String,
    /// Font resource name in effect, if any `Tf` was seen.
    pub font_name: Option<String>,
    /// Raw `Tf` size in effect (0 when no `Tf` was seen).
    pub raw_size: f64,
    /// `raw_size` scaled by the geometric mean of `Tm * CTM`.
    pub effective_size: f64,
    /// Rendering mode; invisible text (3) is still present for redaction.
    pub render: i32,
    /// Glyph records, ordered by visual x position.
    pub glyphs: Vec<Glyph>,
    /// Union of the glyph boxes; `None` for an empty show.
    pub bbox: Option<Rect>,
}

/// Parsed inline image (`BI ... ID ... EI`).
#[derive(Debug, Clone)]
pub struct InlineImage {
    /// Parameter dictionary in source order, unexpanded.
    pub params: Vec<(String, Token)>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub bits_per_component: Option<i64>,
    pub color_space: Option<String>,
    pub filter: Option<String>,
    /// Raw payload bytes, verbatim.
    pub payload: Vec<u8>,
    /// CTM at the image, for overlay placement.
    pub ctm: Matrix,
    /// Unit square under the CTM.
    pub bbox: Rect,
}

/// Kind-specific payload of an operation.
#[derive(Debug, Clone)]
pub enum OpKind {
    /// Opaque pass-through: graphics state, color, line, path construction,
    /// clipping, shading, compatibility and unknown operators.
    State,
    /// `BT`.
    TextBegin,
    /// `ET`.
    TextEnd,
    /// Text state and positioning (`Tf`, `Tm`, `Td`, `TD`, `T*`, `TL`,
    /// `Tc`, `Tw`, `Tz`, `Tr`, `Ts`).
    TextState,
    /// `Tj`, `TJ`, `'`, `"`.
    TextShow(TextShow),
    /// `S`, `s`, `f`, `F`, `f*`, `B`, `B*`, `b`, `b*`, `n`; bbox is the
    /// accumulated path in user space, `None` for an empty path.
    PathPaint { bbox: Option<Rect> },
    /// `Do`.
    XObject { name: String, ctm: Matrix, bbox: Rect },
    /// `BI ... ID ... EI`.
    InlineImage(InlineImage),
    /// `MP`, `DP`, `BMC`, `BDC`, `EMC`.
    MarkedContent,
}

/// One content-stream operation with its derived data.
#[derive(Debug, Clone)]
pub struct Operation {
    pub keyword: Keyword,
    /// Operands exactly as written, for byte-faithful re-serialization.
    pub operands: Operands,
    /// Byte position of the operator keyword in the stream.
    pub pos: usize,
    pub kind: OpKind,
}

impl Operation {
    /// Painted bounds in user space, for kinds that have any.
    pub fn bbox(&self) -> Option<Rect> {
        match &self.kind {
            OpKind::TextShow(ts) => ts.bbox,
            OpKind::PathPaint { bbox } => *bbox,
            OpKind::XObject { bbox, .. } => Some(*bbox),
            OpKind::InlineImage(img) => Some(img.bbox),
            _ => None,
        }
    }
}

/// The interpreter's output: the operation sequence with accumulated
/// diagnostics and the page geometry it was interpreted under.
#[derive(Debug, Clone)]
pub struct OperationSeq {
    pub ops: Vec<Operation>,
    pub diagnostics: Vec<Diagnostic>,
    /// Page media box as (width, height) in points.
    pub media_box: (f64, f64),
    pub rotation: Rotation,
}

impl OperationSeq {
    /// All text-showing operations, in stream order.
    pub fn text_shows(&self) -> impl Iterator<Item = (&Operation, &TextShow)> {
        self.ops.iter().filter_map(|op| match &op.kind {
            OpKind::TextShow(ts) => Some((op, ts)),
            _ => None,
        })
    }
}
