//! Graphics and text state.
//!
//! The graphics state is pushed on `q` and popped on `Q` with value
//! semantics. Clipping and paint parameters are carried opaquely: the
//! operators that set them always pass through to the output unchanged, so
//! the state only has to survive save/restore, not be reasoned about.
//! Text state is not part of the save/restore stack.

use crate::utils::{MATRIX_IDENTITY, Matrix};

/// Opaque handle to a clipping path. 0 means unclipped; each `W`/`W*`
/// consumed by a painter allocates a fresh handle in the interpreter's side
/// arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClipHandle(pub u32);

/// Color value carried through save/restore. The pipeline never interprets
/// it; named entries cover pattern and separation spaces.
#[derive(Debug, Clone, PartialEq)]
pub enum Color {
    Gray(f64),
    Rgb(f64, f64, f64),
    Cmyk(f64, f64, f64, f64),
    Named(String),
}

impl Default for Color {
    fn default() -> Self {
        Color::Gray(0.0)
    }
}

/// Stroke/fill and line parameters, preserved across save/restore.
#[derive(Debug, Clone)]
pub struct PaintState {
    pub line_width: f64,
    pub dash: Option<(Vec<f64>, f64)>,
    pub stroke: Color,
    pub fill: Color,
}

impl Default for PaintState {
    fn default() -> Self {
        Self {
            line_width: 1.0,
            dash: None,
            stroke: Color::Gray(0.0),
            fill: Color::Gray(0.0),
        }
    }
}

/// One entry of the `q`/`Q` stack.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    /// Current transformation matrix.
    pub ctm: Matrix,
    /// Current clipping path (opaque; only saved and restored).
    pub clip: ClipHandle,
    pub paint: PaintState,
}

impl GraphicsState {
    pub fn new() -> Self {
        Self {
            ctm: MATRIX_IDENTITY,
            clip: ClipHandle::default(),
            paint: PaintState::default(),
        }
    }
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self::new()
    }
}

/// Text parameters.
///
/// `BT` resets the text and text-line matrices to identity; font, size and
/// spacing persist across text objects, which is what makes Tf re-injection
/// after a dropped block both necessary and possible.
#[derive(Debug, Clone)]
pub struct TextState {
    /// Text matrix (Tm).
    pub matrix: Matrix,
    /// Text line matrix (Tlm).
    pub line_matrix: Matrix,
    /// Font resource name set by `Tf`.
    pub font_name: Option<String>,
    /// Raw font size set by `Tf` (0 until the first `Tf`).
    pub font_size: f64,
    /// Character spacing (Tc).
    pub char_space: f64,
    /// Word spacing (Tw), applied to byte 32.
    pub word_space: f64,
    /// Horizontal scaling percentage (Tz), 100 = normal.
    pub scaling: f64,
    /// Leading (TL).
    pub leading: f64,
    /// Rendering mode (Tr), 0-7.
    pub render: i32,
    /// Rise (Ts).
    pub rise: f64,
}

impl TextState {
    pub fn new() -> Self {
        Self {
            matrix: MATRIX_IDENTITY,
            line_matrix: MATRIX_IDENTITY,
            font_name: None,
            font_size: 0.0,
            char_space: 0.0,
            word_space: 0.0,
            scaling: 100.0,
            leading: 0.0,
            render: 0,
            rise: 0.0,
        }
    }

    /// Called at `BT`.
    pub fn begin_text(&mut self) {
        self.matrix = MATRIX_IDENTITY;
        self.line_matrix = MATRIX_IDENTITY;
    }
}

impl Default for TextState {
    fn default() -> Self {
        Self::new()
    }
}
