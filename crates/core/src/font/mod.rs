//! Font capability interface.

pub mod resolver;

pub use resolver::{
    DEFAULT_GLYPH_WIDTH, FontMetrics, FontResolver, MapResolver, NoopResolver, ToUnicodeMap,
};
