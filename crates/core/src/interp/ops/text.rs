//! Text operators.
//!
//! Handles: BT, ET, Tc, Tw, Tz, TL, Tf, Tr, Ts, Td, TD, Tm, T*, and the
//! showing operators Tj, TJ, ', ".
//!
//! Text showing is the numerical core of the pipeline: each shown byte gets
//! a glyph record with its pre-advance text matrix, its advance, and its
//! user-space bounding box. The redactor later drops or splits shows at
//! glyph granularity using exactly these records.

use std::sync::Arc;

use crate::diag::DiagKind;
use crate::font::{DEFAULT_GLYPH_WIDTH, FontMetrics};
use crate::interp::interpreter::PageInterpreter;
use crate::model::ops::{Glyph, TextShow};
use crate::utils::{apply_matrix_rect, matrix_det, mult_matrix, rect_union, translate_matrix};

/// Size assumed when text is shown before any `Tf`.
const FALLBACK_FONT_SIZE: f64 = 12.0;

/// One element of a show sequence: string bytes or a TJ adjustment in
/// thousandths of text space.
pub(crate) enum ShowItem {
    Bytes(Vec<u8>),
    Adjust(f64),
}

#[allow(non_snake_case)]
impl<'a> PageInterpreter<'a> {
    /// BT - Begin text object. Resets Tm and Tlm to identity; font, size
    /// and spacing persist across text objects.
    pub(crate) fn do_BT(&mut self, pos: usize) {
        if self.in_text {
            self.warn(DiagKind::UnbalancedState, pos, "BT inside text object");
        }
        self.in_text = true;
        self.tstate.begin_text();
    }

    /// ET - End text object.
    pub(crate) fn do_ET(&mut self, pos: usize) {
        if !self.in_text {
            self.warn(DiagKind::UnbalancedState, pos, "ET without matching BT");
        }
        self.in_text = false;
    }

    /// Tc - Set character spacing.
    pub(crate) fn do_Tc(&mut self, charspace: f64) {
        self.tstate.char_space = charspace;
    }

    /// Tw - Set word spacing.
    pub(crate) fn do_Tw(&mut self, wordspace: f64) {
        self.tstate.word_space = wordspace;
    }

    /// Tz - Set horizontal scaling percentage.
    pub(crate) fn do_Tz(&mut self, scaling: f64) {
        self.tstate.scaling = scaling;
    }

    /// TL - Set text leading.
    pub(crate) fn do_TL(&mut self, leading: f64) {
        self.tstate.leading = leading;
    }

    /// Tr - Set rendering mode. Valid values 0..7; anything else leaves the
    /// state unchanged.
    pub(crate) fn do_Tr(&mut self, pos: usize, render: i64) {
        if (0..=7).contains(&render) {
            self.tstate.render = render as i32;
        } else {
            self.warn(
                DiagKind::MalformedOperand,
                pos,
                format!("Tr mode {render} out of range"),
            );
        }
    }

    /// Ts - Set text rise.
    pub(crate) fn do_Ts(&mut self, rise: f64) {
        self.tstate.rise = rise;
    }

    /// Tf - Set font resource name and raw size.
    pub(crate) fn do_Tf(&mut self, pos: usize, name: &str, size: f64) {
        self.resolve_font(pos, name);
        self.tstate.font_name = Some(name.to_string());
        self.tstate.font_size = size;
    }

    /// Td - Move to the start of the next line, offset (tx, ty).
    pub(crate) fn do_Td(&mut self, tx: f64, ty: f64) {
        self.tstate.line_matrix = translate_matrix(self.tstate.line_matrix, (tx, ty));
        self.tstate.matrix = self.tstate.line_matrix;
    }

    /// TD - Like Td, but also sets leading to -ty.
    pub(crate) fn do_TD(&mut self, tx: f64, ty: f64) {
        self.tstate.leading = -ty;
        self.do_Td(tx, ty);
    }

    /// Tm - Set text matrix and text line matrix.
    pub(crate) fn do_Tm(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.tstate.matrix = (a, b, c, d, e, f);
        self.tstate.line_matrix = (a, b, c, d, e, f);
    }

    /// T* - Move to the start of the next line using the current leading.
    pub(crate) fn do_T_star(&mut self) {
        self.do_Td(0.0, -self.tstate.leading);
    }

    /// Show a sequence of strings and adjustments, producing glyph records.
    pub(crate) fn do_show(&mut self, pos: usize, items: &[ShowItem]) -> TextShow {
        if !self.in_text {
            self.warn(DiagKind::UnbalancedState, pos, "text show outside BT/ET");
        }

        let size = if self.tstate.font_size != 0.0 {
            self.tstate.font_size
        } else {
            if !self.warned_no_font {
                self.warned_no_font = true;
                self.warn(
                    DiagKind::ResourceNotFound,
                    pos,
                    "text shown with no Tf in effect; assuming 12pt default metrics",
                );
            }
            FALLBACK_FONT_SIZE
        };
        let th = self.tstate.scaling / 100.0;
        let metrics = self.current_metrics();

        let mut glyphs: Vec<Glyph> = Vec::new();
        for (seq_index, item) in items.iter().enumerate() {
            match item {
                ShowItem::Adjust(n) => {
                    // Kerning adjustment in thousandths of text space.
                    let dx = -n / 1000.0 * size * th;
                    self.tstate.matrix = translate_matrix(self.tstate.matrix, (dx, 0.0));
                }
                ShowItem::Bytes(data) => {
                    for (byte_index, &code) in data.iter().enumerate() {
                        let w1000 = metrics
                            .as_ref()
                            .map_or(DEFAULT_GLYPH_WIDTH, |m| m.width(code as u32));
                        let w = w1000 / 1000.0 * size * th;
                        let trm = mult_matrix(self.tstate.matrix, self.gstate.ctm);
                        // Pre-advance bounds of [0, rise]-[w, rise + size].
                        let bbox = apply_matrix_rect(
                            trm,
                            (0.0, self.tstate.rise, w, self.tstate.rise + size),
                        );
                        let ch = metrics
                            .as_ref()
                            .and_then(|m| m.decode(code as u32))
                            .or_else(|| Some(char::from(code)));
                        let advance = w
                            + self.tstate.char_space
                            + if code == b' ' { self.tstate.word_space } else { 0.0 };
                        glyphs.push(Glyph {
                            code,
                            ch,
                            origin_tm: self.tstate.matrix,
                            advance,
                            bbox,
                            seq_index,
                            byte_index,
                        });
                        self.tstate.matrix =
                            translate_matrix(self.tstate.matrix, (advance, 0.0));
                    }
                }
            }
        }

        let bbox = glyphs.iter().map(|g| g.bbox).reduce(rect_union);
        let text: String = glyphs.iter().filter_map(|g| g.ch).collect();
        let trm = mult_matrix(self.tstate.matrix, self.gstate.ctm);
        let effective_size = size * matrix_det(trm).abs().sqrt();

        // Raw byte order can differ from reading order; glyph records are
        // kept sorted by visual x. (seq_index, byte_index) recovers byte
        // order for splits.
        glyphs.sort_by(|a, b| a.bbox.0.total_cmp(&b.bbox.0));

        TextShow {
            text,
            font_name: self.tstate.font_name.clone(),
            raw_size: self.tstate.font_size,
            effective_size,
            render: self.tstate.render,
            glyphs,
            bbox,
        }
    }

    /// Look up a font once per resource name, warning on the first miss.
    pub(crate) fn resolve_font(&mut self, pos: usize, name: &str) {
        if self.font_cache.contains_key(name) {
            return;
        }
        let metrics = self.resolver.lookup_font(name);
        if metrics.is_none() {
            self.warn(
                DiagKind::ResourceNotFound,
                pos,
                format!("font {name} not found in resources; using default metrics"),
            );
        }
        self.font_cache
            .insert(name.to_string(), metrics.map(Arc::new));
    }

    pub(crate) fn current_metrics(&self) -> Option<Arc<FontMetrics>> {
        self.tstate
            .font_name
            .as_ref()
            .and_then(|name| self.font_cache.get(name))
            .and_then(Clone::clone)
    }
}
