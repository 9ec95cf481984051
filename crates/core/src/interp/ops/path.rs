//! Path construction and painting operators.
//!
//! Handles: m, l, c, v, y, h, re, and the painters S, s, f, F, f*, B, B*,
//! b, b*, n. Only the accumulated bounding box matters for redaction, so
//! segments are folded straight into a bbox; Bezier control points are
//! included, which keeps the box conservative.

use crate::interp::interpreter::PageInterpreter;
use crate::model::state::ClipHandle;
use crate::utils::{Rect, apply_matrix_rect};

impl<'a> PageInterpreter<'a> {
    /// m - Begin a new subpath.
    pub(crate) fn do_m(&mut self, x: f64, y: f64) {
        self.path.add_point((x, y));
        self.path.current = Some((x, y));
        self.path.subpath_start = Some((x, y));
    }

    /// l - Straight line segment.
    pub(crate) fn do_l(&mut self, x: f64, y: f64) {
        self.path.add_point((x, y));
        self.path.current = Some((x, y));
    }

    /// c - Cubic Bezier with two control points.
    pub(crate) fn do_c(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        self.path.add_point((x1, y1));
        self.path.add_point((x2, y2));
        self.path.add_point((x3, y3));
        self.path.current = Some((x3, y3));
    }

    /// v - Bezier using the current point as first control point.
    pub(crate) fn do_v(&mut self, x2: f64, y2: f64, x3: f64, y3: f64) {
        if let Some(current) = self.path.current {
            self.path.add_point(current);
        }
        self.path.add_point((x2, y2));
        self.path.add_point((x3, y3));
        self.path.current = Some((x3, y3));
    }

    /// y - Bezier with the endpoint replicated as second control point.
    pub(crate) fn do_y(&mut self, x1: f64, y1: f64, x3: f64, y3: f64) {
        self.path.add_point((x1, y1));
        self.path.add_point((x3, y3));
        self.path.current = Some((x3, y3));
    }

    /// h - Close subpath.
    pub(crate) fn do_h(&mut self) {
        if let Some(start) = self.path.subpath_start {
            self.path.current = Some(start);
        }
    }

    /// re - Rectangle shorthand.
    pub(crate) fn do_re(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.path.add_point((x, y));
        self.path.add_point((x + w, y + h));
        self.path.current = Some((x, y));
        self.path.subpath_start = Some((x, y));
    }

    /// Consume the accumulated path for a painting operator, returning its
    /// bbox in user space. A pending `W`/`W*` becomes the new clipping path
    /// here, since clipping takes effect at the next painter.
    pub(crate) fn paint_path(&mut self) -> Option<Rect> {
        let bbox = self
            .path
            .bbox
            .map(|r| apply_matrix_rect(self.gstate.ctm, r));
        if self.pending_clip {
            self.clip_count += 1;
            self.gstate.clip = ClipHandle(self.clip_count);
            self.pending_clip = false;
        }
        self.path.clear();
        bbox
    }
}
