//! Rotation-aware coordinate mapping.
//!
//! Callers supply redaction rectangles in display (rotated) space; the
//! content stream works in unrotated user space. The four canonical page
//! rotations map between the two with exact additions and subtractions,
//! never trigonometry, so round trips are bit-exact.

use crate::utils::{Point, Rect, normalize_rect};

/// Page rotation, clockwise, as stored in the page dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Quarter,
    Half,
    ThreeQuarter,
}

impl Rotation {
    /// Rotation from a /Rotate value. Accepts any multiple of 90, including
    /// negatives; anything else is `None`.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Quarter),
            180 => Some(Rotation::Half),
            270 => Some(Rotation::ThreeQuarter),
            _ => Option::None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Quarter => 90,
            Rotation::Half => 180,
            Rotation::ThreeQuarter => 270,
        }
    }
}

/// Map a display-space rectangle into content-stream user space.
///
/// `media_box` is the unrotated page size (width, height) in points. The
/// rectangle is transformed as a whole and comes back normalized.
pub fn visual_to_user(rect: Rect, rotation: Rotation, media_box: (f64, f64)) -> Rect {
    let (w, h) = media_box;
    let (x0, y0, x1, y1) = normalize_rect(rect);
    let rw = x1 - x0;
    let rh = y1 - y0;
    match rotation {
        Rotation::None => (x0, y0, x1, y1),
        Rotation::Quarter => {
            // The rotated display frame is h wide and w high; its y axis
            // flips into the content x axis.
            let nx = w - y0 - rh;
            let ny = x0;
            (nx, ny, nx + rh, ny + rw)
        }
        Rotation::Half => {
            let nx = w - x0 - rw;
            let ny = h - y0 - rh;
            (nx, ny, nx + rw, ny + rh)
        }
        Rotation::ThreeQuarter => {
            let nx = y0;
            let ny = h - x0 - rw;
            (nx, ny, nx + rh, ny + rw)
        }
    }
}

/// Map a user-space rectangle back into display space; exact inverse of
/// [`visual_to_user`].
pub fn user_to_visual(rect: Rect, rotation: Rotation, media_box: (f64, f64)) -> Rect {
    let (w, h) = media_box;
    let (x0, y0, x1, y1) = normalize_rect(rect);
    let rw = x1 - x0;
    let rh = y1 - y0;
    match rotation {
        Rotation::None => (x0, y0, x1, y1),
        Rotation::Quarter => {
            let nx = y0;
            let ny = w - x0 - rw;
            (nx, ny, nx + rh, ny + rw)
        }
        Rotation::Half => {
            let nx = w - x0 - rw;
            let ny = h - y0 - rh;
            (nx, ny, nx + rw, ny + rh)
        }
        Rotation::ThreeQuarter => {
            let nx = h - y0 - rh;
            let ny = x0;
            (nx, ny, nx + rh, ny + rw)
        }
    }
}

/// Map a display-space point into content-stream user space.
pub fn visual_point_to_user(p: Point, rotation: Rotation, media_box: (f64, f64)) -> Point {
    let (w, h) = media_box;
    let (x, y) = p;
    match rotation {
        Rotation::None => (x, y),
        Rotation::Quarter => (w - y, x),
        Rotation::Half => (w - x, h - y),
        Rotation::ThreeQuarter => (y, h - x),
    }
}

/// Map a user-space point back into display space; exact inverse of
/// [`visual_point_to_user`].
pub fn user_point_to_visual(p: Point, rotation: Rotation, media_box: (f64, f64)) -> Point {
    let (w, h) = media_box;
    let (x, y) = p;
    match rotation {
        Rotation::None => (x, y),
        Rotation::Quarter => (y, w - x),
        Rotation::Half => (w - x, h - y),
        Rotation::ThreeQuarter => (h - y, x),
    }
}
