//! Geometry routines shared across the pipeline.
//!
//! Provides the point, rectangle and affine matrix types used by the
//! interpreter and redactor, plus the transform helpers. Matrices follow the
//! PDF convention: a point (x, y) maps to (ax + cy + e, bx + dy + f).

/// A 2D point (x, y).
pub type Point = (f64, f64);

/// A rectangle (x0, y0, x1, y1) with (x0, y0) bottom-left and (x1, y1)
/// top-right once normalized.
pub type Rect = (f64, f64, f64, f64);

/// A 6-element affine transformation matrix (a, b, c, d, e, f).
pub type Matrix = (f64, f64, f64, f64, f64, f64);

/// Identity transformation matrix.
pub const MATRIX_IDENTITY: Matrix = (1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

/// Multiplies two matrices: the result applies `m1` first, then `m0`.
pub fn mult_matrix(m1: Matrix, m0: Matrix) -> Matrix {
    let (a1, b1, c1, d1, e1, f1) = m1;
    let (a0, b0, c0, d0, e0, f0) = m0;
    (
        a0 * a1 + c0 * b1,
        b0 * a1 + d0 * b1,
        a0 * c1 + c0 * d1,
        b0 * c1 + d0 * d1,
        a0 * e1 + c0 * f1 + e0,
        b0 * e1 + d0 * f1 + f0,
    )
}

/// Translates a matrix by (x, y) inside the projection.
///
/// The matrix is changed so that its origin is at the specified point in its
/// own coordinate system, which is different from translating it within the
/// outer coordinate system.
pub fn translate_matrix(m: Matrix, v: Point) -> Matrix {
    let (a, b, c, d, e, f) = m;
    let (x, y) = v;
    (a, b, c, d, x * a + y * c + e, x * b + y * d + f)
}

/// Builds a pure translation matrix.
pub fn translation(x: f64, y: f64) -> Matrix {
    (1.0, 0.0, 0.0, 1.0, x, y)
}

/// Builds a pure scaling matrix.
pub fn scaling(sx: f64, sy: f64) -> Matrix {
    (sx, 0.0, 0.0, sy, 0.0, 0.0)
}

/// Determinant of the linear part of a matrix.
pub fn matrix_det(m: Matrix) -> f64 {
    m.0 * m.3 - m.1 * m.2
}

/// Inverts an affine matrix. Returns `None` for a singular matrix.
pub fn invert_matrix(m: Matrix) -> Option<Matrix> {
    let (a, b, c, d, e, f) = m;
    let det = a * d - b * c;
    if det.abs() < 1e-12 {
        return None;
    }
    let ia = d / det;
    let ib = -b / det;
    let ic = -c / det;
    let id = a / det;
    let ie = -(e * ia + f * ic);
    let inv_f = -(e * ib + f * id);
    Some((ia, ib, ic, id, ie, inv_f))
}

/// Applies a matrix to a point.
pub fn apply_matrix_pt(m: Matrix, v: Point) -> Point {
    let (a, b, c, d, e, f) = m;
    let (x, y) = v;
    (a * x + c * y + e, b * x + d * y + f)
}

/// Applies a matrix to a vector, ignoring translation.
pub fn apply_matrix_norm(m: Matrix, v: Point) -> Point {
    let (a, b, c, d, _e, _f) = m;
    let (p, q) = v;
    (a * p + c * q, b * p + d * q)
}

/// Applies a matrix to a rectangle.
///
/// The result is not a rotated rectangle but the axis-aligned rectangle that
/// tightly fits the transformed corners.
pub fn apply_matrix_rect(m: Matrix, rect: Rect) -> Rect {
    let (x0, y0, x1, y1) = rect;
    let (lx0, ly0) = apply_matrix_pt(m, (x0, y0));
    let (lx1, ly1) = apply_matrix_pt(m, (x1, y0));
    let (lx2, ly2) = apply_matrix_pt(m, (x1, y1));
    let (lx3, ly3) = apply_matrix_pt(m, (x0, y1));
    (
        lx0.min(lx1).min(lx2).min(lx3),
        ly0.min(ly1).min(ly2).min(ly3),
        lx0.max(lx1).max(lx2).max(lx3),
        ly0.max(ly1).max(ly2).max(ly3),
    )
}

/// Reorders a rectangle so that x0 <= x1 and y0 <= y1.
pub fn normalize_rect(rect: Rect) -> Rect {
    let (x0, y0, x1, y1) = rect;
    (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
}

/// Intersection of two normalized rectangles, `None` when the overlap has no
/// area (edge contact does not count).
pub fn rect_intersection(a: Rect, b: Rect) -> Option<Rect> {
    let x0 = a.0.max(b.0);
    let y0 = a.1.max(b.1);
    let x1 = a.2.min(b.2);
    let y1 = a.3.min(b.3);
    if x0 < x1 && y0 < y1 {
        Some((x0, y0, x1, y1))
    } else {
        None
    }
}

/// Smallest rectangle containing both arguments.
pub fn rect_union(a: Rect, b: Rect) -> Rect {
    (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3))
}

/// Whether `outer` fully contains `inner`.
pub fn rect_contains(outer: Rect, inner: Rect) -> bool {
    outer.0 <= inner.0 && outer.1 <= inner.1 && outer.2 >= inner.2 && outer.3 >= inner.3
}
