//! The redaction engine.
//!
//! Walks the annotated operation sequence once and decides keep, drop, or
//! split per operation. State-bearing operations are never deleted: the
//! surrounding content depends on them, and keeping them is what preserves
//! the q/Q and BT/ET invariants through any rewrite.

use rustc_hash::FxHashSet;
use smallvec::smallvec;

use crate::error::{RedactError, Result};
use crate::model::ops::{Glyph, OpKind, Operands, Operation, OperationSeq, TextShow};
use crate::parser::lexer::{Keyword, Token};
use crate::utils::{
    Matrix, Rect, apply_matrix_rect, invert_matrix, normalize_rect, rect_contains,
    rect_intersection, rect_union,
};

/// What to do with an image only partially covered by redaction rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialImagePolicy {
    /// Remove the whole image operation.
    #[default]
    RemoveWhole,
    /// Keep the image and paint black boxes over the covered regions.
    KeepAndOverlayBlackBox,
}

/// Redaction options.
#[derive(Debug, Clone)]
pub struct RedactConfig {
    pub remove_text: bool,
    pub remove_paths: bool,
    pub remove_images: bool,
    pub partial_image_policy: PartialImagePolicy,
    /// Re-establish font state before shows that lost their `Tf` (§Tf
    /// injection); always uses the raw size, never the effective one.
    pub inject_missing_tf: bool,
    /// Intersections shorter than this fraction of the glyph height do not
    /// count, which keeps a rectangle on one line from bleeding into the
    /// ascenders of the line below. Raising it makes redaction less
    /// aggressive.
    pub min_intersection_height_ratio: f64,
}

impl Default for RedactConfig {
    fn default() -> Self {
        Self {
            remove_text: true,
            remove_paths: true,
            remove_images: true,
            partial_image_policy: PartialImagePolicy::default(),
            inject_missing_tf: true,
            min_intersection_height_ratio: 0.2,
        }
    }
}

/// Resource names scheduled for removal from the page's Resources
/// dictionary. The core records them; the caller applies them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovedResources {
    pub xobjects: Vec<String>,
}

enum ImageAction {
    Remove,
    Overlay,
}

/// Filter an operation sequence against redaction rectangles in user space.
///
/// The engine has no error class for input: every condition it can detect
/// on its own is a programmer bug and surfaces as
/// [`RedactError::InvariantViolated`].
pub fn redact(
    seq: OperationSeq,
    rects: &[Rect],
    config: &RedactConfig,
) -> Result<(OperationSeq, RemovedResources)> {
    let rects: Vec<Rect> = rects.iter().map(|&r| normalize_rect(r)).collect();
    let OperationSeq {
        ops,
        diagnostics,
        media_box,
        rotation,
    } = seq;

    let mut out: Vec<Operation> = Vec::with_capacity(ops.len());
    let mut dropped_xobjects: Vec<String> = Vec::new();
    let mut surviving_xobjects: FxHashSet<String> = FxHashSet::default();

    for op in ops {
        match &op.kind {
            OpKind::TextShow(ts) if config.remove_text && !rects.is_empty() => {
                let hits = glyph_hits(ts, &rects, config.min_intersection_height_ratio);
                let hit_count = hits.iter().filter(|&&h| h).count();
                if hit_count == 0 {
                    out.push(op);
                } else if hit_count == ts.glyphs.len() {
                    // Every glyph intersects: the show disappears entirely.
                } else {
                    split_text_show(&op, ts, &hits, &mut out)?;
                }
            }
            OpKind::PathPaint { bbox } if config.remove_paths && op.keyword != Keyword::N => {
                match bbox {
                    Some(bbox) if intersects_any(*bbox, &rects) => {
                        // The path construction already passed through, so
                        // something must consume the path: swap the painter
                        // for end-path-without-painting.
                        let bbox = Some(*bbox);
                        out.push(Operation {
                            keyword: Keyword::N,
                            operands: Operands::new(),
                            pos: op.pos,
                            kind: OpKind::PathPaint { bbox },
                        });
                    }
                    _ => out.push(op),
                }
            }
            OpKind::XObject { name, ctm, bbox } if config.remove_images => {
                let name = name.clone();
                let ctm = *ctm;
                let bbox = *bbox;
                let pos = op.pos;
                if intersects_any(bbox, &rects) {
                    match image_action(bbox, &rects, config.partial_image_policy) {
                        ImageAction::Remove => dropped_xobjects.push(name),
                        ImageAction::Overlay => {
                            surviving_xobjects.insert(name);
                            out.push(op);
                            push_black_box_overlay(&mut out, ctm, bbox, &rects, pos);
                        }
                    }
                } else {
                    surviving_xobjects.insert(name);
                    out.push(op);
                }
            }
            OpKind::InlineImage(img) if config.remove_images => {
                let ctm = img.ctm;
                let bbox = img.bbox;
                let pos = op.pos;
                if intersects_any(bbox, &rects) {
                    match image_action(bbox, &rects, config.partial_image_policy) {
                        ImageAction::Remove => {}
                        ImageAction::Overlay => {
                            out.push(op);
                            push_black_box_overlay(&mut out, ctm, bbox, &rects, pos);
                        }
                    }
                } else {
                    out.push(op);
                }
            }
            _ => {
                if let OpKind::XObject { name, .. } = &op.kind {
                    surviving_xobjects.insert(name.clone());
                }
                out.push(op);
            }
        }
    }

    if config.inject_missing_tf {
        inject_missing_tf(&mut out);
    }

    let mut seen = FxHashSet::default();
    let removed: Vec<String> = dropped_xobjects
        .into_iter()
        .filter(|name| !surviving_xobjects.contains(name) && seen.insert(name.clone()))
        .collect();

    Ok((
        OperationSeq {
            ops: out,
            diagnostics,
            media_box,
            rotation,
        },
        RemovedResources { xobjects: removed },
    ))
}

fn intersects_any(bbox: Rect, rects: &[Rect]) -> bool {
    rects.iter().any(|&r| rect_intersection(bbox, r).is_some())
}

/// Per-glyph hit flags, aligned with `ts.glyphs`.
fn glyph_hits(ts: &TextShow, rects: &[Rect], min_height_ratio: f64) -> Vec<bool> {
    ts.glyphs
        .iter()
        .map(|g| glyph_hit(g, rects, min_height_ratio))
        .collect()
}

fn glyph_hit(glyph: &Glyph, rects: &[Rect], min_height_ratio: f64) -> bool {
    let height = glyph.bbox.3 - glyph.bbox.1;
    rects.iter().any(|&rect| {
        match rect_intersection(glyph.bbox, rect) {
            Some(overlap) => {
                if height <= 0.0 {
                    return true;
                }
                // Shallow grazes from an adjacent line do not count.
                (overlap.3 - overlap.1) >= min_height_ratio * height
            }
            None => false,
        }
    })
}

/// Glyph-level split: re-emit the surviving glyphs as maximal byte-order
/// runs, each placed by an explicit `Tm` carrying its original pre-advance
/// text matrix. Kerning adjustments from the original array are absorbed
/// into those matrices, so runs never span a TJ element boundary.
fn split_text_show(
    op: &Operation,
    ts: &TextShow,
    hits: &[bool],
    out: &mut Vec<Operation>,
) -> Result<()> {
    let mut survivors: Vec<&Glyph> = ts
        .glyphs
        .iter()
        .zip(hits)
        .filter(|&(_, &hit)| !hit)
        .map(|(g, _)| g)
        .collect();
    if survivors.is_empty() {
        // A split is only requested when some glyph survived; an empty
        // selection means the hit mask and glyph list disagree.
        return Err(RedactError::InvariantViolated(format!(
            "glyph split of the show at byte {} kept no glyphs",
            op.pos
        )));
    }
    survivors.sort_by_key(|g| (g.seq_index, g.byte_index));

    let mut runs: Vec<Vec<&Glyph>> = Vec::new();
    for glyph in survivors {
        match runs.last_mut() {
            Some(run)
                if run.last().is_some_and(|last| {
                    last.seq_index == glyph.seq_index && last.byte_index + 1 == glyph.byte_index
                }) =>
            {
                run.push(glyph);
            }
            _ => runs.push(vec![glyph]),
        }
    }

    for run in runs {
        let Some(first) = run.first() else {
            return Err(RedactError::InvariantViolated(format!(
                "empty glyph run in the show at byte {}",
                op.pos
            )));
        };
        let m = first.origin_tm;
        out.push(Operation {
            keyword: Keyword::Tm,
            operands: smallvec![
                Token::Real(m.0),
                Token::Real(m.1),
                Token::Real(m.2),
                Token::Real(m.3),
                Token::Real(m.4),
                Token::Real(m.5),
            ],
            pos: op.pos,
            kind: OpKind::TextState,
        });

        let bytes: Vec<u8> = run.iter().map(|g| g.code).collect();
        let text: String = run.iter().filter_map(|g| g.ch).collect();
        let mut glyphs: Vec<Glyph> = run.into_iter().cloned().collect();
        let bbox = glyphs.iter().map(|g| g.bbox).reduce(rect_union);
        glyphs.sort_by(|a, b| a.bbox.0.total_cmp(&b.bbox.0));

        out.push(Operation {
            keyword: Keyword::Tj,
            operands: smallvec![Token::LiteralString(bytes)],
            pos: op.pos,
            kind: OpKind::TextShow(TextShow {
                text,
                font_name: ts.font_name.clone(),
                raw_size: ts.raw_size,
                effective_size: ts.effective_size,
                render: ts.render,
                glyphs,
                bbox,
            }),
        });
    }
    Ok(())
}

fn image_action(bbox: Rect, rects: &[Rect], policy: PartialImagePolicy) -> ImageAction {
    match policy {
        PartialImagePolicy::RemoveWhole => ImageAction::Remove,
        PartialImagePolicy::KeepAndOverlayBlackBox => {
            if rects.iter().any(|&r| rect_contains(r, bbox)) {
                ImageAction::Remove
            } else {
                ImageAction::Overlay
            }
        }
    }
}

/// Paint black rectangles over the covered parts of a kept image. The
/// overlay rectangles are in user space; they go back through the inverse
/// CTM so the emitted `re` coordinates land in stream space.
fn push_black_box_overlay(
    out: &mut Vec<Operation>,
    ctm: Matrix,
    bbox: Rect,
    rects: &[Rect],
    pos: usize,
) {
    let Some(inverse) = invert_matrix(ctm) else {
        return; // degenerate image placement paints nothing anyway
    };
    let overlaps: Vec<Rect> = rects
        .iter()
        .filter_map(|&r| rect_intersection(bbox, r))
        .collect();
    if overlaps.is_empty() {
        return;
    }

    out.push(state_op(Keyword::Qq, Operands::new(), pos));
    out.push(state_op(Keyword::Gg, smallvec![Token::Int(0)], pos));
    let mut painted: Option<Rect> = None;
    for overlap in overlaps {
        let r = apply_matrix_rect(inverse, overlap);
        out.push(state_op(
            Keyword::Re,
            smallvec![
                Token::Real(r.0),
                Token::Real(r.1),
                Token::Real(r.2 - r.0),
                Token::Real(r.3 - r.1),
            ],
            pos,
        ));
        painted = Some(match painted {
            Some(u) => rect_union(u, overlap),
            None => overlap,
        });
    }
    out.push(Operation {
        keyword: Keyword::Ff,
        operands: Operands::new(),
        pos,
        kind: OpKind::PathPaint { bbox: painted },
    });
    out.push(state_op(Keyword::Q, Operands::new(), pos));
}

fn state_op(keyword: Keyword, operands: Operands, pos: usize) -> Operation {
    Operation {
        keyword,
        operands,
        pos,
        kind: OpKind::State,
    }
}

/// Ensure every surviving show is preceded by a `Tf` naming its font, with
/// the raw size recorded at interpretation time (default 1). Using the
/// effective size here is the classic font-explosion bug when the original
/// stream encoded scaling in `Tm`.
fn inject_missing_tf(ops: &mut Vec<Operation>) {
    let mut current: Option<String> = None;
    let mut i = 0;
    while i < ops.len() {
        let insertion = match &ops[i].kind {
            OpKind::TextState if ops[i].keyword == Keyword::Tf => {
                current = ops[i]
                    .operands
                    .len()
                    .checked_sub(2)
                    .and_then(|idx| ops[i].operands[idx].as_name())
                    .map(str::to_owned);
                None
            }
            OpKind::TextShow(ts) => match &ts.font_name {
                Some(fname) if current.as_deref() != Some(fname.as_str()) => {
                    let size = if ts.raw_size > 0.0 { ts.raw_size } else { 1.0 };
                    current = Some(fname.clone());
                    Some(Operation {
                        keyword: Keyword::Tf,
                        operands: smallvec![Token::Name(fname.clone()), Token::Real(size)],
                        pos: ops[i].pos,
                        kind: OpKind::TextState,
                    })
                }
                _ => None,
            },
            _ => None,
        };
        if let Some(tf) = insertion {
            ops.insert(i, tf);
            i += 1;
        }
        i += 1;
    }
}
