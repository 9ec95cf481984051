//! End-to-end pipeline tests: interpret -> redact -> serialize.

use expunge_core::{
    NoopResolver, OpKind, OperationSeq, RedactConfig, Rotation, interpret, interpret_segments,
    redact, serialize, visual_to_user,
};

const MEDIA: (f64, f64) = (612.0, 792.0);

fn pipeline(
    data: &[u8],
    rotation: Rotation,
    visual_rects: &[(f64, f64, f64, f64)],
) -> (String, Vec<String>) {
    let seq = interpret(data, &NoopResolver, rotation, MEDIA).expect("interpret");
    let user_rects: Vec<_> = visual_rects
        .iter()
        .map(|&r| visual_to_user(r, rotation, MEDIA))
        .collect();
    let (seq, removed) = redact(seq, &user_rects, &RedactConfig::default()).expect("redact");
    (
        String::from_utf8(serialize(&seq).expect("serialize")).expect("ascii output"),
        removed.xobjects,
    )
}

#[test]
fn test_single_string_redaction() {
    let (output, removed) = pipeline(
        b"BT /F1 12 Tf 100 700 Td (Hello) Tj ET",
        Rotation::None,
        &[(80.0, 690.0, 200.0, 720.0)],
    );
    assert!(!output.contains("(Hello) Tj"));
    assert!(output.contains("BT"));
    assert!(output.contains("ET"));
    assert!(output.contains("/F1 12 Tf"));
    assert!(removed.is_empty());
}

#[test]
fn test_inline_image_inside_ctm() {
    let data = b"q 50 0 0 50 100 200 cm BI /W 10 /H 10 /BPC 8 /CS /G ID 0123456789 EI Q";
    let (output, _) = pipeline(data, Rotation::None, &[(90.0, 190.0, 160.0, 260.0)]);
    assert!(!output.contains("BI"));
    assert!(!output.contains("0123456789"));
    assert!(output.contains("q\n"));
    assert!(output.contains("50 0 0 50 100 200 cm"));
    assert!(output.contains("Q\n"));
}

#[test]
fn test_rotated_page_redaction() {
    // MediaBox 612x792, rotation 90; the visual rect maps into user space
    // around x 395..491, y 492..509. Text placed there is removed; text
    // elsewhere survives.
    let data = b"BT /F1 12 Tf 400 495 Td (Hidden) Tj 100 100 Td (Visible) Tj ET";
    let (output, _) = pipeline(data, Rotation::Quarter, &[(492.0, 121.0, 509.0, 217.0)]);
    assert!(!output.contains("Hidden"));
    assert!(output.contains("(Visible) Tj"));
}

#[test]
fn test_unbalanced_q_page_still_redactable() {
    // Begins with a stray Q: warning, interpretation continues with the
    // CTM unchanged, and the show still appears in output when kept.
    let data = b"Q BT /F1 12 Tf 100 700 Td (text) Tj ET";
    let seq = interpret(data, &NoopResolver, Rotation::None, MEDIA).unwrap();
    assert!(!seq.diagnostics.is_empty());

    let (kept, _) = redact(seq, &[], &RedactConfig::default()).expect("redact");
    let output = String::from_utf8(serialize(&kept).expect("serialize")).unwrap();
    assert!(output.starts_with("Q\n"));
    assert!(output.contains("(text) Tj"));
}

#[test]
fn test_empty_redaction_round_trips_semantically() {
    let data = b"q 0.5 0 0 0.5 10 20 cm BT /F1 12 Tf [(Foo) -100 (Bar)] TJ ET Q 0 0 5 5 re f";
    let first = interpret(data, &NoopResolver, Rotation::None, MEDIA).unwrap();
    let (redacted, _) = redact(first, &[], &RedactConfig::default()).expect("redact");
    let written = serialize(&redacted).expect("serialize");
    let second = interpret(&written, &NoopResolver, Rotation::None, MEDIA).unwrap();

    let summary = |seq: &OperationSeq| {
        seq.ops
            .iter()
            .map(|op| {
                (
                    op.keyword.clone(),
                    match &op.kind {
                        OpKind::TextShow(ts) => ts.glyphs.iter().map(|g| g.bbox).collect(),
                        _ => Vec::new(),
                    },
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(
        summary(&interpret(data, &NoopResolver, Rotation::None, MEDIA).unwrap()),
        summary(&second)
    );
}

#[test]
fn test_glyph_split_survives_reinterpretation() {
    // After a split, re-interpreting the output must place the surviving
    // glyphs exactly where the originals were.
    let data = b"BT /F1 12 Tf 0 700 Td [(Foo) -100 (Bar)] TJ ET";
    let original = interpret(data, &NoopResolver, Rotation::None, MEDIA).unwrap();
    let bar_boxes: Vec<_> = original
        .ops
        .iter()
        .filter_map(|op| match &op.kind {
            OpKind::TextShow(ts) => Some(ts),
            _ => None,
        })
        .flat_map(|ts| ts.glyphs.iter())
        .filter(|g| g.seq_index == 2)
        .map(|g| g.bbox)
        .collect();

    let (redacted, _) = redact(
        original,
        &[(-1.0, 695.0, 22.0, 715.0)],
        &RedactConfig::default(),
    )
    .expect("redact");
    let reparsed = interpret(
        &serialize(&redacted).expect("serialize"),
        &NoopResolver,
        Rotation::None,
        MEDIA,
    )
    .unwrap();
    let new_boxes: Vec<_> = reparsed
        .ops
        .iter()
        .filter_map(|op| match &op.kind {
            OpKind::TextShow(ts) => Some(ts),
            _ => None,
        })
        .flat_map(|ts| ts.glyphs.iter())
        .map(|g| g.bbox)
        .collect();

    assert_eq!(bar_boxes.len(), new_boxes.len());
    for (a, b) in bar_boxes.iter().zip(new_boxes.iter()) {
        assert!((a.0 - b.0).abs() < 1e-9, "{a:?} vs {b:?}");
        assert!((a.1 - b.1).abs() < 1e-9);
        assert!((a.2 - b.2).abs() < 1e-9);
        assert!((a.3 - b.3).abs() < 1e-9);
    }
}

#[test]
fn test_multi_segment_page() {
    let seq = interpret_segments(
        &[b"BT /F1 12 Tf 100 700 Td".as_slice(), b"(Hello) Tj ET".as_slice()],
        &NoopResolver,
        Rotation::None,
        MEDIA,
    )
    .unwrap();
    let shows: Vec<_> = seq
        .ops
        .iter()
        .filter_map(|op| match &op.kind {
            OpKind::TextShow(ts) => Some(ts.text.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(shows, vec!["Hello".to_string()]);
}

#[test]
fn test_tokenizer_failure_leaves_no_output() {
    // A hex string with garbage cannot be resynchronized; the page fails as
    // a whole and the caller keeps the original bytes.
    let data = b"BT /F1 12 Tf <4G> Tj ET";
    assert!(interpret(data, &NoopResolver, Rotation::None, MEDIA).is_err());
}

#[test]
fn test_diagnostics_carried_through_redaction() {
    let data = b"Q nosuchop BT /F1 12 Tf (x) Tj ET";
    let seq = interpret(data, &NoopResolver, Rotation::None, MEDIA).unwrap();
    let diag_count = seq.diagnostics.len();
    assert!(diag_count >= 2);
    let (out, _) = redact(seq, &[], &RedactConfig::default()).expect("redact");
    assert_eq!(out.diagnostics.len(), diag_count);
}
