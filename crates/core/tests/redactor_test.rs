//! Tests for the redaction engine: keep/drop/split decisions, state
//! preservation, and Tf injection.

use expunge_core::model::Operands;
use expunge_core::{
    Keyword, NoopResolver, OpKind, Operation, OperationSeq, PartialImagePolicy, RedactConfig,
    Rotation, Token, interpret, redact, serialize,
};

const MEDIA: (f64, f64) = (612.0, 792.0);

fn run(data: &[u8]) -> OperationSeq {
    interpret(data, &NoopResolver, Rotation::None, MEDIA).expect("interpret")
}

fn redact_stream(data: &[u8], rects: &[(f64, f64, f64, f64)]) -> String {
    let (seq, _) = redact(run(data), rects, &RedactConfig::default()).expect("redact");
    String::from_utf8(serialize(&seq).expect("serialize")).expect("ascii output")
}

fn surviving_text(seq: &OperationSeq) -> String {
    seq.ops
        .iter()
        .filter_map(|op| match &op.kind {
            OpKind::TextShow(ts) => Some(ts.text.clone()),
            _ => None,
        })
        .collect()
}

fn assert_balanced(seq: &OperationSeq) {
    let count = |kw: &Keyword| seq.ops.iter().filter(|op| &op.keyword == kw).count();
    assert_eq!(count(&Keyword::Qq), count(&Keyword::Q), "q/Q balance");
    assert_eq!(count(&Keyword::BT), count(&Keyword::ET), "BT/ET pairing");
}

#[test]
fn test_full_show_removal_preserves_structure() {
    // Scenario: single literal string fully covered by the rectangle.
    let data = b"BT /F1 12 Tf 100 700 Td (Hello) Tj ET";
    let output = redact_stream(data, &[(80.0, 690.0, 200.0, 720.0)]);

    assert!(!output.contains("Hello"));
    assert!(output.contains("BT"));
    assert!(output.contains("ET"));
    assert!(output.contains("/F1 12 Tf"));
}

#[test]
fn test_untouched_show_kept_verbatim() {
    let data = b"BT /F1 12 Tf 100 700 Td (Hello) Tj ET";
    let output = redact_stream(data, &[(400.0, 400.0, 500.0, 500.0)]);
    assert!(output.contains("(Hello) Tj"));
}

#[test]
fn test_kerned_split_emits_tm_and_run() {
    // Scenario: [(Foo) -100 (Bar)] TJ with only "Foo" covered. "Bar" must
    // come back as an explicit Tm at its original origin plus a plain Tj.
    let data = b"BT /F1 12 Tf 0 700 Td [(Foo) -100 (Bar)] TJ ET";
    let output = redact_stream(data, &[(-1.0, 695.0, 22.0, 715.0)]);

    assert!(!output.contains("Foo"));
    // Foo is 3 * 7.2 = 21.6 wide; the -100 kern adds 1.2.
    assert!(output.contains("1 0 0 1 22.8 700 Tm"));
    assert!(output.contains("(Bar) Tj"));
    assert!(!output.contains("TJ"));
}

#[test]
fn test_split_runs_break_at_gaps() {
    // Cover only the middle glyph; the survivors form two runs, each with
    // its own Tm.
    let data = b"BT /F1 10 Tf 0 100 Td (abc) Tj ET";
    // b spans x 6..12.
    let output = redact_stream(data, &[(6.5, 95.0, 11.5, 115.0)]);

    assert!(output.contains("1 0 0 1 0 100 Tm"));
    assert!(output.contains("(a) Tj"));
    assert!(output.contains("1 0 0 1 12 100 Tm"));
    assert!(output.contains("(c) Tj"));
    assert!(!output.contains("abc"));
}

#[test]
fn test_split_glyphs_keep_byte_order() {
    // Right-to-left visual order via a mirrored Tm; surviving glyph bytes
    // must still be emitted in byte order within a run.
    let data = b"BT /F1 10 Tf -1 0 0 1 100 0 Tm (abcd) Tj ET";
    // Glyph a occupies x 94..100; cover it only (b ends exactly at 94, and
    // edge contact does not count as intersection).
    let (seq, _) = redact(
        run(data),
        &[(94.2, -5.0, 100.5, 15.0)],
        &RedactConfig::default(),
    )
    .expect("redact");
    let output = String::from_utf8(serialize(&seq).expect("serialize")).unwrap();
    assert!(output.contains("(bcd) Tj"));
}

#[test]
fn test_tm_scaled_font_reconstruction_uses_raw_size() {
    // Scenario: the true size lives in Tm, Tf carries 1. A split must not
    // multiply the Tf size by the Tm scale.
    let data = b"BT /TT0 1 Tf 9 0 0 9 50 700 Tm (Secret) Tj ET";
    // Glyph width is 5.4 user units; cover the first three glyphs
    // (50..66.2) only.
    let output = redact_stream(data, &[(49.0, 695.0, 66.0, 712.0)]);

    assert!(!output.contains("(Secret)"));
    assert!(output.contains("/TT0 1 Tf"));
    assert!(!output.contains("/TT0 9 Tf"));
    assert!(output.contains("9 0 0 9 66.2 700 Tm"));
    assert!(output.contains("(ret) Tj"));
}

#[test]
fn test_whole_scaled_show_removed() {
    let data = b"BT /TT0 1 Tf 9 0 0 9 50 700 Tm (Secret) Tj ET";
    let output = redact_stream(data, &[(40.0, 690.0, 200.0, 715.0)]);
    assert!(!output.contains("Secret"));
    assert!(output.contains("BT"));
    assert!(output.contains("ET"));
}

#[test]
fn test_path_painter_swapped_for_end_path() {
    let data = b"0 0 50 50 re f 100 100 110 10 re S";
    let (seq, _) = redact(run(data), &[(10.0, 10.0, 20.0, 20.0)], &RedactConfig::default())
        .expect("redact");

    let painters: Vec<&Keyword> = seq
        .ops
        .iter()
        .filter_map(|op| match &op.kind {
            OpKind::PathPaint { .. } => Some(&op.keyword),
            _ => None,
        })
        .collect();
    assert_eq!(painters, vec![&Keyword::N, &Keyword::S]);
    // Construction operators stay.
    assert_eq!(
        seq.ops.iter().filter(|op| op.keyword == Keyword::Re).count(),
        2
    );
}

#[test]
fn test_paths_kept_when_disabled() {
    let config = RedactConfig {
        remove_paths: false,
        ..RedactConfig::default()
    };
    let (seq, _) = redact(
        run(b"0 0 50 50 re f"),
        &[(10.0, 10.0, 20.0, 20.0)],
        &config,
    )
    .expect("redact");
    assert!(seq.ops.iter().any(|op| op.keyword == Keyword::Ff));
}

#[test]
fn test_text_kept_when_disabled() {
    let config = RedactConfig {
        remove_text: false,
        ..RedactConfig::default()
    };
    let (seq, _) = redact(
        run(b"BT /F1 12 Tf 100 700 Td (Hello) Tj ET"),
        &[(80.0, 690.0, 200.0, 720.0)],
        &config,
    )
    .expect("redact");
    assert_eq!(surviving_text(&seq), "Hello");
}

#[test]
fn test_min_intersection_height_ratio() {
    let data = b"BT /F1 12 Tf 0 700 Td (X) Tj ET";
    // Glyph spans y 700..712. A 1.2pt graze is 10% of the height: ignored.
    let (seq, _) = redact(
        run(data),
        &[(-5.0, 690.0, 50.0, 701.2)],
        &RedactConfig::default(),
    )
    .expect("redact");
    assert_eq!(surviving_text(&seq), "X");

    // A 6pt overlap is 50%: redacted.
    let (seq, _) = redact(
        run(data),
        &[(-5.0, 690.0, 50.0, 706.0)],
        &RedactConfig::default(),
    )
    .expect("redact");
    assert_eq!(surviving_text(&seq), "");

    // Raising the threshold above 50% keeps it again.
    let config = RedactConfig {
        min_intersection_height_ratio: 0.6,
        ..RedactConfig::default()
    };
    let (seq, _) = redact(run(data), &[(-5.0, 690.0, 50.0, 706.0)], &config).expect("redact");
    assert_eq!(surviving_text(&seq), "X");
}

#[test]
fn test_invisible_text_still_redacted() {
    let data = b"BT /F1 12 Tf 3 Tr 100 700 Td (Hidden) Tj ET";
    let (seq, _) = redact(
        run(data),
        &[(90.0, 690.0, 200.0, 720.0)],
        &RedactConfig::default(),
    )
    .expect("redact");
    assert_eq!(surviving_text(&seq), "");
}

#[test]
fn test_redaction_monotonicity() {
    let data = b"BT /F1 10 Tf 0 100 Td (abcde) Tj ET";
    let r1 = [(6.5, 95.0, 11.5, 115.0)]; // covers b
    let r2 = [(6.5, 95.0, 11.5, 115.0), (18.5, 95.0, 29.5, 115.0)]; // + d, e

    let (s1, _) = redact(run(data), &r1, &RedactConfig::default()).expect("redact");
    let (s2, _) = redact(run(data), &r2, &RedactConfig::default()).expect("redact");
    let t1 = surviving_text(&s1);
    let t2 = surviving_text(&s2);
    assert_eq!(t1, "acde");
    assert_eq!(t2, "ac");
    // Every survivor under the larger set survives under the smaller one.
    for ch in t2.chars() {
        assert!(t1.contains(ch));
    }
}

#[test]
fn test_state_balance_preserved() {
    let data =
        b"q 2 0 0 2 0 0 cm BT /F1 10 Tf 10 20 Td (kill) Tj ET Q q BT /F1 10 Tf (keep) Tj ET Q";
    let (seq, _) = redact(
        run(data),
        &[(15.0, 35.0, 70.0, 65.0)],
        &RedactConfig::default(),
    )
    .expect("redact");
    assert_balanced(&seq);
    assert_eq!(surviving_text(&seq), "keep");
}

#[test]
fn test_xobject_removed_and_scheduled() {
    let data = b"q 50 0 0 50 100 200 cm /Im1 Do Q";
    let (seq, removed) = redact(
        run(data),
        &[(90.0, 190.0, 160.0, 260.0)],
        &RedactConfig::default(),
    )
    .expect("redact");
    assert!(!seq.ops.iter().any(|op| op.keyword == Keyword::Do));
    assert_eq!(removed.xobjects, vec!["Im1".to_string()]);
    assert_balanced(&seq);
}

#[test]
fn test_xobject_with_surviving_reference_not_scheduled() {
    let data = b"q 50 0 0 50 100 200 cm /Im1 Do Q q 1 0 0 1 400 400 cm /Im1 Do Q";
    let (seq, removed) = redact(
        run(data),
        &[(90.0, 190.0, 160.0, 260.0)],
        &RedactConfig::default(),
    )
    .expect("redact");
    // One invocation dropped, one kept: the resource must stay.
    assert_eq!(
        seq.ops.iter().filter(|op| op.keyword == Keyword::Do).count(),
        1
    );
    assert!(removed.xobjects.is_empty());
}

#[test]
fn test_partial_image_overlay_policy() {
    let config = RedactConfig {
        partial_image_policy: PartialImagePolicy::KeepAndOverlayBlackBox,
        ..RedactConfig::default()
    };
    let data = b"q 100 0 0 100 0 0 cm /Im1 Do Q";
    let (seq, removed) = redact(run(data), &[(10.0, 10.0, 40.0, 40.0)], &config).expect("redact");

    assert!(seq.ops.iter().any(|op| op.keyword == Keyword::Do));
    assert!(removed.xobjects.is_empty());
    assert_balanced(&seq);

    let output = String::from_utf8(serialize(&seq).expect("serialize")).unwrap();
    // Overlay coordinates go back through the inverse CTM.
    assert!(output.contains("0.1 0.1 0.3 0.3 re"));
    assert!(output.contains("0 g"));
}

#[test]
fn test_fully_covered_image_removed_despite_overlay_policy() {
    let config = RedactConfig {
        partial_image_policy: PartialImagePolicy::KeepAndOverlayBlackBox,
        ..RedactConfig::default()
    };
    let data = b"q 100 0 0 100 0 0 cm /Im1 Do Q";
    let (seq, removed) =
        redact(run(data), &[(-10.0, -10.0, 110.0, 110.0)], &config).expect("redact");
    assert!(!seq.ops.iter().any(|op| op.keyword == Keyword::Do));
    assert_eq!(removed.xobjects, vec!["Im1".to_string()]);
}

#[test]
fn test_inline_image_removed_inside_preserved_state() {
    // Scenario: inline image placed by a cm inside q/Q; the image goes, the
    // state operators stay.
    let data = b"q 50 0 0 50 100 200 cm BI /W 10 /H 10 /BPC 8 /CS /G ID 0123456789 EI Q";
    let (seq, _) = redact(
        run(data),
        &[(90.0, 190.0, 160.0, 260.0)],
        &RedactConfig::default(),
    )
    .expect("redact");
    assert!(
        !seq.ops
            .iter()
            .any(|op| matches!(op.kind, OpKind::InlineImage(_)))
    );
    assert_balanced(&seq);
    let output = String::from_utf8(serialize(&seq).expect("serialize")).unwrap();
    assert!(output.contains("50 0 0 50 100 200 cm"));
}

#[test]
fn test_tf_injected_for_orphaned_show() {
    // A hand-assembled sequence whose show lost its Tf; injection must
    // re-establish it with the raw size.
    let show = expunge_core::TextShow {
        text: "x".to_string(),
        font_name: Some("F2".to_string()),
        raw_size: 10.0,
        effective_size: 10.0,
        render: 0,
        glyphs: Vec::new(),
        bbox: None,
    };
    let ops = vec![
        Operation {
            keyword: Keyword::BT,
            operands: Operands::new(),
            pos: 0,
            kind: OpKind::TextBegin,
        },
        Operation {
            keyword: Keyword::Tj,
            operands: Operands::from_vec(vec![Token::LiteralString(b"x".to_vec())]),
            pos: 0,
            kind: OpKind::TextShow(show),
        },
        Operation {
            keyword: Keyword::ET,
            operands: Operands::new(),
            pos: 0,
            kind: OpKind::TextEnd,
        },
    ];
    let seq = OperationSeq {
        ops,
        diagnostics: Vec::new(),
        media_box: MEDIA,
        rotation: Rotation::None,
    };

    let (seq, _) = redact(seq, &[], &RedactConfig::default()).expect("redact");
    let output = String::from_utf8(serialize(&seq).expect("serialize")).unwrap();
    assert!(output.contains("/F2 10 Tf\n(x) Tj"));
}

#[test]
fn test_tf_not_duplicated_when_present() {
    let data = b"BT /F1 12 Tf 100 700 Td (Hello) Tj ET";
    let (seq, _) = redact(run(data), &[], &RedactConfig::default()).expect("redact");
    let tf_count = seq.ops.iter().filter(|op| op.keyword == Keyword::Tf).count();
    assert_eq!(tf_count, 1);
}

#[test]
fn test_empty_rects_is_identity() {
    let data = b"q 0.5 0 0 0.5 10 20 cm BT /F1 12 Tf [(Foo) -100 (Bar)] TJ ET Q 0 0 5 5 re f";
    let before = run(data);
    let before_bytes = serialize(&before).expect("serialize");
    let (after, removed) = redact(before, &[], &RedactConfig::default()).expect("redact");
    assert_eq!(serialize(&after).expect("serialize"), before_bytes);
    assert!(removed.xobjects.is_empty());
}
