//! Tests for the content-stream tokenizer.

use expunge_core::{ContentLexer, Keyword, Token, find_text_operators, interpret};
use expunge_core::{NoopResolver, OpKind, Rotation};

fn collect_tokens(data: &[u8]) -> Vec<Token> {
    let mut lexer = ContentLexer::new(data);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next_token() {
        let lexeme = result.expect("tokenize");
        tokens.push(lexeme.token);
    }
    tokens
}

#[test]
fn test_basic_tokens() {
    let tokens = collect_tokens(b"BT /F1 12 Tf (Hello) Tj ET");
    assert_eq!(
        tokens,
        vec![
            Token::Operator(Keyword::BT),
            Token::Name("F1".to_string()),
            Token::Int(12),
            Token::Operator(Keyword::Tf),
            Token::LiteralString(b"Hello".to_vec()),
            Token::Operator(Keyword::Tj),
            Token::Operator(Keyword::ET),
        ]
    );
}

#[test]
fn test_numbers_preserve_written_form() {
    let tokens = collect_tokens(b"12 -7 +3 0.5 -.25 4. 12.");
    assert_eq!(
        tokens,
        vec![
            Token::Int(12),
            Token::Int(-7),
            Token::Int(3),
            Token::Real(0.5),
            Token::Real(-0.25),
            Token::Real(4.0),
            Token::Real(12.0),
        ]
    );
}

#[test]
fn test_literal_string_escapes() {
    let tokens = collect_tokens(b"(a\\nb\\t\\(c\\)\\\\d)");
    assert_eq!(tokens, vec![Token::LiteralString(b"a\nb\t(c)\\d".to_vec())]);
}

#[test]
fn test_literal_string_balanced_parens() {
    let tokens = collect_tokens(b"(outer (inner) tail)");
    assert_eq!(
        tokens,
        vec![Token::LiteralString(b"outer (inner) tail".to_vec())]
    );
}

#[test]
fn test_literal_string_octal_and_continuation() {
    let tokens = collect_tokens(b"(\\101\\12\\1234)");
    // \101 = 'A', \12 = LF, \123 = 'S' followed by literal '4'.
    assert_eq!(tokens, vec![Token::LiteralString(b"A\nS4".to_vec())]);

    let tokens = collect_tokens(b"(split\\\nline)");
    assert_eq!(tokens, vec![Token::LiteralString(b"splitline".to_vec())]);
}

#[test]
fn test_literal_string_stray_backslash() {
    let tokens = collect_tokens(b"(a\\zb)");
    assert_eq!(tokens, vec![Token::LiteralString(b"azb".to_vec())]);
}

#[test]
fn test_hex_string_whitespace_and_odd_padding() {
    let tokens = collect_tokens(b"<48 65 6C 6C 6F>");
    assert_eq!(tokens, vec![Token::HexString(b"Hello".to_vec())]);

    // Odd digit count is padded with a trailing zero nibble.
    let tokens = collect_tokens(b"<4F3>");
    assert_eq!(tokens, vec![Token::HexString(vec![0x4f, 0x30])]);
}

#[test]
fn test_hex_string_invalid_byte_fails() {
    let mut lexer = ContentLexer::new(b"<4G>");
    assert!(lexer.next_token().unwrap().is_err());
}

#[test]
fn test_name_hex_escape() {
    let tokens = collect_tokens(b"/foo#5fbar /A#20B");
    assert_eq!(
        tokens,
        vec![
            Token::Name("foo_bar".to_string()),
            Token::Name("A B".to_string()),
        ]
    );
}

#[test]
fn test_comments_skipped() {
    let tokens = collect_tokens(b"% comment to end of line\nBT % trailing\nET");
    assert_eq!(
        tokens,
        vec![Token::Operator(Keyword::BT), Token::Operator(Keyword::ET)]
    );
}

#[test]
fn test_unknown_operator_preserved() {
    let tokens = collect_tokens(b"frobnicate");
    assert_eq!(
        tokens,
        vec![Token::Operator(Keyword::Unknown(b"frobnicate".to_vec()))]
    );
}

#[test]
fn test_star_operators() {
    let tokens = collect_tokens(b"T* f* B* W* b*");
    assert_eq!(
        tokens,
        vec![
            Token::Operator(Keyword::TStar),
            Token::Operator(Keyword::FStar),
            Token::Operator(Keyword::BStar),
            Token::Operator(Keyword::WStar),
            Token::Operator(Keyword::BbStar),
        ]
    );
}

#[test]
fn test_inline_image_payload_capture() {
    let data = b"BI /W 10 /H 10 /BPC 8 /CS /G ID 0123456789 EI Q";
    let seq = interpret(data, &NoopResolver, Rotation::None, (612.0, 792.0)).unwrap();
    let img = seq
        .ops
        .iter()
        .find_map(|op| match &op.kind {
            OpKind::InlineImage(img) => Some(img),
            _ => None,
        })
        .expect("inline image operation");
    assert_eq!(img.payload, b"0123456789".to_vec());
    assert_eq!(img.width, Some(10));
    assert_eq!(img.height, Some(10));
    assert_eq!(img.bits_per_component, Some(8));
    assert_eq!(img.color_space.as_deref(), Some("G"));
}

#[test]
fn test_inline_image_payload_may_contain_delimiters() {
    // Payload bytes that look like tokens must pass through verbatim.
    let data = b"BI /W 1 /H 1 /BPC 8 /CS /G ID (not a string) Tj EI";
    let seq = interpret(data, &NoopResolver, Rotation::None, (612.0, 792.0)).unwrap();
    let img = seq
        .ops
        .iter()
        .find_map(|op| match &op.kind {
            OpKind::InlineImage(img) => Some(img),
            _ => None,
        })
        .expect("inline image operation");
    assert_eq!(img.payload, b"(not a string) Tj".to_vec());
}

#[test]
fn test_unterminated_inline_image_is_fatal() {
    let data = b"BI /W 1 /H 1 ID 0123";
    assert!(interpret(data, &NoopResolver, Rotation::None, (612.0, 792.0)).is_err());
}

// Tokenizer resilience: operator substrings inside literal strings yield
// exactly one operator token, the trailing one. The naive scanner reports
// both, which is why it must never drive redaction.
#[test]
fn test_operator_inside_string_not_recognized() {
    let data = b"(Tj inside) Tj";
    let tokens = collect_tokens(data);
    let operator_count = tokens
        .iter()
        .filter(|t| matches!(t, Token::Operator(Keyword::Tj)))
        .count();
    assert_eq!(operator_count, 1);

    let scanned = find_text_operators(data);
    assert_eq!(scanned.len(), 2);
}
