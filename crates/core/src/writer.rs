//! Content-stream serialization.
//!
//! Emits one operator per line, operands before the keyword. Numbers have a
//! deterministic format: integers without a decimal point, reals trimmed to
//! at most six decimals with values within 1e-4 of an integer snapped to
//! integer form. Strings always come out as literal strings with non-ASCII
//! and control bytes octal-escaped, so no byte sequence can be mistaken for
//! a line ending or delimiter.

use itertools::Itertools;

use crate::error::{RedactError, Result};
use crate::model::ops::{OpKind, Operation, OperationSeq};
use crate::parser::lexer::{Keyword, Token};

/// Serialize an operation sequence back into content-stream bytes.
///
/// The writer has no error class for input: an operation whose kind and
/// keyword disagree is a programmer bug and surfaces as
/// [`RedactError::InvariantViolated`].
pub fn serialize(seq: &OperationSeq) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(seq.ops.len() * 16);
    for op in &seq.ops {
        write_operation(&mut out, op)?;
    }
    Ok(out)
}

fn write_operation(out: &mut Vec<u8>, op: &Operation) -> Result<()> {
    if let OpKind::InlineImage(img) = &op.kind {
        if op.keyword != Keyword::BI {
            return Err(RedactError::InvariantViolated(format!(
                "inline image at byte {} carries operator {}",
                op.pos,
                String::from_utf8_lossy(op.keyword.as_bytes())
            )));
        }
        out.extend_from_slice(b"BI");
        for (key, value) in &img.params {
            out.push(b' ');
            write_name(out, key);
            out.push(b' ');
            write_token(out, value);
        }
        out.extend_from_slice(b"\nID\n");
        out.extend_from_slice(&img.payload);
        out.extend_from_slice(b"\nEI\n");
        return Ok(());
    }
    if op.keyword == Keyword::BI {
        return Err(RedactError::InvariantViolated(format!(
            "BI operation at byte {} has no image payload",
            op.pos
        )));
    }

    for operand in &op.operands {
        write_token(out, operand);
        out.push(b' ');
    }
    out.extend_from_slice(op.keyword.as_bytes());
    out.push(b'\n');
    Ok(())
}

fn write_token(out: &mut Vec<u8>, token: &Token) {
    match token {
        Token::Int(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Token::Real(v) => out.extend_from_slice(format_number(*v).as_bytes()),
        Token::LiteralString(bytes) | Token::HexString(bytes) => {
            write_literal_string(out, bytes);
        }
        Token::Name(name) => write_name(out, name),
        Token::Array(items) => {
            out.push(b'[');
            let body = items
                .iter()
                .map(|item| {
                    let mut buf = Vec::new();
                    write_token(&mut buf, item);
                    buf
                })
                .collect_vec();
            out.extend_from_slice(&body.join(&b' '));
            out.push(b']');
        }
        Token::Dict(pairs) => {
            out.extend_from_slice(b"<<");
            for (i, (key, value)) in pairs.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_name(out, key);
                out.push(b' ');
                write_token(out, value);
            }
            out.extend_from_slice(b">>");
        }
        Token::Operator(keyword) => out.extend_from_slice(keyword.as_bytes()),
        Token::ArrayStart => out.push(b'['),
        Token::ArrayEnd => out.push(b']'),
        Token::DictStart => out.extend_from_slice(b"<<"),
        Token::DictEnd => out.extend_from_slice(b">>"),
    }
}

/// Deterministic real formatting: snap to integer within 1e-4, otherwise at
/// most six decimals with trailing zeros trimmed.
pub fn format_number(value: f64) -> String {
    let rounded = value.round();
    if (value - rounded).abs() < 1e-4 {
        // The snap also normalizes -0.
        return format!("{}", rounded as i64);
    }
    let mut s = format!("{value:.6}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

/// Literal string with minimum escaping: backslash, parentheses, and octal
/// escapes for control and non-ASCII bytes.
fn write_literal_string(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'(');
    for &b in bytes {
        match b {
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            0x20..=0x7e => out.push(b),
            _ => {
                out.push(b'\\');
                out.extend_from_slice(format!("{b:03o}").as_bytes());
            }
        }
    }
    out.push(b')');
}

/// Name with #xx escapes for delimiters, whitespace, '#' and bytes outside
/// the printable ASCII range.
fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for ch in name.chars() {
        let code = ch as u32;
        if code > 0xff {
            // Names are built byte-wise; anything wider is caller input.
            for unit in ch.to_string().as_bytes() {
                out.extend_from_slice(format!("#{unit:02X}").as_bytes());
            }
            continue;
        }
        let b = code as u8;
        let needs_escape = b < 0x21
            || b > 0x7e
            || matches!(
                b,
                b'#' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
            );
        if needs_escape {
            out.extend_from_slice(format!("#{b:02X}").as_bytes());
        } else {
            out.push(b);
        }
    }
}
