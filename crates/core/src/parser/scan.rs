//! Naive operator scanner, for diagnostics only.
//!
//! Scans raw bytes for operator keywords without any string or array
//! awareness, so an operator spelled inside a string literal is reported
//! too. That makes it useful for eyeballing suspicious streams and useless
//! for anything else: redaction decisions must come from the real parser,
//! which recognizes `(Tj inside) Tj` as a single trailing operator.

use crate::parser::lexer::is_keyword_end;

/// All positions where one of `needles` appears as a standalone word,
/// including occurrences inside string literals.
pub fn find_operators<'n>(data: &[u8], needles: &[&'n str]) -> Vec<(usize, &'n str)> {
    let mut hits = Vec::new();
    for &needle in needles {
        let nb = needle.as_bytes();
        if nb.is_empty() || nb.len() > data.len() {
            continue;
        }
        for i in 0..=(data.len() - nb.len()) {
            if &data[i..i + nb.len()] != nb {
                continue;
            }
            let before_ok = i == 0 || is_keyword_end(data[i - 1]);
            let after = i + nb.len();
            let after_ok = after >= data.len() || is_keyword_end(data[after]);
            if before_ok && after_ok {
                hits.push((i, needle));
            }
        }
    }
    hits.sort_by_key(|&(pos, _)| pos);
    hits
}

/// [`find_operators`] preset for the text-showing operators.
pub fn find_text_operators(data: &[u8]) -> Vec<(usize, &'static str)> {
    find_operators(data, &["Tj", "TJ", "'", "\""])
}
