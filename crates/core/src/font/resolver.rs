//! Font metrics capability.
//!
//! The interpreter is parameterized by a [`FontResolver`] rather than a font
//! implementation: redaction needs widths for positioning and, optionally, a
//! ToUnicode mapping for the decoded-text payload. Everything else about
//! fonts stays outside the core.

use rustc_hash::FxHashMap;

use crate::parser::lexer::{ContentLexer, Keyword, Token};

/// Default glyph width (thousandths of text space) when no table entry or
/// metrics exist.
pub const DEFAULT_GLYPH_WIDTH: f64 = 600.0;

/// Width table and optional Unicode mapping for one font resource.
#[derive(Debug, Clone, Default)]
pub struct FontMetrics {
    /// First character code covered by `widths`.
    pub first_char: u32,
    /// Widths in thousandths of text space, indexed from `first_char`.
    pub widths: Vec<f64>,
    /// Width for codes outside the table.
    pub missing_width: f64,
    /// Parsed ToUnicode CMap, when the font carries one.
    pub to_unicode: Option<ToUnicodeMap>,
}

impl FontMetrics {
    pub fn new(first_char: u32, widths: Vec<f64>, missing_width: f64) -> Self {
        Self {
            first_char,
            widths,
            missing_width,
            to_unicode: None,
        }
    }

    /// Metrics substituted when font resolution fails.
    pub fn fallback() -> Self {
        Self::new(0, Vec::new(), DEFAULT_GLYPH_WIDTH)
    }

    /// Width of a character code in thousandths of text space.
    pub fn width(&self, code: u32) -> f64 {
        if code >= self.first_char {
            if let Some(&w) = self.widths.get((code - self.first_char) as usize) {
                return w;
            }
        }
        self.missing_width
    }

    /// Unicode character for a code, via the ToUnicode map when present.
    pub fn decode(&self, code: u32) -> Option<char> {
        self.to_unicode.as_ref().and_then(|m| m.lookup(code))
    }

    pub fn with_to_unicode(mut self, cmap: ToUnicodeMap) -> Self {
        self.to_unicode = Some(cmap);
        self
    }
}

/// Capability handle over the page's Resources dictionary.
///
/// The core treats resources as read-only; this is the only question it
/// ever asks of them.
pub trait FontResolver {
    fn lookup_font(&self, name: &str) -> Option<FontMetrics>;
}

/// Resolver for callers without font data; every show falls back to
/// default metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl FontResolver for NoopResolver {
    fn lookup_font(&self, _name: &str) -> Option<FontMetrics> {
        None
    }
}

/// Table-backed resolver.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    fonts: FxHashMap<String, FontMetrics>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, metrics: FontMetrics) {
        self.fonts.insert(name.into(), metrics);
    }
}

impl FontResolver for MapResolver {
    fn lookup_font(&self, name: &str) -> Option<FontMetrics> {
        self.fonts.get(name).cloned()
    }
}

/// Minimal ToUnicode CMap: `bfchar` and `bfrange` sections only.
///
/// Codespace and notdef sections are skipped; redaction correctness never
/// depends on decoded text, only the TextShow payload does.
#[derive(Debug, Clone, Default)]
pub struct ToUnicodeMap {
    singles: FxHashMap<u32, char>,
    ranges: Vec<(u32, u32, u32)>,
}

#[derive(PartialEq, Clone, Copy)]
enum CMapSection {
    Idle,
    BfChar,
    BfRange,
}

impl ToUnicodeMap {
    /// Parse the decoded bytes of a ToUnicode stream.
    pub fn parse(data: &[u8]) -> Self {
        let mut map = ToUnicodeMap::default();
        let mut lexer = ContentLexer::new(data);
        let mut section = CMapSection::Idle;
        let mut pending: Vec<Token> = Vec::new();

        while let Some(result) = lexer.next_token() {
            let Ok(lexeme) = result else { break };
            match lexeme.token {
                Token::Operator(Keyword::Unknown(kw)) => {
                    match kw.as_slice() {
                        b"beginbfchar" => section = CMapSection::BfChar,
                        b"beginbfrange" => section = CMapSection::BfRange,
                        b"endbfchar" | b"endbfrange" => section = CMapSection::Idle,
                        _ => continue,
                    }
                    pending.clear();
                }
                token if section != CMapSection::Idle => {
                    pending.push(token);
                    match section {
                        CMapSection::BfChar => map.drain_bfchar(&mut pending),
                        CMapSection::BfRange => map.drain_bfrange(&mut pending),
                        CMapSection::Idle => {}
                    }
                }
                _ => {}
            }
        }
        map
    }

    fn drain_bfchar(&mut self, pending: &mut Vec<Token>) {
        while pending.len() >= 2 {
            let dst = pending.remove(1);
            let src = pending.remove(0);
            if let (Token::HexString(src), Token::HexString(dst)) = (src, dst) {
                if let Some(ch) = utf16be_char(&dst) {
                    self.singles.insert(code_from_bytes(&src), ch);
                }
            }
        }
    }

    fn drain_bfrange(&mut self, pending: &mut Vec<Token>) {
        loop {
            if pending.len() < 3 {
                return;
            }
            match &pending[2] {
                Token::HexString(_) => {
                    let dst = pending.remove(2);
                    let hi = pending.remove(1);
                    let lo = pending.remove(0);
                    if let (Token::HexString(lo), Token::HexString(hi), Token::HexString(dst)) =
                        (lo, hi, dst)
                    {
                        if let Some(base) = utf16be_char(&dst) {
                            self.ranges.push((
                                code_from_bytes(&lo),
                                code_from_bytes(&hi),
                                base as u32,
                            ));
                        }
                    }
                }
                Token::ArrayStart => {
                    let Some(end) = pending
                        .iter()
                        .position(|t| matches!(t, Token::ArrayEnd))
                    else {
                        return; // array not complete yet
                    };
                    if end < 3 {
                        pending.remove(0);
                        continue;
                    }
                    let entries: Vec<Token> = pending.drain(3..end).collect();
                    // Remaining: lo, hi, ArrayStart, ArrayEnd.
                    pending.drain(2..4);
                    let hi = pending.remove(1);
                    let lo = pending.remove(0);
                    if let (Token::HexString(lo), Token::HexString(_hi)) = (lo, hi) {
                        let base = code_from_bytes(&lo);
                        for (offset, entry) in entries.iter().enumerate() {
                            if let Token::HexString(dst) = entry {
                                if let Some(ch) = utf16be_char(dst) {
                                    self.singles.insert(base + offset as u32, ch);
                                }
                            }
                        }
                    }
                }
                _ => {
                    // Malformed entry; resynchronize by dropping one token.
                    pending.remove(0);
                }
            }
        }
    }

    pub fn lookup(&self, code: u32) -> Option<char> {
        if let Some(&ch) = self.singles.get(&code) {
            return Some(ch);
        }
        for &(lo, hi, base) in &self.ranges {
            if code >= lo && code <= hi {
                return char::from_u32(base + (code - lo));
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.ranges.is_empty()
    }
}

/// Big-endian code value of a CMap hex token.
fn code_from_bytes(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

/// First character of a UTF-16BE destination string.
fn utf16be_char(bytes: &[u8]) -> Option<char> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    char::decode_utf16(units).next().and_then(|r| r.ok())
}
