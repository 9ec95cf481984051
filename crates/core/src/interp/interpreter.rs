//! Content stream interpretation.
//!
//! `ContentParser` stacks operand tokens until an operator keyword arrives
//! and assembles arrays and dictionaries, with special handling for the
//! `BI`/`ID`/`EI` inline-image sequence. `PageInterpreter` consumes the
//! resulting events, maintains graphics and text state, and emits one
//! annotated [`Operation`] per operator.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::FxHashMap;
use tracing::{error, warn};

use crate::diag::{DiagKind, Diagnostic};
use crate::error::{RedactError, Result};
use crate::font::{FontMetrics, FontResolver};
use crate::interp::ops::text::ShowItem;
use crate::model::ops::{OpKind, Operands, Operation, OperationSeq};
use crate::model::state::{GraphicsState, TextState};
use crate::parser::lexer::{ContentLexer, Keyword, Token};
use crate::redact::rotate::Rotation;
use crate::utils::{Point, Rect};

/// Cancellation is checked at `BT`, `ET`, and every this many tokens.
const CANCEL_CHECK_INTERVAL: usize = 1024;

/// Cooperative cancellation handle shared between a caller and one or more
/// page interpretation passes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Parsed content-stream event: an operator with its operands, or an inline
/// image.
pub(crate) enum Event {
    Operator {
        pos: usize,
        keyword: Keyword,
        operands: Operands,
    },
    InlineImage {
        pos: usize,
        params: Vec<(String, Token)>,
        payload: Vec<u8>,
    },
}

/// Context frame for array/dict construction.
enum Ctx {
    Array(Vec<Token>),
    Dict(Vec<Token>),
}

/// Groups lexemes into operator events.
pub(crate) struct ContentParser<'a> {
    lexer: ContentLexer<'a>,
    operands: Vec<Token>,
    contexts: Vec<Ctx>,
    in_inline: bool,
    inline_start: usize,
    tokens_seen: usize,
}

impl<'a> ContentParser<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: ContentLexer::new(data),
            operands: Vec::new(),
            contexts: Vec::new(),
            in_inline: false,
            inline_start: 0,
            tokens_seen: 0,
        }
    }

    pub(crate) fn tokens_seen(&self) -> usize {
        self.tokens_seen
    }

    /// Operands left on the stack at end of stream.
    pub(crate) fn take_leftover(&mut self) -> Vec<Token> {
        std::mem::take(&mut self.operands)
    }

    fn push_operand(&mut self, token: Token) {
        if let Some(ctx) = self.contexts.last_mut() {
            match ctx {
                Ctx::Array(items) | Ctx::Dict(items) => items.push(token),
            }
        } else {
            self.operands.push(token);
        }
    }

    pub(crate) fn next_event(&mut self) -> Option<Result<Event>> {
        loop {
            let lexeme = match self.lexer.next_token()? {
                Ok(l) => l,
                Err(e) => return Some(Err(e)),
            };
            self.tokens_seen += 1;

            match lexeme.token {
                Token::ArrayStart => self.contexts.push(Ctx::Array(Vec::new())),
                Token::ArrayEnd => match self.contexts.pop() {
                    Some(Ctx::Array(items)) => self.push_operand(Token::Array(items)),
                    Some(other) => self.contexts.push(other),
                    None => {}
                },
                Token::DictStart => self.contexts.push(Ctx::Dict(Vec::new())),
                Token::DictEnd => match self.contexts.pop() {
                    Some(Ctx::Dict(items)) => {
                        self.push_operand(Token::Dict(build_dict(items)));
                    }
                    Some(other) => self.contexts.push(other),
                    None => {}
                },
                Token::Operator(Keyword::BI) if self.contexts.is_empty() && !self.in_inline => {
                    self.in_inline = true;
                    self.inline_start = lexeme.start;
                    self.operands.clear();
                }
                Token::Operator(Keyword::ID) if self.in_inline && self.contexts.is_empty() => {
                    self.in_inline = false;
                    let params = build_dict(std::mem::take(&mut self.operands));
                    match self.lexer.read_inline_payload() {
                        Ok(payload) => {
                            return Some(Ok(Event::InlineImage {
                                pos: self.inline_start,
                                params,
                                payload,
                            }));
                        }
                        Err(e) => return Some(Err(e)),
                    }
                }
                // An EI outside an inline image has nothing to terminate.
                Token::Operator(Keyword::EI) => {}
                Token::Operator(keyword) => {
                    if self.in_inline || !self.contexts.is_empty() {
                        // Keywords inside a composite (e.g. `true` in a gs
                        // dict) are operands, not operators.
                        self.push_operand(Token::Operator(keyword));
                    } else {
                        let operands = Operands::from_vec(std::mem::take(&mut self.operands));
                        return Some(Ok(Event::Operator {
                            pos: lexeme.start,
                            keyword,
                            operands,
                        }));
                    }
                }
                token => self.push_operand(token),
            }
        }
    }
}

/// Key/value pairs from a flat token list, preserving source order.
fn build_dict(items: Vec<Token>) -> Vec<(String, Token)> {
    let mut dict = Vec::new();
    let mut iter = items.into_iter();
    while let Some(key) = iter.next() {
        if let Token::Name(name) = key
            && let Some(value) = iter.next()
        {
            dict.push((name, value));
        }
    }
    dict
}

/// Bounding-box accumulator for the current path.
#[derive(Debug, Default)]
pub(crate) struct PathBounds {
    pub(crate) bbox: Option<Rect>,
    pub(crate) current: Option<Point>,
    pub(crate) subpath_start: Option<Point>,
}

impl PathBounds {
    pub(crate) fn add_point(&mut self, p: Point) {
        self.bbox = Some(match self.bbox {
            Some(r) => (r.0.min(p.0), r.1.min(p.1), r.2.max(p.0), r.3.max(p.1)),
            None => (p.0, p.1, p.0, p.1),
        });
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Stateful interpreter for one page's content stream.
pub struct PageInterpreter<'a> {
    pub(crate) resolver: &'a dyn FontResolver,
    cancel: Option<&'a CancelToken>,
    media_box: (f64, f64),
    rotation: Rotation,
    pub(crate) gstate: GraphicsState,
    pub(crate) gstack: Vec<GraphicsState>,
    pub(crate) tstate: TextState,
    pub(crate) in_text: bool,
    pub(crate) path: PathBounds,
    pub(crate) pending_clip: bool,
    pub(crate) clip_count: u32,
    pub(crate) font_cache: FxHashMap<String, Option<Arc<FontMetrics>>>,
    pub(crate) warned_no_font: bool,
    pub(crate) q_underflow: usize,
    pub(crate) ops: Vec<Operation>,
    pub(crate) diags: Vec<Diagnostic>,
}

impl<'a> PageInterpreter<'a> {
    pub fn new(resolver: &'a dyn FontResolver, rotation: Rotation, media_box: (f64, f64)) -> Self {
        Self {
            resolver,
            cancel: None,
            media_box,
            rotation,
            gstate: GraphicsState::new(),
            gstack: Vec::new(),
            tstate: TextState::new(),
            in_text: false,
            path: PathBounds::default(),
            pending_clip: false,
            clip_count: 0,
            font_cache: FxHashMap::default(),
            warned_no_font: false,
            q_underflow: 0,
            ops: Vec::new(),
            diags: Vec::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub(crate) fn warn(&mut self, kind: DiagKind, pos: usize, message: impl Into<String>) {
        let message = message.into();
        warn!(pos, ?kind, "{message}");
        self.diags.push(Diagnostic::warning(kind, pos, message));
    }

    pub(crate) fn error(&mut self, kind: DiagKind, pos: usize, message: impl Into<String>) {
        let message = message.into();
        error!(pos, ?kind, "{message}");
        self.diags.push(Diagnostic::error(kind, pos, message));
    }

    pub(crate) fn check_cancel(&self) -> Result<()> {
        if self.cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(RedactError::Cancelled);
        }
        Ok(())
    }

    /// Interpret one decoded content stream.
    pub fn run(&mut self, data: &[u8]) -> Result<()> {
        let mut parser = ContentParser::new(data);
        let mut last_cancel_check = 0usize;

        loop {
            if parser.tokens_seen() - last_cancel_check >= CANCEL_CHECK_INTERVAL {
                last_cancel_check = parser.tokens_seen();
                self.check_cancel()?;
            }
            match parser.next_event() {
                None => break,
                Some(Err(e)) => return Err(e),
                Some(Ok(Event::Operator {
                    pos,
                    keyword,
                    operands,
                })) => self.handle_operator(pos, keyword, operands)?,
                Some(Ok(Event::InlineImage {
                    pos,
                    params,
                    payload,
                })) => self.handle_inline_image(pos, params, payload),
            }
        }

        let leftover = parser.take_leftover();
        if !leftover.is_empty() {
            self.warn(
                DiagKind::MalformedOperand,
                data.len(),
                format!("{} trailing operand(s) with no operator", leftover.len()),
            );
        }
        if !self.gstack.is_empty() {
            self.warn(
                DiagKind::UnbalancedState,
                data.len(),
                format!("{} unmatched q at end of stream", self.gstack.len()),
            );
        }
        if self.in_text {
            self.warn(
                DiagKind::UnbalancedState,
                data.len(),
                "BT without matching ET at end of stream",
            );
        }
        Ok(())
    }

    /// Consume the interpreter and hand over the annotated sequence.
    pub fn finish(self) -> OperationSeq {
        OperationSeq {
            ops: self.ops,
            diagnostics: self.diags,
            media_box: self.media_box,
            rotation: self.rotation,
        }
    }

    /// Operand arity/type failure: log, skip the handler, pass the
    /// operation through opaquely so state stays synchronized.
    fn malformed(&mut self, pos: usize, keyword: &Keyword) -> OpKind {
        self.warn(
            DiagKind::MalformedOperand,
            pos,
            format!(
                "malformed operands for {}",
                String::from_utf8_lossy(keyword.as_bytes())
            ),
        );
        OpKind::State
    }

    fn handle_operator(&mut self, pos: usize, keyword: Keyword, operands: Operands) -> Result<()> {
        use Keyword as K;

        let kind = match &keyword {
            // Graphics state
            K::Qq => {
                self.do_q();
                OpKind::State
            }
            K::Q => {
                self.do_Q(pos)?;
                OpKind::State
            }
            K::Cm => match last_numbers::<6>(&operands) {
                Some([a, b, c, d, e, f]) => {
                    self.do_cm((a, b, c, d, e, f));
                    OpKind::State
                }
                None => self.malformed(pos, &keyword),
            },
            K::Ww => match last_numbers::<1>(&operands) {
                Some([w]) => {
                    self.do_w(w);
                    OpKind::State
                }
                None => self.malformed(pos, &keyword),
            },
            K::D => {
                self.do_d(&operands);
                OpKind::State
            }
            K::J | K::Jj | K::M | K::Ri | K::I | K::Gs => OpKind::State,

            // Color
            K::G => match last_numbers::<1>(&operands) {
                Some([v]) => {
                    self.do_G(v);
                    OpKind::State
                }
                None => self.malformed(pos, &keyword),
            },
            K::Gg => match last_numbers::<1>(&operands) {
                Some([v]) => {
                    self.do_g(v);
                    OpKind::State
                }
                None => self.malformed(pos, &keyword),
            },
            K::RG => match last_numbers::<3>(&operands) {
                Some([r, g, b]) => {
                    self.do_RG(r, g, b);
                    OpKind::State
                }
                None => self.malformed(pos, &keyword),
            },
            K::Rg => match last_numbers::<3>(&operands) {
                Some([r, g, b]) => {
                    self.do_rg(r, g, b);
                    OpKind::State
                }
                None => self.malformed(pos, &keyword),
            },
            K::K => match last_numbers::<4>(&operands) {
                Some([c, m, y, k]) => {
                    self.do_K(c, m, y, k);
                    OpKind::State
                }
                None => self.malformed(pos, &keyword),
            },
            K::Kk => match last_numbers::<4>(&operands) {
                Some([c, m, y, k]) => {
                    self.do_k(c, m, y, k);
                    OpKind::State
                }
                None => self.malformed(pos, &keyword),
            },
            // Color space selection and component-wise colors stay opaque.
            K::CS | K::Cs | K::SC | K::SCN | K::Sc | K::Scn => OpKind::State,

            // Path construction
            K::Mm => match last_numbers::<2>(&operands) {
                Some([x, y]) => {
                    self.do_m(x, y);
                    OpKind::State
                }
                None => self.malformed(pos, &keyword),
            },
            K::L => match last_numbers::<2>(&operands) {
                Some([x, y]) => {
                    self.do_l(x, y);
                    OpKind::State
                }
                None => self.malformed(pos, &keyword),
            },
            K::C => match last_numbers::<6>(&operands) {
                Some([x1, y1, x2, y2, x3, y3]) => {
                    self.do_c(x1, y1, x2, y2, x3, y3);
                    OpKind::State
                }
                None => self.malformed(pos, &keyword),
            },
            K::V => match last_numbers::<4>(&operands) {
                Some([x2, y2, x3, y3]) => {
                    self.do_v(x2, y2, x3, y3);
                    OpKind::State
                }
                None => self.malformed(pos, &keyword),
            },
            K::Y => match last_numbers::<4>(&operands) {
                Some([x1, y1, x3, y3]) => {
                    self.do_y(x1, y1, x3, y3);
                    OpKind::State
                }
                None => self.malformed(pos, &keyword),
            },
            K::H => {
                self.do_h();
                OpKind::State
            }
            K::Re => match last_numbers::<4>(&operands) {
                Some([x, y, w, h]) => {
                    self.do_re(x, y, w, h);
                    OpKind::State
                }
                None => self.malformed(pos, &keyword),
            },

            // Path painting
            K::S | K::Ss | K::F | K::Ff | K::FStar | K::B | K::BStar | K::Bb | K::BbStar
            | K::N => OpKind::PathPaint {
                bbox: self.paint_path(),
            },

            // Clipping: pass-through; the path survives until the next
            // painter consumes it.
            K::WClip | K::WStar => {
                self.pending_clip = true;
                OpKind::State
            }

            // Text object
            K::BT => {
                self.check_cancel()?;
                self.do_BT(pos);
                OpKind::TextBegin
            }
            K::ET => {
                self.check_cancel()?;
                self.do_ET(pos);
                OpKind::TextEnd
            }

            // Text state
            K::Tc => match last_numbers::<1>(&operands) {
                Some([v]) => {
                    self.do_Tc(v);
                    OpKind::TextState
                }
                None => self.malformed(pos, &keyword),
            },
            K::Tw => match last_numbers::<1>(&operands) {
                Some([v]) => {
                    self.do_Tw(v);
                    OpKind::TextState
                }
                None => self.malformed(pos, &keyword),
            },
            K::Tz => match last_numbers::<1>(&operands) {
                Some([v]) => {
                    self.do_Tz(v);
                    OpKind::TextState
                }
                None => self.malformed(pos, &keyword),
            },
            K::TL => match last_numbers::<1>(&operands) {
                Some([v]) => {
                    self.do_TL(v);
                    OpKind::TextState
                }
                None => self.malformed(pos, &keyword),
            },
            K::Ts => match last_numbers::<1>(&operands) {
                Some([v]) => {
                    self.do_Ts(v);
                    OpKind::TextState
                }
                None => self.malformed(pos, &keyword),
            },
            K::Tr => match operands.last().and_then(Token::as_i64) {
                Some(mode) => {
                    self.do_Tr(pos, mode);
                    OpKind::TextState
                }
                None => self.malformed(pos, &keyword),
            },
            K::Tf => {
                let name = operands
                    .len()
                    .checked_sub(2)
                    .and_then(|i| operands[i].as_name());
                let size = operands.last().and_then(Token::as_f64);
                match (name, size) {
                    (Some(name), Some(size)) => {
                        let name = name.to_string();
                        self.do_Tf(pos, &name, size);
                        OpKind::TextState
                    }
                    _ => self.malformed(pos, &keyword),
                }
            }

            // Text positioning
            K::Td => match last_numbers::<2>(&operands) {
                Some([tx, ty]) => {
                    self.do_Td(tx, ty);
                    OpKind::TextState
                }
                None => self.malformed(pos, &keyword),
            },
            K::TD => match last_numbers::<2>(&operands) {
                Some([tx, ty]) => {
                    self.do_TD(tx, ty);
                    OpKind::TextState
                }
                None => self.malformed(pos, &keyword),
            },
            K::Tm => match last_numbers::<6>(&operands) {
                Some([a, b, c, d, e, f]) => {
                    self.do_Tm(a, b, c, d, e, f);
                    OpKind::TextState
                }
                None => self.malformed(pos, &keyword),
            },
            K::TStar => {
                self.do_T_star();
                OpKind::TextState
            }

            // Text showing
            K::Tj => match operands.last().and_then(Token::as_string_bytes) {
                Some(bytes) => {
                    let items = [ShowItem::Bytes(bytes.to_vec())];
                    OpKind::TextShow(self.do_show(pos, &items))
                }
                None => self.malformed(pos, &keyword),
            },
            K::TJ => match operands.last() {
                Some(Token::Array(elements)) => {
                    let items = self.show_items_from_array(pos, elements);
                    OpKind::TextShow(self.do_show(pos, &items))
                }
                _ => self.malformed(pos, &keyword),
            },
            K::Quote => match operands.last().and_then(Token::as_string_bytes) {
                Some(bytes) => {
                    let items = [ShowItem::Bytes(bytes.to_vec())];
                    self.do_T_star();
                    OpKind::TextShow(self.do_show(pos, &items))
                }
                None => self.malformed(pos, &keyword),
            },
            K::DoubleQuote => {
                let aw = operands
                    .len()
                    .checked_sub(3)
                    .and_then(|i| operands[i].as_f64());
                let ac = operands
                    .len()
                    .checked_sub(2)
                    .and_then(|i| operands[i].as_f64());
                let bytes = operands.last().and_then(Token::as_string_bytes);
                match (aw, ac, bytes) {
                    (Some(aw), Some(ac), Some(bytes)) => {
                        let items = [ShowItem::Bytes(bytes.to_vec())];
                        self.do_Tw(aw);
                        self.do_Tc(ac);
                        self.do_T_star();
                        OpKind::TextShow(self.do_show(pos, &items))
                    }
                    _ => self.malformed(pos, &keyword),
                }
            }

            // XObject
            K::Do => match operands.last().and_then(Token::as_name) {
                Some(name) => {
                    let name = name.to_string();
                    self.do_Do(name)
                }
                None => self.malformed(pos, &keyword),
            },

            // Marked content
            K::MP | K::DP | K::BMC | K::BDC | K::EMC => OpKind::MarkedContent,

            // Shading, Type3 widths, compatibility
            K::Sh | K::D0 | K::D1 | K::BX | K::EX => OpKind::State,

            // BI/ID/EI never reach dispatch; the content parser folds them
            // into an InlineImage event.
            K::BI | K::ID | K::EI => OpKind::State,

            K::Unknown(bytes) => {
                self.warn(
                    DiagKind::UnknownOperator,
                    pos,
                    format!("unknown operator {:?}", String::from_utf8_lossy(bytes)),
                );
                OpKind::State
            }
        };

        self.ops.push(Operation {
            keyword,
            operands,
            pos,
            kind,
        });
        Ok(())
    }

    /// Convert a TJ array into show items, keeping element indices aligned
    /// with the source array.
    fn show_items_from_array(&mut self, pos: usize, elements: &[Token]) -> Vec<ShowItem> {
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                Token::LiteralString(b) | Token::HexString(b) => {
                    items.push(ShowItem::Bytes(b.clone()));
                }
                Token::Int(_) | Token::Real(_) => {
                    items.push(ShowItem::Adjust(element.as_f64().unwrap_or(0.0)));
                }
                other => {
                    self.warn(
                        DiagKind::MalformedOperand,
                        pos,
                        format!("unexpected {other:?} in TJ array"),
                    );
                    items.push(ShowItem::Adjust(0.0));
                }
            }
        }
        items
    }
}

/// The last `N` operands as numbers, or `None` when there are too few or a
/// non-numeric operand among them.
fn last_numbers<const N: usize>(operands: &Operands) -> Option<[f64; N]> {
    if operands.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (i, tok) in operands[operands.len() - N..].iter().enumerate() {
        out[i] = tok.as_f64()?;
    }
    Some(out)
}

/// Interpret a single decoded content stream.
pub fn interpret(
    data: &[u8],
    resolver: &dyn FontResolver,
    rotation: Rotation,
    media_box: (f64, f64),
) -> Result<OperationSeq> {
    interpret_with_cancel(data, resolver, rotation, media_box, None)
}

/// [`interpret`] with a cooperative cancellation token.
pub fn interpret_with_cancel(
    data: &[u8],
    resolver: &dyn FontResolver,
    rotation: Rotation,
    media_box: (f64, f64),
    cancel: Option<&CancelToken>,
) -> Result<OperationSeq> {
    let mut interp = PageInterpreter::new(resolver, rotation, media_box);
    if let Some(cancel) = cancel {
        interp = interp.with_cancel(cancel);
    }
    interp.run(data)?;
    Ok(interp.finish())
}

/// Interpret a page whose content is split across several streams.
///
/// Segments are joined with a single space, the way a page's Contents array
/// concatenates; positions are offsets into that virtual concatenation.
pub fn interpret_segments(
    segments: &[&[u8]],
    resolver: &dyn FontResolver,
    rotation: Rotation,
    media_box: (f64, f64),
) -> Result<OperationSeq> {
    let total: usize = segments.iter().map(|s| s.len() + 1).sum();
    let mut data = Vec::with_capacity(total);
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            data.push(b' ');
        }
        data.extend_from_slice(segment);
    }
    interpret(&data, resolver, rotation, media_box)
}
