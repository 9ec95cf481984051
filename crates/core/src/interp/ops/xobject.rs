//! XObject invocation and inline images.
//!
//! Handles: Do and the BI/ID/EI sequence (delivered pre-parsed by the
//! content parser). Both kinds get the bbox of the unit square under the
//! current CTM; the CTM itself is recorded so a black-box overlay can be
//! placed back into stream coordinates.

use crate::interp::interpreter::PageInterpreter;
use crate::model::ops::{InlineImage, OpKind, Operands, Operation};
use crate::parser::lexer::{Keyword, Token};
use crate::utils::apply_matrix_rect;

#[allow(non_snake_case)]
impl<'a> PageInterpreter<'a> {
    /// Do - Invoke a named XObject.
    pub(crate) fn do_Do(&mut self, name: String) -> OpKind {
        let ctm = self.gstate.ctm;
        OpKind::XObject {
            name,
            ctm,
            bbox: apply_matrix_rect(ctm, (0.0, 0.0, 1.0, 1.0)),
        }
    }

    /// BI ... ID ... EI - Record an inline image.
    pub(crate) fn handle_inline_image(
        &mut self,
        pos: usize,
        params: Vec<(String, Token)>,
        payload: Vec<u8>,
    ) {
        let width = find_param(&params, "W", "Width").and_then(Token::as_i64);
        let height = find_param(&params, "H", "Height").and_then(Token::as_i64);
        let bits_per_component =
            find_param(&params, "BPC", "BitsPerComponent").and_then(Token::as_i64);
        let color_space = find_param(&params, "CS", "ColorSpace")
            .and_then(Token::as_name)
            .map(str::to_owned);
        let filter = find_param(&params, "F", "Filter").and_then(first_filter_name);

        let ctm = self.gstate.ctm;
        let image = InlineImage {
            params,
            width,
            height,
            bits_per_component,
            color_space,
            filter,
            payload,
            ctm,
            bbox: apply_matrix_rect(ctm, (0.0, 0.0, 1.0, 1.0)),
        };
        self.ops.push(Operation {
            keyword: Keyword::BI,
            operands: Operands::new(),
            pos,
            kind: OpKind::InlineImage(image),
        });
    }
}

/// Last value for either the abbreviated or the full parameter key.
fn find_param<'p>(params: &'p [(String, Token)], short: &str, long: &str) -> Option<&'p Token> {
    params
        .iter()
        .rev()
        .find(|(k, _)| k == short || k == long)
        .map(|(_, v)| v)
}

/// Filter name, taking the first element of an array form.
fn first_filter_name(token: &Token) -> Option<String> {
    match token {
        Token::Name(name) => Some(name.clone()),
        Token::Array(items) => items.first().and_then(Token::as_name).map(str::to_owned),
        _ => None,
    }
}
