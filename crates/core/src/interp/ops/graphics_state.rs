//! Graphics state and color operators.
//!
//! Handles: q, Q, cm, w, d, G, g, RG, rg, K, k.
//!
//! Line cap/join, miter limit, rendering intent, flatness, `gs` dictionaries
//! and component-wise color operators are opaque pass-through: they never
//! influence a redaction decision and always survive rewriting, so the
//! interpreter does not mirror them.

use crate::diag::DiagKind;
use crate::error::{RedactError, Result};
use crate::interp::interpreter::PageInterpreter;
use crate::model::ops::Operands;
use crate::model::state::Color;
use crate::parser::lexer::Token;
use crate::utils::{Matrix, mult_matrix};

/// `Q` underflows tolerated before the imbalance is fatal.
const MAX_Q_UNDERFLOW: usize = 16;

#[allow(non_snake_case)]
impl<'a> PageInterpreter<'a> {
    /// q - Save graphics state.
    pub(crate) fn do_q(&mut self) {
        self.gstack.push(self.gstate.clone());
    }

    /// Q - Restore graphics state.
    ///
    /// Underflow skips the pop and continues with the state unchanged; the
    /// operator itself still passes through.
    pub(crate) fn do_Q(&mut self, pos: usize) -> Result<()> {
        match self.gstack.pop() {
            Some(state) => self.gstate = state,
            None => {
                self.q_underflow += 1;
                self.warn(
                    DiagKind::UnbalancedState,
                    pos,
                    "Q with empty graphics state stack",
                );
                if self.q_underflow > MAX_Q_UNDERFLOW {
                    let msg = format!("{} more Q than q", self.q_underflow);
                    self.error(DiagKind::UnbalancedState, pos, msg.clone());
                    return Err(RedactError::UnbalancedState { pos, msg });
                }
            }
        }
        Ok(())
    }

    /// cm - Concatenate matrix to the CTM (left-multiply).
    pub(crate) fn do_cm(&mut self, m: Matrix) {
        self.gstate.ctm = mult_matrix(m, self.gstate.ctm);
    }

    /// w - Set line width.
    pub(crate) fn do_w(&mut self, width: f64) {
        self.gstate.paint.line_width = width;
    }

    /// d - Set dash pattern: `[array] phase d`.
    pub(crate) fn do_d(&mut self, operands: &Operands) {
        if operands.len() < 2 {
            return;
        }
        let phase = operands[operands.len() - 1].as_f64();
        let array = match &operands[operands.len() - 2] {
            Token::Array(items) => {
                let nums: Option<Vec<f64>> = items.iter().map(Token::as_f64).collect();
                nums
            }
            _ => None,
        };
        if let (Some(array), Some(phase)) = (array, phase) {
            self.gstate.paint.dash = Some((array, phase));
        }
    }

    /// G - Set stroking gray level.
    pub(crate) fn do_G(&mut self, gray: f64) {
        self.gstate.paint.stroke = Color::Gray(gray);
    }

    /// g - Set non-stroking gray level.
    pub(crate) fn do_g(&mut self, gray: f64) {
        self.gstate.paint.fill = Color::Gray(gray);
    }

    /// RG - Set stroking RGB color.
    pub(crate) fn do_RG(&mut self, r: f64, g: f64, b: f64) {
        self.gstate.paint.stroke = Color::Rgb(r, g, b);
    }

    /// rg - Set non-stroking RGB color.
    pub(crate) fn do_rg(&mut self, r: f64, g: f64, b: f64) {
        self.gstate.paint.fill = Color::Rgb(r, g, b);
    }

    /// K - Set stroking CMYK color.
    pub(crate) fn do_K(&mut self, c: f64, m: f64, y: f64, k: f64) {
        self.gstate.paint.stroke = Color::Cmyk(c, m, y, k);
    }

    /// k - Set non-stroking CMYK color.
    pub(crate) fn do_k(&mut self, c: f64, m: f64, y: f64, k: f64) {
        self.gstate.paint.fill = Color::Cmyk(c, m, y, k);
    }
}
