//! Operator handler implementations, grouped by category:
//! - `graphics_state` - state stack, transforms and color (q, Q, cm, w, d, G..k)
//! - `path` - path construction and painting (m..re, S..n)
//! - `text` - text object, state, positioning and showing (BT..ET, Tc..", Td..T*)
//! - `xobject` - XObject invocation and inline images (Do, BI/ID/EI)
//!
//! Each file adds an impl block to `PageInterpreter`; dispatch lives in
//! `interp::interpreter`.

mod graphics_state;
mod path;
pub(crate) mod text;
mod xobject;
