//! Generates the standalone HTML document an exported game runs in.
//!
//! This module is split into:
//! - `html`: the document template (wrap_html)
//! - `engine`: the inlined browser engine
//! - `helpers`: escaping for the payload and title

mod engine;
mod helpers;
mod html;

pub use html::wrap_html;
