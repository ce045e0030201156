//! Automatic task status cycling for markdown checkboxes.
//!
//! Editing the mark inside `- [ ]` is intercepted as a transaction and rewritten so the
//! mark advances to the next state of a configured cycle.

pub mod cli;
pub mod io;
pub mod model;
pub mod ops;
pub mod parse;
pub mod util;
