//! Label layer: the declared label-format grammar and the parser that turns
//! one raw user entry into a storable value.
//!
//! Parsing is pure. An entry is either a value of the declared kind, the
//! end-of-session sentinel (the empty entry), or invalid; invalid entries are
//! never stored.

pub mod format;
pub mod parse;
pub mod value;

pub use format::LabelFormat;
pub use parse::{Parsed, parse};
pub use value::Value;
