//! Repository layer: classification history operations on a `&Connection`.

mod document;

pub use document::*;
