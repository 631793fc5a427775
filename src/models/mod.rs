pub mod enums;
pub mod classification;
pub mod document;

pub use classification::*;
pub use document::*;
pub use enums::*;
