pub mod parsers;

pub use parsers::*;
