//! Plain data carried between the pipeline stages.

pub mod catalog;
pub mod product;

pub use catalog::*;
pub use product::*;
