pub mod lower;
pub mod nodes;

pub use nodes::*;
