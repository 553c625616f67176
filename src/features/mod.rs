pub mod indicators;
pub mod engine;

pub use engine::*;
