pub mod frame;
pub mod raw;
pub mod panel;

pub use frame::*;
pub use raw::*;
pub use panel::*;
