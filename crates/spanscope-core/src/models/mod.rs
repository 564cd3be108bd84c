//! Data models for Spanscope

mod intent;
mod result;
mod row;
mod window;

pub use intent::*;
pub use result::*;
pub use row::*;
pub use window::*;
