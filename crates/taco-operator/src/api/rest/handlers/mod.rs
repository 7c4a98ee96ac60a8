//! API request handlers

mod health;
mod orders;
mod secrets;

pub use health::*;
pub use orders::*;
pub use secrets::*;
