//! Data models for the signed-in identity

mod account;
mod identity;

pub use account::*;
pub use identity::*;
