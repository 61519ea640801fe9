//! Common types for the timeclock workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
