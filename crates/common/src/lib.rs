//! Common types shared by the Keeper client crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
