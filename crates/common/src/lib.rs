//! Shared types for the bearer authentication workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
