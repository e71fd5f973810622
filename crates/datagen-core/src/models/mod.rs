//! Data models for the generation workflow
//!
//! Everything here is created per user action and dropped once the result has
//! been presented. Nothing is persisted between runs.

mod artifact;
mod generation;
mod schema;

pub use artifact::*;
pub use generation::*;
pub use schema::*;
