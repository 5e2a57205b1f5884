//! # shotlens-core
//!
//! Core types, traits, and abstractions for the shotlens screenshot
//! understanding library.
//!
//! This crate provides the foundational data structures and the trait
//! boundaries (recognizer, reconstructor, data detector, name recognizer)
//! that the other shotlens crates depend on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
