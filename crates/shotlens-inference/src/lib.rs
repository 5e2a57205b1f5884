//! # shotlens-inference
//!
//! Model-backed document reconstruction for shotlens.
//!
//! [`OllamaReconstructor`] implements
//! [`DocumentReconstructor`](shotlens_core::DocumentReconstructor) by asking a
//! local Ollama model to lay out the recognized text blocks. The analysis
//! pipeline falls back to the heuristic reconstructor whenever it fails.
//!
//! # Example
//!
//! ```rust,no_run
//! use shotlens_inference::OllamaReconstructor;
//!
//! #[tokio::main]
//! async fn main() {
//!     if let Ok(Some(reconstructor)) = OllamaReconstructor::from_env() {
//!         let up = reconstructor.health_check().await.unwrap_or(false);
//!         println!("{} reachable: {up}", reconstructor.model());
//!     }
//! }
//! ```

pub mod ollama;
pub mod response;

pub use ollama::{env_base_url, OllamaReconstructor};
pub use response::clean_response;
