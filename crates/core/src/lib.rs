//! Project Translator Core
//!
//! Foundational error types and persistence helpers shared by every crate in
//! the Project Translator workspace. This crate has no dependencies on the
//! LLM, tool, or verification layers.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `persist` - Atomic JSON/text writes and JSON reads

pub mod error;
pub mod persist;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Persistence ────────────────────────────────────────────────────────
pub use persist::{read_json, write_json_atomic, write_text_atomic};
