//! Utility Functions

pub mod error;
