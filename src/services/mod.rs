//! Business Logic Services

pub mod translation;
