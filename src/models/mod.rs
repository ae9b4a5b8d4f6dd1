//! Data Models

pub mod config;
