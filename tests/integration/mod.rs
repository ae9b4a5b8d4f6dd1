//! Integration Tests Module
//!
//! End-to-end tests for the translation engines, the retry loop and the
//! verification cycle. LLM traffic is served by a scripted in-memory
//! provider; HTTP scenarios run against in-process axum servers.

// Shared fixtures (scripted provider, fake verifier, sample projects)
mod support;

// Batch and iterative engines
mod translation_test;

// Retry orchestration with feedback
mod retry_test;

// Test Executor driven through the retry loop
mod verification_test;
