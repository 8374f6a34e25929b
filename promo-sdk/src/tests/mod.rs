//! Unit tests for the promo SDK
//!
//! This module contains tests for the SDK components working together.

pub mod ollama_mock_tests;
pub mod resilience_tests;
pub mod selection_tests;
