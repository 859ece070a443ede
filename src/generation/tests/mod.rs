//! Unit tests for batch generation.
