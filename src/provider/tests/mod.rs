//! Unit tests for provider classification, retry, and dispatch.
