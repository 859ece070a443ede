//! Unit tests for token-bucket rate limiting.
