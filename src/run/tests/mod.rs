//! Unit tests for runs and the result store.
