//! Unit tests for the JSON record directory.
