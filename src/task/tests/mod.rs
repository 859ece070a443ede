//! Unit tests for the task domain.

mod domain_tests;
