//! Unit tests for batch sizing and queue draining.

mod sizing_tests;
