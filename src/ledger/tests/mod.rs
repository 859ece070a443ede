//! Unit tests for the pending request ledger.

mod ledger_tests;
