//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one part of the port
//! against the local bus and mock/simulated readers.  All tests run on the
//! host (x86_64) with no real hardware required.

mod event_tests;
mod mock_reader;
mod request_tests;
