//! Test support for the run database crates
//!
//! Logging initialization shared by unit and integration tests, throwaway
//! credential homes with exact Unix modes, and unique run identifiers.

pub mod fixtures;
pub mod test_logging;
pub mod unique;
