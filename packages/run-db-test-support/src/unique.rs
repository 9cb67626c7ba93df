//! Unique identifiers for test isolation

use ulid::Ulid;

/// Generate a run identifier that is also a valid database name component.
///
/// # Examples
/// ```
/// use run_db_test_support::unique::unique_run_id;
///
/// let a = unique_run_id("run");
/// let b = unique_run_id("run");
/// assert_ne!(a, b);
/// assert!(a.starts_with("run_"));
/// ```
pub fn unique_run_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}
