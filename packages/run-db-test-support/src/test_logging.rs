//! Tracing subscriber for run-db tests
//!
//! `TEST_LOG` takes precedence over `RUST_LOG`. Without either, only
//! warnings from the run-db crates are shown so that permission warnings
//! surface while setup chatter stays quiet.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when neither `TEST_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "run_db=warn,run_db_test_support=warn";

static INITIALIZED: OnceCell<()> = OnceCell::new();

fn filter_directives() -> String {
    std::env::var("TEST_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| DEFAULT_FILTER.to_string())
}

/// Install the subscriber once per test binary. Later calls are no-ops, and
/// a subscriber installed elsewhere first is left in place.
pub fn init() {
    INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_new(filter_directives())
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .without_time()
            .with_target(true)
            .try_init()
            .ok();
    });
}
