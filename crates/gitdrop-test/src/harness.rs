//! Test harness helpers.

use tracing_subscriber::EnvFilter;

/// Set up test logging with the given filter.
///
/// Output goes through the test writer so it is captured per test. Safe to
/// call from many tests; only the first call installs a subscriber.
///
/// # Example
///
/// ```rust,ignore
/// use gitdrop_test::setup_test_logging;
///
/// #[tokio::test]
/// async fn my_test() {
///     setup_test_logging("gitdrop_upload=debug");
///     // ... test code
/// }
/// ```
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// Set up test logging with the default filter (warn level).
pub fn setup_test_logging_default() {
    setup_test_logging("warn");
}
