pub mod accounts;
pub mod transactions;

use tracing_subscriber::EnvFilter;

/// Routes `tracing` output through the test harness; set `RUST_LOG=debug` to see the signer's
/// sighash chain.
pub fn setup_logger() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
