//! Subscriber setup shared by every binary that drives a controller.

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

/// Install a thread-local `tracing` subscriber for the stepping loop.
///
/// `RUST_LOG` takes precedence; otherwise `default_directive` is used
/// (e.g. `"info"` or `"arm_control_lib=debug"`). Per-tick cache refreshes are
/// logged at `debug`, skipped refreshes at `trace`.
///
/// The returned guard must stay alive for as long as logging is wanted.
///
/// # Example
/// ```no_run
/// use arm_control_lib::init_tracing;
///
/// let _guard = init_tracing("info");
/// ```
pub fn init_tracing(default_directive: &str) -> DefaultGuard {
    use tracing_subscriber::layer::SubscriberExt;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(fmt_layer);

    tracing::subscriber::set_default(subscriber)
}
