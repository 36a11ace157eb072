//! Diagnostic logging via `tracing`.
//!
//! Logs go to stderr so they never mix with answers or JSON on stdout.
//! `HEARTH_LOG` takes an `EnvFilter` directive (e.g. `hearth=debug`); without
//! it only warnings are shown, or debug output for hearth with `--verbose`.

use tracing_subscriber::EnvFilter;

use crate::constants::LOG_ENV_VAR;

pub fn init(verbose: bool) {
    let fallback = default_directive(verbose);
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(fallback));
    // A second init (e.g. from tests) is harmless; keep the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "warn,hearth=debug"
    } else {
        "warn"
    }
}
