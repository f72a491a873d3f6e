//! Provide tracing, tailored to this program.
//!
//! At startup, the program should call one of the init_* functions to install
//! a tracing subscriber (i.e., something that emits events to a log).
//!
//! The rest of the program can include `use tracing::prelude::*` for
//! convenient access to the `trace!()`, `debug!()`, `info!()`, `warn!()`, and
//! `error!()` macros.

use std::env;
use time::OffsetDateTime;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{format::Writer, time::FormatTime},
    prelude::*,
};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

use prelude::*;

/// Initialize logging.
///
/// Bring-up normally runs from a systemd unit early in boot, so use journald
/// when it is available; otherwise fall back to stdout. `verbosity` raises the
/// stdout default level one step per count (INFO, DEBUG, TRACE).
pub fn init_journald_or_stdout(verbosity: u8) {
    if env::var("JOURNAL_STREAM").is_ok() {
        if let Ok(layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(default_filter(verbosity))
                .with(layer)
                .init();
        } else {
            use_stdout(verbosity);
            error!("Failed to initialize journald logging, using stdout.");
        }
    } else {
        use_stdout(verbosity);
    }
}

// Map the -v count onto a default level. RUST_LOG still wins when set.
fn default_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn default_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level(verbosity).into())
        .with_env_var("RUST_LOG")
        .from_env_lossy()
}

// Log to stdout, filtering according to environment variable RUST_LOG.
fn use_stdout(verbosity: u8) {
    tracing_subscriber::registry()
        .with(default_filter(verbosity))
        .with(tracing_subscriber::fmt::layer().with_timer(LocalTimer))
        .init();
}

// Provide our own timer that formats timestamps in local time and to the
// nearest second. The default timer was in UTC and formatted timestamps as a
// long, ugly string.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or(OffsetDateTime::now_utc());
        let formatted = now
            .format(time::macros::format_description!("[hour]:[minute]:[second]"))
            .map_err(|_| std::fmt::Error)?;
        write!(w, "{}", formatted)
    }
}
