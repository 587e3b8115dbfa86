//! Process-wide logging setup.
//!
//! The engine emits structured [`tracing`] events; this module only installs
//! the subscriber. Hosts embedding the engine as a library can skip
//! [`init`] and install their own.

use std::str::FromStr;

use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    Layer, filter::FilterFn, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

#[macro_export]
macro_rules! log {
    ($level:expr, $span:expr, $($msg:expr),*) => {{
        let span = $crate::tracing::span!($level, $span);
        let _enter = span.enter();

        $crate::tracing::event!($level, $($msg),*)
    }};
}

/// Events on the synchronous admission path (lookup, routing, dedup,
/// enqueue).
#[macro_export]
macro_rules! admission {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "admission", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::admission!(level = TRACE, $($msg),*)
    };
}

/// Events on the asynchronous delivery path (workers, retries, adapters).
#[macro_export]
macro_rules! delivery {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "delivery", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::delivery!(level = TRACE, $($msg),*)
    };
}

/// Install the default subscriber: compact format, UTC RFC-3339 timestamps,
/// level taken from the `LOG_LEVEL` environment variable, events limited to
/// this workspace's targets.
///
/// Calling it more than once keeps the first subscriber.
pub fn init() {
    let default = if cfg!(debug_assertions) {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let level = std::env::var("LOG_LEVEL").map_or(default, |level| {
        LevelFilter::from_str(level.as_str()).unwrap_or_else(|_| {
            eprintln!("Invalid log level specified {level}, defaulting to {default}");
            default
        })
    });

    let registry = tracing_subscriber::Registry::default().with(
        tracing_subscriber::fmt::layer()
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_ansi(true)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
            .with_filter(level)
            .with_filter(FilterFn::new(|metadata| {
                metadata.target().starts_with("herald")
            })),
    );

    if registry.try_init().is_err() {
        tracing::debug!("subscriber already installed, keeping it");
    }
}
