// Copyright (C) Microsoft Corporation. All rights reserved.

//! Test attribute that turns on `tracing` output for the test binary.
//!
//! Annotate tests with `#[test]` after `use test_with_tracing::test;` and
//! set `RUST_LOG` to adjust the filter; without it everything at DEBUG and
//! above is shown.

// The macro expansion refers to this crate by name, which also has to
// resolve from the crate's own tests.
#[cfg(test)]
extern crate self as test_with_tracing;

pub use test_with_tracing_macro::test;
use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

#[doc(hidden)]
/// Installs the process-wide subscriber. Idempotent across tests.
pub fn init() {
    static ONCE: std::sync::Once = std::sync::Once::new();

    ONCE.call_once(|| {
        let targets = std::env::var("RUST_LOG")
            .ok()
            .and_then(|var| var.parse().ok())
            .unwrap_or_else(|| Targets::new().with_default(LevelFilter::DEBUG));
        tracing_subscriber::fmt()
            .with_ansi(false) // avoid polluting logs with escape sequences
            .with_test_writer()
            .with_max_level(LevelFilter::TRACE)
            .finish()
            .with(targets)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::test;

    #[test]
    fn subscriber_accepts_events() {
        tracing::debug!("debug event visible under the default filter");
    }

    #[test]
    fn wrapped_test_may_return_result() -> Result<(), Box<dyn std::error::Error>> {
        tracing::info!("ok");
        Ok(())
    }
}
