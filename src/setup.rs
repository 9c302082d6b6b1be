//! Process-level setup shared by drivers and tests.

use std::time::Instant;

use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{format::Writer, time::FormatTime, writer::BoxMakeWriter},
    prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
    Layer,
};

/// Seconds since the subscriber was installed, e.g. `   3.042s`.
#[derive(Debug, Clone, Copy)]
struct SinceStart(Instant);

impl FormatTime for SinceStart {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let elapsed = self.0.elapsed();
        write!(w, "{:>4}.{:03}s", elapsed.as_secs(), elapsed.subsec_millis())
    }
}

/// Installs a stderr `tracing` subscriber showing events up to `DEBUG`.
/// Per-declaration `TRACE` events stay off.
///
/// Only the first call installs anything.
pub fn logging() {
    let layer = tracing_subscriber::fmt::Layer::default()
        .with_timer(SinceStart(Instant::now()))
        .with_ansi(false)
        .with_target(false)
        .with_writer(BoxMakeWriter::new(std::io::stderr))
        .with_filter(LevelFilter::DEBUG);
    let _ = tracing_subscriber::registry().with(layer).try_init();
}
