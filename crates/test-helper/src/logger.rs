use std::sync::Once;

use tracing::subscriber::set_global_default;
use tracing_subscriber::{filter::LevelFilter, fmt::format::FmtSpan, layer::SubscriberExt};

static INIT: Once = Once::new();

/// Installs a plain logger for the test binary, later calls do nothing.
pub fn init_logger() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::filter::Targets::new()
            .with_default(LevelFilter::DEBUG)
            .with_target("screengrab", LevelFilter::TRACE);

        let std_logger = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .with_target(false)
            .without_time();

        let collector = tracing_subscriber::registry().with(std_logger).with(filter);

        set_global_default(collector).unwrap();
    });
}
