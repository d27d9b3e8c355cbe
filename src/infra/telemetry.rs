//! Tracing subscriber and metric descriptions for the service process.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{
    METRIC_CACHE_COALESCED, METRIC_CACHE_COMPUTE_MS, METRIC_CACHE_EVICT, METRIC_CACHE_HIT,
    METRIC_CACHE_INVALIDATE, METRIC_CACHE_MISS,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

const CACHE_COUNTERS: [(&str, &str); 5] = [
    (METRIC_CACHE_HIT, "Listing lookups answered from the cache."),
    (METRIC_CACHE_MISS, "Listing lookups that rendered a fresh page."),
    (
        METRIC_CACHE_COALESCED,
        "Listing lookups that reused a page rendered by a concurrent request.",
    ),
    (METRIC_CACHE_EVICT, "Listing pages evicted at capacity."),
    (METRIC_CACHE_INVALIDATE, "Tag invalidations after catalog writes."),
];

/// Install the global subscriber: env filter, span traces for errors, then the formatter.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let formatter = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default())
        .with(formatter)
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("subscriber already installed: {err}")))
}

/// Register units and help text for the cache metrics. Idempotent.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        for (name, help) in CACHE_COUNTERS {
            describe_counter!(name, Unit::Count, help);
        }
        describe_histogram!(
            METRIC_CACHE_COMPUTE_MS,
            Unit::Milliseconds,
            "Time spent rendering a missed listing page."
        );
    });
}
