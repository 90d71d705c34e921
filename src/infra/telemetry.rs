//! Tracing and metrics bootstrap.

use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static DESCRIBE_ONCE: Once = Once::new();

/// Install the global tracing subscriber and register metric descriptions.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    let filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());

    let installed = match logging.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(true))
            .try_init(),
    };
    installed.map_err(|err| InfraError::telemetry(format!("tracing init failed: {err}")))?;

    describe_cache_metrics();
    Ok(())
}

fn describe_cache_metrics() {
    DESCRIBE_ONCE.call_once(|| {
        describe_counter!(
            "orgatlas_cache_hit_total",
            Unit::Count,
            "Reads served from the tagged data cache."
        );
        describe_counter!(
            "orgatlas_cache_miss_total",
            Unit::Count,
            "Reads that fell through to the database or snapshot files."
        );
        describe_counter!(
            "orgatlas_cache_evict_total",
            Unit::Count,
            "Entries displaced by the LRU capacity bound."
        );
        describe_counter!(
            "orgatlas_cache_purge_total",
            Unit::Count,
            "Entries removed by tag invalidation."
        );
    });
}
