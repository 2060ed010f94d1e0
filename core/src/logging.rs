use crate::logs::{LogBuffer, RingBufferLayer};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Human-readable logging plus the ring-buffer layer the dashboard reads
/// from (§4.8 `logs`).
pub fn init_logging(buffer: Arc<LogBuffer>) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(RingBufferLayer::new(buffer))
        .init()
}

/// JSON logging for log aggregators, same ring-buffer wiring as
/// [`init_logging`].
pub fn init_json_logging(buffer: Arc<LogBuffer>) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .with(RingBufferLayer::new(buffer))
        .init()
}
