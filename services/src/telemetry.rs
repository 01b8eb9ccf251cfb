use crate::config::Config;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use std::env;
use tracing_stackdriver::CloudTraceConfiguration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,usuarios_services=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global tracing subscriber.
///
/// Local development gets pretty printing. Every other environment logs JSON
/// in the Stackdriver format, correlated with Cloud Trace when
/// `GOOGLE_CLOUD_PROJECT` is available.
pub fn init_tracing(config: &Config) -> anyhow::Result<()> {
    if config.is_local() {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer())
            .try_init()?;
        return Ok(());
    }

    // W3C trace-context, so spans join traces started by upstream callers
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    let otel_layer = tracing_opentelemetry::layer();

    match env::var("GOOGLE_CLOUD_PROJECT") {
        Ok(project_id) => {
            let stackdriver_layer = tracing_stackdriver::layer()
                .with_cloud_trace(CloudTraceConfiguration { project_id });
            tracing_subscriber::registry()
                .with(env_filter())
                .with(otel_layer)
                .with(stackdriver_layer)
                .try_init()?;
        }
        Err(_) => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(otel_layer)
                .with(tracing_stackdriver::layer())
                .try_init()?;
        }
    }

    Ok(())
}
