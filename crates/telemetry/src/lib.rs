//! Tracing subscriber setup for pgboot binaries.

use anyhow::Context;
use pgboot_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[cfg(any(test, feature = "testing"))]
pub mod capture;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Output goes to stderr; stdout is reserved for the bootstrap result.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.log_level)
            .with_context(|| format!("invalid log level '{}'", settings.log_level))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    match settings.log_format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_level(true)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    }
    .with_context(|| "failed to install tracing subscriber")?;

    tracing::debug!(target: "pgboot-telemetry", format = ?settings.log_format, "telemetry initialized");
    Ok(())
}
