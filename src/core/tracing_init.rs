use crate::core::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Dependencies that log at request level are capped so a `debug` service
/// log does not drown in driver and connection chatter.
const QUIET_TARGETS: &[(&str, &str)] = &[("mongodb", "warn"), ("hyper", "warn"), ("hyper_util", "warn")];

/// Filter directives used when `RUST_LOG` is not set
pub fn default_directives(config: &LoggingConfig) -> String {
    let mut directives = vec![
        config.level.clone(),
        format!("user_service={}", config.level),
        format!("tower_http={}", config.level),
    ];
    directives.extend(
        QUIET_TARGETS
            .iter()
            .map(|(target, level)| format!("{target}={level}")),
    );
    directives.join(",")
}

fn uses_console(config: &LoggingConfig) -> bool {
    config.console || config.format == "console"
}

pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(config)))
        .context("Invalid log filter")?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if uses_console(config) {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_ansi(true)
                    .with_line_number(true),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    };

    installed.context("Failed to install tracing subscriber")
}
