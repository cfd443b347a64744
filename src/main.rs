use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use user_service::core::config::{Config, ListenType};
use user_service::core::routes::build_app;
use user_service::core::server::{bind_tcp, bind_unix, serve_tcp, serve_unix, shutdown_signal};
use user_service::core::startup::{build_storage, create_seed_user};
use user_service::core::state::AppState;
use user_service::core::tracing_init::init_tracing;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let config_path = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("config.toml")
    };

    // Load and validate configuration
    let config = Config::from_file(&config_path).context(format!(
        "Failed to load configuration from '{}'. \
        Copy config.example.toml to config.toml and adjust the values.",
        config_path.display()
    ))?;

    init_tracing(&config.logging)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.num_threads)
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    let result = runtime.block_on(async_main(config, config_path));
    if let Err(e) = &result {
        error!(error = ?e, "User service terminated");
    }
    result
}

async fn async_main(config: Config, config_path: PathBuf) -> Result<()> {
    info!(
        config_path = %config_path.display(),
        listen = ?config.server.listen,
        backend = ?config.storage.backend,
        num_threads = config.server.num_threads,
        log_level = %config.logging.level,
        "User service starting"
    );

    let storage = build_storage(&config).await?;

    if let Some(seed) = &config.seed {
        create_seed_user(storage.as_ref(), seed).await?;
    }

    let app = build_app(
        Arc::new(AppState::new(storage)),
        config.server.request_timeout(),
    );

    info!("Registered user routes");

    match config.server.listen {
        ListenType::Sock => {
            let path = config.server.resolve_socket_path()?;
            let listener = bind_unix(&path)?;
            serve_unix(listener, &path, app, shutdown_signal()).await?;
        }
        ListenType::Tcp => {
            let listener = bind_tcp(&config.server.tcp_address()).await?;
            serve_tcp(listener, app, shutdown_signal()).await?;
        }
    }

    info!("Shutting down gracefully");

    Ok(())
}
