// Listener setup and connection serving

use anyhow::{Context, Result};
use axum::{serve, Router};
use std::future::Future;
use std::io;
use std::path::Path;
use tokio::net::{TcpListener, UnixListener};
use tokio::signal;
use tower::Service;
use tracing::{error, info, warn};

pub async fn bind_tcp(address: &str) -> Result<TcpListener> {
    info!(address = %address, "Starting TCP listener");

    let listener = TcpListener::bind(address)
        .await
        .context(format!("Failed to bind TCP listener to {}", address))?;

    info!(address = %address, "Server is listening on TCP");
    Ok(listener)
}

pub async fn serve_tcp<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("TCP server error")
}

/// Bind the Unix socket at `path`, replacing a stale socket file left by a previous run
pub fn bind_unix(path: &Path) -> Result<UnixListener> {
    info!(path = %path.display(), "Starting Unix socket listener");

    if path.exists() {
        std::fs::remove_file(path)
            .context(format!("Failed to remove existing Unix socket: {}", path.display()))?;
    }

    let listener = UnixListener::bind(path)
        .context(format!("Failed to bind Unix socket listener to {}", path.display()))?;

    info!(path = %path.display(), "Server is listening on Unix socket");
    Ok(listener)
}

/// Errors that concern a single incoming connection. Anything else means the
/// listener itself is unusable (e.g. out of file descriptors).
pub fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
    )
}

/// Serve `app` on `listener` until `shutdown` resolves or the listener fails.
/// The socket file at `path` is removed on the way out.
pub async fn serve_unix<F>(listener: UnixListener, path: &Path, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let result = accept_unix(listener, app, shutdown).await;

    if let Err(e) = std::fs::remove_file(path) {
        warn!(error = %e, path = %path.display(), "Failed to remove Unix socket");
    }

    result
}

async fn accept_unix<F>(listener: UnixListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let mut make_service = app.into_make_service();
    tokio::pin!(shutdown);

    loop {
        let socket = tokio::select! {
            conn = listener.accept() => match conn {
                Ok((socket, _remote_addr)) => socket,
                Err(e) if is_connection_error(&e) => {
                    warn!(error = %e, "Dropped Unix socket connection during accept");
                    continue;
                }
                Err(e) => {
                    return Err(e).context("Unix socket listener failed");
                }
            },
            _ = &mut shutdown => return Ok(()),
        };

        let tower_service = match make_service.call(&socket).await {
            Ok(svc) => svc,
            Err(infallible) => match infallible {},
        };

        tokio::spawn(async move {
            let socket = hyper_util::rt::TokioIo::new(socket);

            let hyper_service = hyper::service::service_fn(move |request: hyper::Request<hyper::body::Incoming>| {
                tower_service.clone().call(request)
            });

            if let Err(err) = hyper_util::server::conn::auto::Builder::new(hyper_util::rt::TokioExecutor::new())
                .serve_connection(socket, hyper_service)
                .await
            {
                error!(error = %err, "Error serving Unix socket connection");
            }
        });
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::routes::build_router;
    use crate::core::state::AppState;
    use crate::stores::memory::MemoryUserStorage;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixStream;
    use tokio::sync::oneshot;

    fn test_router() -> Router {
        build_router(Arc::new(AppState::new(Arc::new(MemoryUserStorage::new()))))
    }

    #[test]
    fn test_connection_errors_are_not_fatal() {
        for kind in [
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::Interrupted,
        ] {
            assert!(is_connection_error(&io::Error::from(kind)));
        }
    }

    #[test]
    fn test_listener_errors_are_fatal() {
        // EMFILE and friends surface as uncategorized OS errors
        assert!(!is_connection_error(&io::Error::from_raw_os_error(24)));
        assert!(!is_connection_error(&io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(!is_connection_error(&io::Error::from(io::ErrorKind::OutOfMemory)));
    }

    #[tokio::test]
    async fn test_bind_unix_replaces_stale_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.sock");
        std::fs::write(&path, b"stale").unwrap();

        assert!(bind_unix(&path).is_ok());
    }

    #[tokio::test]
    async fn test_serve_unix_answers_and_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.sock");

        let listener = bind_unix(&path).unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let server_path = path.clone();
        let server = tokio::spawn(async move {
            serve_unix(listener, &server_path, test_router(), async {
                let _ = stop_rx.await;
            })
            .await
        });

        let mut stream = UnixStream::connect(&path).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        let response = String::from_utf8_lossy(&response);
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();

        assert!(!path.exists());
    }
}
