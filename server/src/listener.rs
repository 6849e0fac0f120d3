//! TCP and Unix socket serving with graceful shutdown.

use crate::config::ListenAddr;
use anyhow::Context;
use axum::Router;
use std::future::Future;
use std::time::Duration;

/// Serve `app` on `listen` until `shutdown` resolves.
///
/// TCP connections are drained by `axum::serve`. Unix socket connections are
/// drained for at most `drain_timeout`.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve<F>(
    listen: &ListenAddr,
    app: Router,
    socket_mode: u32,
    drain_timeout: Duration,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    match listen {
        ListenAddr::Tcp(addr) => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;
            tracing::info!(address = %addr, "Server listening");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
                .context("HTTP server failed")
        }
        ListenAddr::Unix(path) => unix::serve(path, app, socket_mode, drain_timeout, shutdown).await,
    }
}

#[cfg(unix)]
mod unix {
    use anyhow::Context;
    use axum::Router;
    use hyper::Request;
    use hyper::body::Incoming;
    use hyper_util::rt::{TokioExecutor, TokioIo};
    use hyper_util::server::conn::auto;
    use std::fs;
    use std::future::Future;
    use std::io;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::time::Duration;
    use tokio::net::UnixListener;
    use tokio_util::sync::CancellationToken;
    use tokio_util::task::TaskTracker;
    use tower::Service;

    pub(super) async fn serve<F>(
        path: &Path,
        app: Router,
        socket_mode: u32,
        drain_timeout: Duration,
        shutdown: F,
    ) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        remove_stale_socket(path)?;

        let listener = UnixListener::bind(path)
            .with_context(|| format!("Failed to bind unix socket {}", path.display()))?;
        fs::set_permissions(path, fs::Permissions::from_mode(socket_mode))
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        tracing::info!(path = %path.display(), mode = %format!("{socket_mode:o}"), "Server listening");

        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();
        let mut shutdown = std::pin::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let stream = match accepted {
                        Ok((stream, _)) => stream,
                        Err(err) => {
                            tracing::warn!(error = %err, "Failed to accept connection");
                            continue;
                        }
                    };

                    let service = app.clone();
                    let cancel = cancel.clone();
                    tracker.spawn(async move {
                        let hyper_service = hyper::service::service_fn(move |request: Request<Incoming>| {
                            service.clone().call(request)
                        });
                        let builder = auto::Builder::new(TokioExecutor::new());
                        let connection = builder.serve_connection(TokioIo::new(stream), hyper_service);
                        let mut connection = std::pin::pin!(connection);

                        let result = tokio::select! {
                            result = connection.as_mut() => result,
                            () = cancel.cancelled() => {
                                connection.as_mut().graceful_shutdown();
                                connection.await
                            }
                        };
                        if let Err(err) = result {
                            tracing::debug!(error = %err, "Error serving connection");
                        }
                    });
                }
                () = &mut shutdown => break,
            }
        }

        drop(listener);
        cancel.cancel();
        tracker.close();
        tracing::info!(connections = tracker.len(), "Draining connections");
        if tokio::time::timeout(drain_timeout, tracker.wait()).await.is_err() {
            tracing::warn!(
                remaining = tracker.len(),
                "Timed out waiting for connections to finish"
            );
        }

        if let Err(err) = fs::remove_file(path) {
            tracing::debug!(error = %err, "Failed to remove socket file");
        }
        Ok(())
    }

    /// Remove a socket file left behind by a previous run.
    pub(super) fn remove_stale_socket(path: &Path) -> anyhow::Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed stale socket");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

#[cfg(not(unix))]
mod unix {
    use axum::Router;
    use std::future::Future;
    use std::path::Path;
    use std::time::Duration;

    pub(super) async fn serve<F>(
        path: &Path,
        _app: Router,
        _socket_mode: u32,
        _drain_timeout: Duration,
        _shutdown: F,
    ) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        anyhow::bail!("unix sockets are not supported on this platform: {}", path.display())
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::routing::get;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixStream;

    fn socket_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("status-ingest-{}-{name}.sock", std::process::id()))
    }

    #[tokio::test]
    async fn test_unix_socket_round_trip() {
        let path = socket_path("round-trip");
        // A leftover regular file must not prevent binding.
        std::fs::write(&path, b"stale").unwrap();

        let app = Router::new().route("/health", get(|| async { "ok" }));
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let listen = ListenAddr::Unix(path.clone());
        let server = tokio::spawn(async move {
            serve(&listen, app, 0o660, Duration::from_secs(1), async {
                let _ = stopped.await;
            })
            .await
        });

        let mut stream = loop {
            match UnixStream::connect(&path).await {
                Ok(stream) => break stream,
                Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        };
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.ends_with("ok"));

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o660);

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_missing_socket_is_ok() {
        assert!(unix::remove_stale_socket(&socket_path("missing")).is_ok());
    }
}
