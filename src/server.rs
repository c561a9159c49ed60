//! HTTP server lifecycle.
//!
//! Binds the listener, serves the router until the cancellation token fires,
//! then gives in-flight requests a bounded amount of time to finish.

use axum::Router;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Bind `addr`, returning the listener so callers can learn the bound port.
pub async fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("[server] Listening on http://{}", listener.local_addr()?);
    Ok(listener)
}

/// Serve `app` on `listener` until `shutdown` is cancelled.
///
/// Returns once the server has drained, or after `drain_timeout` if requests
/// are still in flight.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
    drain_timeout: Duration,
) -> std::io::Result<()> {
    let signal = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.cancelled().await });
    let mut server = Box::pin(server.into_future());

    tokio::select! {
        result = &mut server => return result,
        _ = shutdown.cancelled() => {
            log::info!("[server] Shutdown requested, draining connections");
        }
    }

    match tokio::time::timeout(drain_timeout, server).await {
        Ok(result) => {
            log::info!("[server] Stopped");
            result
        }
        Err(_) => {
            log::warn!(
                "[server] In-flight requests still running after {:?}, exiting",
                drain_timeout
            );
            Ok(())
        }
    }
}

/// Cancel `token` on Ctrl-C or, on Unix, SIGTERM.
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        log::info!("[server] Signal received");
        token.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            log::warn!("[server] Cannot listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
