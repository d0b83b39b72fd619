//! HTTP query API over the reading store.
//!
//! The server runs on its own OS thread inside a current-thread Tokio
//! runtime: one listener, every connection multiplexed on that single
//! thread. Store access goes through the [`Database`] actor, so handlers
//! never block the loop on SQLite.

pub mod error;
pub mod handlers;

use std::{
    future::IntoFuture,
    net::{SocketAddr, TcpListener as StdTcpListener},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use axum::routing::{get, post};
use axum::Router;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::{config::ApiConfig, db::Database};

pub use error::{not_found, ApiError, ErrorResponse};

/// Build the axum router with all endpoints
pub fn build_router(db: Database) -> Router {
    Router::new()
        .route(
            "/api/temperature/getlast",
            get(handlers::get_last).fallback(not_found),
        )
        .route(
            "/api/temperature/get",
            get(handlers::get_range).fallback(not_found),
        )
        .route(
            "/api/temperature/set",
            post(handlers::set_temperature).fallback(not_found),
        )
        .fallback(not_found)
        .with_state(db)
}

/// Serves `router` on `listener` until `cancel_token` fires, then gives
/// in-flight connections at most `grace` to finish.
pub async fn serve(
    listener: tokio::net::TcpListener,
    router: Router,
    grace: Duration,
    cancel_token: CancellationToken,
) -> Result<()> {
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(cancel_token.clone().cancelled_owned())
        .into_future();
    tokio::pin!(server);

    let grace_expired = async {
        cancel_token.cancelled().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = &mut server => result.context("HTTP server failed"),
        _ = grace_expired => {
            warn!("HTTP connections still open after {grace:?}; dropping them");
            Ok(())
        }
    }
}

/// A running API server thread.
pub struct ApiServer {
    local_addr: SocketAddr,
    handle: JoinHandle<Result<()>>,
}

impl ApiServer {
    /// Binds `config.listen_addr` and starts the event loop thread. Bind
    /// failures are reported here rather than from the thread.
    pub fn spawn(config: &ApiConfig, db: Database, cancel_token: CancellationToken) -> Result<Self> {
        let listener = StdTcpListener::bind(&config.listen_addr)
            .with_context(|| format!("failed to bind {}", config.listen_addr))?;
        listener
            .set_nonblocking(true)
            .context("failed to make listener non-blocking")?;
        let local_addr = listener.local_addr()?;
        let grace = Duration::from_millis(config.poll_timeout_ms);

        let handle = thread::Builder::new()
            .name("thermolog-api".into())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .context("failed to build API runtime")?;

                runtime.block_on(async move {
                    let listener = tokio::net::TcpListener::from_std(listener)
                        .context("failed to register listener")?;
                    info!("HTTP server listening on {local_addr}");
                    serve(listener, build_router(db), grace, cancel_token).await
                })
            })
            .context("failed to spawn API thread")?;

        Ok(Self { local_addr, handle })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the event loop thread to exit.
    pub fn join(self) -> Result<()> {
        self.handle
            .join()
            .map_err(|_| anyhow!("API thread panicked"))?
    }
}
