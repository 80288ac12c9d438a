use super::routes::create_router;
use super::state::AppState;
use crate::config::HttpConfig;
use crate::recognition::RecognizerBackend;
use crate::session::SessionConfig;
use anyhow::{Context, Result};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

/// Accepts WebSocket clients and runs one relay session per connection
pub struct SessionServer {
    http: HttpConfig,
    state: AppState,
}

impl SessionServer {
    pub fn new(
        http: HttpConfig,
        session_config: SessionConfig,
        backend: Arc<dyn RecognizerBackend>,
        credential: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            http,
            state: AppState::new(session_config, backend, credential),
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Bind the listening socket; port 0 picks a free port
    pub async fn bind(self) -> Result<BoundServer> {
        let addr = format!("{}:{}", self.http.bind, self.http.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        Ok(BoundServer {
            shutdown: self.state.shutdown.clone(),
            sessions: self.state.sessions.clone(),
            router: create_router(self.state),
            listener,
        })
    }
}

/// A server with its socket bound, ready to accept connections
pub struct BoundServer {
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
    sessions: TaskTracker,
}

impl BoundServer {
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves, then end every open session and
    /// wait for them to close their recognition streams
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Listening on {}", self.local_addr()?);

        let token = self.shutdown.clone();
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                token.cancel();
            })
            .await
            .context("HTTP server error")?;

        self.sessions.close();
        if !self.sessions.is_empty() {
            info!("Waiting for {} sessions to close", self.sessions.len());
        }
        self.sessions.wait().await;

        Ok(())
    }
}
