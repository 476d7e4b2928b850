//! `DuelsyncServer` builder and server loop.
//!
//! Ties the layers together: an axum listener for the HTTP API, a
//! WebSocket listener for the relay, and a periodic sweeper.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use duelsync_match::InMemoryDecks;
use duelsync_protocol::JsonCodec;
use duelsync_transport::{Transport, TransportError, WebSocketTransport};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::handler::handle_connection;
use crate::{api, Backend, DuelsyncError, InMemoryBackend, ServerConfig, Services};

/// Pause after a listener-level accept failure such as running out of
/// file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Builder for an in-memory server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), duelsync::DuelsyncError> {
/// use duelsync::{DuelsyncServer, ServerConfig};
///
/// let server = DuelsyncServer::builder()
///     .config(ServerConfig::from_env()?)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ServerBuilder {
    config: ServerConfig,
    decks: Option<Arc<InMemoryDecks>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares a deck directory with the caller, e.g. to grant decks in
    /// tests. Defaults to an empty directory.
    pub fn decks(mut self, decks: Arc<InMemoryDecks>) -> Self {
        self.decks = Some(decks);
        self
    }

    /// Binds both listeners.
    pub async fn build(self) -> Result<DuelsyncServer<InMemoryBackend>, DuelsyncError> {
        let decks = self.decks.unwrap_or_default();
        let services = Services::in_memory(decks, &self.config);
        DuelsyncServer::with_services(services, self.config).await
    }
}

/// A bound duelsync server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct DuelsyncServer<B: Backend> {
    http: TcpListener,
    relay: WebSocketTransport,
    services: Arc<Services<B>>,
    sweep_interval: Duration,
}

impl DuelsyncServer<InMemoryBackend> {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }
}

impl<B: Backend> DuelsyncServer<B> {
    /// Binds both listeners around an existing service graph.
    pub async fn with_services(
        services: Services<B>,
        config: ServerConfig,
    ) -> Result<Self, DuelsyncError> {
        let http = TcpListener::bind(&config.http_addr).await?;
        tracing::info!(addr = %config.http_addr, "http api listening");
        let relay = WebSocketTransport::bind_with(&config.relay_addr, config.transport.clone()).await?;

        Ok(Self {
            http,
            relay,
            services: Arc::new(services),
            sweep_interval: config.sweep_interval,
        })
    }

    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http.local_addr()
    }

    pub fn relay_addr(&self) -> std::io::Result<SocketAddr> {
        self.relay.local_addr()
    }

    pub fn services(&self) -> &Arc<Services<B>> {
        &self.services
    }

    /// Serves the API and accepts relay connections until the HTTP
    /// listener fails.
    pub async fn run(mut self) -> Result<(), DuelsyncError> {
        tracing::info!("duelsync server running");

        let app = api::router(Arc::clone(&self.services));
        let listener = self.http;
        let mut http = tokio::spawn(async move { axum::serve(listener, app).await });
        let sweeper = spawn_sweeper(Arc::clone(&self.services), self.sweep_interval);

        let result = loop {
            tokio::select! {
                accepted = self.relay.accept() => match accepted {
                    Ok(conn) => {
                        let services = Arc::clone(&self.services);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, services, JsonCodec).await {
                                tracing::debug!(error = %e, "relay connection ended with error");
                            }
                        });
                    }
                    Err(e) => accept_failed(&e).await,
                },
                served = &mut http => {
                    break match served {
                        Ok(result) => result.map_err(DuelsyncError::from),
                        Err(e) => Err(std::io::Error::other(e).into()),
                    };
                }
            }
        };

        sweeper.abort();
        self.services.relay.shutdown().await;
        result
    }
}

async fn accept_failed(e: &TransportError) {
    if e.is_per_client() {
        tracing::debug!(error = %e, "relay upgrade failed");
    } else {
        tracing::error!(
            error = %e,
            backoff_ms = ACCEPT_BACKOFF.as_millis() as u64,
            "relay accept failed"
        );
        tokio::time::sleep(ACCEPT_BACKOFF).await;
    }
}

fn spawn_sweeper<B: Backend>(services: Arc<Services<B>>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            services.sweep().await;
        }
    })
}
