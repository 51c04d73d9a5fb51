//! TCP server loop.
//!
//! The accept loop only dispatches: every accepted connection gets its own
//! task running [`run_session`], and the loop goes straight back to
//! `accept()`. A failing session never stops the server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ServerConfig;
use crate::error::{ProtocolError, Result};
use crate::protocol::catalog::Catalog;
use crate::protocol::session::{run_session, SessionContext};

pub struct Server {
    listener: TcpListener,
    ctx: Arc<SessionContext>,
}

impl Server {
    /// Validate `config` and bind its listen address.
    ///
    /// Hostnames are resolved here, so an unknown host surfaces as an I/O error.
    pub async fn bind(config: &ServerConfig, catalog: Catalog) -> Result<Self> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(ProtocolError::Config(errors.join("; ")));
        }
        for warning in config.warnings() {
            warn!("{warning}");
        }

        let ctx = Arc::new(SessionContext::from_config(config, catalog));
        Self::bind_with_context(&config.address, ctx).await
    }

    /// Bind `address` and serve sessions with a prepared context
    pub async fn bind_with_context(address: &str, ctx: Arc<SessionContext>) -> Result<Self> {
        let listener = TcpListener::bind(address).await?;
        info!(
            address = %listener.local_addr()?,
            max_clients = ctx.admission.max_clients(),
            records = ctx.catalog.len(),
            "Server running"
        );
        Ok(Self { listener, ctx })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    /// Accept connections until the process ends
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Sessions already in flight keep running on their own tasks.
    #[instrument(skip(self, shutdown))]
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(active = self.ctx.admission.active(), "Shutting down server");
                    self.ctx.metrics.log_metrics();
                    return Ok(());
                }

                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer)) => {
                            self.ctx.metrics.connection_accepted();
                            debug!(peer = %peer, "Connection accepted");

                            let ctx = Arc::clone(&self.ctx);
                            tokio::spawn(async move {
                                let outcome = run_session(stream, peer, ctx).await;
                                debug!(peer = %peer, ?outcome, "Session finished");
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Error accepting connection");
                        }
                    }
                }
            }
        }
    }
}

/// Serve the default catalog on `config.address` until Ctrl-C
pub async fn start_server(config: &ServerConfig) -> Result<()> {
    let server = Server::bind(config, Catalog::with_default_entries()).await?;
    server
        .run_until(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received CTRL+C signal, shutting down");
            }
        })
        .await
}
