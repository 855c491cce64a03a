//! Listener ownership and the drain-then-stop shutdown sequence.

use std::{
    future::{Future, IntoFuture},
    io,
    net::SocketAddr,
    time::Duration,
};

use thiserror::Error;
use tokio::{net::TcpListener, select, sync::oneshot, time::timeout};
use tracing::{info, warn};

use crate::{app::AppState, config::Settings, handlers, stats::Statistics};

/// Failures that end the process.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind listener on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("listener failed while serving")]
    Serve(#[source] io::Error),
    #[error("could not shut down gracefully within {0:?}")]
    ShutdownTimeout(Duration),
}

pub struct HashServer {
    listener: TcpListener,
    app: AppState,
}

impl HashServer {
    pub fn new(listener: TcpListener, settings: Settings) -> Self {
        Self {
            listener,
            app: AppState::new(settings),
        }
    }

    /// Binds every interface on the configured port.
    pub async fn bind(settings: Settings) -> Result<Self, ServeError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServeError::Bind { addr, source })?;
        Ok(Self::new(listener, settings))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the state the handlers share, for inspection and tests.
    pub fn state(&self) -> AppState {
        self.app.clone()
    }

    /// Serves until a drain completes, then closes the listener.
    ///
    /// A drain starts either from `/shutdown` or when `interrupt` resolves.
    /// Closing the listener is bounded by `Settings::shutdown_timeout`.
    /// Returns the final statistics.
    pub async fn run_until<F>(self, interrupt: F) -> Result<Statistics, ServeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let HashServer { listener, app } = self;
        let router = handlers::router(app.clone());

        let (stopping_tx, stopping_rx) = oneshot::channel::<()>();
        let signal_app = app.clone();
        let stop_signal = async move {
            select! {
                _ = signal_app.drained() => {}
                _ = interrupt => {
                    info!("interrupt received; draining in-flight requests");
                    signal_app.request_shutdown();
                    signal_app.drained().await;
                }
            }
            let _ = stopping_tx.send(());
        };

        let serve = axum::serve(listener, router)
            .with_graceful_shutdown(stop_signal)
            .into_future();
        tokio::pin!(serve);

        let result = select! {
            result = &mut serve => result,
            _ = stopping_rx => {
                info!("server is shutting down");
                let limit = app.settings.shutdown_timeout;
                match timeout(limit, &mut serve).await {
                    Ok(result) => result,
                    Err(_) => {
                        app.lifecycle.mark_stopped();
                        return Err(ServeError::ShutdownTimeout(limit));
                    }
                }
            }
        };

        app.lifecycle.mark_stopped();
        result.map_err(ServeError::Serve)?;

        let stats = app.stats.snapshot();
        info!(
            total = stats.request_count,
            average_micros = stats.average_latency_micros,
            "final server statistics"
        );
        Ok(stats)
    }

    pub async fn run_until_ctrl_c(self) -> Result<Statistics, ServeError> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}
