//! Shared state injected into every handler.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::{
    config::Settings,
    state::{ServerState, StateMachine},
    stats::StatsAggregator,
    tracker::{InFlightGuard, InFlightTracker},
};

/// Handles to the independently synchronized pieces of the server.
///
/// Cloning is cheap; every clone refers to the same state, tracker and
/// statistics. Separate `AppState::new` calls give fully isolated servers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub lifecycle: Arc<StateMachine>,
    pub tracker: InFlightTracker,
    pub stats: Arc<StatsAggregator>,
    pub settings: Arc<Settings>,
    drained: Arc<watch::Sender<bool>>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let (drained, _) = watch::channel(false);
        Self {
            lifecycle: Arc::new(StateMachine::new()),
            tracker: InFlightTracker::new(),
            stats: Arc::new(StatsAggregator::new()),
            settings: Arc::new(settings),
            drained: Arc::new(drained),
        }
    }

    /// Admits one unit of work, or reports the state that refused it.
    pub fn admit(&self) -> Result<InFlightGuard, ServerState> {
        self.lifecycle.admit(&self.tracker)
    }

    /// Stops admitting work and, in the background, waits for in-flight work
    /// to finish before signalling [`AppState::drained`].
    ///
    /// Safe to call any number of times; only the first call transitions.
    pub fn request_shutdown(&self) -> bool {
        let transitioned = self.lifecycle.begin_drain();
        if transitioned {
            info!(in_flight = self.tracker.in_flight(), "shutdown requested");
        } else {
            debug!(state = %self.lifecycle.current(), "shutdown already in progress");
        }

        let app = self.clone();
        tokio::spawn(async move {
            app.tracker.await_drain().await;
            if !app.drained.send_replace(true) {
                info!("in-flight requests drained");
            }
        });

        transitioned
    }

    /// Resolves once a requested shutdown has drained all in-flight work.
    pub async fn drained(&self) {
        let mut rx = self.drained.subscribe();
        // The sender is owned by `self`, so the channel cannot close here.
        let _ = rx.wait_for(|drained| *drained).await;
    }
}
