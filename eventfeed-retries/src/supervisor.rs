//! Reconnect loop around an [`EventSourceClient`].
//!
//! The client itself never reconnects. A supervisor re-runs `connect()`
//! after recoverable failures, waiting between attempts, and stops as soon
//! as the client settles in a way that should not be retried.

use crate::config::ReconnectConfig;
use crate::error::{ReconnectError, ReconnectResult};
use eventfeed_client::{ConnectOutcome, EventSourceClient};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How supervision ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorStop {
    /// The server ended the stream and `reconnect_on_close` is off.
    Closed,
    /// The client was disconnected or destroyed by its owner.
    Disconnected,
    /// The supervisor's cancellation token fired.
    Cancelled,
}

/// Keeps an [`EventSourceClient`] connected.
#[derive(Debug)]
pub struct ReconnectSupervisor {
    client: EventSourceClient,
    config: ReconnectConfig,
    cancel: CancellationToken,
}

impl ReconnectSupervisor {
    /// Supervise `client`.
    pub fn new(client: EventSourceClient, config: ReconnectConfig) -> Self {
        Self {
            client,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop when `cancel` fires instead of a private token.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The supervised client.
    pub fn client(&self) -> &EventSourceClient {
        &self.client
    }

    /// The reconnect configuration.
    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    /// Token that stops supervision when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop supervising and disconnect the client.
    pub fn stop(&self) {
        self.cancel.cancel();
        self.client.disconnect();
    }

    /// Run the reconnect loop on a background task.
    pub fn spawn(self) -> JoinHandle<ReconnectResult<SupervisorStop>> {
        tokio::spawn(async move { self.run().await })
    }

    /// Connect and reconnect until the stream should stay down.
    pub async fn run(&self) -> ReconnectResult<SupervisorStop> {
        let url = self.client.url().to_string();
        let mut failures: u32 = 0;

        loop {
            let connection = self.client.connect();
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.client.disconnect();
                    info!(url = %url, "Reconnect supervision cancelled");
                    return Ok(SupervisorStop::Cancelled);
                }
                outcome = connection => outcome,
            };

            match outcome {
                ConnectOutcome::Disconnected => {
                    debug!(url = %url, "Client disconnected by its owner");
                    return Ok(SupervisorStop::Disconnected);
                }
                ConnectOutcome::Rejected(err) => {
                    warn!(url = %url, error = %err, "Client rejected connect");
                    return Err(ReconnectError::Rejected(err));
                }
                ConnectOutcome::Closed => {
                    failures = 0;
                    if !self.config.reconnect_on_close {
                        info!(url = %url, "Event stream closed by server");
                        return Ok(SupervisorStop::Closed);
                    }
                }
                ConnectOutcome::Failed(err) => {
                    if !err.is_recoverable() {
                        warn!(url = %url, error = %err, "Event stream failed, not retrying");
                        return Err(ReconnectError::NotRecoverable(err));
                    }
                    // A read failure means the stream had opened.
                    failures = if err.is_open_failure() {
                        failures.saturating_add(1)
                    } else {
                        1
                    };
                    if self.config.is_exhausted(failures) {
                        warn!(
                            url = %url,
                            attempts = failures,
                            error = %err,
                            "Reconnect attempts exhausted"
                        );
                        return Err(ReconnectError::Exhausted {
                            attempts: failures,
                            last: err,
                        });
                    }
                }
            }

            let wait = self
                .config
                .delay_for(failures.max(1), self.client.retry_hint());
            debug!(
                url = %url,
                attempt = failures,
                wait_ms = wait.as_millis() as u64,
                last_event_id = ?self.client.last_event_id(),
                "Waiting before reconnect"
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!(url = %url, "Reconnect supervision cancelled");
                    return Ok(SupervisorStop::Cancelled);
                }
                _ = sleep(wait) => {}
            }
        }
    }
}
