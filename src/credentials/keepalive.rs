//! Background renewal of credentials.
//!
//! A [`KeepAlive`] task calls [`CredentialSource::refresh_or_get`] on a fixed
//! interval so that foreground readers rarely pay for a synchronous refresh.
//! It stops when its [`Shutdown`] signal fires; [`KeepAlive::join`] returns
//! only after the task has exited, so no refresh can start after it.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::CredentialSource;
use crate::errors::ConfigError;

/// A stop signal that can be shared by any number of keep-alive tasks.
#[derive(Clone, Debug)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the signal. Calling it again is a no-op.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one running keep-alive task.
#[derive(Debug)]
pub struct KeepAlive {
    kind: &'static str,
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

impl KeepAlive {
    /// Spawn a task with its own stop signal.
    pub fn spawn(
        source: Arc<dyn CredentialSource>,
        interval: Duration,
    ) -> Result<Self, ConfigError> {
        Self::spawn_with(source, interval, Shutdown::new())
    }

    /// Spawn a task that stops when `shutdown` fires.
    ///
    /// The first refresh happens one `interval` after spawning; a zero interval
    /// is refused. Must be called from within a tokio runtime.
    pub fn spawn_with(
        source: Arc<dyn CredentialSource>,
        interval: Duration,
        shutdown: Shutdown,
    ) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::NotPositive("keep_alive_interval"));
        }
        let kind = source.kind();
        let stop = shutdown.subscribe();
        let handle = tokio::spawn(run(source, interval, stop));
        info!(credential = kind, interval_secs = interval.as_secs_f64(), "keep-alive started");
        Ok(Self {
            kind,
            shutdown,
            handle,
        })
    }

    /// Signal the task to stop. Shared signals stop every task subscribed to them.
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to exit. Call [`KeepAlive::stop`] (or trigger the
    /// shared signal) first, otherwise this waits forever.
    pub async fn join(self) {
        match self.handle.await {
            Ok(()) => debug!(credential = self.kind, "keep-alive joined"),
            Err(e) => warn!(credential = self.kind, error = %e, "keep-alive task ended abnormally"),
        }
    }
}

async fn run(
    source: Arc<dyn CredentialSource>,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let kind = source.kind();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Skip the first immediate tick
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => break,
            _ = ticker.tick() => {}
        }

        // the refresh is never raced against the stop signal: once started it
        // completes or fails before the loop looks at the signal again
        match source.refresh_or_get(OffsetDateTime::now_utc()).await {
            Ok(_) => debug!(credential = kind, "keep-alive tick"),
            Err(e) => warn!(credential = kind, error = %e, "keep-alive refresh failed"),
        }
    }

    info!(credential = kind, "keep-alive stopped");
}
