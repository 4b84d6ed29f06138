//! Instrument loading and the periodic refresh task.

use crate::error::Result;
use crate::registry::InstrumentRegistry;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use venuefeed_channel::DataSink;
use venuefeed_core::{Data, Instrument};

/// Default interval between instrument reloads.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

/// Handle to a running refresh loop.
pub struct RefreshTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl RefreshTask {
    fn spawn(
        registry: Arc<dyn InstrumentRegistry>,
        sink: Arc<dyn DataSink>,
        interval: Duration,
    ) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(refresh_loop(registry, sink, interval, token.clone()));
        Self { token, handle }
    }

    /// Cancels the loop and waits for it to exit.
    ///
    /// A reload already in progress completes first.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!("Instrument refresh task ended abnormally: {e}");
        }
    }

    /// Returns true once the loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

async fn refresh_loop(
    registry: Arc<dyn InstrumentRegistry>,
    sink: Arc<dyn DataSink>,
    interval: Duration,
    token: CancellationToken,
) {
    loop {
        tracing::debug!(
            "Scheduled instrument refresh to run in {}s",
            interval.as_secs()
        );
        tokio::select! {
            biased;
            () = token.cancelled() => {
                tracing::debug!("Instrument refresh cancelled");
                break;
            }
            () = tokio::time::sleep(interval) => {}
        }

        match registry.load_all().await {
            Ok(instruments) => push_instruments(sink.as_ref(), instruments),
            Err(e) => tracing::warn!("Instrument refresh failed: {e}"),
        }
    }
}

fn push_instruments(sink: &dyn DataSink, instruments: Vec<Instrument>) {
    tracing::debug!("Pushing {} instruments", instruments.len());
    for instrument in instruments {
        sink.on_data(Data::Instrument(instrument));
    }
}

/// Owns instrument loading and at most one [`RefreshTask`].
pub struct TaskSupervisor {
    registry: Arc<dyn InstrumentRegistry>,
    sink: Arc<dyn DataSink>,
    interval: Duration,
    refresh: Mutex<Option<RefreshTask>>,
}

impl TaskSupervisor {
    /// Creates a supervisor reloading every `interval`.
    #[must_use]
    pub fn new(
        registry: Arc<dyn InstrumentRegistry>,
        sink: Arc<dyn DataSink>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            sink,
            interval,
            refresh: Mutex::new(None),
        }
    }

    /// Initializes the registry, pushes every instrument and starts the
    /// refresh loop.
    ///
    /// # Errors
    /// Returns the registry error if initialization fails; no task is started.
    pub async fn start(&self) -> Result<()> {
        tracing::info!("Initializing instruments...");
        self.registry.initialize().await?;
        push_instruments(self.sink.as_ref(), self.registry.all());
        self.spawn_refresh();
        Ok(())
    }

    /// Starts the refresh loop unless one is already running.
    ///
    /// Returns true if a new loop was started.
    pub fn spawn_refresh(&self) -> bool {
        let mut slot = self.refresh.lock();
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            tracing::debug!("Instrument refresh already running");
            return false;
        }
        *slot = Some(RefreshTask::spawn(
            Arc::clone(&self.registry),
            Arc::clone(&self.sink),
            self.interval,
        ));
        true
    }

    /// Stops the refresh loop. Stopping when nothing runs is a no-op.
    pub async fn stop(&self) {
        let task = self.refresh.lock().take();
        if let Some(task) = task {
            task.stop().await;
        }
    }

    /// Returns true while a refresh loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.refresh
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Returns the refresh interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}
