//! Watch mode: poll for schema changes and regenerate.
//!
//! Each tick walks the state machine
//! `Idle -> Polling -> (Unchanged | Regenerating) -> Idle`:
//!
//! 1. The current [`Fingerprint`] is fetched from the [`SchemaSource`]
//! 2. Without a stored fingerprint the fetched one becomes the baseline and
//!    nothing is regenerated
//! 3. An equal fingerprint ends the tick without touching the store
//! 4. A different fingerprint is persisted *before* the pipeline runs, so a
//!    crash mid-run cannot re-trigger the same change forever
//!
//! A failed regeneration does not roll the stored fingerprint back; the SDK
//! is regenerated again only after the next upstream change.
//!
//! ## Examples
//!
//! ```no_run
//! use codegen_lib::{JsonFingerprintFile, Pipeline, RemoteClient, Watcher, WatchEvent};
//! use tokio::sync::mpsc;
//!
//! # async fn example() {
//! let (tx, mut rx) = mpsc::channel::<WatchEvent>(16);
//! let pipeline = Pipeline::new(RemoteClient::new("api-key"), "flotiqApi".into());
//! let watcher = Watcher::new(pipeline, JsonFingerprintFile::default_path()).with_events(tx);
//!
//! tokio::spawn(async move {
//!     while let Some(event) = rx.recv().await {
//!         println!("{event:?}");
//!     }
//! });
//!
//! // Stop after a minute; the CLI passes its SIGINT handler instead.
//! watcher.run(tokio::time::sleep(std::time::Duration::from_secs(60))).await;
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::MissedTickBehavior;

use crate::config::DEFAULT_POLL_INTERVAL;
use crate::error::{PipelineError, WatchError};
use crate::fingerprint::{Fingerprint, FingerprintStore};
use crate::pipeline::Pipeline;
use crate::remote::SchemaSource;

/// Phase of the watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Waiting for the next tick.
    Idle,
    /// Fetching the current fingerprint.
    Polling,
    /// The schema has not changed since the last tick.
    Unchanged,
    /// A change was detected and the SDK is being regenerated.
    Regenerating,
}

/// Event emitted while watching.
///
/// Sent through the channel given to [`Watcher::with_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The watcher moved to a new state.
    StateChanged { state: WatchState },
    /// No baseline existed; `fingerprint` was stored as the first one.
    BaselineRecorded { fingerprint: Fingerprint },
    /// The schema changed between two polls.
    ChangeDetected {
        previous: Fingerprint,
        current: Fingerprint,
    },
    /// The SDK was regenerated after a change.
    Regenerated,
    /// A poll or a regeneration failed.
    Failed { error: String },
}

/// Result of a single tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// First observation; stored as the baseline.
    Baseline,
    /// Nothing changed.
    Unchanged,
    /// A change was detected and the SDK regenerated.
    Regenerated,
    /// A change was detected but the pipeline failed.
    RegenerationFailed(PipelineError),
    /// The fingerprint could not be fetched, read, or stored.
    PollFailed(WatchError),
    /// A previous tick was still running; this one was dropped.
    Skipped,
}

/// Counters for a finished [`Watcher::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub ticks: usize,
    pub regenerations: usize,
    pub failures: usize,
}

/// Polls a [`SchemaSource`] and reruns a [`Pipeline`] on change.
///
/// One watcher owns one destination. Ticks never overlap: a tick that
/// starts while another is in flight returns [`TickOutcome::Skipped`].
pub struct Watcher<S, F> {
    pipeline: Pipeline<S>,
    store: F,
    interval: Duration,
    events: Option<mpsc::Sender<WatchEvent>>,
    active: Mutex<()>,
}

impl<S, F> Watcher<S, F>
where
    S: SchemaSource,
    F: FingerprintStore,
{
    /// Creates a watcher polling every [`DEFAULT_POLL_INTERVAL`].
    #[must_use]
    pub fn new(pipeline: Pipeline<S>, store: F) -> Self {
        Self {
            pipeline,
            store,
            interval: DEFAULT_POLL_INTERVAL,
            events: None,
            active: Mutex::new(()),
        }
    }

    /// Sends [`WatchEvent`]s to `tx`.
    #[must_use]
    pub fn with_events(mut self, tx: mpsc::Sender<WatchEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn store(&self) -> &F {
        &self.store
    }

    /// Polls until `shutdown` completes.
    ///
    /// The first tick fires immediately. Completing `shutdown` also abandons
    /// a tick that is still in flight, and no tick starts after it.
    pub async fn run<Fut>(&self, shutdown: Fut) -> WatchSummary
    where
        Fut: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut summary = WatchSummary::default();
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                biased;
                () = &mut shutdown => break,
                outcome = self.tick() => outcome,
            };

            summary.ticks += 1;
            match &outcome {
                TickOutcome::Baseline => tracing::info!("Recorded schema baseline"),
                TickOutcome::Unchanged | TickOutcome::Skipped => {
                    tracing::debug!(?outcome, "No regeneration needed");
                }
                TickOutcome::Regenerated => summary.regenerations += 1,
                TickOutcome::RegenerationFailed(e) => {
                    summary.failures += 1;
                    tracing::error!(error = %e, "Regeneration failed");
                }
                TickOutcome::PollFailed(e) => {
                    summary.failures += 1;
                    tracing::warn!(error = %e, "Polling failed, retrying on next tick");
                }
            }
        }

        tracing::info!(ticks = summary.ticks, "Stopped watching");
        summary
    }

    /// Runs a single poll-compare-regenerate cycle.
    pub async fn tick(&self) -> TickOutcome {
        let Ok(_guard) = self.active.try_lock() else {
            tracing::debug!("Previous run still active, dropping tick");
            return TickOutcome::Skipped;
        };

        self.emit(WatchEvent::StateChanged {
            state: WatchState::Polling,
        })
        .await;

        let outcome = self.poll_and_regenerate().await;

        let failure = match &outcome {
            TickOutcome::RegenerationFailed(e) => Some(e.to_string()),
            TickOutcome::PollFailed(e) => Some(e.to_string()),
            _ => None,
        };
        if let Some(error) = failure {
            self.emit(WatchEvent::Failed { error }).await;
        }

        self.emit(WatchEvent::StateChanged {
            state: WatchState::Idle,
        })
        .await;
        outcome
    }

    async fn poll_and_regenerate(&self) -> TickOutcome {
        let current = match self.pipeline.source().fetch_fingerprint().await {
            Ok(fp) => fp,
            Err(e) => return TickOutcome::PollFailed(e.into()),
        };
        let previous = match self.store.load() {
            Ok(previous) => previous,
            Err(e) => return TickOutcome::PollFailed(e.into()),
        };

        let Some(previous) = previous else {
            if let Err(e) = self.store.save(&current) {
                return TickOutcome::PollFailed(e.into());
            }
            self.emit(WatchEvent::BaselineRecorded {
                fingerprint: current,
            })
            .await;
            self.emit(WatchEvent::StateChanged {
                state: WatchState::Unchanged,
            })
            .await;
            return TickOutcome::Baseline;
        };

        if previous == current {
            self.emit(WatchEvent::StateChanged {
                state: WatchState::Unchanged,
            })
            .await;
            return TickOutcome::Unchanged;
        }

        // Persist first: without a stored change every later tick would
        // detect it again.
        if let Err(e) = self.store.save(&current) {
            return TickOutcome::PollFailed(e.into());
        }

        tracing::info!(
            previous_updated_at = %previous.updated_at,
            updated_at = %current.updated_at,
            "Detected changes in content"
        );
        self.emit(WatchEvent::ChangeDetected { previous, current })
            .await;
        self.emit(WatchEvent::StateChanged {
            state: WatchState::Regenerating,
        })
        .await;

        match self.pipeline.run().await {
            Ok(()) => {
                self.emit(WatchEvent::Regenerated).await;
                TickOutcome::Regenerated
            }
            Err(e) => TickOutcome::RegenerationFailed(e),
        }
    }

    async fn emit(&self, event: WatchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}
