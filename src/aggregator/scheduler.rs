use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::feed::{ingest, FeedSource};
use crate::storage::{Store, StoreError};

/// Knobs for one scheduler run.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    /// Time between ticks; each tick launches at most one fetch
    pub interval: Duration,
    /// Deadline for one fetch including the body transfer
    pub fetch_timeout: Duration,
    /// Fetch+ingest tasks allowed in flight at once
    pub max_concurrent: usize,
}

/// Fetches feeds round-robin by staleness, one launch per tick.
///
/// Each tick takes a permit, asks the store for the least recently fetched
/// feed, stamps it fetched and hands it to a worker. Stamping happens on the
/// coordinating task before the worker starts, so a feed cannot be picked
/// again until every other feed has had a turn.
pub struct RotationScheduler {
    store: Arc<dyn Store>,
    source: Arc<dyn FeedSource>,
    settings: SchedulerSettings,
    permits: Arc<Semaphore>,
}

impl RotationScheduler {
    pub fn new(
        store: Arc<dyn Store>,
        source: Arc<dyn FeedSource>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            store,
            source,
            permits: Arc::new(Semaphore::new(settings.max_concurrent)),
            settings,
        }
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Fetch and store failures are logged and never end the loop. On
    /// shutdown no new fetch is launched and in-flight workers are awaited,
    /// each bounded by the fetch deadline.
    ///
    /// # Errors
    ///
    /// Only if the concurrency semaphore is closed, which never happens while
    /// the scheduler owns it.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut workers = JoinSet::new();

        tracing::info!(
            interval = ?self.settings.interval,
            max_concurrent = self.settings.max_concurrent,
            "Collecting feeds"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    log_worker_exit(joined);
                    continue;
                }
                _ = ticker.tick() => {}
            }

            // Blocks here while every permit is held by a worker
            let permit = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                permit = Arc::clone(&self.permits).acquire_owned() => {
                    permit.context("fetch semaphore closed")?
                }
            };

            match self.launch(permit, &mut workers).await {
                Ok(()) => {}
                Err(StoreError::NoFeeds) => {
                    tracing::info!("No feeds registered, nothing to fetch");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Could not pick next feed, skipping tick");
                }
            }
        }

        if !workers.is_empty() {
            tracing::info!(in_flight = workers.len(), "Waiting for in-flight fetches");
        }
        while let Some(joined) = workers.join_next().await {
            log_worker_exit(joined);
        }
        tracing::info!("Collector stopped");
        Ok(())
    }

    /// Select, mark and spawn. The permit travels with the worker.
    async fn launch(
        &self,
        permit: OwnedSemaphorePermit,
        workers: &mut JoinSet<()>,
    ) -> Result<(), StoreError> {
        let feed = self.store.next_feed_to_fetch().await?;
        self.store.mark_fetched(feed.id).await?;
        tracing::info!(feed = %feed.url, name = %feed.name, "Fetching feed");

        let store = Arc::clone(&self.store);
        let source = Arc::clone(&self.source);
        let deadline = self.settings.fetch_timeout;

        workers.spawn(async move {
            let _permit = permit;
            match source.fetch(&feed.url, deadline).await {
                Ok(document) => {
                    ingest(store.as_ref(), &feed, &document).await;
                }
                Err(e) => {
                    tracing::warn!(feed = %feed.url, error = %e, "Failed to fetch feed");
                }
            }
        });
        Ok(())
    }
}

fn log_worker_exit(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "Fetch worker panicked");
    }
}
