//! Non-blocking click producer.
//!
//! `track` hands the event to a bounded channel and returns immediately;
//! a background task batches events (up to 500, or every flush interval)
//! and RPUSHes them onto the `clicks:queue` Redis list. A full buffer
//! drops the event and counts it -- the redirect response never waits on
//! click persistence.

use std::time::Duration;

use metrics::counter;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use linkrift_shared::clients::redis::RedisClient;
use linkrift_shared::types::{ClickEvent, CLICK_QUEUE_KEY};

const MAX_BATCH: usize = 500;

pub struct ClickTracker {
    tx: mpsc::Sender<ClickEvent>,
    shutdown_tx: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ClickTracker {
    pub fn spawn(redis: RedisClient, capacity: usize, flush_interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(flush_loop(redis, rx, shutdown_rx, flush_interval));
        Self {
            tx,
            shutdown_tx,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Enqueue a click without blocking. Drops (and counts) when the
    /// buffer is full.
    pub fn track(&self, event: ClickEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                counter!("tracker_dropped_events_total").increment(1);
                tracing::warn!(short_code = %event.short_code, "click buffer full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                counter!("tracker_dropped_events_total").increment(1);
                tracing::warn!(short_code = %event.short_code, "click tracker stopped, dropping event");
            }
        }
    }

    /// Flush remaining buffered events, bounded by `deadline`.
    pub async fn shutdown(&self, deadline: Duration) {
        let _ = self.shutdown_tx.send(true);
        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            if tokio::time::timeout(deadline, handle).await.is_err() {
                tracing::warn!("click tracker did not drain before the shutdown deadline");
            }
        }
    }
}

async fn flush_loop(
    redis: RedisClient,
    mut rx: mpsc::Receiver<ClickEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
    flush_interval: Duration,
) {
    let mut batch: Vec<ClickEvent> = Vec::with_capacity(MAX_BATCH);
    let mut ticker = tokio::time::interval(flush_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(event) => {
                    batch.push(event);
                    if batch.len() >= MAX_BATCH {
                        flush(&redis, &mut batch).await;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                if !batch.is_empty() {
                    flush(&redis, &mut batch).await;
                }
            }
            _ = shutdown_rx.changed() => break,
        }
    }

    // Drain whatever is still buffered before returning.
    while let Ok(event) = rx.try_recv() {
        batch.push(event);
        if batch.len() >= MAX_BATCH {
            flush(&redis, &mut batch).await;
        }
    }
    if !batch.is_empty() {
        flush(&redis, &mut batch).await;
    }
    tracing::info!("click tracker drained");
}

async fn flush(redis: &RedisClient, batch: &mut Vec<ClickEvent>) {
    let values: Vec<String> = batch
        .drain(..)
        .filter_map(|event| match serde_json::to_string(&event) {
            Ok(raw) => Some(raw),
            Err(e) => {
                tracing::warn!(error = %e, "click event serialization failed");
                None
            }
        })
        .collect();

    if values.is_empty() {
        return;
    }

    let pushed = values.len() as u64;
    match redis.rpush(CLICK_QUEUE_KEY, &values).await {
        Ok(_) => {
            counter!("tracker_flushed_events_total").increment(pushed);
        }
        Err(e) => {
            // Availability over completeness: the batch is dropped, not retried.
            counter!("tracker_dropped_events_total").increment(pushed);
            tracing::warn!(error = %e, dropped = pushed, "click queue push failed");
        }
    }
}
