//! Periodic bot status polling.

use std::{sync::Arc, time::Duration};

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{domain::BotStatus, ports::BotStatusProbe};

/// Keeps the latest [`BotStatus`] fresh in the background.
#[derive(Clone)]
pub struct StatusMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    probe: Arc<dyn BotStatusProbe>,
    interval: Duration,
    latest: watch::Sender<BotStatus>,
    task: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl StatusMonitor {
    pub fn new(probe: Arc<dyn BotStatusProbe>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                probe,
                interval,
                latest: watch::Sender::new(BotStatus::NotInitialized),
                task: Mutex::new(None),
            }),
        }
    }

    /// Probe once and publish the result.
    pub async fn refresh(&self) -> BotStatus {
        let status = self.inner.probe.bot_status().await;
        let changed = self.inner.latest.send_if_modified(|s| {
            if *s == status {
                false
            } else {
                *s = status;
                true
            }
        });
        if changed {
            tracing::info!(%status, "bot status changed");
        }
        status
    }

    pub fn latest(&self) -> BotStatus {
        *self.inner.latest.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<BotStatus> {
        self.inner.latest.subscribe()
    }

    /// Start polling, if not already running. The first probe fires immediately.
    pub async fn start(&self) {
        let mut task = self.inner.task.lock().await;
        if task.is_some() {
            return;
        }

        let tok = CancellationToken::new();
        let cancel = tok.clone();
        let monitor = self.clone();
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(monitor.inner.interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => {
                        monitor.refresh().await;
                    }
                }
            }
        });

        *task = Some((tok, handle));
    }

    pub async fn stop(&self) {
        let task = self.inner.task.lock().await.take();
        if let Some((tok, handle)) = task {
            tok.cancel();
            let _ = handle.await;
        }
    }

    pub async fn is_running(&self) -> bool {
        self.inner.task.lock().await.is_some()
    }
}
