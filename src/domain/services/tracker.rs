#[cfg(test)]
#[path = "tracker_test.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time;

use super::Composition;
use super::EventBindings;
use super::HeartbeatComposer;
use super::RequestScheduler;
use super::TrackerContext;
use crate::domain::models::HostHook;
use crate::infrastructure::api::ApiClient;

/// Drives the heartbeat pipeline from host events and per-step ticks. All
/// state mutation happens on the task running `start`.
pub struct Tracker {
    context: Arc<TrackerContext>,
    composer: HeartbeatComposer,
    api: Arc<ApiClient>,
    scheduler: RequestScheduler,
    bindings: EventBindings,
    tick_interval: Duration,
}

impl Tracker {
    pub fn new(
        context: Arc<TrackerContext>,
        composer: HeartbeatComposer,
        api: Arc<ApiClient>,
        scheduler: RequestScheduler,
        bindings: EventBindings,
        tick_interval: Duration,
    ) -> Tracker {
        return Tracker {
            context,
            composer,
            api,
            scheduler,
            bindings,
            tick_interval,
        };
    }

    /// Subscribes to the host and checks the stored key again. Projects are
    /// listed once the key is confirmed.
    pub fn initialize(&self) {
        self.bindings.register();
        self.api.revalidate_stored_key();
    }

    fn reload(&self) {
        tracing::info!("Host reloaded, rebuilding tracker state");
        self.context.reinitialize();
        self.bindings.rebind();
        self.api.list_projects();
    }

    pub async fn handle_event(&self, hook: HostHook) -> Composition {
        return self.handle_event_at(hook, HeartbeatComposer::now()).await;
    }

    pub async fn handle_event_at(&self, hook: HostHook, time: i64) -> Composition {
        tracing::debug!(hook = hook.to_string(), "Host event");

        if hook == HostHook::HotReloadCompleted {
            self.reload();
        }

        let composition = self.composer.compose(hook.is_write(), time).await;
        if let Composition::Ready(heartbeat) = &composition {
            if let Err(err) = self.api.post_heartbeat(heartbeat) {
                tracing::error!(error = ?err, "Failed to send heartbeat");
            }
        }

        return composition;
    }

    pub fn tick(&self) {
        self.scheduler.tick();
    }

    pub async fn flush(&self) {
        tracing::debug!(pending = self.scheduler.len(), "Flushing requests");
        self.scheduler.flush().await;
    }

    /// Handles events and ticks the scheduler every `tick_interval`. Runs
    /// until the event channel closes, callers usually race it against the
    /// host's own lifetime.
    pub async fn start(&self, rx: &mut mpsc::UnboundedReceiver<HostHook>) -> Result<()> {
        let mut ticker = time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Some(hook) => {
                            self.handle_event(hook).await;
                        }
                        None => break,
                    }
                },
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }

        self.flush().await;
        return Ok(());
    }
}
