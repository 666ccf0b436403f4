// Cross-session sync - Polls the durable store and reconciles the provider
use crate::application::data_provider::DataProvider;
use crate::application::session_store::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Background reconciliation task. Aborted when dropped.
pub struct SessionSync {
    task: JoinHandle<()>,
}

/// Resolves on the next store notification; never, once the store has none
async fn next_change(changes: &mut Option<watch::Receiver<u64>>) {
    let Some(receiver) = changes.as_mut() else {
        return std::future::pending().await;
    };
    if receiver.changed().await.is_err() {
        debug!("session store stopped publishing changes");
        *changes = None;
        std::future::pending::<()>().await;
    }
}

impl SessionSync {
    pub fn spawn(provider: Arc<DataProvider>, store: Arc<dyn SessionStore>, poll_interval: Duration) -> Self {
        info!(poll_interval_ms = poll_interval.as_millis() as u64, "starting session sync");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut changes = store.subscribe();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = store.refresh() {
                            warn!(error = %e, "failed to refresh session store");
                        }
                    }
                    _ = next_change(&mut changes) => {}
                }
                provider.reconcile_session().await;
            }
        });

        Self { task }
    }
}

impl Drop for SessionSync {
    fn drop(&mut self) {
        self.task.abort();
    }
}
