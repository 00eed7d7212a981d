//! Liveness heartbeat held while an activity runs.

use errata_store::Store;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::{
    task::JoinHandle,
    time::{interval, Duration},
};

/// Beats the task's heartbeat column until dropped.
pub struct Heart {
    name: String,
    handle: JoinHandle<()>,
}

impl Heart {
    pub const RATE: Duration = Duration::from_secs(10);

    pub fn new(name: impl Into<String>, store: Arc<dyn Store>) -> Self {
        let name = name.into();
        let task = name.clone();
        let handle = tokio::spawn(async move {
            let mut interval = interval(Heart::RATE);
            // track our own last beat; the update is optimistic-locked so a
            // second worker beating the same task surfaces as an error here
            let mut previous = match store.task_status(&task).await {
                Ok(status) => status.and_then(|s| s.heartbeat),
                Err(err) => {
                    log::error!("Failed to read heartbeat for '{task}': {err}");
                    None
                }
            };
            loop {
                interval.tick().await;
                let now = OffsetDateTime::now_utc();
                match store.beat_task(&task, previous, now).await {
                    Ok(()) => {
                        log::debug!("{task}: heartbeat");
                        previous = Some(now);
                    }
                    Err(err) => log::error!("Failed to send heartbeat for '{task}': {err}"),
                }
            }
        });
        Self { name, handle }
    }
}

impl Drop for Heart {
    fn drop(&mut self) {
        log::debug!("Shutting down heartbeat for {}", self.name);
        self.handle.abort();
    }
}
