//! Single node, single process task scheduler.

use crate::heartbeat::Heart;
use crate::{Controller, Error};
use errata_store::Store;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::time::MissedTickBehavior;

pub struct TaskDef {
    pub name: &'static str,
    pub period: time::Duration,
}

/// The periodic tasks and their cadence.
pub const TASKS: [TaskDef; 5] = [
    TaskDef {
        name: "poll-cves",
        period: time::Duration::hours(2),
    },
    TaskDef {
        name: "poll-errata",
        period: time::Duration::hours(2),
    },
    TaskDef {
        name: "update-cve-state",
        period: time::Duration::hours(1),
    },
    TaskDef {
        name: "downstream-check",
        period: time::Duration::minutes(10),
    },
    TaskDef {
        name: "autocreate-advisories",
        period: time::Duration::minutes(10),
    },
];

/// run the worker loop
pub async fn worker(controller: Arc<Controller>) -> Result<(), Error> {
    Server { controller }.run().await
}

struct Server {
    controller: Arc<Controller>,
}

impl Server {
    async fn run(&self) -> Result<(), Error> {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            log::debug!("checking tasks");

            for task in &TASKS {
                let status = self.controller.store().task_status(task.name).await?;
                if can_wait(status.as_ref().and_then(|s| s.last_run), task.period) {
                    continue;
                }

                // record the timestamp before processing, so that nothing
                // falls between two runs
                let last_run = OffsetDateTime::now_utc();

                log::info!("Starting run: {}", task.name);
                let heart = Heart::new(task.name, self.controller.store().clone());

                if let Err(err) = self.run_task(task.name).await {
                    log::error!("Task {} failed: {err}", task.name);
                } else {
                    log::info!("Task {} complete", task.name);
                }

                drop(heart);
                self.controller
                    .store()
                    .finish_task(task.name, last_run)
                    .await?;
            }
        }
    }

    async fn run_task(&self, name: &str) -> Result<(), Error> {
        match name {
            "poll-cves" => self.controller.poll_cves().await,
            "poll-errata" => self.controller.poll_errata().await,
            "update-cve-state" => self.controller.update_cve_state().await,
            "downstream-check" => self.controller.downstream_check().await,
            "autocreate-advisories" => self.controller.autocreate_advisories().await,
            other => {
                log::warn!("unknown task {other}");
                Ok(())
            }
        }
    }
}

/// check if the task ran recently enough to skip this tick
fn can_wait(last_run: Option<OffsetDateTime>, period: time::Duration) -> bool {
    let Some(last) = last_run else {
        return false;
    };

    (OffsetDateTime::now_utc() - last) < period
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fresh_tasks_run_immediately() {
        assert!(!can_wait(None, time::Duration::hours(2)));
    }

    #[test]
    fn recent_runs_wait_out_the_period() {
        let just_now = OffsetDateTime::now_utc() - time::Duration::minutes(1);
        assert!(can_wait(Some(just_now), time::Duration::hours(2)));

        let long_ago = OffsetDateTime::now_utc() - time::Duration::hours(3);
        assert!(!can_wait(Some(long_ago), time::Duration::hours(2)));
    }
}
