use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::models::case::SyncReport;
use crate::services::CaseService;

const JOB_NAME: &str = "sync_cases";

pub struct Scheduler {
    cases: Arc<dyn CaseService>,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    pub fn new(cases: Arc<dyn CaseService>, config: SchedulerConfig) -> Self {
        Self {
            cases,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        if let Some(cron_expr) = &self.config.cron_expression {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let cases = Arc::clone(&self.cases);
        let running = Arc::clone(&self.running);

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let cases = Arc::clone(&cases);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                run_sync_job(cases.as_ref()).await;
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler running with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let interval_mins = self.config.check_interval_minutes.max(1);

        info!("Scheduler running: check every {}m", interval_mins);

        let mut check_interval = interval(Duration::from_secs(u64::from(interval_mins) * 60));

        loop {
            check_interval.tick().await;
            if !*self.running.read().await {
                break;
            }
            run_sync_job(self.cases.as_ref()).await;
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Runs one sync pass outside the schedule.
    pub async fn run_once(&self) -> Result<SyncReport> {
        info!("Running manual check...");
        Ok(self.cases.sync_all().await?)
    }
}

async fn run_sync_job(cases: &dyn CaseService) {
    let start = std::time::Instant::now();
    info!(
        event = "job_started",
        job_name = JOB_NAME,
        "Starting scheduled case sync"
    );

    match cases.sync_all().await {
        Ok(report) => info!(
            event = "job_finished",
            job_name = JOB_NAME,
            changed = report.changed,
            failed = report.failed,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Scheduled case sync finished"
        ),
        Err(e) => error!(
            event = "job_failed",
            job_name = JOB_NAME,
            error = %e,
            "Scheduled case sync failed"
        ),
    }
}
