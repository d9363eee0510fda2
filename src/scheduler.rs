//! Interval scheduler for the maintenance jobs.
//!
//! Each job gets its own tokio interval from `[scheduler]` in the config. The
//! engine is synchronous (sled), so every job runs on the blocking pool and a
//! failed run is logged and retried on the next tick.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use log::{debug, error, info};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::config::SchedulerConfig;
use crate::game::maintenance::{self, MaintenanceJob, MaintenanceReport};
use crate::game::GameContext;

fn job_interval(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Run one job on the blocking pool with the current time.
pub async fn run_job_now(ctx: Arc<GameContext>, job: MaintenanceJob) -> Result<MaintenanceReport> {
    debug!("scheduler running {}", job);
    let report = tokio::task::spawn_blocking(move || maintenance::run_job(&ctx, job, Utc::now())).await??;
    Ok(report)
}

async fn tick(ctx: &Arc<GameContext>, job: MaintenanceJob) {
    if let Err(e) = run_job_now(ctx.clone(), job).await {
        error!("scheduled {} failed: {}", job, e);
    }
}

/// Drive the maintenance jobs until `shutdown` resolves.
pub async fn run<F>(ctx: Arc<GameContext>, config: SchedulerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let mut daily = job_interval(config.daily_refresh_interval());
    let mut revive = job_interval(config.revive_interval());
    let mut mail = job_interval(config.mail_cleanup_interval());
    let mut jail = job_interval(config.jail_sweep_interval());
    tokio::pin!(shutdown);

    info!(
        "Scheduler started (daily refresh {}h, revive {}h, mail cleanup {}h, jail sweep {}m)",
        config.daily_refresh_hours, config.revive_hours, config.mail_cleanup_hours, config.jail_sweep_minutes
    );

    loop {
        tokio::select! {
            _ = daily.tick() => tick(&ctx, MaintenanceJob::DailyRefresh).await,
            _ = revive.tick() => tick(&ctx, MaintenanceJob::Revive).await,
            _ = mail.tick() => tick(&ctx, MaintenanceJob::MailCleanup).await,
            _ = jail.tick() => tick(&ctx, MaintenanceJob::JailSweep).await,
            _ = &mut shutdown => {
                info!("Scheduler received shutdown signal");
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{FactionCatalog, GameSettings, GameStore};
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> Arc<GameContext> {
        let store = GameStore::open(dir.path()).unwrap();
        Arc::new(GameContext::new(
            store,
            Arc::new(FactionCatalog::default()),
            GameSettings::default(),
        ))
    }

    #[tokio::test]
    async fn stops_when_shutdown_resolves() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        run(ctx, SchedulerConfig::default(), async {}).await.unwrap();
    }

    #[tokio::test]
    async fn run_job_now_reports_on_empty_store() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let report = run_job_now(ctx, MaintenanceJob::DailyRefresh).await.unwrap();
        assert_eq!(report, MaintenanceReport::default());
    }
}
