//! Scheduler-facing maintenance. Every job walks the whole population, commits
//! per character and can be re-run safely.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Serialize;

use crate::game::character::revive;
use crate::game::errors::GameResult;
use crate::game::storage::Records;
use crate::game::types::CharacterId;
use crate::game::{jail, mail, quest, GameContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaintenanceJob {
    DailyRefresh,
    Revive,
    MailCleanup,
    JailSweep,
    ExpireQuests,
}

impl MaintenanceJob {
    pub const ALL: [MaintenanceJob; 5] = [
        MaintenanceJob::DailyRefresh,
        MaintenanceJob::Revive,
        MaintenanceJob::MailCleanup,
        MaintenanceJob::JailSweep,
        MaintenanceJob::ExpireQuests,
    ];

    pub fn key(self) -> &'static str {
        match self {
            MaintenanceJob::DailyRefresh => "daily-refresh",
            MaintenanceJob::Revive => "revive",
            MaintenanceJob::MailCleanup => "mail-cleanup",
            MaintenanceJob::JailSweep => "jail-sweep",
            MaintenanceJob::ExpireQuests => "expire-quests",
        }
    }
}

impl fmt::Display for MaintenanceJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MaintenanceJob {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MaintenanceJob::ALL
            .into_iter()
            .find(|job| job.key() == s.trim())
            .ok_or_else(|| {
                let known: Vec<&str> = MaintenanceJob::ALL.iter().map(|job| job.key()).collect();
                format!("unknown job '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// What one maintenance run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub revived: usize,
    pub resources_refilled: usize,
    pub quests_expired: usize,
    pub mail_removed: usize,
    pub jails_released: usize,
    /// Characters skipped because their update failed.
    pub failures: usize,
}

impl MaintenanceReport {
    fn merge(&mut self, other: MaintenanceReport) {
        self.revived += other.revived;
        self.resources_refilled += other.resources_refilled;
        self.quests_expired += other.quests_expired;
        self.mail_removed += other.mail_removed;
        self.jails_released += other.jails_released;
        self.failures += other.failures;
    }
}

impl fmt::Display for MaintenanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "revived={} refilled={} quests_expired={} mail_removed={} jails_released={} failures={}",
            self.revived,
            self.resources_refilled,
            self.quests_expired,
            self.mail_removed,
            self.jails_released,
            self.failures
        )
    }
}

pub fn run_job(ctx: &GameContext, job: MaintenanceJob, now: DateTime<Utc>) -> GameResult<MaintenanceReport> {
    let report = match job {
        MaintenanceJob::DailyRefresh => daily_refresh(ctx, now)?,
        MaintenanceJob::Revive => periodic_revive(ctx)?,
        MaintenanceJob::MailCleanup => MaintenanceReport {
            mail_removed: mail::cleanup_expired_mail(ctx, now)?,
            ..MaintenanceReport::default()
        },
        MaintenanceJob::JailSweep => MaintenanceReport {
            jails_released: jail::release_expired_jails(ctx, now)?,
            ..MaintenanceReport::default()
        },
        MaintenanceJob::ExpireQuests => MaintenanceReport {
            quests_expired: quest::expire_overdue_quests(ctx, now)?,
            ..MaintenanceReport::default()
        },
    };
    info!("maintenance {} finished: {}", job, report);
    Ok(report)
}

fn active_ids(ctx: &GameContext) -> GameResult<Vec<CharacterId>> {
    Ok(ctx
        .store
        .list_characters()?
        .into_iter()
        .filter(|character| !character.is_retired())
        .map(|character| character.id)
        .collect())
}

fn revive_one(ctx: &GameContext, id: CharacterId) -> GameResult<bool> {
    let mut uow = ctx.store.begin();
    let mut character = uow.character(id)?;
    if !character.dead {
        return Ok(false);
    }
    revive(&mut uow, &ctx.factions, &mut character)?;
    uow.commit()?;
    Ok(true)
}

/// Revive every dead character at full health.
pub fn periodic_revive(ctx: &GameContext) -> GameResult<MaintenanceReport> {
    let mut report = MaintenanceReport::default();
    for id in active_ids(ctx)? {
        match revive_one(ctx, id) {
            Ok(true) => report.revived += 1,
            Ok(false) => {}
            Err(e) => {
                error!("revive failed for character {}: {}", id, e);
                report.failures += 1;
            }
        }
    }
    Ok(report)
}

/// Returns whether the character had to be revived.
fn refresh_one(ctx: &GameContext, id: CharacterId, now: DateTime<Utc>) -> GameResult<bool> {
    let mut uow = ctx.store.begin();
    let mut character = uow.character(id)?;
    let was_dead = character.dead;
    if was_dead {
        revive(&mut uow, &ctx.factions, &mut character)?;
    }
    character.resource = character.resource_max;
    character.last_resource_update = now;
    character.touch();
    uow.put_character(&character)?;
    uow.commit()?;
    Ok(was_dead)
}

/// Revive the dead, refill every resource pool, then expire overdue quests.
pub fn daily_refresh(ctx: &GameContext, now: DateTime<Utc>) -> GameResult<MaintenanceReport> {
    let mut report = MaintenanceReport::default();
    for id in active_ids(ctx)? {
        match refresh_one(ctx, id, now) {
            Ok(revived) => {
                report.resources_refilled += 1;
                if revived {
                    report.revived += 1;
                }
            }
            Err(e) => {
                error!("daily refresh failed for character {}: {}", id, e);
                report.failures += 1;
            }
        }
    }
    report.merge(MaintenanceReport {
        quests_expired: quest::expire_overdue_quests(ctx, now)?,
        ..MaintenanceReport::default()
    });
    Ok(report)
}
