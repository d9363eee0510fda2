//! Jail: admin-imposed, time-boxed restrictions checked before gated actions.

use chrono::{DateTime, Utc};
use log::info;

use crate::game::errors::{Conflict, GameError, GameResult};
use crate::game::mail;
use crate::game::storage::{Records, UnitOfWork};
use crate::game::types::{Character, CharacterId, JailRecord, JAIL_SCHEMA_VERSION, SYSTEM_SENDER};
use crate::game::GameContext;

/// Longest sentence an admin may hand out: one year.
pub const MAX_JAIL_MINUTES: i64 = 365 * 24 * 60;

/// The character's sentence if it is still running.
pub fn active_sentence(
    records: &impl Records,
    character: &Character,
    now: DateTime<Utc>,
) -> GameResult<Option<JailRecord>> {
    let Some(jail_id) = character.current_jail else {
        return Ok(None);
    };
    let record = records.jail(jail_id)?;
    if record.released || record.is_expired(now) {
        Ok(None)
    } else {
        Ok(Some(record))
    }
}

/// Reject jailed characters. An expired sentence is released in `uow` on the way.
pub fn ensure_not_jailed(uow: &mut UnitOfWork<'_>, character: &mut Character, now: DateTime<Utc>) -> GameResult<()> {
    let Some(jail_id) = character.current_jail else {
        return Ok(());
    };
    let mut record = uow.jail(jail_id)?;
    if !record.released && !record.is_expired(now) {
        return Err(Conflict::Jailed.into());
    }
    record.released = true;
    uow.put_jail(&record)?;
    character.current_jail = None;
    character.touch();
    info!("released {} from jail (sentence expired)", character.name);
    Ok(())
}

pub fn jail_character(
    ctx: &GameContext,
    admin_id: CharacterId,
    target_id: CharacterId,
    minutes: i64,
    real_reason: &str,
    game_reason: &str,
) -> GameResult<JailRecord> {
    if minutes <= 0 {
        return Err(GameError::validation("jail time must be positive"));
    }
    if minutes > MAX_JAIL_MINUTES {
        return Err(GameError::validation(format!(
            "jail time cannot exceed {} minutes",
            MAX_JAIL_MINUTES
        )));
    }
    let now = Utc::now();
    let mut uow = ctx.store.begin();
    let mut target = uow.character(target_id)?;
    if active_sentence(&uow, &target, now)?.is_some() {
        return Err(Conflict::Jailed.into());
    }

    let mut record = JailRecord {
        id: 0,
        character_id: target_id,
        admin_id,
        started_at: now,
        duration_minutes: minutes,
        real_reason: real_reason.to_string(),
        game_reason: game_reason.to_string(),
        released: false,
        schema_version: JAIL_SCHEMA_VERSION,
    };
    record.id = uow.insert_jail(record.clone())?;
    target.current_jail = Some(record.id);
    target.touch();
    uow.put_character(&target)?;
    mail::stage_mail(
        &mut uow,
        &ctx.settings,
        SYSTEM_SENDER,
        target_id,
        "You have been jailed",
        &format!("You are in jail for {} minutes.\n\nReason: {}", minutes, game_reason),
    )?;
    uow.commit()?;
    info!(
        "{} jailed for {} minutes by {} ({})",
        target.name, minutes, admin_id, real_reason
    );
    Ok(record)
}

/// Release a character early. Returns false when they were not jailed.
pub fn release(ctx: &GameContext, character_id: CharacterId) -> GameResult<bool> {
    let mut uow = ctx.store.begin();
    let mut character = uow.character(character_id)?;
    let Some(jail_id) = character.current_jail.take() else {
        return Ok(false);
    };
    let mut record = uow.jail(jail_id)?;
    record.released = true;
    uow.put_jail(&record)?;
    character.touch();
    uow.put_character(&character)?;
    uow.commit()?;
    info!("released {} from jail", character.name);
    Ok(true)
}

/// Release every expired sentence, committing per character.
pub fn release_expired_jails(ctx: &GameContext, now: DateTime<Utc>) -> GameResult<usize> {
    let mut released = 0usize;
    for record in ctx.store.list_jails()? {
        if record.released || !record.is_expired(now) {
            continue;
        }
        let mut uow = ctx.store.begin();
        let mut character = uow.character(record.character_id)?;
        let mut record = record;
        record.released = true;
        uow.put_jail(&record)?;
        if character.current_jail == Some(record.id) {
            character.current_jail = None;
            character.touch();
            uow.put_character(&character)?;
        }
        uow.commit()?;
        released += 1;
    }
    if released > 0 {
        info!("jail sweep released {} characters", released);
    }
    Ok(released)
}
