//! Quest progress tracking: one active quest per character, advanced by game
//! events, completed exactly once, failed on abandon or timeout.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::game::character::{load_active, spend_resource};
use crate::game::damage::Roller;
use crate::game::errors::{Conflict, GameError, GameResult};
use crate::game::rewards::{apply_rewards, AppliedReward};
use crate::game::storage::{Records, UnitOfWork};
use crate::game::types::{
    Character, CharacterId, FailReason, ObjectiveKind, PlayerQuest, QuestRecord, SYSTEM_SENDER,
};
use crate::game::{jail, mail, GameContext};

/// Something that happened in the game which may advance an objective.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestEvent {
    pub kind: ObjectiveKind,
    pub amount: f64,
    pub target: Option<String>,
}

impl QuestEvent {
    pub fn new(kind: ObjectiveKind, amount: f64) -> Self {
        Self {
            kind,
            amount,
            target: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Progress this event contributes. Training counts the size of the
    /// change, whichever way it went.
    fn contribution(&self) -> f64 {
        match self.kind {
            ObjectiveKind::TrainAttribute => self.amount.abs(),
            _ => self.amount.max(0.0),
        }
    }

    fn matches(&self, kind: ObjectiveKind, target: Option<&str>) -> bool {
        if self.kind != kind {
            return false;
        }
        match target {
            Some(wanted) => self
                .target
                .as_deref()
                .map_or(false, |actual| actual.eq_ignore_ascii_case(wanted)),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuestUpdate {
    NoActiveQuest,
    Unaffected,
    Progressed { quest_key: String },
    Completed { quest_key: String, rewards: Vec<AppliedReward> },
    Expired { quest_key: String },
}

/// An active quest with its template and deadline.
#[derive(Debug, Clone)]
pub struct ActiveQuest {
    pub quest: PlayerQuest,
    pub template: QuestRecord,
    pub expires_at: DateTime<Utc>,
}

/// Fail the active quest if its window has passed. Applies the penalty to
/// `character`; the caller persists the character.
fn expire_if_overdue(
    ctx: &GameContext,
    uow: &mut UnitOfWork<'_>,
    character: &mut Character,
    now: DateTime<Utc>,
) -> GameResult<Option<PlayerQuest>> {
    let Some(mut quest) = uow.active_quest(character.id)? else {
        return Ok(None);
    };
    if now < quest.expires_at(ctx.settings.quest_window()) {
        return Ok(None);
    }
    quest.mark_failed(now, FailReason::Expired);
    character.change_reputation(-ctx.settings.quest_penalty);
    character.touch();
    uow.put_player_quest(&quest)?;
    info!("quest '{}' expired for {}", quest.quest_key, character.name);
    Ok(Some(quest))
}

/// Feed an event to the character's active quest inside `uow`.
///
/// Progress and completion are staged in `uow`; reputation and rewards land on
/// `character`, which the caller writes before committing.
pub fn record_event(
    ctx: &GameContext,
    uow: &mut UnitOfWork<'_>,
    character: &mut Character,
    event: &QuestEvent,
    now: DateTime<Utc>,
) -> GameResult<QuestUpdate> {
    if let Some(expired) = expire_if_overdue(ctx, uow, character, now)? {
        return Ok(QuestUpdate::Expired {
            quest_key: expired.quest_key,
        });
    }
    let Some(mut quest) = uow.active_quest(character.id)? else {
        return Ok(QuestUpdate::NoActiveQuest);
    };
    let Some(template) = uow.find_quest(&quest.quest_key)? else {
        warn!("active quest '{}' has no template", quest.quest_key);
        return Ok(QuestUpdate::Unaffected);
    };

    let contribution = event.contribution();
    if contribution <= 0.0 {
        return Ok(QuestUpdate::Unaffected);
    }

    let mut touched = false;
    for objective in &template.objectives {
        if !event.matches(objective.kind, objective.target.as_deref()) {
            continue;
        }
        if let Some(progress) = quest.progress.iter_mut().find(|p| p.objective_id == objective.id) {
            progress.value += contribution;
            progress.updated_at = now;
            touched = true;
        }
    }
    if !touched {
        return Ok(QuestUpdate::Unaffected);
    }
    debug!(
        "{} advanced quest '{}' by {} ({})",
        character.name,
        quest.quest_key,
        contribution,
        event.kind.key()
    );

    let finished = template
        .objectives
        .iter()
        .all(|objective| quest.progress_for(objective.id) >= objective.required as f64);
    if !finished {
        uow.put_player_quest(&quest)?;
        return Ok(QuestUpdate::Progressed {
            quest_key: quest.quest_key,
        });
    }

    quest.mark_complete(now);
    uow.put_player_quest(&quest)?;
    character.change_reputation(ctx.settings.quest_completion_bonus);
    let rewards = apply_rewards(uow, &ctx.factions, character, &template.rewards)?;
    mail::stage_mail(
        uow,
        &ctx.settings,
        SYSTEM_SENDER,
        character.id,
        "Quest Complete",
        &format!("You completed the quest '{}'.", template.key),
    )?;
    info!("{} completed quest '{}'", character.name, template.key);
    Ok(QuestUpdate::Completed {
        quest_key: quest.quest_key,
        rewards,
    })
}

/// Standalone event: load, record and commit in one go.
pub fn track_event(
    ctx: &GameContext,
    character_id: CharacterId,
    event: &QuestEvent,
) -> GameResult<QuestUpdate> {
    let now = Utc::now();
    let mut uow = ctx.store.begin();
    let mut character = load_active(&uow, character_id)?;
    let update = record_event(ctx, &mut uow, &mut character, event, now)?;
    uow.put_character(&character)?;
    uow.commit()?;
    Ok(update)
}

fn completed_before(records: &impl Records, character_id: CharacterId, quest_key: &str) -> GameResult<bool> {
    Ok(records
        .player_quests(character_id)?
        .iter()
        .any(|quest| quest.quest_key == quest_key && quest.is_complete()))
}

/// Start a quest. Costs one resource point.
pub fn accept_quest(
    ctx: &GameContext,
    character_id: CharacterId,
    quest_key: &str,
    now: DateTime<Utc>,
) -> GameResult<PlayerQuest> {
    let mut uow = ctx.store.begin();
    let mut character = load_active(&uow, character_id)?;
    jail::ensure_not_jailed(&mut uow, &mut character, now)?;
    expire_if_overdue(ctx, &mut uow, &mut character, now)?;
    if uow.active_quest(character_id)?.is_some() {
        return Err(Conflict::QuestAlreadyActive.into());
    }

    let template = uow.quest(quest_key)?;
    if !template.enabled {
        return Err(Conflict::QuestUnavailable.into());
    }
    if template.unique && completed_before(&uow, character_id, quest_key)? {
        return Err(Conflict::UniqueQuestCompleted.into());
    }
    spend_resource(&mut character, 1)?;

    let quest = PlayerQuest::new(uow.next_id()?, character_id, &template, now);
    uow.put_player_quest(&quest)?;
    character.touch();
    uow.put_character(&character)?;
    uow.commit()?;
    info!("{} accepted quest '{}'", character.name, quest_key);
    Ok(quest)
}

/// Give up the active quest for the reputation penalty.
pub fn abandon_quest(ctx: &GameContext, character_id: CharacterId, now: DateTime<Utc>) -> GameResult<PlayerQuest> {
    let mut uow = ctx.store.begin();
    let mut character = load_active(&uow, character_id)?;
    let mut quest = uow
        .active_quest(character_id)?
        .ok_or(GameError::Precondition(Conflict::NoActiveQuest))?;
    quest.mark_failed(now, FailReason::Abandoned);
    uow.put_player_quest(&quest)?;
    character.change_reputation(-ctx.settings.quest_penalty);
    character.touch();
    uow.put_character(&character)?;
    uow.commit()?;
    info!("{} abandoned quest '{}'", character.name, quest.quest_key);
    Ok(quest)
}

/// Fail every active quest whose window has passed. Returns how many expired.
pub fn expire_overdue_quests(ctx: &GameContext, now: DateTime<Utc>) -> GameResult<usize> {
    let window = ctx.settings.quest_window();
    let mut expired = 0usize;
    for quest in ctx.store.list_active_quests()? {
        if now < quest.expires_at(window) {
            continue;
        }
        let mut uow = ctx.store.begin();
        let mut character = uow.character(quest.character_id)?;
        if expire_if_overdue(ctx, &mut uow, &mut character, now)?.is_some() {
            uow.put_character(&character)?;
            uow.commit()?;
            expired += 1;
        }
    }
    Ok(expired)
}

pub fn active_quest(ctx: &GameContext, character_id: CharacterId) -> GameResult<Option<ActiveQuest>> {
    let Some(quest) = ctx.store.active_quest(character_id)? else {
        return Ok(None);
    };
    let template = ctx.store.quest(&quest.quest_key)?;
    let expires_at = quest.expires_at(ctx.settings.quest_window());
    Ok(Some(ActiveQuest {
        quest,
        template,
        expires_at,
    }))
}

/// Draw up to `quest_offer_count` distinct quests, weighted by spawn weight.
/// Disabled quests and unique quests the character already finished are left out.
pub fn draw_quest_offers(
    ctx: &GameContext,
    character_id: CharacterId,
    roller: &mut impl Roller,
) -> GameResult<Vec<QuestRecord>> {
    let history = ctx.store.player_quests(character_id)?;
    let mut pool: Vec<QuestRecord> = ctx
        .store
        .list_quests()?
        .into_iter()
        .filter(|quest| quest.enabled && quest.spawn_weight > 0.0)
        .filter(|quest| {
            !(quest.unique
                && history
                    .iter()
                    .any(|done| done.quest_key == quest.key && done.is_complete()))
        })
        .collect();

    let mut offers = Vec::new();
    while offers.len() < ctx.settings.quest_offer_count && !pool.is_empty() {
        let total: f64 = pool.iter().map(|quest| quest.spawn_weight).sum();
        let mut pick = roller.float_range(0.0, total);
        let mut chosen = pool.len() - 1;
        for (index, quest) in pool.iter().enumerate() {
            if pick < quest.spawn_weight {
                chosen = index;
                break;
            }
            pick -= quest.spawn_weight;
        }
        offers.push(pool.swap_remove(chosen));
    }
    Ok(offers)
}
