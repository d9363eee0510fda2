//! Outcome settlement: turns a concluded fight into persisted consequences.
//!
//! A PvP fight checks its preconditions, runs the resolver, then stages the
//! XP, gold tax, reputation table, death bookkeeping, battle record, both
//! notification mails and the winner's quest events in one [`UnitOfWork`].
//! Nothing is visible until that single commit succeeds.

use chrono::{DateTime, Utc};
use log::info;

use crate::game::character::{self, add_xp, load_active, min_attackable_level, regenerate_resource, spend_resource};
use crate::game::combat::{resolve, CombatEvent, CombatRules, FightOutcome, Side};
use crate::game::damage::Roller;
use crate::game::errors::{Conflict, GameResult};
use crate::game::factions::Relation;
use crate::game::narration::{self, Cast};
use crate::game::quest::{self, QuestEvent, QuestUpdate};
use crate::game::rewards::{apply_rewards, AppliedReward};
use crate::game::stats::Combatant;
use crate::game::storage::{Records, UnitOfWork};
use crate::game::types::{BattleRecord, Character, CharacterId, ObjectiveKind, Reward, BATTLE_SCHEMA_VERSION};
use crate::game::{jail, mail, GameContext};

/// Resource spent to start any fight.
pub const FIGHT_COST: u32 = 1;

/// Share of the loser's gold handed to the winner.
const GOLD_TAX: f64 = 0.05;

/// Reputation deltas `(attacker, defender)` for a concluded PvP fight.
pub fn reputation_changes(relation: Relation, winner: Side) -> (i32, i32) {
    match (relation, winner) {
        (Relation::Same, Side::Attacker) => (-4, 0),
        (Relation::Same, Side::Defender) => (-4, 4),
        (Relation::Enemy, Side::Attacker) => (3, -3),
        (Relation::Enemy, Side::Defender) => (-3, 3),
        (Relation::Neutral, Side::Attacker) => (1, -1),
        (Relation::Neutral, Side::Defender) => (-1, 1),
    }
}

/// Gold moved from loser to winner on a kill.
pub fn gold_tax(loser_gold: u64) -> u64 {
    let tax = (loser_gold as f64 * GOLD_TAX).floor() as u64;
    tax.min(loser_gold)
}

/// XP for the winner: U[1,100] plus 10 per level the loser had over them.
pub fn roll_victory_xp(winner_level: u32, loser_level: u32, roller: &mut impl Roller) -> u64 {
    let gap = loser_level.saturating_sub(winner_level) as u64;
    roller.int_range(1, 100) + 10 * gap
}

fn check_rematch(
    ctx: &GameContext,
    records: &impl Records,
    attacker: CharacterId,
    defender: CharacterId,
    now: DateTime<Utc>,
) -> GameResult<()> {
    let Some(previous) = records.latest_battle_between(attacker, defender)? else {
        return Ok(());
    };
    if !previous.is_decided() {
        return Err(Conflict::UndecidedBattle.into());
    }
    let ready_at = previous.created_at + ctx.settings.rematch_cooldown();
    if now < ready_at {
        return Err(Conflict::RematchCooldown {
            remaining_secs: (ready_at - now).num_seconds().max(1),
        }
        .into());
    }
    Ok(())
}

/// Reject a PvP fight before anything is touched. Jailed or dead parties,
/// self-attacks, targets under the level floor and rematches inside the
/// cooldown all fail here.
fn check_preconditions(
    ctx: &GameContext,
    uow: &mut UnitOfWork<'_>,
    attacker: &mut Character,
    defender: &mut Character,
    now: DateTime<Utc>,
) -> GameResult<()> {
    jail::ensure_not_jailed(uow, attacker, now)?;
    if jail::active_sentence(uow, defender, now)?.is_some() {
        return Err(Conflict::Jailed.into());
    }
    if attacker.dead {
        return Err(Conflict::Dead.into());
    }
    if defender.dead {
        return Err(Conflict::OpponentDead.into());
    }
    let min_level = min_attackable_level(attacker.level);
    if defender.level < min_level {
        return Err(Conflict::LevelFloor { min_level }.into());
    }
    check_rematch(ctx, uow, attacker.id, defender.id, now)
}

/// Attack another character and settle the result atomically.
pub fn fight(
    ctx: &GameContext,
    attacker_id: CharacterId,
    defender_id: CharacterId,
    roller: &mut impl Roller,
) -> GameResult<BattleRecord> {
    fight_at(ctx, attacker_id, defender_id, roller, Utc::now())
}

pub fn fight_at(
    ctx: &GameContext,
    attacker_id: CharacterId,
    defender_id: CharacterId,
    roller: &mut impl Roller,
    now: DateTime<Utc>,
) -> GameResult<BattleRecord> {
    if attacker_id == defender_id {
        return Err(Conflict::SelfTarget.into());
    }
    let mut uow = ctx.store.begin();
    let mut attacker = load_active(&uow, attacker_id)?;
    let mut defender = load_active(&uow, defender_id)?;
    check_preconditions(ctx, &mut uow, &mut attacker, &mut defender, now)?;
    regenerate_resource(&mut attacker, now);
    spend_resource(&mut attacker, FIGHT_COST)?;

    let attacker_level = attacker.level;
    let defender_level = defender.level;
    let attacker_gear = uow.equipped_items(&attacker)?;
    let defender_gear = uow.equipped_items(&defender)?;
    let outcome = resolve(
        Combatant::from_character(&attacker, &ctx.factions, &attacker_gear),
        Combatant::from_character(&defender, &ctx.factions, &defender_gear),
        CombatRules::pvp(ctx.settings.max_combat_rounds),
        roller,
    );
    attacker.health = outcome.attacker.health;
    defender.health = outcome.defender.health;

    let relation = Relation::between(attacker.faction, defender.faction);
    let (attacker_rep, defender_rep) = reputation_changes(relation, outcome.winner);
    let attacker_rep = attacker.change_reputation(attacker_rep);
    let defender_rep = defender.change_reputation(defender_rep);

    let (winner, loser) = match outcome.winner {
        Side::Attacker => (&mut attacker, &mut defender),
        Side::Defender => (&mut defender, &mut attacker),
    };
    let xp = roll_victory_xp(winner.level, loser.level, roller);
    let tax = gold_tax(loser.gold);
    loser.gold -= tax;
    winner.gold += tax;
    loser.health = 0;
    loser.dead = true;
    loser.deaths += 1;
    loser.last_killed_by = Some(winner.id);
    winner.pvp_kills += 1;
    winner.last_killed = Some(loser.id);
    add_xp(&uow, &ctx.factions, winner, xp)?;

    if winner.faction != loser.faction {
        let target = loser.faction.key();
        quest::record_event(
            ctx,
            &mut uow,
            winner,
            &QuestEvent::new(ObjectiveKind::KillOtherFaction, 1.0).with_target(target),
            now,
        )?;
        if winner.faction.enemy() == loser.faction {
            quest::record_event(
                ctx,
                &mut uow,
                winner,
                &QuestEvent::new(ObjectiveKind::KillEnemyFaction, 1.0).with_target(target),
                now,
            )?;
        }
    }

    let winner_id = winner.id;
    let winner_name = winner.name.clone();
    let winner_faction = winner.faction;
    let (attacker_gold_change, defender_gold_change) = match outcome.winner {
        Side::Attacker => (tax as i64, -(tax as i64)),
        Side::Defender => (-(tax as i64), tax as i64),
    };

    let mut events = outcome.events;
    events.push(CombatEvent::Victory {
        winner: outcome.winner,
        xp,
    });
    let log = narration::render_log(&events, Cast::new(&attacker.name, &defender.name));

    for character in [&mut attacker, &mut defender] {
        character.last_fight_at = Some(now);
        character.touch();
    }

    let mut battle = BattleRecord {
        id: 0,
        attacker_id,
        defender_id,
        winner_id: Some(winner_id),
        attacker_name: attacker.name.clone(),
        defender_name: defender.name.clone(),
        winner_name: Some(winner_name.clone()),
        attacker_faction: attacker.faction,
        defender_faction: defender.faction,
        winner_faction: Some(winner_faction),
        attacker_level,
        defender_level,
        log,
        events,
        rounds: outcome.rounds,
        attacker_reputation_change: attacker_rep,
        defender_reputation_change: defender_rep,
        xp_gained: xp,
        resource_cost: FIGHT_COST,
        attacker_gold_change,
        defender_gold_change,
        created_at: now,
        schema_version: BATTLE_SCHEMA_VERSION,
    };
    battle.id = uow.insert_battle(battle.clone())?;

    let attacker_won = outcome.winner == Side::Attacker;
    mail::stage_mail(
        &mut uow,
        &ctx.settings,
        winner_id,
        attacker_id,
        &narration::battle_subject(&defender.name),
        &narration::battle_body(attacker_won, &defender.name, battle.id),
    )?;
    mail::stage_mail(
        &mut uow,
        &ctx.settings,
        winner_id,
        defender_id,
        &narration::battle_subject(&attacker.name),
        &narration::battle_body(!attacker_won, &attacker.name, battle.id),
    )?;

    uow.put_character(&attacker)?;
    uow.put_character(&defender)?;
    uow.commit()?;
    info!(
        "battle {}: {} defeated {} in {} rounds (+{} xp, {} gold)",
        battle.id,
        winner_name,
        if attacker_won { &defender.name } else { &attacker.name },
        battle.rounds,
        xp,
        tax
    );
    Ok(battle)
}

/// Everything a player sees after fighting an NPC.
#[derive(Debug, Clone, PartialEq)]
pub struct NpcFightReport {
    pub npc_key: String,
    pub won: bool,
    pub rounds: u32,
    pub events: Vec<CombatEvent>,
    pub log: Vec<String>,
    pub auto_healed: u32,
    pub xp: u64,
    pub gold: u64,
    pub reputation_change: i32,
    pub rewards: Vec<AppliedReward>,
    pub quest: QuestUpdate,
}

/// Fight a battlefield NPC. The NPC record is only read; every fight starts it
/// at full health.
pub fn settle_npc_fight(
    ctx: &GameContext,
    character_id: CharacterId,
    npc_key: &str,
    roller: &mut impl Roller,
) -> GameResult<NpcFightReport> {
    let now = Utc::now();
    let mut uow = ctx.store.begin();
    let mut player = load_active(&uow, character_id)?;
    jail::ensure_not_jailed(&mut uow, &mut player, now)?;
    if player.dead {
        return Err(Conflict::Dead.into());
    }
    let npc = uow.npc(npc_key)?;
    regenerate_resource(&mut player, now);
    spend_resource(&mut player, FIGHT_COST)?;

    let weapon = match &npc.weapon {
        Some(key) => uow.find_item(key)?,
        None => None,
    };
    let armor = match &npc.armor {
        Some(key) => uow.find_item(key)?,
        None => None,
    };
    let gear = uow.equipped_items(&player)?;
    let outcome: FightOutcome = resolve(
        Combatant::from_character(&player, &ctx.factions, &gear),
        Combatant::from_npc(&npc, weapon.as_ref(), armor.as_ref()),
        CombatRules::plain(ctx.settings.max_combat_rounds),
        roller,
    );
    let won = outcome.winner == Side::Attacker;
    player.health = outcome.attacker.health;
    let mut events = outcome.events;

    let mut auto_healed = 0;
    let mut xp = 0;
    let mut gold = 0;
    let mut rewards = Vec::new();
    let mut quest_update = QuestUpdate::Unaffected;
    let reputation_change;

    if won {
        let max_health = character::max_health_of(&uow, &ctx.factions, &player)?;
        let missing = max_health.saturating_sub(player.health);
        auto_healed = (missing as u64).min(player.gold) as u32;
        if auto_healed > 0 {
            player.health += auto_healed;
            player.gold -= auto_healed as u64;
            events.push(CombatEvent::AutoHealed {
                side: Side::Attacker,
                amount: auto_healed,
            });
        }

        xp = roller.int_range(npc.xp_range.0, npc.xp_range.1);
        gold = roller.int_range(npc.gold_range.0, npc.gold_range.1);
        let mut lines = vec![Reward::Xp(xp), Reward::Gold(gold), Reward::Reputation(npc.reputation)];
        if let Some(weapon) = &npc.weapon {
            lines.push(Reward::Item {
                item_key: weapon.clone(),
            });
            events.push(CombatEvent::Loot {
                side: Side::Attacker,
                item_key: weapon.clone(),
            });
        }
        events.push(CombatEvent::Victory {
            winner: Side::Attacker,
            xp,
        });
        rewards = apply_rewards(&uow, &ctx.factions, &mut player, &lines)?;
        reputation_change = rewards
            .iter()
            .find_map(|applied| match applied {
                AppliedReward::Reputation(delta) => Some(*delta),
                _ => None,
            })
            .unwrap_or(0);
        quest_update = quest::record_event(
            ctx,
            &mut uow,
            &mut player,
            &QuestEvent::new(ObjectiveKind::KillNpc, 1.0).with_target(&npc.key),
            now,
        )?;
    } else {
        player.health = 0;
        player.dead = true;
        player.deaths += 1;
        reputation_change = player.change_reputation(-npc.reputation);
    }

    let log = narration::render_log(&events, Cast::new(&player.name, &npc.name));
    player.last_fight_at = Some(now);
    player.touch();
    uow.put_character(&player)?;
    uow.commit()?;
    info!(
        "{} {} against {} in {} rounds",
        player.name,
        if won { "won" } else { "lost" },
        npc.name,
        outcome.rounds
    );

    Ok(NpcFightReport {
        npc_key: npc.key,
        won,
        rounds: outcome.rounds,
        events,
        log,
        auto_healed,
        xp,
        gold,
        reputation_change,
        rewards,
        quest: quest_update,
    })
}
