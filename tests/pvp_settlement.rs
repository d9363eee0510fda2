/// Integration tests for PvP settlement: gold, reputation, death bookkeeping,
/// battle history, notification mail, quest progress and fight preconditions.
mod common;

use chrono::{Duration, Utc};
use common::{game_context, spawn};
use warbound::game::combat::{CombatEvent, Side};
use warbound::game::errors::{Conflict, GameError};
use warbound::game::maintenance::periodic_revive;
use warbound::game::settlement::{fight, fight_at};
use warbound::game::{jail, mail, quest, Faction, Records, ScriptedRoller};

#[test]
fn attacker_victory_settles_every_consequence() {
    let (ctx, _temp) = game_context();
    let arlen = spawn(&ctx, "Arlen", Faction::Veylan);
    let brisk = spawn(&ctx, "Brisk", Faction::Urghan);
    let t0 = Utc::now();

    // Equal stats, no specials: one point per swing, the attacker opens and wins.
    let battle = fight_at(&ctx, arlen.id, brisk.id, &mut ScriptedRoller::all_fail(), t0).expect("fight");

    assert_eq!(battle.winner_id, Some(arlen.id));
    assert_eq!(battle.rounds, 49);
    assert_eq!(battle.xp_gained, 1);
    assert_eq!(battle.attacker_level, 1);
    assert_eq!(battle.attacker_gold_change, 25);
    assert_eq!(battle.defender_gold_change, -25);
    assert_eq!(battle.attacker_reputation_change, 3);
    assert_eq!(battle.defender_reputation_change, -3);
    assert_eq!(
        battle.events.last(),
        Some(&CombatEvent::Victory {
            winner: Side::Attacker,
            xp: 1
        })
    );
    assert!(!battle.log.is_empty());

    let winner = ctx.store.character(arlen.id).unwrap();
    let loser = ctx.store.character(brisk.id).unwrap();
    assert_eq!(winner.gold + loser.gold, 1000, "gold only moves between the two");
    assert_eq!(winner.gold, 525);
    assert_eq!(winner.reputation, 3);
    assert_eq!(loser.reputation, -3);
    assert_eq!(winner.current_xp, 1);
    assert_eq!(winner.resource, 74);
    assert_eq!(winner.health, 1);
    assert_eq!(winner.pvp_kills, 1);
    assert_eq!(winner.last_killed, Some(brisk.id));
    assert!(loser.dead);
    assert_eq!(loser.health, 0);
    assert_eq!(loser.deaths, 1);
    assert_eq!(loser.last_killed_by, Some(arlen.id));

    let history = ctx.store.battles_for(brisk.id, 0, 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, battle.id);

    for id in [arlen.id, brisk.id] {
        let inbox = mail::inbox(&ctx, id, t0).unwrap();
        assert_eq!(inbox.len(), 2, "welcome mail plus the battle report");
        assert!(inbox.iter().any(|message| message.sender_id == arlen.id));
    }
}

#[test]
fn same_faction_fight_costs_the_attacker_reputation() {
    let (ctx, _temp) = game_context();
    let arlen = spawn(&ctx, "Arlen", Faction::Aureen);
    let brisk = spawn(&ctx, "Brisk", Faction::Aureen);

    let battle = fight(&ctx, arlen.id, brisk.id, &mut ScriptedRoller::all_fail()).unwrap();

    assert_eq!(battle.winner_id, Some(arlen.id));
    assert_eq!(battle.attacker_reputation_change, -4);
    assert_eq!(battle.defender_reputation_change, 0);
}

#[test]
fn pvp_kill_completes_the_winners_quest() {
    let (ctx, _temp) = game_context();
    let arlen = spawn(&ctx, "Arlen", Faction::Veylan);
    let brisk = spawn(&ctx, "Brisk", Faction::Urghan);
    let t0 = Utc::now();
    quest::accept_quest(&ctx, arlen.id, "first_blood", t0).unwrap();

    fight_at(&ctx, arlen.id, brisk.id, &mut ScriptedRoller::all_fail(), t0).unwrap();

    let winner = ctx.store.character(arlen.id).unwrap();
    assert_eq!(winner.gold, 525 + 200);
    assert_eq!(winner.reputation, 3 + 2);
    assert_eq!(winner.current_xp, 1 + 50);
    assert_eq!(winner.resource, 73);
    assert!(ctx.store.active_quest(arlen.id).unwrap().is_none());
    let history = ctx.store.player_quests(arlen.id).unwrap();
    assert!(history[0].is_complete());
}

#[test]
fn rematch_waits_for_the_cooldown_in_either_direction() {
    let (ctx, _temp) = game_context();
    let arlen = spawn(&ctx, "Arlen", Faction::Veylan);
    let brisk = spawn(&ctx, "Brisk", Faction::Urghan);
    let t0 = Utc::now();
    fight_at(&ctx, arlen.id, brisk.id, &mut ScriptedRoller::all_fail(), t0).unwrap();
    periodic_revive(&ctx).unwrap();

    let again = fight_at(
        &ctx,
        arlen.id,
        brisk.id,
        &mut ScriptedRoller::all_fail(),
        t0 + Duration::seconds(10),
    );
    assert!(matches!(
        again,
        Err(GameError::Precondition(Conflict::RematchCooldown { remaining_secs: 290 }))
    ));

    let reversed = fight_at(
        &ctx,
        brisk.id,
        arlen.id,
        &mut ScriptedRoller::all_fail(),
        t0 + Duration::seconds(10),
    );
    assert!(matches!(
        reversed,
        Err(GameError::Precondition(Conflict::RematchCooldown { .. }))
    ));

    fight_at(
        &ctx,
        arlen.id,
        brisk.id,
        &mut ScriptedRoller::all_fail(),
        t0 + Duration::seconds(301),
    )
    .expect("cooldown elapsed");
    assert_eq!(ctx.store.battles_for(arlen.id, 0, 10).unwrap().len(), 2);
}

#[test]
fn preconditions_reject_without_touching_the_store() {
    let (ctx, _temp) = game_context();
    let arlen = spawn(&ctx, "Arlen", Faction::Veylan);
    let brisk = spawn(&ctx, "Brisk", Faction::Urghan);
    let warden = spawn(&ctx, "Warden", Faction::Camyra);

    assert!(matches!(
        fight(&ctx, arlen.id, arlen.id, &mut ScriptedRoller::all_fail()),
        Err(GameError::Precondition(Conflict::SelfTarget))
    ));

    jail::jail_character(&ctx, warden.id, brisk.id, 30, "spam", "Disorderly conduct").unwrap();
    assert!(matches!(
        fight(&ctx, arlen.id, brisk.id, &mut ScriptedRoller::all_fail()),
        Err(GameError::Precondition(Conflict::Jailed))
    ));
    jail::release(&ctx, brisk.id).unwrap();

    let mut veteran = ctx.store.character(arlen.id).unwrap();
    veteran.level = 30;
    ctx.store.put_character(&veteran).unwrap();
    assert!(matches!(
        fight(&ctx, arlen.id, brisk.id, &mut ScriptedRoller::all_fail()),
        Err(GameError::Precondition(Conflict::LevelFloor { min_level: 20 }))
    ));

    let unchanged = ctx.store.character(arlen.id).unwrap();
    assert_eq!(unchanged.resource, 75);
    assert_eq!(ctx.store.stats().unwrap().battles, 0);
}

#[test]
fn the_dead_neither_fight_nor_get_attacked() {
    let (ctx, _temp) = game_context();
    let arlen = spawn(&ctx, "Arlen", Faction::Veylan);
    let brisk = spawn(&ctx, "Brisk", Faction::Urghan);
    let cato = spawn(&ctx, "Cato", Faction::Aureen);
    fight(&ctx, arlen.id, brisk.id, &mut ScriptedRoller::all_fail()).unwrap();

    assert!(matches!(
        fight(&ctx, cato.id, brisk.id, &mut ScriptedRoller::all_fail()),
        Err(GameError::Precondition(Conflict::OpponentDead))
    ));
    assert!(matches!(
        fight(&ctx, brisk.id, cato.id, &mut ScriptedRoller::all_fail()),
        Err(GameError::Precondition(Conflict::Dead))
    ));
}

#[test]
fn undecided_record_blocks_rematch_regardless_of_age() {
    let (ctx, _temp) = game_context();
    let arlen = spawn(&ctx, "Arlen", Faction::Veylan);
    let brisk = spawn(&ctx, "Brisk", Faction::Urghan);
    let t0 = Utc::now();

    let mut stale = fight_at(&ctx, arlen.id, brisk.id, &mut ScriptedRoller::all_fail(), t0).expect("fight");
    periodic_revive(&ctx).unwrap();
    stale.winner_id = None;
    stale.winner_name = None;
    stale.winner_faction = None;
    let mut uow = ctx.store.begin();
    let stale_id = uow.insert_battle(stale).unwrap();
    uow.commit().unwrap();
    assert_eq!(
        ctx.store.latest_battle_between(arlen.id, brisk.id).unwrap().map(|b| b.id),
        Some(stale_id)
    );

    for at in [t0 + Duration::seconds(10), t0 + Duration::days(2)] {
        assert!(matches!(
            fight_at(&ctx, arlen.id, brisk.id, &mut ScriptedRoller::all_fail(), at),
            Err(GameError::Precondition(Conflict::UndecidedBattle))
        ));
        assert!(matches!(
            fight_at(&ctx, brisk.id, arlen.id, &mut ScriptedRoller::all_fail(), at),
            Err(GameError::Precondition(Conflict::UndecidedBattle))
        ));
    }
    assert_eq!(ctx.store.battles_for(arlen.id, 0, 10).unwrap().len(), 2);
}
