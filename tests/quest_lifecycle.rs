/// Integration tests for the quest tracker: accept, event-driven progress,
/// completion rewards, abandon, expiry and offers.
mod common;

use chrono::{Duration, Utc};
use common::{game_context, game_context_with, spawn};
use warbound::game::activities::{mine, mine_at, train, MiningAmount, TrainingAmount};
use warbound::game::errors::{Conflict, GameError};
use warbound::game::quest::{
    abandon_quest, accept_quest, active_quest, draw_quest_offers, expire_overdue_quests, track_event, QuestEvent,
    QuestUpdate,
};
use warbound::game::{
    Attribute, FailReason, Faction, GameSettings, ObjectiveKind, QuestState, Records, ScriptedRoller,
};

#[test]
fn mining_quest_progresses_then_completes() {
    let (ctx, _temp) = game_context();
    let miner = spawn(&ctx, "Delve", Faction::Urghan);
    accept_quest(&ctx, miner.id, "deep_shafts", Utc::now()).expect("accept");

    let tracked = active_quest(&ctx, miner.id).unwrap().expect("active");
    assert_eq!(tracked.template.key, "deep_shafts");
    assert_eq!(tracked.expires_at, tracked.quest.started_at + Duration::hours(21));

    for _ in 0..3 {
        mine(&ctx, miner.id, MiningAmount::Five, &mut ScriptedRoller::all_fail()).unwrap();
    }
    let quest = ctx.store.active_quest(miner.id).unwrap().expect("still active");
    assert_eq!(quest.progress_for(1), 15.0);

    mine(&ctx, miner.id, MiningAmount::Five, &mut ScriptedRoller::all_fail()).unwrap();
    assert!(ctx.store.active_quest(miner.id).unwrap().is_none());

    let miner = ctx.store.character(miner.id).unwrap();
    assert_eq!(miner.diamonds, 2);
    assert_eq!(miner.reputation, 2, "completion bonus");
    assert_eq!(miner.resource, 75 - 1 - 20);
    let inbox = ctx.store.mailbox(miner.id).unwrap();
    assert!(inbox.iter().any(|mail| mail.subject == "Quest Complete"));
}

#[test]
fn only_the_named_attribute_advances_a_training_quest() {
    let (ctx, _temp) = game_context();
    let scholar = spawn(&ctx, "Quill", Faction::Aureen);
    accept_quest(&ctx, scholar.id, "scholars_path", Utc::now()).unwrap();

    train(&ctx, scholar.id, Attribute::Strength, TrainingAmount::Five, &mut ScriptedRoller::all_fail()).unwrap();
    let quest = ctx.store.active_quest(scholar.id).unwrap().expect("active");
    assert_eq!(quest.progress_for(1), 0.0);

    // Two excellent sessions of exactly +1.0 each.
    let mut roller = ScriptedRoller::all_fail().with_floats([0.99, 1.0, 0.99, 1.0]);
    train(&ctx, scholar.id, Attribute::Intelligence, TrainingAmount::Ten, &mut roller).unwrap();

    assert!(ctx.store.active_quest(scholar.id).unwrap().is_none());
    let scholar = ctx.store.character(scholar.id).unwrap();
    assert!((scholar.attributes.intelligence - 12.5).abs() < 1e-9);
    assert_eq!(scholar.resource, 75 - 1 - 5 - 10);
}

#[test]
fn one_active_quest_and_unique_quests_once() {
    let (ctx, _temp) = game_context();
    let hero = spawn(&ctx, "Hale", Faction::Camyra);
    let now = Utc::now();
    accept_quest(&ctx, hero.id, "first_blood", now).unwrap();

    assert!(matches!(
        accept_quest(&ctx, hero.id, "deep_shafts", now),
        Err(GameError::Precondition(Conflict::QuestAlreadyActive))
    ));

    let update = track_event(&ctx, hero.id, &QuestEvent::new(ObjectiveKind::KillOtherFaction, 1.0)).unwrap();
    assert!(matches!(update, QuestUpdate::Completed { ref quest_key, .. } if quest_key == "first_blood"));

    assert!(matches!(
        accept_quest(&ctx, hero.id, "first_blood", now),
        Err(GameError::Precondition(Conflict::UniqueQuestCompleted))
    ));
    assert!(matches!(
        accept_quest(&ctx, hero.id, "no_such_quest", now),
        Err(GameError::NotFound(_))
    ));
}

#[test]
fn events_without_an_active_quest_change_nothing() {
    let (ctx, _temp) = game_context();
    let idle = spawn(&ctx, "Idle", Faction::Veylan);
    let update = track_event(&ctx, idle.id, &QuestEvent::new(ObjectiveKind::DepositGold, 100.0)).unwrap();
    assert_eq!(update, QuestUpdate::NoActiveQuest);
}

#[test]
fn abandoning_costs_reputation() {
    let (ctx, _temp) = game_context();
    let quitter = spawn(&ctx, "Quin", Faction::Veylan);
    let now = Utc::now();

    assert!(matches!(
        abandon_quest(&ctx, quitter.id, now),
        Err(GameError::Precondition(Conflict::NoActiveQuest))
    ));

    accept_quest(&ctx, quitter.id, "prudent_saver", now).unwrap();
    let abandoned = abandon_quest(&ctx, quitter.id, now).unwrap();
    assert!(matches!(
        abandoned.state,
        QuestState::Failed {
            reason: FailReason::Abandoned,
            ..
        }
    ));
    assert_eq!(ctx.store.character(quitter.id).unwrap().reputation, -2);

    // The slot is free again.
    accept_quest(&ctx, quitter.id, "prudent_saver", now).unwrap();
}

#[test]
fn overdue_quests_expire_lazily_and_in_the_sweep() {
    let (ctx, _temp) = game_context();
    let lazy = spawn(&ctx, "Lazy", Faction::Urghan);
    let swept = spawn(&ctx, "Swept", Faction::Urghan);
    let t0 = Utc::now();
    accept_quest(&ctx, lazy.id, "deep_shafts", t0).unwrap();
    accept_quest(&ctx, swept.id, "deep_shafts", t0).unwrap();
    let late = t0 + Duration::hours(22);

    mine_at(&ctx, lazy.id, MiningAmount::One, &mut ScriptedRoller::all_fail(), late).unwrap();
    let history = ctx.store.player_quests(lazy.id).unwrap();
    assert!(matches!(
        history[0].state,
        QuestState::Failed {
            reason: FailReason::Expired,
            ..
        }
    ));
    assert_eq!(history[0].progress_for(1), 0.0, "no progress after the deadline");
    assert_eq!(ctx.store.character(lazy.id).unwrap().reputation, -2);

    assert_eq!(expire_overdue_quests(&ctx, late).unwrap(), 1);
    assert_eq!(expire_overdue_quests(&ctx, late).unwrap(), 0);
    assert_eq!(ctx.store.character(swept.id).unwrap().reputation, -2);
}

#[test]
fn offers_are_distinct_and_skip_finished_unique_quests() {
    let settings = GameSettings {
        quest_offer_count: 10,
        ..GameSettings::default()
    };
    let (ctx, _temp) = game_context_with(settings);
    let hero = spawn(&ctx, "Hale", Faction::Camyra);

    let offers = draw_quest_offers(&ctx, hero.id, &mut ScriptedRoller::all_fail()).unwrap();
    let mut keys: Vec<String> = offers.iter().map(|quest| quest.key.clone()).collect();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), 7);

    accept_quest(&ctx, hero.id, "first_blood", Utc::now()).unwrap();
    track_event(&ctx, hero.id, &QuestEvent::new(ObjectiveKind::KillOtherFaction, 1.0)).unwrap();

    let offers = draw_quest_offers(&ctx, hero.id, &mut ScriptedRoller::all_fail()).unwrap();
    assert_eq!(offers.len(), 6);
    assert!(offers.iter().all(|quest| quest.key != "first_blood"));
}
