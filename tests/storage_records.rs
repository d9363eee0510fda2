/// Integration tests for the sled-backed game store.
mod common;

use chrono::{Duration, Utc};
use common::{game_context, spawn};
use tempfile::TempDir;
use warbound::game::maintenance::periodic_revive;
use warbound::game::settlement::fight_at;
use warbound::game::{Faction, GameStore, GameStoreBuilder, Records, ScriptedRoller};

#[test]
fn catalog_is_seeded_once_and_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = GameStore::open(dir.path()).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.items, 11);
        assert_eq!(stats.quests, 7);
        assert_eq!(stats.npcs, 2);
        assert_eq!(store.seed_catalog_if_needed().unwrap(), 0);
    }
    let reopened = GameStore::open(dir.path()).unwrap();
    assert_eq!(reopened.item("war_axe").unwrap().price, 600);
}

#[test]
fn builder_can_skip_the_starter_catalog() {
    let dir = TempDir::new().unwrap();
    let store = GameStoreBuilder::new(dir.path()).without_catalog_seed().open().unwrap();
    assert!(store.list_items().unwrap().is_empty());
    assert!(store.find_quest("first_blood").unwrap().is_none());
}

#[test]
fn dropped_unit_of_work_writes_nothing() {
    let (ctx, _temp) = game_context();
    let hero = spawn(&ctx, "Hale", Faction::Veylan);
    {
        let mut uow = ctx.store.begin();
        let mut staged = uow.character(hero.id).unwrap();
        staged.gold = 1;
        uow.put_character(&staged).unwrap();
        assert_eq!(uow.character(hero.id).unwrap().gold, 1, "reads see staged writes");
        assert_eq!(ctx.store.character(hero.id).unwrap().gold, 500);
    }
    assert_eq!(ctx.store.character(hero.id).unwrap().gold, 500);
}

#[test]
fn battle_history_pages_newest_first() {
    let (ctx, _temp) = game_context();
    let arlen = spawn(&ctx, "Arlen", Faction::Veylan);
    let brisk = spawn(&ctx, "Brisk", Faction::Urghan);
    let t0 = Utc::now();

    let mut ids = Vec::new();
    for round in 0..3 {
        let at = t0 + Duration::minutes(10 * round);
        ids.push(fight_at(&ctx, arlen.id, brisk.id, &mut ScriptedRoller::all_fail(), at).unwrap().id);
        periodic_revive(&ctx).unwrap();
    }

    let page = ctx.store.battles_for(arlen.id, 0, 2).unwrap();
    assert_eq!(page.iter().map(|b| b.id).collect::<Vec<_>>(), vec![ids[2], ids[1]]);
    let rest = ctx.store.battles_for(brisk.id, 2, 10).unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].id, ids[0]);
    assert_eq!(
        ctx.store.latest_battle_between(brisk.id, arlen.id).unwrap().map(|b| b.id),
        Some(ids[2])
    );
}
