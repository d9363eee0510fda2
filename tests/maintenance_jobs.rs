/// Integration tests for messaging, jail and the scheduled maintenance jobs.
mod common;

use chrono::{Duration, Utc};
use common::{game_context, spawn};
use warbound::game::activities::{deposit, BankAmount};
use warbound::game::character::retire_character;
use warbound::game::errors::{Conflict, GameError};
use warbound::game::maintenance::{run_job, MaintenanceJob};
use warbound::game::settlement::fight;
use warbound::game::jail::MAX_JAIL_MINUTES;
use warbound::game::{jail, mail, Faction, Records, ScriptedRoller, SYSTEM_SENDER};

#[test]
fn mail_can_be_read_and_deleted() {
    let (ctx, _temp) = game_context();
    let alice = spawn(&ctx, "Alice", Faction::Veylan);
    let bruno = spawn(&ctx, "Bruno", Faction::Urghan);
    let now = Utc::now();

    let id = mail::send_mail(&ctx, alice.id, bruno.id, "  Truce? ", "Meet at the mine.").unwrap();
    assert_eq!(mail::unread_count(&ctx, bruno.id, now).unwrap(), 2);

    let inbox = mail::inbox(&ctx, bruno.id, now).unwrap();
    assert_eq!(inbox[0].id, id, "newest first");
    assert_eq!(inbox[0].subject, "Truce?");
    assert_eq!(inbox[1].sender_id, SYSTEM_SENDER);

    assert!(mail::mark_read(&ctx, bruno.id, id).unwrap().read);
    assert_eq!(mail::unread_count(&ctx, bruno.id, now).unwrap(), 1);
    mail::delete_mail(&ctx, bruno.id, id).unwrap();
    assert!(matches!(mail::mark_read(&ctx, bruno.id, id), Err(GameError::NotFound(_))));

    assert!(matches!(
        mail::send_mail(&ctx, alice.id, bruno.id, "", "empty subject"),
        Err(GameError::Validation(_))
    ));
}

#[test]
fn jailed_characters_only_write_to_their_warden() {
    let (ctx, _temp) = game_context();
    let warden = spawn(&ctx, "Warden", Faction::Camyra);
    let inmate = spawn(&ctx, "Inmate", Faction::Urghan);
    let bystander = spawn(&ctx, "Bystander", Faction::Aureen);
    jail::jail_character(&ctx, warden.id, inmate.id, 60, "botting", "Caught sleeping on watch").unwrap();

    assert!(matches!(
        mail::send_mail(&ctx, inmate.id, bystander.id, "Help", "Get me out"),
        Err(GameError::Precondition(Conflict::Jailed))
    ));
    mail::send_mail(&ctx, inmate.id, warden.id, "Appeal", "It was a misunderstanding").unwrap();
    assert!(matches!(
        deposit(&ctx, inmate.id, BankAmount::All),
        Err(GameError::Precondition(Conflict::Jailed))
    ));
    let inbox = mail::inbox(&ctx, inmate.id, Utc::now()).unwrap();
    assert!(inbox.iter().any(|message| message.subject == "You have been jailed"));
}

#[test]
fn jail_sweep_releases_expired_sentences() {
    let (ctx, _temp) = game_context();
    let warden = spawn(&ctx, "Warden", Faction::Camyra);
    let short = spawn(&ctx, "Short", Faction::Urghan);
    let long = spawn(&ctx, "Long", Faction::Urghan);
    jail::jail_character(&ctx, warden.id, short.id, 1, "spam", "Shouting").unwrap();
    jail::jail_character(&ctx, warden.id, long.id, 600, "spam", "Shouting").unwrap();
    assert!(matches!(
        jail::jail_character(&ctx, warden.id, long.id, 5, "spam", "Again"),
        Err(GameError::Precondition(Conflict::Jailed))
    ));

    let later = Utc::now() + Duration::minutes(2);
    let report = run_job(&ctx, MaintenanceJob::JailSweep, later).unwrap();

    assert_eq!(report.jails_released, 1);
    assert!(ctx.store.character(short.id).unwrap().current_jail.is_none());
    assert!(ctx.store.character(long.id).unwrap().current_jail.is_some());
    assert_eq!(run_job(&ctx, MaintenanceJob::JailSweep, later).unwrap().jails_released, 0);
}

#[test]
fn mail_cleanup_removes_expired_messages() {
    let (ctx, _temp) = game_context();
    spawn(&ctx, "Alice", Faction::Veylan);
    spawn(&ctx, "Bruno", Faction::Urghan);

    let soon = run_job(&ctx, MaintenanceJob::MailCleanup, Utc::now()).unwrap();
    assert_eq!(soon.mail_removed, 0);

    let later = Utc::now() + Duration::days(31);
    let report = run_job(&ctx, MaintenanceJob::MailCleanup, later).unwrap();
    assert_eq!(report.mail_removed, 2);
    assert_eq!(ctx.store.stats().unwrap().mail, 0);
}

#[test]
fn daily_refresh_revives_refills_and_skips_the_retired() {
    let (ctx, _temp) = game_context();
    let winner = spawn(&ctx, "Arlen", Faction::Veylan);
    let loser = spawn(&ctx, "Brisk", Faction::Urghan);
    let gone = spawn(&ctx, "Gone", Faction::Aureen);
    fight(&ctx, winner.id, loser.id, &mut ScriptedRoller::all_fail()).unwrap();
    retire_character(&ctx, gone.id).unwrap();

    let report = run_job(&ctx, MaintenanceJob::DailyRefresh, Utc::now()).unwrap();

    assert_eq!(report.revived, 1);
    assert_eq!(report.resources_refilled, 2);
    assert_eq!(report.failures, 0);
    let winner = ctx.store.character(winner.id).unwrap();
    let loser = ctx.store.character(loser.id).unwrap();
    assert_eq!(winner.resource, winner.resource_max);
    assert!(!loser.dead);
    assert_eq!(loser.health, 25);
    assert_eq!(winner.health, 1, "refresh does not heal the living");
}

#[test]
fn periodic_revive_is_idempotent() {
    let (ctx, _temp) = game_context();
    let winner = spawn(&ctx, "Arlen", Faction::Veylan);
    let loser = spawn(&ctx, "Brisk", Faction::Urghan);
    fight(&ctx, winner.id, loser.id, &mut ScriptedRoller::all_fail()).unwrap();

    assert_eq!(run_job(&ctx, MaintenanceJob::Revive, Utc::now()).unwrap().revived, 1);
    assert_eq!(run_job(&ctx, MaintenanceJob::Revive, Utc::now()).unwrap().revived, 0);
}

#[test]
fn sentences_longer_than_a_year_are_rejected() {
    let (ctx, _temp) = game_context();
    let warden = spawn(&ctx, "Warden", Faction::Camyra);
    let inmate = spawn(&ctx, "Inmate", Faction::Urghan);

    for minutes in [i64::MAX / 1000, MAX_JAIL_MINUTES + 1] {
        assert!(matches!(
            jail::jail_character(&ctx, warden.id, inmate.id, minutes, "abuse", "Forever"),
            Err(GameError::Validation(_))
        ));
    }
    assert!(ctx.store.character(inmate.id).unwrap().current_jail.is_none());

    jail::jail_character(&ctx, warden.id, inmate.id, MAX_JAIL_MINUTES, "abuse", "A long year").unwrap();
    assert!(matches!(
        fight(&ctx, inmate.id, warden.id, &mut ScriptedRoller::all_fail()),
        Err(GameError::Precondition(Conflict::Jailed))
    ));
    let report = run_job(&ctx, MaintenanceJob::JailSweep, Utc::now() + Duration::days(30)).unwrap();
    assert_eq!(report.jails_released, 0);
}
