//! Game engine: stat model, combat, settlement, quests, rewards and the
//! character economy around them, persisted in a sled-backed [`GameStore`].
//!
//! Every state-changing operation stages its writes in a
//! [`storage::UnitOfWork`] and commits them together; an error anywhere before
//! the commit leaves the store untouched.

use std::sync::Arc;

use chrono::Duration;

pub mod activities;
pub mod catalog;
pub mod character;
pub mod combat;
pub mod damage;
pub mod errors;
pub mod factions;
pub mod jail;
pub mod mail;
pub mod maintenance;
pub mod narration;
pub mod quest;
pub mod rewards;
pub mod settlement;
pub mod stats;
pub mod storage;
pub mod types;

pub use combat::{CombatEvent, CombatRules, Fight, FightOutcome, FightState, Side};
pub use damage::{RandRoller, Roller, ScriptedRoller};
pub use errors::{Conflict, GameError, GameResult};
pub use factions::{Attribute, Faction, FactionCatalog};
pub use storage::{GameStore, GameStoreBuilder, Records, UnitOfWork};
pub use types::*;

/// Tunable rules the engine reads at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSettings {
    pub rematch_cooldown_secs: i64,
    pub quest_window_hours: i64,
    pub quest_penalty: i32,
    pub quest_completion_bonus: i32,
    pub mail_expiry_days: i64,
    pub max_combat_rounds: u32,
    pub quest_offer_count: usize,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            rematch_cooldown_secs: 300,
            quest_window_hours: 21,
            quest_penalty: 2,
            quest_completion_bonus: 2,
            mail_expiry_days: 30,
            max_combat_rounds: combat::DEFAULT_MAX_ROUNDS,
            quest_offer_count: 4,
        }
    }
}

impl GameSettings {
    pub fn rematch_cooldown(&self) -> Duration {
        Duration::seconds(self.rematch_cooldown_secs)
    }

    pub fn quest_window(&self) -> Duration {
        Duration::hours(self.quest_window_hours)
    }

    pub fn mail_expiry(&self) -> Duration {
        Duration::days(self.mail_expiry_days)
    }
}

/// Everything an engine operation needs: the store, the faction table and the rules.
pub struct GameContext {
    pub store: GameStore,
    pub factions: Arc<FactionCatalog>,
    pub settings: GameSettings,
}

impl GameContext {
    pub fn new(store: GameStore, factions: Arc<FactionCatalog>, settings: GameSettings) -> Self {
        Self {
            store,
            factions,
            settings,
        }
    }
}
