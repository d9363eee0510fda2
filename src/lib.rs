//! # Warbound - Faction PvP Role-Playing Game Server
//!
//! Warbound is the server core of a faction-based PvP role-playing game: rival
//! factions, persistent characters, turn-based combat with dodge, critical,
//! block and heal rolls, and a quest system driven by everything a character
//! does.
//!
//! ## Features
//!
//! - **Stat Model**: Faction base values plus per-level growth, equipment bonuses and weapon dice.
//! - **Combat**: A resolver that produces a structured event stream; text is rendered separately.
//! - **Settlement**: Gold tax, reputation by faction relation, experience and level-ups, battle history and notification mail, all committed atomically.
//! - **Quests**: Accept, abandon, event-driven progress, expiry and weighted offers.
//! - **Economy**: Shop, equipment, training, banking, mining and a lottery.
//! - **Maintenance**: Daily refresh, revives, mail cleanup and jail sweeps on a tokio scheduler.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warbound::config::Config;
//! use warbound::game::{character, settlement, Faction, GameContext, GameStore, RandRoller};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("warbound.toml").await?;
//!     let store = GameStore::open(&config.storage.data_dir)?;
//!     let factions = Arc::new(config.game.load_factions()?);
//!     let ctx = GameContext::new(store, factions, config.game.to_settings());
//!
//!     let attacker = character::create_character(&ctx, 1, "Arlen", Faction::Veylan)?;
//!     let defender = character::create_character(&ctx, 2, "Brisk", Faction::Urghan)?;
//!     let battle = settlement::fight(&ctx, attacker.id, defender.id, &mut RandRoller::thread())?;
//!     println!("{}", battle.log.join("\n"));
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - The engine: stats, combat, settlement, quests, rewards, storage
//! - [`config`] - Configuration loading and validation
//! - [`scheduler`] - Interval scheduler for maintenance jobs
//! - [`validation`] - Character-name and mail-content validation

pub mod config;
pub mod game;
pub mod scheduler;
pub mod validation;
