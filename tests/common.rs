//! Test utilities & fixtures shared by the integration tests.

use std::sync::Arc;

use tempfile::TempDir;
use warbound::game::character::create_character;
use warbound::game::{Character, Faction, FactionCatalog, GameContext, GameSettings, GameStore};

/// A context over a fresh, catalog-seeded store. Keep the `TempDir` alive for
/// as long as the context is used.
#[allow(dead_code)]
pub fn game_context() -> (GameContext, TempDir) {
    game_context_with(GameSettings::default())
}

#[allow(dead_code)]
pub fn game_context_with(settings: GameSettings) -> (GameContext, TempDir) {
    let temp_dir = TempDir::new().expect("tempdir");
    let store = GameStore::open(temp_dir.path()).expect("open store");
    let ctx = GameContext::new(store, Arc::new(FactionCatalog::default()), settings);
    (ctx, temp_dir)
}

/// Create a character whose user id is derived from its name.
#[allow(dead_code)]
pub fn spawn(ctx: &GameContext, name: &str, faction: Faction) -> Character {
    let user_id = name.bytes().fold(7u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    create_character(ctx, user_id, name, faction).expect("create character")
}
