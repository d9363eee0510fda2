//! Reward dispensing for quest completion and admin grants.

use std::str::FromStr;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::game::character::{self, add_xp};
use crate::game::errors::GameResult;
use crate::game::factions::{Attribute, FactionCatalog};
use crate::game::storage::{Records, UnitOfWork};
use crate::game::types::{Character, CharacterId, Reward};
use crate::game::GameContext;

/// What a single reward line actually did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppliedReward {
    Gold(u64),
    Diamonds(u64),
    Xp { amount: u64, levels_gained: u32 },
    /// Delta after the reputation floor.
    Reputation(i32),
    Item { item_key: String, added: bool },
    Attribute { attribute: Attribute, amount: f64 },
    Skipped { reason: String },
}

/// Apply `rewards` to `character` in memory. The caller persists the character
/// through `uow`; nothing here commits.
pub fn apply_rewards(
    uow: &UnitOfWork<'_>,
    factions: &FactionCatalog,
    character: &mut Character,
    rewards: &[Reward],
) -> GameResult<Vec<AppliedReward>> {
    let mut applied = Vec::with_capacity(rewards.len());
    for reward in rewards {
        let outcome = match reward {
            Reward::Gold(amount) => {
                character.gold = character.gold.saturating_add(*amount);
                AppliedReward::Gold(*amount)
            }
            Reward::Diamonds(amount) => {
                character.diamonds = character.diamonds.saturating_add(*amount);
                AppliedReward::Diamonds(*amount)
            }
            Reward::Xp(amount) => {
                let levels_gained = add_xp(uow, factions, character, *amount)?;
                AppliedReward::Xp {
                    amount: *amount,
                    levels_gained,
                }
            }
            Reward::Reputation(amount) => AppliedReward::Reputation(character.change_reputation(*amount)),
            Reward::Item { item_key } => {
                if uow.find_item(item_key)?.is_none() {
                    warn!("reward item '{}' is not in the catalog, skipping", item_key);
                    AppliedReward::Skipped {
                        reason: format!("unknown item {}", item_key),
                    }
                } else if character.owns_item(item_key) {
                    AppliedReward::Item {
                        item_key: item_key.clone(),
                        added: false,
                    }
                } else {
                    character.add_item(item_key);
                    AppliedReward::Item {
                        item_key: item_key.clone(),
                        added: true,
                    }
                }
            }
            Reward::Attribute { attribute, amount } => match Attribute::from_str(attribute) {
                Ok(parsed) => {
                    *character.attributes.get_mut(parsed) += amount;
                    AppliedReward::Attribute {
                        attribute: parsed,
                        amount: *amount,
                    }
                }
                Err(_) => {
                    warn!("reward names unknown attribute '{}', skipping", attribute);
                    AppliedReward::Skipped {
                        reason: format!("unknown attribute {}", attribute),
                    }
                }
            },
        };
        applied.push(outcome);
    }
    character.touch();
    Ok(applied)
}

/// Grant `rewards` to a character in one atomic write: either every line
/// lands or none does.
pub fn dispense_rewards(
    ctx: &GameContext,
    character_id: CharacterId,
    rewards: &[Reward],
) -> GameResult<Vec<AppliedReward>> {
    let mut uow = ctx.store.begin();
    let mut character = character::load_active(&uow, character_id)?;
    let applied = apply_rewards(&uow, &ctx.factions, &mut character, rewards)?;
    uow.put_character(&character)?;
    uow.commit()?;
    info!("dispensed {} rewards to {}", applied.len(), character.name);
    Ok(applied)
}
