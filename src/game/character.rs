//! Character lifecycle and economy: creation, XP and levels, resource
//! regeneration, healing, and the item shop.

use chrono::{DateTime, Duration, Utc};
use log::info;

use crate::game::errors::{Conflict, GameError, GameResult};
use crate::game::factions::{Attribute, Faction, FactionCatalog};
use crate::game::quest::{self, QuestEvent};
use crate::game::stats;
use crate::game::storage::{Records, UnitOfWork};
use crate::game::types::{
    xp_for_level, Attributes, Character, CharacterId, ItemKind, ObjectiveKind, PriceCurrency,
    SYSTEM_SENDER,
};
use crate::game::{jail, mail, GameContext};
use crate::validation::validate_character_name;

const FULL_REFILL_AFTER_HOURS: i64 = 21;
const MINUTES_PER_RESOURCE: i64 = 30;

const WELCOME_SUBJECT: &str = "Welcome to the Game!";
const WELCOME_BODY: &str = "Welcome! We're excited to have you here.\n\n\
Here are some tips to get started:\n\
1. Visit the Academy to train your attributes\n\
2. Check the shop for equipment\n\
3. Explore the world and battle other players\n\n\
Good luck on your adventures!";

/// Lowest level a character of `attacker_level` may attack.
pub fn min_attackable_level(attacker_level: u32) -> u32 {
    if attacker_level <= 15 {
        1
    } else {
        ((attacker_level as f64 / 1.5) as u32).max(1)
    }
}

/// Load a character that can act: it must exist and not be retired.
pub fn load_active(records: &impl Records, id: CharacterId) -> GameResult<Character> {
    let character = records.character(id)?;
    if character.is_retired() {
        return Err(Conflict::Retired.into());
    }
    Ok(character)
}

pub fn create_character(
    ctx: &GameContext,
    user_id: u64,
    name: &str,
    faction: Faction,
) -> GameResult<Character> {
    let name = validate_character_name(name)?;
    let mut uow = ctx.store.begin();
    if uow.character_by_name(&name)?.is_some() {
        return Err(Conflict::NameTaken.into());
    }
    if uow.character_for_user(user_id)?.is_some() {
        return Err(Conflict::CharacterExists.into());
    }

    let id = uow.next_id()?;
    let mut character = Character::new(id, user_id, &name, faction);
    let faction_stats = ctx.factions.stats(faction);
    let mut attributes = Attributes::default();
    let mut growth = Attributes::default();
    for attribute in Attribute::ALL {
        let configured = faction_stats.growth(attribute);
        *attributes.get_mut(attribute) = configured.base;
        *growth.get_mut(attribute) = configured.per_level;
    }
    character.attributes = attributes;
    character.growth = growth;
    character.health = stats::max_health(&character, &ctx.factions, &[]);

    uow.put_character(&character)?;
    mail::stage_mail(&mut uow, &ctx.settings, SYSTEM_SENDER, id, WELCOME_SUBJECT, WELCOME_BODY)?;
    uow.commit()?;
    info!("created character {} ({}) for user {}", character.name, faction, user_id);
    Ok(character)
}

/// Soft-remove a character when its account is deleted. The record and its
/// battle history stay; the name and account slot are freed.
pub fn retire_character(ctx: &GameContext, id: CharacterId) -> GameResult<Character> {
    let mut uow = ctx.store.begin();
    let mut character = load_active(&uow, id)?;
    character.retired_at = Some(Utc::now());
    character.touch();
    uow.release_character_indexes(&character);
    uow.put_character(&character)?;
    uow.commit()?;
    info!("retired character {}", character.name);
    Ok(character)
}

pub fn max_health_of(
    records: &impl Records,
    factions: &FactionCatalog,
    character: &Character,
) -> GameResult<u32> {
    let equipped = records.equipped_items(character)?;
    Ok(stats::max_health(character, factions, &equipped))
}

/// Clamp current health into `[0, max_health]`.
pub fn clamp_health(records: &impl Records, factions: &FactionCatalog, character: &mut Character) -> GameResult<()> {
    let max = max_health_of(records, factions, character)?;
    character.health = character.health.min(max);
    Ok(())
}

/// Grant XP, levelling up as many times as the total allows. Returns the number
/// of levels gained; a level-up fully heals.
pub fn add_xp(
    records: &impl Records,
    factions: &FactionCatalog,
    character: &mut Character,
    amount: u64,
) -> GameResult<u32> {
    character.current_xp += amount;
    let mut levels = 0u32;
    while character.current_xp >= character.xp_to_next_level {
        character.current_xp -= character.xp_to_next_level;
        level_up(character);
        levels += 1;
    }
    if levels > 0 {
        character.health = max_health_of(records, factions, character)?;
        info!("{} reached level {}", character.name, character.level);
    }
    Ok(levels)
}

fn level_up(character: &mut Character) {
    character.level += 1;
    character.xp_to_next_level = xp_for_level(character.level);
    character.resource = (character.resource + 1).min(character.resource_max);
    for attribute in Attribute::ALL {
        *character.attributes.get_mut(attribute) += character.growth.get(attribute);
    }
}

/// Refill the resource pool for time elapsed since the last update: a full
/// refill after 21 hours, otherwise one point per 30 minutes with the
/// remainder carried forward. Returns the points gained.
pub fn regenerate_resource(character: &mut Character, now: DateTime<Utc>) -> u32 {
    let elapsed = now - character.last_resource_update;
    if elapsed < Duration::zero() {
        return 0;
    }
    let before = character.resource;
    if elapsed >= Duration::hours(FULL_REFILL_AFTER_HOURS) {
        character.resource = character.resource_max;
        character.last_resource_update = now;
    } else {
        let increments = elapsed.num_minutes() / MINUTES_PER_RESOURCE;
        if increments > 0 {
            character.resource = (character.resource as i64 + increments).min(character.resource_max as i64) as u32;
            let remainder = elapsed - Duration::minutes(increments * MINUTES_PER_RESOURCE);
            character.last_resource_update = now - remainder;
        }
    }
    character.resource - before
}

/// Spend one resource point or fail validation.
pub fn spend_resource(character: &mut Character, amount: u32) -> GameResult<()> {
    if character.resource < amount {
        return Err(GameError::validation(format!(
            "need {} resource, have {}",
            amount, character.resource
        )));
    }
    character.resource -= amount;
    Ok(())
}

/// Apply pending regeneration and persist it.
pub fn refresh(ctx: &GameContext, id: CharacterId, now: DateTime<Utc>) -> GameResult<Character> {
    let mut uow = ctx.store.begin();
    let mut character = load_active(&uow, id)?;
    if regenerate_resource(&mut character, now) > 0 {
        uow.put_character(&character)?;
        uow.commit()?;
    }
    Ok(character)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealOutcome {
    pub healed: u32,
    pub cost: u64,
    pub revived: bool,
}

/// Heal for 1 gold per HP. A dead character must heal exactly the missing
/// health, which revives them.
pub fn heal(ctx: &GameContext, id: CharacterId, amount: u32) -> GameResult<HealOutcome> {
    if amount == 0 {
        return Err(GameError::validation("healing amount must be positive"));
    }
    let mut uow = ctx.store.begin();
    let mut character = load_active(&uow, id)?;
    let max = max_health_of(&uow, &ctx.factions, &character)?;
    let missing = max.saturating_sub(character.health);

    let healed = if character.dead {
        if amount != missing {
            return Err(GameError::validation(format!(
                "to revive you must heal exactly {} HP",
                missing
            )));
        }
        missing
    } else {
        if missing == 0 {
            return Err(GameError::validation("already at full health"));
        }
        amount.min(missing)
    };

    let cost = healed as u64;
    if character.gold < cost {
        return Err(GameError::validation(format!(
            "need {} gold to heal, have {}",
            cost, character.gold
        )));
    }
    character.gold -= cost;
    character.health += healed;
    let revived = character.dead;
    character.dead = false;
    character.touch();
    uow.put_character(&character)?;
    uow.commit()?;
    Ok(HealOutcome {
        healed,
        cost,
        revived,
    })
}

/// Full revive without cost (maintenance and admin use).
pub fn revive(uow: &mut UnitOfWork<'_>, factions: &FactionCatalog, character: &mut Character) -> GameResult<()> {
    character.dead = false;
    character.health = max_health_of(uow, factions, character)?;
    character.touch();
    uow.put_character(character)
}

pub fn update_motto(ctx: &GameContext, id: CharacterId, motto: &str) -> GameResult<()> {
    let motto = crate::validation::sanitize_message_content("Motto", motto.trim(), 200)?;
    let mut uow = ctx.store.begin();
    let mut character = load_active(&uow, id)?;
    character.motto = Some(motto);
    character.touch();
    uow.put_character(&character)?;
    uow.commit()
}

/// Buy a catalog item. Purchases always add a new instance.
pub fn buy_item(ctx: &GameContext, id: CharacterId, item_key: &str) -> GameResult<u64> {
    let now = Utc::now();
    let mut uow = ctx.store.begin();
    let mut character = load_active(&uow, id)?;
    jail::ensure_not_jailed(&mut uow, &mut character, now)?;
    let item = uow.item(item_key)?;
    if item.npc_only {
        return Err(GameError::validation("item is not sold in stores"));
    }
    if character.level < item.min_level {
        return Err(GameError::validation(format!(
            "requires level {}",
            item.min_level
        )));
    }
    match item.price_currency {
        PriceCurrency::Gold => {
            if character.gold < item.price {
                return Err(GameError::validation("not enough gold"));
            }
            character.gold -= item.price;
        }
        PriceCurrency::Diamonds => {
            if character.diamonds < item.price {
                return Err(GameError::validation("not enough diamonds"));
            }
            character.diamonds -= item.price;
        }
    }
    let instance = character.add_item(&item.key);
    character.touch();

    quest::record_event(
        ctx,
        &mut uow,
        &mut character,
        &QuestEvent::new(ObjectiveKind::BuyFromStore, 1.0).with_target(item.kind.store()),
        now,
    )?;
    quest::record_event(
        ctx,
        &mut uow,
        &mut character,
        &QuestEvent::new(ObjectiveKind::BuySpecificItem, 1.0).with_target(&item.key),
        now,
    )?;
    uow.put_character(&character)?;
    uow.commit()?;
    info!("{} bought {}", character.name, item.key);
    Ok(instance)
}

/// Equip an owned item, unequipping whatever held its slot.
pub fn equip_item(ctx: &GameContext, id: CharacterId, instance_id: u64) -> GameResult<()> {
    let now = Utc::now();
    let mut uow = ctx.store.begin();
    let mut character = load_active(&uow, id)?;
    jail::ensure_not_jailed(&mut uow, &mut character, now)?;
    let owned = character
        .items
        .iter()
        .find(|owned| owned.instance_id == instance_id)
        .ok_or_else(|| GameError::NotFound(format!("item instance: {}", instance_id)))?
        .clone();
    let item = uow.item(&owned.item_key)?;

    if character.level < item.min_level {
        return Err(GameError::validation(format!(
            "requires level {}",
            item.min_level
        )));
    }
    if let Some((attribute, required)) = item.required_attribute {
        if character.attributes.get(attribute) < required {
            return Err(GameError::validation(format!(
                "requires {} {}",
                required, attribute
            )));
        }
    }

    let slot = match &item.kind {
        ItemKind::Weapon { .. } => None,
        ItemKind::Armor { slot, .. } => Some(slot.clone()),
        ItemKind::Magic { .. } => return Err(GameError::validation("item cannot be equipped")),
    };

    // Free the slot first.
    let mut displaced = Vec::new();
    for other in character.items.iter().filter(|o| o.equipped && o.instance_id != instance_id) {
        if let Some(record) = uow.find_item(&other.item_key)? {
            let same_slot = match &slot {
                None => record.is_weapon(),
                Some(slot) => record.armor_slot() == Some(slot.as_str()),
            };
            if same_slot {
                displaced.push(other.instance_id);
            }
        }
    }
    for owned in character.items.iter_mut() {
        if displaced.contains(&owned.instance_id) {
            owned.equipped = false;
        }
        if owned.instance_id == instance_id {
            owned.equipped = true;
        }
    }

    clamp_health(&uow, &ctx.factions, &mut character)?;
    character.touch();
    uow.put_character(&character)?;
    uow.commit()
}

pub fn unequip_item(ctx: &GameContext, id: CharacterId, instance_id: u64) -> GameResult<()> {
    let now = Utc::now();
    let mut uow = ctx.store.begin();
    let mut character = load_active(&uow, id)?;
    jail::ensure_not_jailed(&mut uow, &mut character, now)?;
    let owned = character
        .items
        .iter_mut()
        .find(|owned| owned.instance_id == instance_id)
        .ok_or_else(|| GameError::NotFound(format!("item instance: {}", instance_id)))?;
    if !owned.equipped {
        return Err(GameError::validation("item is not equipped"));
    }
    owned.equipped = false;
    clamp_health(&uow, &ctx.factions, &mut character)?;
    character.touch();
    uow.put_character(&character)?;
    uow.commit()
}

/// Sell an owned item back for a quarter of its price, paid in gold.
pub fn sell_item(ctx: &GameContext, id: CharacterId, instance_id: u64) -> GameResult<u64> {
    let now = Utc::now();
    let mut uow = ctx.store.begin();
    let mut character = load_active(&uow, id)?;
    jail::ensure_not_jailed(&mut uow, &mut character, now)?;
    let position = character
        .items
        .iter()
        .position(|owned| owned.instance_id == instance_id)
        .ok_or_else(|| GameError::NotFound(format!("item instance: {}", instance_id)))?;
    let owned = character.items.remove(position);
    let refund = uow.find_item(&owned.item_key)?.map_or(0, |item| item.price / 4);
    character.gold += refund;
    clamp_health(&uow, &ctx.factions, &mut character)?;
    character.touch();
    uow.put_character(&character)?;
    uow.commit()?;
    Ok(refund)
}

/// What consuming a magic item did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemUse {
    pub item_key: String,
    pub gold: u64,
    pub diamonds: u64,
    pub healed: u32,
    pub resource_restored: u32,
    pub revived: bool,
}

/// Consume an owned magic item. Dead characters may use items, but only a
/// reviving item brings their health back.
pub fn use_item(ctx: &GameContext, id: CharacterId, instance_id: u64) -> GameResult<ItemUse> {
    let now = Utc::now();
    let mut uow = ctx.store.begin();
    let mut character = load_active(&uow, id)?;
    jail::ensure_not_jailed(&mut uow, &mut character, now)?;
    let position = character
        .items
        .iter()
        .position(|owned| owned.instance_id == instance_id)
        .ok_or_else(|| GameError::NotFound(format!("item instance: {}", instance_id)))?;
    let item = uow.item(&character.items[position].item_key)?;
    if !matches!(item.kind, ItemKind::Magic { .. }) {
        return Err(GameError::validation("this item cannot be used"));
    }

    let mut used = ItemUse {
        item_key: item.key.clone(),
        gold: item.effect("gold"),
        diamonds: item.effect("diamonds"),
        ..ItemUse::default()
    };
    character.gold += used.gold;
    character.diamonds += used.diamonds;

    let max = max_health_of(&uow, &ctx.factions, &character)?;
    if !character.dead {
        let amount = (max as u64 * item.effect("health").min(100) / 100) as u32;
        used.healed = amount.min(max.saturating_sub(character.health));
        character.health += used.healed;
    }
    let restore = (character.resource_max as u64 * item.effect("resource").min(100) / 100) as u32;
    used.resource_restored = restore.min(character.resource_max.saturating_sub(character.resource));
    character.resource += used.resource_restored;
    if item.effect("revives") > 0 && character.dead {
        character.dead = false;
        character.health = max;
        used.revived = true;
    }

    character.items.remove(position);
    character.touch();
    uow.put_character(&character)?;
    uow.commit()?;
    info!("{} used {}", character.name, item.key);
    Ok(used)
}
