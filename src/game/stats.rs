//! Stat model: turns raw attributes, faction and gear into combat values.
//!
//! Every chance is a percentage in `[0, 95]` rolled independently against a
//! uniform draw; nothing here is random.

use log::warn;

use crate::game::damage::{weapon_label, Dice};
use crate::game::factions::{Attribute, Faction, FactionCatalog, Specialty};
use crate::game::types::{Attributes, Character, CharacterId, ItemKind, ItemRecord, NpcRecord};

/// Health gained per character level on top of the faction base.
pub const HEALTH_PER_LEVEL: u32 = 5;

const PRIMARY_WEIGHT: f64 = 0.75;
const SECONDARY_WEIGHT: f64 = 0.35;
const CHANCE_CEILING: f64 = 95.0;

/// A weapon as wielded in a fight.
#[derive(Debug, Clone, PartialEq)]
pub struct Weapon {
    pub name: String,
    pub dice: Dice,
}

/// Fight-time snapshot of one side. Fights mutate only `health`.
#[derive(Debug, Clone, PartialEq)]
pub struct Combatant {
    /// Character id, or `None` for an NPC.
    pub character_id: Option<CharacterId>,
    pub name: String,
    pub faction: Faction,
    pub level: u32,
    pub attributes: Attributes,
    pub health: u32,
    pub max_health: u32,
    /// Sum of equipped armor defense.
    pub defense: u32,
    pub weapon: Option<Weapon>,
}

impl Combatant {
    /// Build a snapshot from a character and its equipped item records.
    pub fn from_character(
        character: &Character,
        factions: &FactionCatalog,
        equipped: &[ItemRecord],
    ) -> Self {
        let max_health = max_health(character, factions, equipped);
        let weapon = equipped.iter().find_map(wielded_weapon);
        Self {
            character_id: Some(character.id),
            name: character.name.clone(),
            faction: character.faction,
            level: character.level,
            attributes: character.attributes,
            health: character.health.min(max_health),
            max_health,
            defense: defense_total(equipped),
            weapon,
        }
    }

    /// NPCs always enter a fight at full health.
    pub fn from_npc(npc: &NpcRecord, weapon: Option<&ItemRecord>, armor: Option<&ItemRecord>) -> Self {
        let armor: Vec<ItemRecord> = armor.into_iter().cloned().collect();
        Self {
            character_id: None,
            name: npc.name.clone(),
            faction: npc.faction,
            level: npc.level,
            attributes: npc.attributes,
            health: npc.max_health,
            max_health: npc.max_health,
            defense: defense_total(&armor),
            weapon: weapon.and_then(wielded_weapon),
        }
    }

    pub fn attribute(&self, attribute: Attribute) -> f64 {
        self.attributes.get(attribute)
    }

    pub fn effective_power(&self) -> f64 {
        effective_power(self.faction, &self.attributes)
    }

    pub fn health_fraction(&self) -> f64 {
        if self.max_health == 0 {
            0.0
        } else {
            self.health as f64 / self.max_health as f64
        }
    }

    pub fn is_down(&self) -> bool {
        self.health == 0
    }
}

fn wielded_weapon(item: &ItemRecord) -> Option<Weapon> {
    let ItemKind::Weapon { damage } = &item.kind else {
        return None;
    };
    match damage.parse::<Dice>() {
        Ok(dice) => Some(Weapon {
            name: weapon_label(&item.key),
            dice,
        }),
        Err(err) => {
            warn!("weapon '{}' has unusable damage spec: {}", item.key, err);
            None
        }
    }
}

/// 0.75 × the faction's primary attribute + 0.35 × the other three.
pub fn effective_power(faction: Faction, attributes: &Attributes) -> f64 {
    let primary = attributes.get(faction.primary_attribute());
    let others = attributes.total() - primary;
    PRIMARY_WEIGHT * primary + SECONDARY_WEIGHT * others
}

/// Sum of `defense` across equipped armor.
pub fn defense_total(equipped: &[ItemRecord]) -> u32 {
    equipped
        .iter()
        .filter_map(|item| match item.kind {
            ItemKind::Armor { defense, .. } => Some(defense),
            _ => None,
        })
        .sum()
}

pub fn armor_health_bonus(equipped: &[ItemRecord]) -> u32 {
    equipped
        .iter()
        .filter_map(|item| match item.kind {
            ItemKind::Armor { health_bonus, .. } => Some(health_bonus),
            _ => None,
        })
        .sum()
}

/// Faction base health + level × 5 + equipped armor health bonuses.
pub fn max_health(character: &Character, factions: &FactionCatalog, equipped: &[ItemRecord]) -> u32 {
    factions.base_health(character.faction)
        + character.level * HEALTH_PER_LEVEL
        + armor_health_bonus(equipped)
}

fn clamp_chance(chance: f64) -> f64 {
    chance.clamp(0.0, CHANCE_CEILING)
}

fn steps_of_ten(diff: f64) -> f64 {
    (diff / 10.0).floor()
}

/// Chance that `actor`'s attack is dodged, using the actor's dexterity edge.
pub fn dodge_chance(actor: &Combatant, opponent: &Combatant) -> f64 {
    let specialist = actor.faction.specializes_in(Specialty::Dodge);
    let mut chance: f64 = if specialist { 10.0 } else { 5.0 };
    let diff = actor.attribute(Attribute::Dexterity) - opponent.attribute(Attribute::Dexterity);
    if diff > 0.0 {
        let cap = if specialist { 40.0 } else { 25.0 };
        chance += (steps_of_ten(diff) * 2.0).min(cap);
    }
    clamp_chance(chance)
}

/// Chance that `defender` blocks part of `attacker`'s hit.
pub fn block_chance(attacker: &Combatant, defender: &Combatant) -> f64 {
    let specialist = defender.faction.specializes_in(Specialty::Block);
    let attacker_str = attacker.attribute(Attribute::Strength);
    let defender_str = defender.attribute(Attribute::Strength);

    let mut chance: f64 = if specialist { 15.0 } else { 5.0 };
    if attacker_str >= defender_str {
        chance = 10.0;
    }

    let cap = if specialist { 40.0 } else { 25.0 };
    let bonus = (steps_of_ten((attacker_str - defender_str).abs()) * 2.0).min(cap);
    if defender_str > attacker_str {
        chance += bonus;
    } else {
        chance -= bonus;
    }
    clamp_chance(chance)
}

/// Damage soaked by a successful block.
pub fn block_amount(defender: &Combatant) -> u32 {
    (defender.effective_power() + defender.defense as f64).floor().max(0.0) as u32
}

pub fn crit_chance(actor: &Combatant, opponent: &Combatant) -> f64 {
    scaled_chance(actor, opponent, Attribute::Intelligence, Specialty::Critical, 5.0, (25.0, 20.0))
}

/// Chance that `actor` heals after taking a hit from `opponent`.
pub fn heal_chance(actor: &Combatant, opponent: &Combatant) -> f64 {
    scaled_chance(actor, opponent, Attribute::Devotion, Specialty::Heal, 2.0, (30.0, 20.0))
}

/// Crit and heal share a shape: base (10 for the specialist), +5 for any edge,
/// then 1.0 (specialist) or 0.5 per 10 points of edge up to a cap.
fn scaled_chance(
    actor: &Combatant,
    opponent: &Combatant,
    attribute: Attribute,
    specialty: Specialty,
    base: f64,
    caps: (f64, f64),
) -> f64 {
    let specialist = actor.faction.specializes_in(specialty);
    let mut chance = if specialist { 10.0 } else { base };
    let diff = actor.attribute(attribute) - opponent.attribute(attribute);
    if diff > 0.0 {
        chance += 5.0;
        let (per_step, cap) = if specialist { (1.0, caps.0) } else { (0.5, caps.1) };
        chance += (steps_of_ten(diff) * per_step).min(cap);
    }
    clamp_chance(chance)
}

/// Fraction of max health restored by a heal-on-hit.
pub fn heal_fraction(healer: &Combatant, opponent: &Combatant) -> f64 {
    let mut fraction = 0.10;
    if healer.faction.specializes_in(Specialty::Heal) {
        let diff = healer.attribute(Attribute::Devotion) - opponent.attribute(Attribute::Devotion);
        fraction += (steps_of_ten(diff) * 0.01).clamp(0.0, 0.5);
    }
    fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fighter(faction: Faction, attributes: Attributes) -> Combatant {
        Combatant {
            character_id: Some(1),
            name: "test".into(),
            faction,
            level: 1,
            attributes,
            health: 25,
            max_health: 25,
            defense: 0,
            weapon: None,
        }
    }

    #[test]
    fn effective_power_weights_primary_attribute() {
        let attrs = Attributes::new(20.0, 10.0, 10.0, 10.0);
        let veylan = effective_power(Faction::Veylan, &attrs);
        let urghan = effective_power(Faction::Urghan, &attrs);
        assert!((veylan - (0.75 * 20.0 + 0.35 * 30.0)).abs() < 1e-9);
        assert!((urghan - (0.75 * 10.0 + 0.35 * 40.0)).abs() < 1e-9);
    }

    #[test]
    fn dodge_bonus_is_capped_by_specialty() {
        let quick = Attributes::new(400.0, 10.0, 10.0, 10.0);
        let slow = Attributes::default();
        let veylan = fighter(Faction::Veylan, quick);
        let aureen = fighter(Faction::Aureen, quick);
        let target = fighter(Faction::Urghan, slow);
        assert_eq!(dodge_chance(&veylan, &target), 50.0);
        assert_eq!(dodge_chance(&aureen, &target), 30.0);
        assert_eq!(dodge_chance(&target, &veylan), 5.0);
    }

    #[test]
    fn block_chance_follows_strength_gap() {
        let strong = fighter(Faction::Urghan, Attributes::new(10.0, 45.0, 10.0, 10.0));
        let weak = fighter(Faction::Veylan, Attributes::default());
        // Stronger Urghan defender: base 15 + 3 steps × 2.
        assert_eq!(block_chance(&weak, &strong), 21.0);
        // Stronger attacker: base raised to 10, then reduced by the gap.
        assert_eq!(block_chance(&strong, &weak), 4.0);
        // Equal strength counts as the attacker being at least as strong.
        assert_eq!(block_chance(&weak, &weak), 10.0);
        // The same holds for a block specialist: equal strength drops 15 to 10.
        let rival = fighter(Faction::Urghan, Attributes::new(10.0, 45.0, 10.0, 10.0));
        assert_eq!(block_chance(&strong, &rival), 10.0);
    }

    #[test]
    fn crit_and_heal_chances_scale_with_gap() {
        let smart = fighter(Faction::Aureen, Attributes::new(10.0, 10.0, 60.0, 10.0));
        let plain = fighter(Faction::Veylan, Attributes::default());
        assert_eq!(crit_chance(&smart, &plain), 10.0 + 5.0 + 5.0);
        assert_eq!(crit_chance(&plain, &smart), 5.0);

        let pious = fighter(Faction::Camyra, Attributes::new(10.0, 10.0, 10.0, 510.0));
        assert_eq!(heal_chance(&pious, &plain), 10.0 + 5.0 + 30.0);
        assert_eq!(heal_chance(&plain, &pious), 2.0);
    }

    #[test]
    fn heal_fraction_bonus_only_for_healers() {
        let pious = fighter(Faction::Camyra, Attributes::new(10.0, 10.0, 10.0, 40.0));
        let plain = fighter(Faction::Veylan, Attributes::default());
        assert!((heal_fraction(&pious, &plain) - 0.13).abs() < 1e-9);
        assert!((heal_fraction(&plain, &pious) - 0.10).abs() < 1e-9);
        assert!((heal_fraction(&plain, &plain) - 0.10).abs() < 1e-9);
    }

    #[test]
    fn max_health_includes_level_and_armor() {
        let factions = FactionCatalog::default();
        let mut character = Character::new(1, 1, "Ana", Faction::Urghan);
        character.level = 3;
        let armor = vec![
            ItemRecord::armor("helm", "head", 2, 5, 10),
            ItemRecord::armor("plate", "body", 4, 10, 10),
            ItemRecord::weapon("sword", "1d6", 10),
        ];
        assert_eq!(max_health(&character, &factions, &armor), 20 + 15 + 15);
        assert_eq!(defense_total(&armor), 6);

        let combatant = Combatant::from_character(&character, &factions, &armor);
        assert_eq!(combatant.weapon.as_ref().map(|w| w.name.as_str()), Some("Sword"));
        assert_eq!(combatant.health, 0);
    }
}
