//! Factions, their combat specialisations and the faction configuration provider.
//!
//! Faction-specific behaviour is resolved through [`Faction::profile`], a static
//! lookup table, so the stat model and resolver never compare faction names.
//! Numeric per-faction starting values (base attributes, growth per level, base
//! health, resource label) come from [`FactionCatalog`], loaded once per process
//! from JSON and shared behind an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::game::errors::GameError;

/// The four primary attributes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Dexterity,
    Strength,
    Intelligence,
    Devotion,
}

impl Attribute {
    pub const ALL: [Attribute; 4] = [
        Attribute::Dexterity,
        Attribute::Strength,
        Attribute::Intelligence,
        Attribute::Devotion,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Attribute::Dexterity => "dexterity",
            Attribute::Strength => "strength",
            Attribute::Intelligence => "intelligence",
            Attribute::Devotion => "devotion",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Attribute {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dexterity" | "dex" => Ok(Attribute::Dexterity),
            "strength" | "str" => Ok(Attribute::Strength),
            "intelligence" | "int" => Ok(Attribute::Intelligence),
            "devotion" | "dev" => Ok(Attribute::Devotion),
            other => Err(GameError::validation(format!("unknown attribute: {}", other))),
        }
    }
}

/// The combat effect a faction is specialised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specialty {
    Dodge,
    Block,
    Critical,
    Heal,
}

/// Static per-faction combat profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactionProfile {
    pub primary: Attribute,
    pub specialty: Specialty,
    /// The single faction this one is at war with.
    pub enemy: Faction,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Veylan,
    Urghan,
    Aureen,
    Camyra,
}

const PROFILES: [FactionProfile; 4] = [
    FactionProfile {
        primary: Attribute::Dexterity,
        specialty: Specialty::Dodge,
        enemy: Faction::Urghan,
    },
    FactionProfile {
        primary: Attribute::Strength,
        specialty: Specialty::Block,
        enemy: Faction::Aureen,
    },
    FactionProfile {
        primary: Attribute::Intelligence,
        specialty: Specialty::Critical,
        enemy: Faction::Camyra,
    },
    FactionProfile {
        primary: Attribute::Devotion,
        specialty: Specialty::Heal,
        enemy: Faction::Veylan,
    },
];

impl Faction {
    pub const ALL: [Faction; 4] = [
        Faction::Veylan,
        Faction::Urghan,
        Faction::Aureen,
        Faction::Camyra,
    ];

    pub fn profile(self) -> &'static FactionProfile {
        &PROFILES[self as usize]
    }

    pub fn primary_attribute(self) -> Attribute {
        self.profile().primary
    }

    pub fn specializes_in(self, specialty: Specialty) -> bool {
        self.profile().specialty == specialty
    }

    pub fn enemy(self) -> Faction {
        self.profile().enemy
    }

    pub fn key(self) -> &'static str {
        match self {
            Faction::Veylan => "veylan",
            Faction::Urghan => "urghan",
            Faction::Aureen => "aureen",
            Faction::Camyra => "camyra",
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Faction {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Faction::ALL
            .into_iter()
            .find(|faction| faction.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| GameError::validation(format!("unknown faction: {}", s)))
    }
}

/// How two factions relate for reputation purposes, seen from the attacker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Same,
    Enemy,
    Neutral,
}

impl Relation {
    /// Only the attacker's declared enemy counts; the reverse direction is neutral.
    pub fn between(attacker: Faction, defender: Faction) -> Self {
        if attacker == defender {
            Relation::Same
        } else if attacker.enemy() == defender {
            Relation::Enemy
        } else {
            Relation::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Growth {
    #[serde(default = "default_attribute_base")]
    pub base: f64,
    #[serde(default = "default_attribute_per_level")]
    pub per_level: f64,
}

fn default_attribute_base() -> f64 {
    10.0
}

fn default_attribute_per_level() -> f64 {
    1.0
}

impl Default for Growth {
    fn default() -> Self {
        Self {
            base: default_attribute_base(),
            per_level: default_attribute_per_level(),
        }
    }
}

/// Base health; the per-level increment is fixed (see [`crate::game::stats::HEALTH_PER_LEVEL`]).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HealthGrowth {
    #[serde(default = "default_health_base")]
    pub base: u32,
}

fn default_health_base() -> u32 {
    20
}

impl Default for HealthGrowth {
    fn default() -> Self {
        Self {
            base: default_health_base(),
        }
    }
}

/// Configured starting values for one faction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactionStats {
    #[serde(default)]
    pub dexterity: Growth,
    #[serde(default)]
    pub strength: Growth,
    #[serde(default)]
    pub intelligence: Growth,
    #[serde(default)]
    pub devotion: Growth,
    #[serde(default, alias = "healthpoints")]
    pub health: HealthGrowth,
    #[serde(default = "default_resource_name")]
    pub resource_name: String,
    #[serde(default = "default_resource_image")]
    pub resource_image: String,
}

fn default_resource_name() -> String {
    "Resource".to_string()
}

fn default_resource_image() -> String {
    "resource.webp".to_string()
}

impl Default for FactionStats {
    fn default() -> Self {
        Self {
            dexterity: Growth::default(),
            strength: Growth::default(),
            intelligence: Growth::default(),
            devotion: Growth::default(),
            health: HealthGrowth::default(),
            resource_name: default_resource_name(),
            resource_image: default_resource_image(),
        }
    }
}

impl FactionStats {
    pub fn growth(&self, attribute: Attribute) -> Growth {
        match attribute {
            Attribute::Dexterity => self.dexterity,
            Attribute::Strength => self.strength,
            Attribute::Intelligence => self.intelligence,
            Attribute::Devotion => self.devotion,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FactionFile {
    factions: HashMap<String, FactionEntry>,
}

#[derive(Debug, Deserialize)]
struct FactionEntry {
    #[serde(default)]
    stats: FactionStats,
}

/// Read-only faction configuration, keyed by [`Faction`].
#[derive(Debug, Clone, Default)]
pub struct FactionCatalog {
    stats: HashMap<Faction, FactionStats>,
    fallback: FactionStats,
}

impl FactionCatalog {
    /// Parse a `{"factions": {"veylan": {"stats": {...}}}}` document.
    /// Unknown faction keys are skipped with a warning.
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let file: FactionFile = serde_json::from_str(json)?;
        let mut stats = HashMap::new();
        for (key, entry) in file.factions {
            match key.parse::<Faction>() {
                Ok(faction) => {
                    stats.insert(faction, entry.stats);
                }
                Err(_) => warn!("ignoring unknown faction '{}' in faction config", key),
            }
        }
        Ok(Self {
            stats,
            fallback: FactionStats::default(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GameError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        info!(
            "Loaded faction config for {} factions from {}",
            catalog.stats.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn with_stats(mut self, faction: Faction, stats: FactionStats) -> Self {
        self.stats.insert(faction, stats);
        self
    }

    /// Stats for `faction`, or the built-in defaults when the faction is not configured.
    pub fn stats(&self, faction: Faction) -> &FactionStats {
        self.stats.get(&faction).unwrap_or(&self.fallback)
    }

    pub fn base_health(&self, faction: Faction) -> u32 {
        self.stats(faction).health.base
    }

    pub fn resource_label(&self, faction: Faction) -> (&str, &str) {
        let stats = self.stats(faction);
        (&stats.resource_name, &stats.resource_image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enemy_cycle_is_closed() {
        let mut faction = Faction::Veylan;
        for _ in 0..4 {
            faction = faction.enemy();
        }
        assert_eq!(faction, Faction::Veylan);
        assert_eq!(Faction::Veylan.enemy(), Faction::Urghan);
        assert_eq!(Faction::Camyra.enemy(), Faction::Veylan);
    }

    #[test]
    fn each_faction_has_distinct_primary() {
        let mut primaries: Vec<_> = Faction::ALL.iter().map(|f| f.primary_attribute()).collect();
        primaries.sort();
        primaries.dedup();
        assert_eq!(primaries.len(), 4);
        assert_eq!(Faction::Urghan.primary_attribute(), Attribute::Strength);
        assert!(Faction::Camyra.specializes_in(Specialty::Heal));
    }

    #[test]
    fn relation_is_directional() {
        assert_eq!(Relation::between(Faction::Veylan, Faction::Urghan), Relation::Enemy);
        assert_eq!(Relation::between(Faction::Urghan, Faction::Veylan), Relation::Neutral);
        assert_eq!(Relation::between(Faction::Aureen, Faction::Aureen), Relation::Same);
    }

    #[test]
    fn catalog_parses_partial_json_with_defaults() {
        let json = r#"{"factions": {
            "urghan": {"stats": {"strength": {"base": 14, "per_level": 1.5},
                                 "health": {"base": 30},
                                 "resource_name": "Rage"}},
            "atlantis": {"stats": {}}
        }}"#;
        let catalog = FactionCatalog::from_json(json).unwrap();
        let urghan = catalog.stats(Faction::Urghan);
        assert_eq!(urghan.strength.base, 14.0);
        assert_eq!(urghan.dexterity.base, 10.0);
        assert_eq!(urghan.health.base, 30);
        assert_eq!(catalog.resource_label(Faction::Urghan).0, "Rage");
        assert_eq!(catalog.base_health(Faction::Veylan), 20);
    }
}
