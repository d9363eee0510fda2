use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::game::combat::CombatEvent;
use crate::game::factions::{Attribute, Faction};

pub const CHARACTER_SCHEMA_VERSION: u8 = 1;
pub const ITEM_SCHEMA_VERSION: u8 = 1;
pub const BATTLE_SCHEMA_VERSION: u8 = 1;
pub const QUEST_SCHEMA_VERSION: u8 = 1;
pub const MAIL_SCHEMA_VERSION: u8 = 1;
pub const JAIL_SCHEMA_VERSION: u8 = 1;
pub const NPC_SCHEMA_VERSION: u8 = 1;

pub type CharacterId = u64;
pub type BattleId = u64;
pub type MailId = u64;

/// Sender id used for mail that does not come from a player.
pub const SYSTEM_SENDER: CharacterId = 0;

/// Lowest reputation a character can fall to.
pub const REPUTATION_FLOOR: i32 = -10;

// ============================================================================
// Attributes
// ============================================================================

/// The four primary attributes as fractional values (training moves them by fractions).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Attributes {
    pub dexterity: f64,
    pub strength: f64,
    pub intelligence: f64,
    pub devotion: f64,
}

impl Attributes {
    pub fn new(dexterity: f64, strength: f64, intelligence: f64, devotion: f64) -> Self {
        Self {
            dexterity,
            strength,
            intelligence,
            devotion,
        }
    }

    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn get(&self, attribute: Attribute) -> f64 {
        match attribute {
            Attribute::Dexterity => self.dexterity,
            Attribute::Strength => self.strength,
            Attribute::Intelligence => self.intelligence,
            Attribute::Devotion => self.devotion,
        }
    }

    pub fn get_mut(&mut self, attribute: Attribute) -> &mut f64 {
        match attribute {
            Attribute::Dexterity => &mut self.dexterity,
            Attribute::Strength => &mut self.strength,
            Attribute::Intelligence => &mut self.intelligence,
            Attribute::Devotion => &mut self.devotion,
        }
    }

    pub fn total(&self) -> f64 {
        self.dexterity + self.strength + self.intelligence + self.devotion
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self::uniform(10.0)
    }
}

// ============================================================================
// Items and equipment
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PriceCurrency {
    Gold,
    Diamonds,
}

/// Type-specific item payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Dice damage spec such as `"2d6"`.
    Weapon { damage: String },
    Armor {
        slot: String,
        defense: u32,
        health_bonus: u32,
    },
    Magic { effects: HashMap<String, i64> },
}

impl ItemKind {
    /// Store section this kind of item is sold in.
    pub fn store(&self) -> &'static str {
        match self {
            ItemKind::Weapon { .. } => "weapon",
            ItemKind::Armor { .. } => "armor",
            ItemKind::Magic { .. } => "magic",
        }
    }
}

/// Catalog entry for an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRecord {
    pub key: String,
    pub kind: ItemKind,
    pub price: u64,
    pub price_currency: PriceCurrency,
    pub min_level: u32,
    #[serde(default)]
    pub required_attribute: Option<(Attribute, f64)>,
    #[serde(default)]
    pub npc_only: bool,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl ItemRecord {
    pub fn new(key: &str, kind: ItemKind, price: u64) -> Self {
        Self {
            key: key.to_string(),
            kind,
            price,
            price_currency: PriceCurrency::Gold,
            min_level: 1,
            required_attribute: None,
            npc_only: false,
            created_at: Utc::now(),
            schema_version: ITEM_SCHEMA_VERSION,
        }
    }

    pub fn weapon(key: &str, damage: &str, price: u64) -> Self {
        Self::new(
            key,
            ItemKind::Weapon {
                damage: damage.to_string(),
            },
            price,
        )
    }

    pub fn armor(key: &str, slot: &str, defense: u32, health_bonus: u32, price: u64) -> Self {
        Self::new(
            key,
            ItemKind::Armor {
                slot: slot.to_string(),
                defense,
                health_bonus,
            },
            price,
        )
    }

    /// Consumable with effects keyed `gold`, `diamonds`, `health` (% of max),
    /// `resource` (% of max) and `revives` (non-zero revives a dead user).
    pub fn magic(key: &str, effects: &[(&str, i64)], price: u64) -> Self {
        Self::new(
            key,
            ItemKind::Magic {
                effects: effects
                    .iter()
                    .map(|(name, value)| (name.to_string(), *value))
                    .collect(),
            },
            price,
        )
    }

    pub fn with_min_level(mut self, level: u32) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_requirement(mut self, attribute: Attribute, amount: f64) -> Self {
        self.required_attribute = Some((attribute, amount));
        self
    }

    pub fn priced_in_diamonds(mut self) -> Self {
        self.price_currency = PriceCurrency::Diamonds;
        self
    }

    pub fn is_weapon(&self) -> bool {
        matches!(self.kind, ItemKind::Weapon { .. })
    }

    /// Positive value of a magic effect, or 0 for missing effects and other kinds.
    pub fn effect(&self, name: &str) -> u64 {
        match &self.kind {
            ItemKind::Magic { effects } => effects.get(name).copied().unwrap_or(0).max(0) as u64,
            _ => 0,
        }
    }

    pub fn armor_slot(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Armor { slot, .. } => Some(slot),
            _ => None,
        }
    }
}

/// One owned instance of a catalog item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnedItem {
    pub instance_id: u64,
    pub item_key: String,
    pub equipped: bool,
    pub acquired_at: DateTime<Utc>,
}

// ============================================================================
// Characters
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Character {
    pub id: CharacterId,
    pub user_id: u64,
    pub name: String,
    pub normalized_name: String,
    pub faction: Faction,
    pub level: u32,
    pub current_xp: u64,
    pub xp_to_next_level: u64,
    pub attributes: Attributes,
    /// Attribute gain applied on every level-up.
    pub growth: Attributes,
    pub health: u32,
    pub resource: u32,
    pub resource_max: u32,
    pub last_resource_update: DateTime<Utc>,
    pub gold: u64,
    pub bank_gold: u64,
    pub diamonds: u64,
    pub mining_level: u64,
    #[serde(default)]
    pub mining_streak: u32,
    #[serde(default)]
    pub last_mine_date: Option<DateTime<Utc>>,
    pub reputation: i32,
    pub dead: bool,
    pub deaths: u32,
    pub pvp_kills: u32,
    /// Weak back-references: ids only, never owning.
    #[serde(default)]
    pub last_killed: Option<CharacterId>,
    #[serde(default)]
    pub last_killed_by: Option<CharacterId>,
    #[serde(default)]
    pub last_fight_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_jail: Option<u64>,
    #[serde(default)]
    pub items: Vec<OwnedItem>,
    #[serde(default)]
    pub motto: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub retired_at: Option<DateTime<Utc>>,
    pub schema_version: u8,
}

impl Character {
    pub fn new(id: CharacterId, user_id: u64, name: &str, faction: Faction) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            name: name.to_string(),
            normalized_name: normalize_name(name),
            faction,
            level: 1,
            current_xp: 0,
            xp_to_next_level: xp_for_level(1),
            attributes: Attributes::default(),
            growth: Attributes::uniform(1.0),
            health: 0,
            resource: 75,
            resource_max: 75,
            last_resource_update: now,
            gold: 500,
            bank_gold: 0,
            diamonds: 0,
            mining_level: 10,
            mining_streak: 0,
            last_mine_date: None,
            reputation: 0,
            dead: false,
            deaths: 0,
            pvp_kills: 0,
            last_killed: None,
            last_killed_by: None,
            last_fight_at: None,
            current_jail: None,
            items: Vec::new(),
            motto: None,
            created_at: now,
            updated_at: now,
            retired_at: None,
            schema_version: CHARACTER_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_jailed(&self) -> bool {
        self.current_jail.is_some()
    }

    pub fn is_retired(&self) -> bool {
        self.retired_at.is_some()
    }

    /// Apply a reputation delta, never dropping below [`REPUTATION_FLOOR`].
    /// Returns the delta actually applied.
    pub fn change_reputation(&mut self, amount: i32) -> i32 {
        let before = self.reputation;
        self.reputation = (self.reputation + amount).max(REPUTATION_FLOOR);
        self.reputation - before
    }

    pub fn equipped_item_keys(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter(|item| item.equipped)
            .map(|item| item.item_key.as_str())
    }

    pub fn owns_item(&self, item_key: &str) -> bool {
        self.items.iter().any(|item| item.item_key == item_key)
    }

    pub fn next_instance_id(&self) -> u64 {
        self.items
            .iter()
            .map(|item| item.instance_id)
            .max()
            .map_or(1, |id| id + 1)
    }

    pub fn add_item(&mut self, item_key: &str) -> u64 {
        let instance_id = self.next_instance_id();
        self.items.push(OwnedItem {
            instance_id,
            item_key: item_key.to_string(),
            equipped: false,
            acquired_at: Utc::now(),
        });
        instance_id
    }
}

/// XP needed to leave `level`.
pub fn xp_for_level(level: u32) -> u64 {
    150 * (level as u64).pow(2)
}

/// Lowercase and strip combining accents so "Ána" and "ana" collide.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(fold_accent)
        .filter(|c| c.is_ascii())
        .collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

// ============================================================================
// NPCs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NpcRecord {
    pub key: String,
    pub name: String,
    pub faction: Faction,
    pub level: u32,
    pub max_health: u32,
    pub attributes: Attributes,
    #[serde(default)]
    pub weapon: Option<String>,
    #[serde(default)]
    pub armor: Option<String>,
    pub xp_range: (u64, u64),
    pub gold_range: (u64, u64),
    /// Reputation won on victory and lost on defeat.
    pub reputation: i32,
    pub schema_version: u8,
}

impl NpcRecord {
    pub fn new(key: &str, name: &str, faction: Faction, level: u32, max_health: u32) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            faction,
            level,
            max_health,
            attributes: Attributes::default(),
            weapon: None,
            armor: None,
            xp_range: (10, 20),
            gold_range: (5, 10),
            reputation: 0,
            schema_version: NPC_SCHEMA_VERSION,
        }
    }
}

// ============================================================================
// Battles
// ============================================================================

/// Immutable snapshot of one resolved fight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BattleRecord {
    pub id: BattleId,
    pub attacker_id: CharacterId,
    pub defender_id: CharacterId,
    /// `None` only for records written by older tooling; the resolver always decides.
    pub winner_id: Option<CharacterId>,
    pub attacker_name: String,
    pub defender_name: String,
    pub winner_name: Option<String>,
    pub attacker_faction: Faction,
    pub defender_faction: Faction,
    pub winner_faction: Option<Faction>,
    pub attacker_level: u32,
    pub defender_level: u32,
    pub log: Vec<String>,
    pub events: Vec<CombatEvent>,
    pub rounds: u32,
    pub attacker_reputation_change: i32,
    pub defender_reputation_change: i32,
    pub xp_gained: u64,
    pub resource_cost: u32,
    pub attacker_gold_change: i64,
    pub defender_gold_change: i64,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl BattleRecord {
    pub fn is_decided(&self) -> bool {
        self.winner_id.is_some()
    }
}

// ============================================================================
// Quests
// ============================================================================

/// Event types that advance quest objectives.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    KillOtherFaction,
    KillEnemyFaction,
    KillNpc,
    MineResources,
    TrainAttribute,
    DepositGold,
    WithdrawGold,
    BuyFromStore,
    BuySpecificItem,
    EnterLottery,
}

impl ObjectiveKind {
    pub fn key(self) -> &'static str {
        match self {
            ObjectiveKind::KillOtherFaction => "kill_other_faction",
            ObjectiveKind::KillEnemyFaction => "kill_enemy_faction",
            ObjectiveKind::KillNpc => "kill_npc",
            ObjectiveKind::MineResources => "mine_resources",
            ObjectiveKind::TrainAttribute => "train_attribute",
            ObjectiveKind::DepositGold => "deposit_gold",
            ObjectiveKind::WithdrawGold => "withdraw_gold",
            ObjectiveKind::BuyFromStore => "buy_from_store",
            ObjectiveKind::BuySpecificItem => "buy_specific_item",
            ObjectiveKind::EnterLottery => "enter_lottery",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestObjective {
    pub id: u32,
    pub kind: ObjectiveKind,
    /// Optional qualifier, e.g. an attribute name, NPC key or item key.
    #[serde(default)]
    pub target: Option<String>,
    pub required: u32,
}

/// One reward line item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Reward {
    Gold(u64),
    Diamonds(u64),
    Xp(u64),
    Reputation(i32),
    Item { item_key: String },
    /// Attribute named by key; unknown names are skipped when dispensed.
    Attribute { attribute: String, amount: f64 },
}

/// Quest template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestRecord {
    pub key: String,
    pub enabled: bool,
    pub unique: bool,
    pub spawn_weight: f64,
    pub objectives: Vec<QuestObjective>,
    pub rewards: Vec<Reward>,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl QuestRecord {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            enabled: true,
            unique: false,
            spawn_weight: 1.0,
            objectives: Vec::new(),
            rewards: Vec::new(),
            created_at: Utc::now(),
            schema_version: QUEST_SCHEMA_VERSION,
        }
    }

    pub fn with_objective(mut self, kind: ObjectiveKind, target: Option<&str>, required: u32) -> Self {
        let id = self.objectives.len() as u32 + 1;
        self.objectives.push(QuestObjective {
            id,
            kind,
            target: target.map(str::to_string),
            required,
        });
        self
    }

    pub fn with_reward(mut self, reward: Reward) -> Self {
        self.rewards.push(reward);
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_spawn_weight(mut self, weight: f64) -> Self {
        self.spawn_weight = weight;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    Abandoned,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum QuestState {
    Active,
    Completed { completed_at: DateTime<Utc> },
    Failed {
        failed_at: DateTime<Utc>,
        reason: FailReason,
    },
}

/// Per-objective progress counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestProgress {
    pub objective_id: u32,
    pub value: f64,
    pub updated_at: DateTime<Utc>,
}

/// A character's attempt at a quest template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerQuest {
    pub id: u64,
    pub character_id: CharacterId,
    pub quest_key: String,
    pub state: QuestState,
    pub started_at: DateTime<Utc>,
    pub progress: Vec<QuestProgress>,
    pub schema_version: u8,
}

impl PlayerQuest {
    pub fn new(id: u64, character_id: CharacterId, quest: &QuestRecord, now: DateTime<Utc>) -> Self {
        Self {
            id,
            character_id,
            quest_key: quest.key.clone(),
            state: QuestState::Active,
            started_at: now,
            progress: quest
                .objectives
                .iter()
                .map(|objective| QuestProgress {
                    objective_id: objective.id,
                    value: 0.0,
                    updated_at: now,
                })
                .collect(),
            schema_version: QUEST_SCHEMA_VERSION,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, QuestState::Active)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, QuestState::Completed { .. })
    }

    pub fn progress_for(&self, objective_id: u32) -> f64 {
        self.progress
            .iter()
            .find(|p| p.objective_id == objective_id)
            .map_or(0.0, |p| p.value)
    }

    pub fn expires_at(&self, window: Duration) -> DateTime<Utc> {
        self.started_at + window
    }

    pub fn mark_complete(&mut self, now: DateTime<Utc>) {
        self.state = QuestState::Completed { completed_at: now };
    }

    pub fn mark_failed(&mut self, now: DateTime<Utc>, reason: FailReason) {
        self.state = QuestState::Failed {
            failed_at: now,
            reason,
        };
    }
}

// ============================================================================
// Mail
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MailMessage {
    pub id: MailId,
    pub sender_id: CharacterId,
    pub recipient_id: CharacterId,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub read: bool,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub reply_to: Option<MailId>,
    pub schema_version: u8,
}

impl MailMessage {
    pub fn new(
        sender_id: CharacterId,
        recipient_id: CharacterId,
        subject: &str,
        body: &str,
        expiry: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // assigned by the store
            sender_id,
            recipient_id,
            subject: subject.to_string(),
            body: body.to_string(),
            sent_at: now,
            expires_at: now + expiry,
            read: false,
            admin: sender_id == SYSTEM_SENDER,
            reply_to: None,
            schema_version: MAIL_SCHEMA_VERSION,
        }
    }
}

// ============================================================================
// Jail
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JailRecord {
    pub id: u64,
    pub character_id: CharacterId,
    pub admin_id: CharacterId,
    pub started_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub real_reason: String,
    pub game_reason: String,
    pub released: bool,
    pub schema_version: u8,
}

impl JailRecord {
    /// `None` when the deadline is not representable; such a sentence never expires.
    pub fn release_at(&self) -> Option<DateTime<Utc>> {
        Duration::try_minutes(self.duration_minutes).and_then(|length| self.started_at.checked_add_signed(length))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.release_at().is_some_and(|deadline| now >= deadline)
    }
}

// ============================================================================
// Lottery
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotteryPool {
    pub gold: u64,
    pub diamonds: u64,
    pub last_draw_at: Option<DateTime<Utc>>,
}

impl Default for LotteryPool {
    fn default() -> Self {
        Self {
            gold: 0,
            diamonds: 20,
            last_draw_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotteryEntry {
    pub id: u64,
    pub character_id: CharacterId,
    pub cost: u64,
    pub entered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotteryWinner {
    pub id: u64,
    pub character_id: CharacterId,
    pub gold_won: u64,
    pub diamonds_won: u64,
    pub won_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrepresentable_jail_deadline_never_expires() {
        let record = JailRecord {
            id: 1,
            character_id: 2,
            admin_id: 3,
            started_at: Utc::now(),
            duration_minutes: i64::MAX / 1000,
            real_reason: String::new(),
            game_reason: String::new(),
            released: false,
            schema_version: JAIL_SCHEMA_VERSION,
        };
        assert!(record.release_at().is_none());
        assert!(!record.is_expired(Utc::now() + Duration::days(3650)));

        let short = JailRecord { duration_minutes: 5, ..record };
        assert_eq!(short.release_at(), Some(short.started_at + Duration::minutes(5)));
        assert!(short.is_expired(short.started_at + Duration::minutes(5)));
    }

    #[test]
    fn reputation_never_drops_below_floor() {
        let mut character = Character::new(1, 1, "Ana", Faction::Veylan);
        character.reputation = -8;
        assert_eq!(character.change_reputation(-4), -2);
        assert_eq!(character.reputation, REPUTATION_FLOOR);
        assert_eq!(character.change_reputation(3), 3);
    }

    #[test]
    fn normalized_names_fold_accents_and_case() {
        assert_eq!(normalize_name("  Ána Lúcia "), "ana lucia");
        assert_eq!(normalize_name("GARÇOM"), "garcom");
    }

    #[test]
    fn instance_ids_are_monotonic() {
        let mut character = Character::new(1, 1, "Ana", Faction::Veylan);
        let first = character.add_item("sword");
        let second = character.add_item("sword");
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(character.items.len(), 2);
    }
}
