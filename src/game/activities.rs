//! Resource-driven activities: academy training, banking, mining and the
//! mining lottery.

use chrono::{DateTime, Duration, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::game::character::{load_active, regenerate_resource, spend_resource};
use crate::game::damage::Roller;
use crate::game::errors::{Conflict, GameError, GameResult};
use crate::game::factions::Attribute;
use crate::game::quest::{self, QuestEvent};
use crate::game::storage::{Records, UnitOfWork};
use crate::game::types::{Character, CharacterId, LotteryEntry, LotteryPool, LotteryWinner, ObjectiveKind};
use crate::game::{jail, GameContext};

/// Resource spent per training session.
pub const TRAINING_SESSION_COST: u32 = 5;
pub const LOTTERY_MIN_MINING_LEVEL: u64 = 5000;
const LOTTERY_ENTRY_STEP: u64 = 1000;
const MINING_GOLD_CAP: u64 = 200;

/// Load a character for an activity: alive, unretired, not jailed, with
/// resources regenerated up to `now`.
fn load_for_activity(uow: &mut UnitOfWork<'_>, id: CharacterId, now: DateTime<Utc>) -> GameResult<Character> {
    let mut character = load_active(uow, id)?;
    jail::ensure_not_jailed(uow, &mut character, now)?;
    regenerate_resource(&mut character, now);
    Ok(character)
}

// ============================================================================
// Academy
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingAmount {
    Five,
    Ten,
    Fifty,
    /// Every resource point, rounded down to a whole session.
    All,
}

impl TrainingAmount {
    pub fn resources(self, available: u32) -> u32 {
        match self {
            TrainingAmount::Five => 5,
            TrainingAmount::Ten => 10,
            TrainingAmount::Fifty => 50,
            TrainingAmount::All => available / TRAINING_SESSION_COST * TRAINING_SESSION_COST,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingQuality {
    Loss,
    Normal,
    Good,
    Excellent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    pub attribute: Attribute,
    pub change: f64,
    pub quality: TrainingQuality,
}

/// Roll one academy session.
pub fn roll_training(roller: &mut impl Roller) -> (f64, TrainingQuality) {
    if roller.chance(5.0) {
        return (-roller.float_range(0.001, 1.499), TrainingQuality::Loss);
    }
    let tier = roller.unit();
    if tier < 0.90 {
        (roller.float_range(0.001, 0.400), TrainingQuality::Normal)
    } else if tier < 0.95 {
        (roller.float_range(0.401, 0.600), TrainingQuality::Good)
    } else {
        (roller.float_range(0.601, 1.000), TrainingQuality::Excellent)
    }
}

pub fn train(
    ctx: &GameContext,
    id: CharacterId,
    attribute: Attribute,
    amount: TrainingAmount,
    roller: &mut impl Roller,
) -> GameResult<Vec<TrainingResult>> {
    let now = Utc::now();
    let mut uow = ctx.store.begin();
    let mut character = load_for_activity(&mut uow, id, now)?;
    if character.dead {
        return Err(Conflict::Dead.into());
    }
    let resources = amount.resources(character.resource);
    if resources == 0 {
        return Err(GameError::validation("not enough resource to train"));
    }
    spend_resource(&mut character, resources)?;

    let mut results = Vec::new();
    for _ in 0..resources / TRAINING_SESSION_COST {
        let (change, quality) = roll_training(roller);
        let value = character.attributes.get_mut(attribute);
        *value = (*value + change).max(0.0);
        quest::record_event(
            ctx,
            &mut uow,
            &mut character,
            &QuestEvent::new(ObjectiveKind::TrainAttribute, change.abs()).with_target(attribute.key()),
            now,
        )?;
        results.push(TrainingResult {
            attribute,
            change,
            quality,
        });
    }

    character.touch();
    uow.put_character(&character)?;
    uow.commit()?;
    let total: f64 = results.iter().map(|result| result.change).sum();
    info!(
        "{} trained {} for {} resource ({:+.3})",
        character.name, attribute, resources, total
    );
    Ok(results)
}

// ============================================================================
// Bank
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankAmount {
    /// Clamped to what is available.
    Exact(u64),
    All,
}

impl BankAmount {
    fn resolve(self, available: u64) -> u64 {
        match self {
            BankAmount::Exact(amount) => amount.min(available),
            BankAmount::All => available,
        }
    }
}

/// Move gold from purse to bank. Returns the amount moved.
pub fn deposit(ctx: &GameContext, id: CharacterId, amount: BankAmount) -> GameResult<u64> {
    let now = Utc::now();
    let mut uow = ctx.store.begin();
    let mut character = load_for_activity(&mut uow, id, now)?;
    let moved = amount.resolve(character.gold);
    if moved == 0 {
        return Err(GameError::validation("invalid amount"));
    }
    character.gold -= moved;
    character.bank_gold += moved;
    quest::record_event(
        ctx,
        &mut uow,
        &mut character,
        &QuestEvent::new(ObjectiveKind::DepositGold, moved as f64),
        now,
    )?;
    character.touch();
    uow.put_character(&character)?;
    uow.commit()?;
    Ok(moved)
}

/// Move gold from bank to purse. Returns the amount moved.
pub fn withdraw(ctx: &GameContext, id: CharacterId, amount: BankAmount) -> GameResult<u64> {
    let now = Utc::now();
    let mut uow = ctx.store.begin();
    let mut character = load_for_activity(&mut uow, id, now)?;
    let moved = amount.resolve(character.bank_gold);
    if moved == 0 {
        return Err(GameError::validation("invalid amount"));
    }
    character.bank_gold -= moved;
    character.gold += moved;
    quest::record_event(
        ctx,
        &mut uow,
        &mut character,
        &QuestEvent::new(ObjectiveKind::WithdrawGold, moved as f64),
        now,
    )?;
    character.touch();
    uow.put_character(&character)?;
    uow.commit()?;
    Ok(moved)
}

// ============================================================================
// Mine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiningAmount {
    One,
    Five,
    Fifty,
    All,
}

impl MiningAmount {
    pub fn resources(self, available: u32) -> u32 {
        match self {
            MiningAmount::One => 1,
            MiningAmount::Five => 5,
            MiningAmount::Fifty => 50,
            MiningAmount::All => available,
        }
    }
}

/// One resource point's worth of digging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningResult {
    pub mining_gain: u64,
    pub gold_gain: u64,
    pub diamonds_gain: u64,
    pub crit: bool,
    pub broke_tool: bool,
    /// Mining level after this dig.
    pub current_mining_level: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningReport {
    pub results: Vec<MiningResult>,
    pub resources_used: u32,
    pub streak: u32,
    pub streak_bonus: f64,
    pub total_mining_gain: u64,
    /// Totals after the house cut.
    pub player_gold: u64,
    pub player_diamonds: u64,
    pub house_gold: u64,
    pub house_diamonds: u64,
}

/// Advance the daily streak for a dig at `now` and return it.
pub fn update_streak(character: &mut Character, now: DateTime<Utc>) -> u32 {
    let today = now.date_naive();
    character.mining_streak = match character.last_mine_date.map(|at| at.date_naive()) {
        Some(last) if last == today => character.mining_streak.max(1),
        Some(last) if last + Duration::days(1) == today => character.mining_streak + 1,
        _ => 1,
    };
    character.last_mine_date = Some(now);
    character.mining_streak
}

pub fn streak_bonus(streak: u32) -> f64 {
    (streak as f64 * 0.02).min(0.14)
}

/// Base gold per dig, before the random factor, streak, crit and cap.
pub fn base_gold(mining_level: u64) -> f64 {
    (10.0 + ((mining_level + 1) as f64).log(1.5)).floor()
}

/// ×1.1 for every consecutive doubling milestone from 1000 that has been reached.
pub fn milestone_multiplier(mining_level: u64) -> f64 {
    let mut multiplier = 1.0;
    for i in 0..20u32 {
        if mining_level >= 1000 * 2u64.pow(i) {
            multiplier *= 1.1;
        } else {
            break;
        }
    }
    multiplier
}

/// Probability (0..=0.35) that a dig turns up a diamond.
pub fn diamond_chance(mining_level: u64) -> f64 {
    let base = 0.005 + mining_level.min(50_000) as f64 / 200_000.0;
    let extra = (mining_level.saturating_sub(50_000) / 50_000) as f64 * 0.025;
    (base + extra).min(0.35)
}

/// The lottery's share of a dig: 10% of the gold, and of the diamonds one
/// when three to nine were found, otherwise a tenth.
pub fn house_cut(total_gold: u64, total_diamonds: u64) -> (u64, u64) {
    let diamonds = if (3..=9).contains(&total_diamonds) {
        1
    } else {
        total_diamonds / 10
    };
    (total_gold / 10, diamonds)
}

pub fn roll_dig(mining_level: u64, bonus: f64, roller: &mut impl Roller) -> MiningResult {
    let mining_gain = if roller.chance(95.0) {
        roller.int_range(1, 30)
    } else {
        roller.int_range(30, 100)
    };
    let current = mining_level + mining_gain;

    let random_factor = roller.float_range(0.9, 1.1);
    let crit = roller.chance(5.0);
    let broke_tool = roller.chance(2.0);
    let crit_multiplier = if crit { 2.0 } else { 1.0 };
    let gold = (base_gold(current) * milestone_multiplier(current) * random_factor * (1.0 + bonus) * crit_multiplier)
        .floor() as u64;
    let gold_gain = if broke_tool { 0 } else { gold.min(MINING_GOLD_CAP) };
    let diamonds_gain = u64::from(roller.chance(diamond_chance(current) * 100.0));

    MiningResult {
        mining_gain,
        gold_gain,
        diamonds_gain,
        crit,
        broke_tool,
        current_mining_level: current,
    }
}

pub fn mine(ctx: &GameContext, id: CharacterId, amount: MiningAmount, roller: &mut impl Roller) -> GameResult<MiningReport> {
    mine_at(ctx, id, amount, roller, Utc::now())
}

pub fn mine_at(
    ctx: &GameContext,
    id: CharacterId,
    amount: MiningAmount,
    roller: &mut impl Roller,
    now: DateTime<Utc>,
) -> GameResult<MiningReport> {
    let mut uow = ctx.store.begin();
    let mut character = load_for_activity(&mut uow, id, now)?;
    let resources = amount.resources(character.resource);
    if resources == 0 || character.resource < resources {
        return Err(GameError::validation("not enough resource to mine"));
    }

    let streak = update_streak(&mut character, now);
    let bonus = streak_bonus(streak);
    let mut level = character.mining_level;
    let mut results = Vec::with_capacity(resources as usize);
    for _ in 0..resources {
        let result = roll_dig(level, bonus, roller);
        level = result.current_mining_level;
        results.push(result);
    }

    let total_mining_gain: u64 = results.iter().map(|r| r.mining_gain).sum();
    let total_gold: u64 = results.iter().map(|r| r.gold_gain).sum();
    let total_diamonds: u64 = results.iter().map(|r| r.diamonds_gain).sum();
    let (house_gold, house_diamonds) = house_cut(total_gold, total_diamonds);

    character.mining_level = level;
    character.gold += total_gold - house_gold;
    character.diamonds += total_diamonds - house_diamonds;
    spend_resource(&mut character, resources)?;

    let mut pool = uow.lottery_pool()?;
    pool.gold += house_gold;
    pool.diamonds += house_diamonds;
    uow.put_lottery_pool(&pool)?;

    quest::record_event(
        ctx,
        &mut uow,
        &mut character,
        &QuestEvent::new(ObjectiveKind::MineResources, resources as f64),
        now,
    )?;
    character.touch();
    uow.put_character(&character)?;
    uow.commit()?;
    info!(
        "{} mined {} times: +{} levels, {} gold, {} diamonds",
        character.name,
        resources,
        total_mining_gain,
        total_gold - house_gold,
        total_diamonds - house_diamonds
    );

    Ok(MiningReport {
        results,
        resources_used: resources,
        streak,
        streak_bonus: bonus,
        total_mining_gain,
        player_gold: total_gold - house_gold,
        player_diamonds: total_diamonds - house_diamonds,
        house_gold,
        house_diamonds,
    })
}

// ============================================================================
// Lottery
// ============================================================================

fn entries_for(records: &impl Records, id: CharacterId) -> GameResult<u64> {
    Ok(records
        .lottery_entries()?
        .iter()
        .filter(|entry| entry.character_id == id)
        .count() as u64)
}

/// Price of the character's next entry.
pub fn next_entry_cost(records: &impl Records, id: CharacterId) -> GameResult<u64> {
    Ok(LOTTERY_ENTRY_STEP * (entries_for(records, id)? + 1))
}

/// Buy a lottery entry; the price goes into the pool. Returns the cost paid.
pub fn enter_lottery(ctx: &GameContext, id: CharacterId) -> GameResult<u64> {
    let now = Utc::now();
    let mut uow = ctx.store.begin();
    let mut character = load_for_activity(&mut uow, id, now)?;
    if character.mining_level < LOTTERY_MIN_MINING_LEVEL {
        return Err(GameError::validation(format!(
            "mining level {} required to enter the lottery",
            LOTTERY_MIN_MINING_LEVEL
        )));
    }
    let cost = next_entry_cost(&uow, id)?;
    if character.gold < cost {
        return Err(GameError::validation(format!("need {} gold to enter the lottery", cost)));
    }
    character.gold -= cost;

    let mut pool = uow.lottery_pool()?;
    pool.gold += cost;
    uow.put_lottery_pool(&pool)?;
    uow.insert_lottery_entry(LotteryEntry {
        id: 0,
        character_id: id,
        cost,
        entered_at: now,
    })?;
    quest::record_event(
        ctx,
        &mut uow,
        &mut character,
        &QuestEvent::new(ObjectiveKind::EnterLottery, 1.0),
        now,
    )?;
    character.touch();
    uow.put_character(&character)?;
    uow.commit()?;
    info!("{} entered the lottery for {} gold", character.name, cost);
    Ok(cost)
}

/// Pay the whole pool to one uniformly drawn entry and reset the lottery.
/// Returns `None` when nobody entered.
pub fn draw_lottery(ctx: &GameContext, roller: &mut impl Roller) -> GameResult<Option<LotteryWinner>> {
    let now = Utc::now();
    let mut uow = ctx.store.begin();
    let entries = uow.lottery_entries()?;
    if entries.is_empty() {
        return Ok(None);
    }
    let chosen = &entries[roller.index(entries.len())];
    let pool = uow.lottery_pool()?;
    let mut winner = uow.character(chosen.character_id)?;
    winner.gold += pool.gold;
    winner.diamonds += pool.diamonds;
    winner.touch();
    uow.put_character(&winner)?;

    let mut record = LotteryWinner {
        id: 0,
        character_id: winner.id,
        gold_won: pool.gold,
        diamonds_won: pool.diamonds,
        won_at: now,
    };
    record.id = uow.insert_lottery_winner(record.clone())?;
    uow.put_lottery_pool(&LotteryPool {
        last_draw_at: Some(now),
        ..LotteryPool::default()
    })?;
    uow.clear_lottery_entries()?;
    uow.commit()?;
    info!(
        "lottery won by {}: {} gold, {} diamonds",
        winner.name, record.gold_won, record.diamonds_won
    );
    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::damage::ScriptedRoller;

    #[test]
    fn training_tiers_follow_the_unit_roll() {
        let mut roller = ScriptedRoller::all_fail().with_floats([0.5, 0.2]);
        let (change, quality) = roll_training(&mut roller);
        assert_eq!(quality, TrainingQuality::Normal);
        assert!((change - 0.2).abs() < 1e-9);

        let mut roller = ScriptedRoller::all_fail().with_floats([0.97, 0.0]);
        let (change, quality) = roll_training(&mut roller);
        assert_eq!(quality, TrainingQuality::Excellent);
        assert!((change - 0.601).abs() < 1e-9);

        let mut roller = ScriptedRoller::all_fail().with_chances([true]).with_floats([1.0]);
        let (change, quality) = roll_training(&mut roller);
        assert_eq!(quality, TrainingQuality::Loss);
        assert!((change + 1.0).abs() < 1e-9);
    }

    #[test]
    fn training_all_rounds_down_to_sessions() {
        assert_eq!(TrainingAmount::All.resources(23), 20);
        assert_eq!(TrainingAmount::All.resources(4), 0);
    }

    #[test]
    fn mining_formulas() {
        assert_eq!(base_gold(10), (10.0 + 11f64.log(1.5)).floor());
        assert_eq!(milestone_multiplier(999), 1.0);
        assert!((milestone_multiplier(2500) - 1.21).abs() < 1e-9);
        assert!((diamond_chance(0) - 0.005).abs() < 1e-12);
        assert!((diamond_chance(50_000) - 0.255).abs() < 1e-12);
        assert!((diamond_chance(150_000) - 0.305).abs() < 1e-12);
        assert_eq!(diamond_chance(10_000_000), 0.35);
        assert!((streak_bonus(3) - 0.06).abs() < 1e-12);
        assert_eq!(streak_bonus(30), 0.14);
    }

    #[test]
    fn house_cut_rules() {
        assert_eq!(house_cut(95, 0), (9, 0));
        assert_eq!(house_cut(0, 2), (0, 0));
        assert_eq!(house_cut(0, 3), (0, 1));
        assert_eq!(house_cut(0, 9), (0, 1));
        assert_eq!(house_cut(0, 25), (0, 2));
    }

    #[test]
    fn streak_counts_consecutive_days() {
        let mut character = Character::new(1, 1, "Mira", crate::game::factions::Faction::Camyra);
        let day = Utc::now();
        assert_eq!(update_streak(&mut character, day), 1);
        assert_eq!(update_streak(&mut character, day), 1);
        assert_eq!(update_streak(&mut character, day + Duration::days(1)), 2);
        assert_eq!(update_streak(&mut character, day + Duration::days(3)), 1);
    }

    #[test]
    fn broken_tool_yields_no_gold() {
        let mut roller = ScriptedRoller::all_fail()
            .with_chances([true, false, true, false])
            .with_ints([12]);
        let result = roll_dig(10, 0.0, &mut roller);
        assert_eq!(result.mining_gain, 12);
        assert!(result.broke_tool);
        assert_eq!(result.gold_gain, 0);
        assert_eq!(result.current_mining_level, 22);
    }
}
