//! Damage rolls and the randomness seam used by every game mechanic.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::game::errors::GameError;
use crate::game::stats::Combatant;

/// Shown when a combatant fights without a weapon.
pub const UNARMED: &str = "bare hands";

/// Source of randomness for game mechanics.
///
/// Production code wraps a [`rand::Rng`] in [`RandRoller`]; tests and replays
/// use [`ScriptedRoller`] to force outcomes.
pub trait Roller {
    /// True with probability `percent / 100`.
    fn chance(&mut self, percent: f64) -> bool;

    /// Uniform integer in `[low, high]`.
    fn int_range(&mut self, low: u64, high: u64) -> u64;

    /// Uniform float in `[low, high)`.
    fn float_range(&mut self, low: f64, high: f64) -> f64;

    /// Uniform float in `[0, 1)`.
    fn unit(&mut self) -> f64 {
        self.float_range(0.0, 1.0)
    }

    /// Uniform index in `[0, len)`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize {
        self.int_range(0, len.saturating_sub(1) as u64) as usize
    }
}

/// [`Roller`] backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RandRoller<R: Rng>(pub R);

impl RandRoller<rand::rngs::ThreadRng> {
    pub fn thread() -> Self {
        RandRoller(rand::thread_rng())
    }
}

impl<R: Rng> Roller for RandRoller<R> {
    fn chance(&mut self, percent: f64) -> bool {
        self.0.gen::<f64>() < percent / 100.0
    }

    fn int_range(&mut self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        self.0.gen_range(low..=high)
    }

    fn float_range(&mut self, low: f64, high: f64) -> f64 {
        if low >= high {
            return low;
        }
        self.0.gen_range(low..high)
    }
}

/// Deterministic roller fed from queues.
///
/// Once a queue is drained, chances fall back to `default_chance` and ranges
/// return their lower bound. Queued integers and floats are clamped into the
/// requested range.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRoller {
    chances: VecDeque<bool>,
    ints: VecDeque<u64>,
    floats: VecDeque<f64>,
    default_chance: bool,
}

impl ScriptedRoller {
    /// Every chance fails and every range yields its minimum.
    pub fn all_fail() -> Self {
        Self::default()
    }

    /// Every chance succeeds and every range yields its minimum.
    pub fn all_succeed() -> Self {
        Self {
            default_chance: true,
            ..Self::default()
        }
    }

    pub fn with_chances(mut self, outcomes: impl IntoIterator<Item = bool>) -> Self {
        self.chances.extend(outcomes);
        self
    }

    pub fn with_ints(mut self, values: impl IntoIterator<Item = u64>) -> Self {
        self.ints.extend(values);
        self
    }

    pub fn with_floats(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.floats.extend(values);
        self
    }
}

impl Roller for ScriptedRoller {
    fn chance(&mut self, _percent: f64) -> bool {
        self.chances.pop_front().unwrap_or(self.default_chance)
    }

    fn int_range(&mut self, low: u64, high: u64) -> u64 {
        match self.ints.pop_front() {
            Some(value) => value.clamp(low, high.max(low)),
            None => low,
        }
    }

    fn float_range(&mut self, low: f64, high: f64) -> f64 {
        match self.floats.pop_front() {
            Some(value) => value.clamp(low, high.max(low)),
            None => low,
        }
    }
}

pub const MAX_DICE_COUNT: u32 = 100;
pub const MAX_DICE_FACES: u32 = 1000;

/// Parsed `NdM` dice spec, at most `MAX_DICE_COUNT` dice of `MAX_DICE_FACES` faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dice {
    pub count: u32,
    pub faces: u32,
}

impl Dice {
    pub fn roll(&self, roller: &mut impl Roller) -> u32 {
        (0..self.count)
            .map(|_| roller.int_range(1, self.faces as u64) as u32)
            .sum()
    }

    /// Lowest possible total (every die shows 1).
    pub fn minimum(&self) -> u32 {
        self.count
    }
}

impl FromStr for Dice {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (count, faces) = s
            .trim()
            .to_ascii_lowercase()
            .split_once('d')
            .map(|(c, f)| (c.trim().parse::<u32>(), f.trim().parse::<u32>()))
            .ok_or_else(|| GameError::validation(format!("invalid dice spec: {}", s)))?;
        match (count, faces) {
            (Ok(count), Ok(faces))
                if (1..=MAX_DICE_COUNT).contains(&count) && (1..=MAX_DICE_FACES).contains(&faces) =>
            {
                Ok(Dice { count, faces })
            }
            _ => Err(GameError::validation(format!("invalid dice spec: {}", s))),
        }
    }
}

impl fmt::Display for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.faces)
    }
}

/// `"iron_sword"` becomes `"Iron Sword"`.
pub fn weapon_label(item_key: &str) -> String {
    item_key
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Outcome of one damage roll.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageRoll {
    pub amount: u32,
    pub weapon: String,
}

/// `floor(max(0, power gap) + weapon dice + U[1,3])`.
pub fn roll_damage(attacker: &Combatant, defender: &Combatant, roller: &mut impl Roller) -> DamageRoll {
    let gap = (attacker.effective_power() - defender.effective_power()).max(0.0);
    let (weapon_damage, weapon) = match &attacker.weapon {
        Some(weapon) => (weapon.dice.roll(roller), weapon.name.clone()),
        None => (0, UNARMED.to_string()),
    };
    let base = roller.int_range(1, 3) as u32;
    DamageRoll {
        amount: (gap + weapon_damage as f64 + base as f64).floor() as u32,
        weapon,
    }
}
