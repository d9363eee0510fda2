//! Presentation layer: turns structured engine output into player-facing text.
//!
//! The engine never formats strings for players; everything readable is built
//! here from [`CombatEvent`]s, objectives and rewards.

use std::collections::HashMap;

use crate::game::combat::{CombatEvent, Side};
use crate::game::types::{ObjectiveKind, QuestObjective, Reward};

/// Names of both sides, used to resolve [`Side`] references.
#[derive(Debug, Clone, Copy)]
pub struct Cast<'a> {
    pub attacker: &'a str,
    pub defender: &'a str,
}

impl<'a> Cast<'a> {
    pub fn new(attacker: &'a str, defender: &'a str) -> Self {
        Self { attacker, defender }
    }

    fn name(&self, side: Side) -> &'a str {
        match side {
            Side::Attacker => self.attacker,
            Side::Defender => self.defender,
        }
    }
}

pub fn describe_event(event: &CombatEvent, cast: Cast<'_>) -> String {
    match event {
        CombatEvent::Dodged { actor } => format!(
            "{} dodged {}'s attack!",
            cast.name(actor.other()),
            cast.name(*actor)
        ),
        CombatEvent::Blocked {
            actor,
            incoming,
            reduced_by,
            remaining,
        } => {
            let verb = if *remaining == 0 { "blocked" } else { "partially blocked" };
            format!(
                "{} {} {} damage (reduced by {})!",
                cast.name(actor.other()),
                verb,
                incoming,
                reduced_by
            )
        }
        CombatEvent::Hit {
            actor,
            weapon,
            damage,
            critical,
        } => {
            let verb = if weapon == crate::game::damage::UNARMED { "hits" } else { "strikes" };
            let kind = if *critical { " critical" } else { "" };
            format!(
                "{} {} {} with {} for {}{} damage!",
                cast.name(*actor),
                verb,
                cast.name(actor.other()),
                weapon,
                damage,
                kind
            )
        }
        CombatEvent::Healed { side, amount } => {
            format!("{} healed for {} HP!", cast.name(*side), amount)
        }
        CombatEvent::RoundLimit { rounds } => {
            format!("After {} rounds both fighters are exhausted.", rounds)
        }
        CombatEvent::Defeated { winner, loser } => {
            format!("{} has defeated {}!", cast.name(*winner), cast.name(*loser))
        }
        CombatEvent::Victory { winner, xp } => {
            format!("{} gained {} XP!", cast.name(*winner), xp)
        }
        CombatEvent::AutoHealed { side, amount } => format!(
            "{} automatically healed {} HP for {} gold.",
            cast.name(*side),
            amount,
            amount
        ),
        CombatEvent::Loot { side, item_key } => format!(
            "{} got an ultra rare drop: {}!",
            cast.name(*side),
            crate::game::damage::weapon_label(item_key)
        ),
    }
}

/// Render a whole event stream as log lines.
pub fn render_log(events: &[CombatEvent], cast: Cast<'_>) -> Vec<String> {
    events.iter().map(|event| describe_event(event, cast)).collect()
}

pub fn battle_subject(opponent: &str) -> String {
    format!("Battle Result vs {}", opponent)
}

pub fn battle_body(won: bool, opponent: &str, battle_id: u64) -> String {
    format!(
        "You {} the battle against {}.\n\nView battle log: /battle/{}",
        if won { "won" } else { "lost" },
        opponent,
        battle_id
    )
}

/// Optional text overrides keyed by item/quest/NPC key. Lookups fall back to
/// the raw key.
#[derive(Debug, Clone, Default)]
pub struct Labels {
    names: HashMap<String, String>,
}

impl Labels {
    pub fn with(mut self, key: &str, label: &str) -> Self {
        self.names.insert(key.to_string(), label.to_string());
        self
    }

    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.names.get(key).map(String::as_str).unwrap_or(key)
    }
}

pub fn describe_objective(objective: &QuestObjective, labels: &Labels) -> String {
    let n = objective.required;
    let target = objective.target.as_deref().map(|t| labels.get(t));
    match (objective.kind, target) {
        (ObjectiveKind::KillOtherFaction, _) => format!("Defeat {} players from another faction", n),
        (ObjectiveKind::KillEnemyFaction, _) => format!("Defeat {} players from your enemy faction", n),
        (ObjectiveKind::KillNpc, Some(npc)) => format!("Defeat {} {} times", npc, n),
        (ObjectiveKind::KillNpc, None) => format!("Defeat {} creatures", n),
        (ObjectiveKind::MineResources, _) => format!("Mine {} resources", n),
        (ObjectiveKind::TrainAttribute, Some(attribute)) => format!("Train {} points of {}", n, attribute),
        (ObjectiveKind::TrainAttribute, None) => format!("Train {} attribute points", n),
        (ObjectiveKind::DepositGold, _) => format!("Deposit {} gold in the bank", n),
        (ObjectiveKind::WithdrawGold, _) => format!("Withdraw {} gold from the bank", n),
        (ObjectiveKind::BuyFromStore, Some(store)) => format!("Buy {} items from the {} store", n, store),
        (ObjectiveKind::BuyFromStore, None) => format!("Buy {} items", n),
        (ObjectiveKind::BuySpecificItem, Some(item)) => format!("Buy {} x {}", n, item),
        (ObjectiveKind::BuySpecificItem, None) => format!("Buy {} items", n),
        (ObjectiveKind::EnterLottery, _) => format!("Enter the lottery {} times", n),
    }
}

pub fn describe_reward(reward: &Reward, labels: &Labels) -> String {
    match reward {
        Reward::Gold(amount) => format!("{} gold", amount),
        Reward::Diamonds(amount) => format!("{} diamonds", amount),
        Reward::Xp(amount) => format!("{} XP", amount),
        Reward::Reputation(amount) => format!("{:+} reputation", amount),
        Reward::Item { item_key } => labels.get(item_key).to_string(),
        Reward::Attribute { attribute, amount } => format!("+{} {}", amount, labels.get(attribute)),
    }
}
