//! Combat resolver: the turn loop between two [`Combatant`]s.
//!
//! A [`Fight`] moves through `AwaitingTurn(side)` states until it reaches
//! `Concluded`. It only touches the two snapshots' health and emits structured
//! [`CombatEvent`]s; persistence and consequences belong to settlement, text to
//! the narration layer.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::game::damage::{roll_damage, Roller};
use crate::game::stats::{self, Combatant};

pub const DEFAULT_MAX_ROUNDS: u32 = 200;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }
}

/// Something that happened during a fight. Sides are relative to the fight's
/// initiator, never to whoever acts in a given turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CombatEvent {
    /// `actor`'s swing was dodged by the other side.
    Dodged { actor: Side },
    /// The other side of `actor` blocked some or all of the incoming damage.
    Blocked {
        actor: Side,
        incoming: u32,
        reduced_by: u32,
        remaining: u32,
    },
    Hit {
        actor: Side,
        weapon: String,
        damage: u32,
        critical: bool,
    },
    Healed { side: Side, amount: u32 },
    /// The round cap was reached; the fight was decided on remaining health.
    RoundLimit { rounds: u32 },
    Defeated { winner: Side, loser: Side },
    /// Appended by settlement once XP has been rolled.
    Victory { winner: Side, xp: u64 },
    /// A surviving player paid gold to patch up after an NPC fight.
    AutoHealed { side: Side, amount: u32 },
    /// Item dropped to `side` after an NPC fight.
    Loot { side: Side, item_key: String },
}

/// Which optional mechanics a fight uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatRules {
    /// Dodge, crit, block and heal-on-hit rolls.
    pub specials: bool,
    /// When false the side with the higher dexterity opens (ties favour the attacker).
    pub attacker_always_first: bool,
    pub max_rounds: u32,
}

impl CombatRules {
    /// Player-versus-player rules.
    pub fn pvp(max_rounds: u32) -> Self {
        Self {
            specials: true,
            attacker_always_first: false,
            max_rounds,
        }
    }

    /// Straight exchange of blows, player first; used against NPCs.
    pub fn plain(max_rounds: u32) -> Self {
        Self {
            specials: false,
            attacker_always_first: true,
            max_rounds,
        }
    }
}

impl Default for CombatRules {
    fn default() -> Self {
        Self::pvp(DEFAULT_MAX_ROUNDS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FightState {
    AwaitingTurn(Side),
    Concluded { winner: Side },
}

/// Result of a finished fight.
#[derive(Debug, Clone, PartialEq)]
pub struct FightOutcome {
    pub attacker: Combatant,
    pub defender: Combatant,
    pub winner: Side,
    pub rounds: u32,
    pub events: Vec<CombatEvent>,
    pub hit_round_cap: bool,
}

impl FightOutcome {
    pub fn winner(&self) -> &Combatant {
        self.side(self.winner)
    }

    pub fn loser(&self) -> &Combatant {
        self.side(self.winner.other())
    }

    pub fn side(&self, side: Side) -> &Combatant {
        match side {
            Side::Attacker => &self.attacker,
            Side::Defender => &self.defender,
        }
    }
}

pub struct Fight {
    attacker: Combatant,
    defender: Combatant,
    rules: CombatRules,
    state: FightState,
    rounds: u32,
    hit_round_cap: bool,
    events: Vec<CombatEvent>,
}

impl Fight {
    pub fn new(attacker: Combatant, defender: Combatant, rules: CombatRules) -> Self {
        let opener = if rules.attacker_always_first
            || attacker.attributes.dexterity >= defender.attributes.dexterity
        {
            Side::Attacker
        } else {
            Side::Defender
        };
        Self {
            attacker,
            defender,
            rules,
            state: FightState::AwaitingTurn(opener),
            rounds: 0,
            hit_round_cap: false,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> FightState {
        self.state
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn events(&self) -> &[CombatEvent] {
        &self.events
    }

    pub fn combatant(&self, side: Side) -> &Combatant {
        match side {
            Side::Attacker => &self.attacker,
            Side::Defender => &self.defender,
        }
    }

    /// Split into (acting, receiving) snapshots.
    fn pair_mut(&mut self, actor: Side) -> (&mut Combatant, &mut Combatant) {
        match actor {
            Side::Attacker => (&mut self.attacker, &mut self.defender),
            Side::Defender => (&mut self.defender, &mut self.attacker),
        }
    }

    /// Resolve a single turn. Calling this on a concluded fight is a no-op.
    pub fn step(&mut self, roller: &mut impl Roller) -> FightState {
        let FightState::AwaitingTurn(actor_side) = self.state else {
            return self.state;
        };
        let target_side = actor_side.other();
        let specials = self.rules.specials;
        self.rounds += 1;

        let mut turn_events = Vec::new();
        let (actor, target) = self.pair_mut(actor_side);

        if specials && roller.chance(stats::dodge_chance(actor, target)) {
            turn_events.push(CombatEvent::Dodged { actor: actor_side });
        } else {
            let roll = roll_damage(actor, target, roller);
            let mut damage = roll.amount;

            let critical = specials && roller.chance(stats::crit_chance(actor, target));
            if critical {
                damage = (damage as f64 * 1.5).floor() as u32;
            }

            if specials && roller.chance(stats::block_chance(actor, target)) {
                let reduced_by = stats::block_amount(target);
                let remaining = damage.saturating_sub(reduced_by);
                turn_events.push(CombatEvent::Blocked {
                    actor: actor_side,
                    incoming: damage,
                    reduced_by,
                    remaining,
                });
                damage = remaining;
            }

            if damage > 0 {
                target.health = target.health.saturating_sub(damage);
                turn_events.push(CombatEvent::Hit {
                    actor: actor_side,
                    weapon: roll.weapon,
                    damage,
                    critical,
                });

                if specials && roller.chance(stats::heal_chance(target, actor)) {
                    let amount = (target.max_health as f64 * stats::heal_fraction(target, actor)).floor() as u32;
                    target.health = (target.health + amount).min(target.max_health);
                    turn_events.push(CombatEvent::Healed {
                        side: target_side,
                        amount,
                    });
                }
            }
        }

        let target_down = target.is_down();
        debug!(
            "round {}: {:?} acts, {} hp / {} hp",
            self.rounds, actor_side, self.attacker.health, self.defender.health
        );
        self.events.extend(turn_events);

        if target_down {
            self.conclude(actor_side);
        } else if self.rounds >= self.rules.max_rounds {
            self.decide_on_health();
        } else {
            self.state = FightState::AwaitingTurn(target_side);
        }
        self.state
    }

    /// Run turns until the fight concludes.
    pub fn run(mut self, roller: &mut impl Roller) -> FightOutcome {
        let winner = loop {
            if let FightState::Concluded { winner } = self.step(roller) {
                break winner;
            }
        };
        FightOutcome {
            attacker: self.attacker,
            defender: self.defender,
            winner,
            rounds: self.rounds,
            events: self.events,
            hit_round_cap: self.hit_round_cap,
        }
    }

    fn conclude(&mut self, winner: Side) {
        self.events.push(CombatEvent::Defeated {
            winner,
            loser: winner.other(),
        });
        self.state = FightState::Concluded { winner };
    }

    /// Lower remaining health fraction loses; a tie goes against the attacker.
    fn decide_on_health(&mut self) {
        let loser = if self.defender.health_fraction() < self.attacker.health_fraction() {
            Side::Defender
        } else {
            Side::Attacker
        };
        match loser {
            Side::Attacker => self.attacker.health = 0,
            Side::Defender => self.defender.health = 0,
        }
        self.hit_round_cap = true;
        self.events.push(CombatEvent::RoundLimit {
            rounds: self.rounds,
        });
        self.conclude(loser.other());
    }
}

/// Run a fight to completion under `rules`.
pub fn resolve(
    attacker: Combatant,
    defender: Combatant,
    rules: CombatRules,
    roller: &mut impl Roller,
) -> FightOutcome {
    Fight::new(attacker, defender, rules).run(roller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::damage::{RandRoller, ScriptedRoller};
    use crate::game::factions::Faction;
    use crate::game::types::Attributes;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fighter(faction: Faction, attributes: Attributes, health: u32) -> Combatant {
        Combatant {
            character_id: Some(1),
            name: faction.key().to_string(),
            faction,
            level: 1,
            attributes,
            health,
            max_health: health,
            defense: 0,
            weapon: None,
        }
    }

    #[test]
    fn higher_dexterity_opens() {
        let quick = fighter(Faction::Veylan, Attributes::new(20.0, 10.0, 10.0, 10.0), 30);
        let slow = fighter(Faction::Urghan, Attributes::default(), 30);
        let fight = Fight::new(slow.clone(), quick.clone(), CombatRules::default());
        assert_eq!(fight.state(), FightState::AwaitingTurn(Side::Defender));
        let fight = Fight::new(quick, slow, CombatRules::default());
        assert_eq!(fight.state(), FightState::AwaitingTurn(Side::Attacker));
    }

    #[test]
    fn dodge_flips_turn_without_damage() {
        let a = fighter(Faction::Veylan, Attributes::default(), 30);
        let b = fighter(Faction::Urghan, Attributes::default(), 30);
        let mut fight = Fight::new(a, b, CombatRules::default());
        let mut roller = ScriptedRoller::all_fail().with_chances([true]);
        let state = fight.step(&mut roller);
        assert_eq!(state, FightState::AwaitingTurn(Side::Defender));
        assert_eq!(fight.events(), &[CombatEvent::Dodged { actor: Side::Attacker }]);
        assert_eq!(fight.combatant(Side::Defender).health, 30);
    }

    #[test]
    fn full_block_logs_and_skips_hit() {
        let a = fighter(Faction::Veylan, Attributes::default(), 30);
        let b = fighter(Faction::Urghan, Attributes::default(), 30);
        let mut fight = Fight::new(a, b, CombatRules::default());
        // dodge fails, crit fails, block succeeds
        let mut roller = ScriptedRoller::all_fail().with_chances([false, false, true]);
        fight.step(&mut roller);
        match &fight.events()[0] {
            CombatEvent::Blocked { remaining, incoming, .. } => {
                assert_eq!(*incoming, 1);
                assert_eq!(*remaining, 0);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(fight.events().len(), 1);
        assert_eq!(fight.combatant(Side::Defender).health, 30);
    }

    #[test]
    fn heal_restores_part_of_max_health() {
        let a = fighter(Faction::Veylan, Attributes::new(10.0, 30.0, 10.0, 10.0), 100);
        let b = fighter(Faction::Urghan, Attributes::default(), 100);
        let mut fight = Fight::new(a, b, CombatRules::default());
        // dodge, crit, block fail; heal succeeds
        let mut roller = ScriptedRoller::all_fail().with_chances([false, false, false, true]);
        fight.step(&mut roller);
        let defender = fight.combatant(Side::Defender);
        let damage = match &fight.events()[0] {
            CombatEvent::Hit { damage, .. } => *damage,
            other => panic!("unexpected event {:?}", other),
        };
        assert_eq!(defender.health, (100 - damage + 10).min(100));
        assert_eq!(fight.events()[1], CombatEvent::Healed { side: Side::Defender, amount: 10 });
    }

    #[test]
    fn crit_multiplies_damage() {
        let a = fighter(Faction::Aureen, Attributes::new(10.0, 10.0, 10.0, 10.0), 100);
        let b = fighter(Faction::Urghan, Attributes::default(), 100);
        let mut fight = Fight::new(a, b, CombatRules::default());
        let mut roller = ScriptedRoller::all_fail().with_chances([false, true]).with_ints([3]);
        fight.step(&mut roller);
        assert_eq!(
            fight.events()[0],
            CombatEvent::Hit {
                actor: Side::Attacker,
                weapon: "bare hands".into(),
                damage: 4,
                critical: true
            }
        );
    }

    #[test]
    fn fight_ends_with_exactly_one_side_down() {
        let mut roller = RandRoller(StdRng::seed_from_u64(42));
        for seed in 0..50u64 {
            let a = fighter(Faction::ALL[(seed % 4) as usize], Attributes::uniform(10.0 + seed as f64), 40);
            let b = fighter(Faction::ALL[((seed + 1) % 4) as usize], Attributes::uniform(25.0), 40);
            let outcome = resolve(a, b, CombatRules::default(), &mut roller);
            assert_eq!(outcome.loser().health, 0);
            assert!(outcome.winner().health > 0);
            assert!(matches!(outcome.events.last(), Some(CombatEvent::Defeated { .. })));
        }
    }

    #[test]
    fn round_cap_decides_on_health_fraction() {
        // Nobody can land a hit: every swing is dodged.
        let a = fighter(Faction::Veylan, Attributes::default(), 40);
        let mut b = fighter(Faction::Urghan, Attributes::default(), 40);
        b.health = 30;
        let rules = CombatRules::pvp(10);
        let outcome = resolve(a, b, rules, &mut ScriptedRoller::all_succeed());
        assert!(outcome.hit_round_cap);
        assert_eq!(outcome.rounds, 10);
        assert_eq!(outcome.winner, Side::Attacker);
        assert_eq!(outcome.defender.health, 0);
        assert!(outcome.attacker.health > 0);
    }

    #[test]
    fn round_cap_tie_goes_against_attacker() {
        let a = fighter(Faction::Veylan, Attributes::default(), 40);
        let b = fighter(Faction::Urghan, Attributes::default(), 40);
        let outcome = resolve(a, b, CombatRules::pvp(4), &mut ScriptedRoller::all_succeed());
        assert_eq!(outcome.winner, Side::Defender);
        assert_eq!(outcome.attacker.health, 0);
    }

    #[test]
    fn plain_rules_skip_special_rolls() {
        let a = fighter(Faction::Veylan, Attributes::default(), 20);
        let b = fighter(Faction::Urghan, Attributes::new(30.0, 10.0, 10.0, 10.0), 3);
        // Every chance would succeed, but plain rules never roll them.
        let outcome = resolve(a, b, CombatRules::plain(200), &mut ScriptedRoller::all_succeed());
        assert_eq!(outcome.winner, Side::Attacker);
        assert_eq!(outcome.rounds, 5);
        assert_eq!(outcome.attacker.health, 4);
        assert!(outcome
            .events
            .iter()
            .all(|e| !matches!(e, CombatEvent::Dodged { .. } | CombatEvent::Healed { .. })));
    }
}
