//! Starter catalog inserted into an empty store: shop items, quest templates
//! and battlefield NPCs.

use crate::game::factions::{Attribute, Faction};
use crate::game::types::{Attributes, ItemRecord, NpcRecord, ObjectiveKind, QuestRecord, Reward};

pub fn starter_items() -> Vec<ItemRecord> {
    vec![
        ItemRecord::weapon("rusty_dagger", "1d4", 50),
        ItemRecord::weapon("short_sword", "1d6", 150).with_min_level(2),
        ItemRecord::weapon("war_axe", "2d6", 600)
            .with_min_level(5)
            .with_requirement(Attribute::Strength, 15.0),
        ItemRecord::weapon("runed_staff", "2d8", 25)
            .with_min_level(8)
            .with_requirement(Attribute::Intelligence, 20.0)
            .priced_in_diamonds(),
        ItemRecord::armor("leather_cap", "head", 1, 5, 60),
        ItemRecord::armor("padded_vest", "body", 2, 10, 120),
        ItemRecord::armor("iron_greaves", "legs", 3, 10, 300).with_min_level(4),
        ItemRecord::armor("tower_shield", "shield", 5, 15, 800)
            .with_min_level(6)
            .with_requirement(Attribute::Strength, 18.0),
        ItemRecord::magic("healing_draught", &[("health", 50), ("resource", 20)], 40),
        ItemRecord::magic("phoenix_feather", &[("revives", 1), ("diamonds", 1)], 3).priced_in_diamonds(),
        ItemRecord {
            npc_only: true,
            ..ItemRecord::weapon("wolfsbane_fang", "3d6", 0)
        },
    ]
}

pub fn starter_quests() -> Vec<QuestRecord> {
    vec![
        QuestRecord::new("first_blood")
            .with_objective(ObjectiveKind::KillOtherFaction, None, 1)
            .with_reward(Reward::Gold(200))
            .with_reward(Reward::Xp(50))
            .unique(),
        QuestRecord::new("war_of_the_cycle")
            .with_objective(ObjectiveKind::KillEnemyFaction, None, 3)
            .with_reward(Reward::Gold(500))
            .with_reward(Reward::Reputation(2))
            .with_spawn_weight(0.5),
        QuestRecord::new("deep_shafts")
            .with_objective(ObjectiveKind::MineResources, None, 20)
            .with_reward(Reward::Diamonds(2))
            .with_spawn_weight(2.0),
        QuestRecord::new("scholars_path")
            .with_objective(ObjectiveKind::TrainAttribute, Some("intelligence"), 2)
            .with_reward(Reward::Attribute {
                attribute: "intelligence".into(),
                amount: 0.5,
            }),
        QuestRecord::new("prudent_saver")
            .with_objective(ObjectiveKind::DepositGold, None, 1000)
            .with_reward(Reward::Gold(100)),
        QuestRecord::new("wolf_hunt")
            .with_objective(ObjectiveKind::KillNpc, Some("grey_wolf"), 3)
            .with_reward(Reward::Xp(120))
            .with_reward(Reward::Item {
                item_key: "leather_cap".into(),
            }),
        QuestRecord::new("outfitter")
            .with_objective(ObjectiveKind::BuyFromStore, Some("armor"), 1)
            .with_objective(ObjectiveKind::BuySpecificItem, Some("short_sword"), 1)
            .with_reward(Reward::Gold(75)),
    ]
}

pub fn starter_npcs() -> Vec<NpcRecord> {
    let mut wolf = NpcRecord::new("grey_wolf", "Grey Wolf", Faction::Veylan, 2, 40);
    wolf.attributes = Attributes::new(14.0, 10.0, 6.0, 6.0);
    wolf.weapon = Some("wolfsbane_fang".into());
    wolf.xp_range = (15, 40);
    wolf.gold_range = (10, 30);
    wolf.reputation = 1;

    let mut brute = NpcRecord::new("tunnel_brute", "Tunnel Brute", Faction::Urghan, 6, 90);
    brute.attributes = Attributes::new(10.0, 24.0, 8.0, 10.0);
    brute.weapon = Some("war_axe".into());
    brute.armor = Some("padded_vest".into());
    brute.xp_range = (60, 120);
    brute.gold_range = (40, 90);
    brute.reputation = 2;

    vec![wolf, brute]
}
