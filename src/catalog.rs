//! Static game data: part level tables, missions, build/repair costs, salvage.
//!
//! Everything here is immutable. Runtime state lives in `model::Garage`.

use crate::model::{
    ActiveMission, Bot, Bundle, MissionId, PartKind, ResourceKind, MAX_PART_LEVEL,
};
use crate::model::ResourceKind::{Bolts, Circuits, Magnets, Wires};

pub(crate) const STARTING_RESOURCES: &[(ResourceKind, u32)] =
    &[(Bolts, 12), (Magnets, 4), (Wires, 4), (Circuits, 1)];

pub(crate) const BUILD_COST: &[(ResourceKind, u32)] =
    &[(Bolts, 15), (Magnets, 6), (Wires, 6), (Circuits, 3)];

pub(crate) const REPAIR_COST: &[(ResourceKind, u32)] = &[(Bolts, 3), (Wires, 1)];
pub(crate) const REPAIR_AMOUNT: u8 = 25;

/// Salvage from every lost bot, before part bonuses.
pub(crate) const BASE_SALVAGE: &[(ResourceKind, u32)] = &[(Bolts, 4), (Wires, 2)];

pub(crate) const CHARGE_ENERGY: u8 = 20;
pub(crate) const PLAY_ENERGY_COST: u8 = 10;
pub(crate) const PLAY_HAPPINESS: u8 = 15;

/// Bots at or above this damage stay home.
pub(crate) const MISSION_DAMAGE_LIMIT: u8 = 80;

pub(crate) const BOT_NAMES: &[&str] = &[
    "Sprocket", "Widget", "Gizmo", "Rivet", "Servo", "Pixel", "Dynamo", "Cog", "Ratchet", "Volt",
];

/* -----------------------------
   Parts
------------------------------ */

pub(crate) struct PartLevel {
    /// Percent: damage reduction, reward multiplier or time reduction.
    pub(crate) effect: u32,
    /// Price of reaching this level from the one below.
    pub(crate) cost: &'static [(ResourceKind, u32)],
}

pub(crate) struct PartDef {
    pub(crate) effect_label: &'static str,
    pub(crate) levels: [PartLevel; MAX_PART_LEVEL as usize + 1],
    /// Salvage granted per installed level when the bot is lost.
    pub(crate) salvage_per_level: (ResourceKind, u32),
}

static CHASSIS: PartDef = PartDef {
    effect_label: "damage reduction",
    levels: [
        PartLevel { effect: 0, cost: &[] },
        PartLevel {
            effect: 20,
            cost: &[(Bolts, 6), (Magnets, 2)],
        },
        PartLevel {
            effect: 40,
            cost: &[(Bolts, 12), (Magnets, 4), (Wires, 2)],
        },
        PartLevel {
            effect: 60,
            cost: &[(Bolts, 20), (Magnets, 8), (Circuits, 2)],
        },
    ],
    salvage_per_level: (Bolts, 3),
};

static SENSORS: PartDef = PartDef {
    effect_label: "reward bonus",
    levels: [
        PartLevel {
            effect: 100,
            cost: &[],
        },
        PartLevel {
            effect: 125,
            cost: &[(Wires, 4), (Circuits, 1)],
        },
        PartLevel {
            effect: 150,
            cost: &[(Wires, 6), (Magnets, 2), (Circuits, 2)],
        },
        PartLevel {
            effect: 200,
            cost: &[(Wires, 10), (Magnets, 4), (Circuits, 4)],
        },
    ],
    salvage_per_level: (Circuits, 1),
};

static WHEELS: PartDef = PartDef {
    effect_label: "faster missions",
    levels: [
        PartLevel { effect: 0, cost: &[] },
        PartLevel {
            effect: 15,
            cost: &[(Bolts, 4), (Wires, 2)],
        },
        PartLevel {
            effect: 30,
            cost: &[(Bolts, 8), (Wires, 4), (Magnets, 2)],
        },
        PartLevel {
            effect: 50,
            cost: &[(Bolts, 14), (Wires, 6), (Circuits, 2)],
        },
    ],
    salvage_per_level: (Wires, 2),
};

pub(crate) fn part(kind: PartKind) -> &'static PartDef {
    match kind {
        PartKind::Chassis => &CHASSIS,
        PartKind::Sensors => &SENSORS,
        PartKind::Wheels => &WHEELS,
    }
}

pub(crate) fn part_effect(kind: PartKind, level: u8) -> u32 {
    let def = part(kind);
    let idx = (level.min(MAX_PART_LEVEL)) as usize;
    def.levels[idx].effect
}

/// Cost of going from `level` to `level + 1`; `None` at max level.
pub(crate) fn upgrade_cost(kind: PartKind, level: u8) -> Option<Bundle> {
    if level >= MAX_PART_LEVEL {
        return None;
    }
    Some(Bundle::of(part(kind).levels[level as usize + 1].cost))
}

/* -----------------------------
   Missions
------------------------------ */

pub(crate) struct MissionDef {
    pub(crate) id: MissionId,
    pub(crate) name: &'static str,
    pub(crate) energy_cost: u8,
    pub(crate) happiness_cost: u8,
    pub(crate) duration_secs: u32,
    pub(crate) reward: &'static [(ResourceKind, u32)],
    pub(crate) min_energy: u8,
    pub(crate) min_parts: &'static [(PartKind, u8)],
    pub(crate) base_damage: u8,
}

// min_energy stays above energy_cost so a mission can never drain a bot to zero.
pub(crate) static MISSIONS: [MissionDef; 4] = [
    MissionDef {
        id: MissionId::ScrapyardSweep,
        name: "Scrapyard Sweep",
        energy_cost: 15,
        happiness_cost: 5,
        duration_secs: 10,
        reward: &[(Bolts, 5), (Wires, 2)],
        min_energy: 20,
        min_parts: &[],
        base_damage: 10,
    },
    MissionDef {
        id: MissionId::MagnetMine,
        name: "Magnet Mine",
        energy_cost: 25,
        happiness_cost: 10,
        duration_secs: 20,
        reward: &[(Magnets, 4), (Bolts, 3)],
        min_energy: 35,
        min_parts: &[],
        base_damage: 20,
    },
    MissionDef {
        id: MissionId::CircuitSalvage,
        name: "Circuit Salvage",
        energy_cost: 35,
        happiness_cost: 15,
        duration_secs: 30,
        reward: &[(Circuits, 2), (Wires, 4)],
        min_energy: 50,
        min_parts: &[(PartKind::Chassis, 1)],
        base_damage: 30,
    },
    MissionDef {
        id: MissionId::DeepCoreRun,
        name: "Deep Core Run",
        energy_cost: 50,
        happiness_cost: 25,
        duration_secs: 45,
        reward: &[(Circuits, 4), (Magnets, 5), (Bolts, 8)],
        min_energy: 70,
        min_parts: &[(PartKind::Chassis, 2), (PartKind::Wheels, 1)],
        base_damage: 45,
    },
];

pub(crate) fn mission(id: MissionId) -> &'static MissionDef {
    match id {
        MissionId::ScrapyardSweep => &MISSIONS[0],
        MissionId::MagnetMine => &MISSIONS[1],
        MissionId::CircuitSalvage => &MISSIONS[2],
        MissionId::DeepCoreRun => &MISSIONS[3],
    }
}

/// Fixes duration, reward and damage for `bot` launching `def` right now.
pub(crate) fn plan_mission(def: &MissionDef, bot: &Bot) -> ActiveMission {
    let wheels = part_effect(PartKind::Wheels, bot.part_level(PartKind::Wheels));
    let sensors = part_effect(PartKind::Sensors, bot.part_level(PartKind::Sensors));
    let chassis = part_effect(PartKind::Chassis, bot.part_level(PartKind::Chassis));

    let base_ms = def.duration_secs as u64 * 1000;
    let total_ms = (base_ms * (100 - wheels.min(100)) as u64 / 100).max(1000);
    let damage = (def.base_damage as u32 * (100 - chassis.min(100)) / 100) as u8;

    ActiveMission {
        mission: def.id,
        total_ms,
        remaining_ms: total_ms,
        reward: Bundle::of(def.reward).scaled(sensors),
        damage,
    }
}

pub(crate) fn salvage_for(bot: &Bot) -> Bundle {
    let mut out = Bundle::of(BASE_SALVAGE);
    for kind in PartKind::ALL {
        let (res, per_level) = part(kind).salvage_per_level;
        out.add(res, per_level * bot.part_level(kind) as u32);
    }
    out
}
