use crate::error::ActionError;
use crate::sim::TickReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub(crate) const SAVE_VERSION: u32 = 1;
pub(crate) const GAME_VERSION: u32 = 1;

pub(crate) const STAT_MAX: u8 = 100;
pub(crate) const MAX_BOTS: usize = 4;
pub(crate) const MAX_PART_LEVEL: u8 = 3;

/// Adds `delta` to a stat and clamps the result to `[0, STAT_MAX]`.
pub(crate) fn adjust(value: u8, delta: i32) -> u8 {
    (value as i32 + delta).clamp(0, STAT_MAX as i32) as u8
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) enum Scene {
    #[default]
    Main,
    Missions,
    Parts,
    Help,
    Recap(CatchupSummary),
}

/* -----------------------------
   Resources
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub(crate) enum ResourceKind {
    Bolts,
    Magnets,
    Wires,
    Circuits,
}

impl ResourceKind {
    pub(crate) const ALL: [ResourceKind; 4] = [
        ResourceKind::Bolts,
        ResourceKind::Magnets,
        ResourceKind::Wires,
        ResourceKind::Circuits,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            ResourceKind::Bolts => "bolts",
            ResourceKind::Magnets => "magnets",
            ResourceKind::Wires => "wires",
            ResourceKind::Circuits => "circuits",
        }
    }
}

/// A bag of resource amounts. Serves as inventory, cost, reward and salvage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Bundle(BTreeMap<ResourceKind, u32>);

impl Bundle {
    pub(crate) fn of(items: &[(ResourceKind, u32)]) -> Self {
        let mut b = Bundle::default();
        for &(kind, amount) in items {
            b.add(kind, amount);
        }
        b
    }

    pub(crate) fn get(&self, kind: ResourceKind) -> u32 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub(crate) fn add(&mut self, kind: ResourceKind, amount: u32) {
        if amount == 0 {
            return;
        }
        let slot = self.0.entry(kind).or_insert(0);
        *slot = slot.saturating_add(amount);
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v)).filter(|(_, v)| *v > 0)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.values().all(|v| *v == 0)
    }

    pub(crate) fn covers(&self, cost: &Bundle) -> bool {
        cost.iter().all(|(kind, amount)| self.get(kind) >= amount)
    }

    /// What is missing from `self` to pay `cost`.
    pub(crate) fn shortfall(&self, cost: &Bundle) -> Bundle {
        let mut missing = Bundle::default();
        for (kind, amount) in cost.iter() {
            missing.add(kind, amount.saturating_sub(self.get(kind)));
        }
        missing
    }

    /// Pays `cost` in full or not at all.
    pub(crate) fn spend(&mut self, cost: &Bundle) -> Result<(), ActionError> {
        if !self.covers(cost) {
            return Err(ActionError::NotEnoughResources(self.shortfall(cost)));
        }
        for (kind, amount) in cost.iter() {
            if let Some(slot) = self.0.get_mut(&kind) {
                *slot -= amount;
            }
        }
        self.0.retain(|_, v| *v > 0);
        Ok(())
    }

    pub(crate) fn grant(&mut self, other: &Bundle) {
        for (kind, amount) in other.iter() {
            self.add(kind, amount);
        }
    }

    /// Scales every amount by `percent` / 100, rounding down.
    pub(crate) fn scaled(&self, percent: u32) -> Bundle {
        let mut out = Bundle::default();
        for (kind, amount) in self.iter() {
            let v = (amount as u64 * percent as u64 / 100).min(u32::MAX as u64) as u32;
            out.add(kind, v);
        }
        out
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("nothing");
        }
        let mut first = true;
        for (kind, amount) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", amount, kind.label())?;
            first = false;
        }
        Ok(())
    }
}

/* -----------------------------
   Parts and missions
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub(crate) enum PartKind {
    Chassis,
    Sensors,
    Wheels,
}

impl PartKind {
    pub(crate) const ALL: [PartKind; 3] = [PartKind::Chassis, PartKind::Sensors, PartKind::Wheels];

    pub(crate) fn name(self) -> &'static str {
        match self {
            PartKind::Chassis => "Chassis",
            PartKind::Sensors => "Sensors",
            PartKind::Wheels => "Wheels",
        }
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub(crate) enum MissionId {
    ScrapyardSweep,
    MagnetMine,
    CircuitSalvage,
    DeepCoreRun,
}

impl MissionId {
    pub(crate) const ALL: [MissionId; 4] = [
        MissionId::ScrapyardSweep,
        MissionId::MagnetMine,
        MissionId::CircuitSalvage,
        MissionId::DeepCoreRun,
    ];
}

/// A mission in flight. Reward and damage are fixed at launch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ActiveMission {
    pub(crate) mission: MissionId,
    pub(crate) total_ms: u64,
    pub(crate) remaining_ms: u64,
    pub(crate) reward: Bundle,
    pub(crate) damage: u8,
}

impl ActiveMission {
    pub(crate) fn remaining_secs(&self) -> u64 {
        self.remaining_ms.div_ceil(1000)
    }

    /// Elapsed fraction in [0,1].
    pub(crate) fn progress(&self) -> f32 {
        if self.total_ms == 0 {
            return 1.0;
        }
        1.0 - (self.remaining_ms as f32 / self.total_ms as f32).clamp(0.0, 1.0)
    }
}

/* -----------------------------
   Bots
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub(crate) struct BotId(pub(crate) u32);

impl fmt::Display for BotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BotMood {
    Away,
    Tired,
    Damaged,
    Happy,
    Normal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Bot {
    pub(crate) id: BotId,
    pub(crate) name: String,
    pub(crate) design: usize,
    pub(crate) energy: u8,
    pub(crate) happiness: u8,
    pub(crate) damage: u8,
    pub(crate) parts: BTreeMap<PartKind, u8>,
    pub(crate) mission: Option<ActiveMission>,
    #[serde(default)]
    pub(crate) energy_drain_ms: u64,
    #[serde(default)]
    pub(crate) happiness_drain_ms: u64,
}

impl Bot {
    pub(crate) fn new(id: BotId, name: String, design: usize) -> Self {
        Self {
            id,
            name,
            design,
            energy: STAT_MAX,
            happiness: 80,
            damage: 0,
            parts: PartKind::ALL.iter().map(|k| (*k, 0)).collect(),
            mission: None,
            energy_drain_ms: 0,
            happiness_drain_ms: 0,
        }
    }

    pub(crate) fn part_level(&self, kind: PartKind) -> u8 {
        self.parts.get(&kind).copied().unwrap_or(0)
    }

    pub(crate) fn on_mission(&self) -> bool {
        self.mission.is_some()
    }

    pub(crate) fn mood(&self) -> BotMood {
        if self.on_mission() {
            return BotMood::Away;
        }
        if self.energy < 30 {
            return BotMood::Tired;
        }
        if self.damage >= 50 {
            return BotMood::Damaged;
        }
        if self.happiness > 80 {
            return BotMood::Happy;
        }
        BotMood::Normal
    }
}

/* -----------------------------
   The garage store
------------------------------ */

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct RngState {
    pub(crate) seed: u64,
    pub(crate) event_counter: u64,
}

impl RngState {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            seed,
            event_counter: 0,
        }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        // Counter-based SplitMix64.
        let mut z = self
            .seed
            .wrapping_add(self.event_counter.wrapping_mul(0x9E3779B97F4A7C15));
        self.event_counter = self.event_counter.wrapping_add(1);

        z = z.wrapping_add(0x9E3779B97F4A7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    /// Uniform-ish index in `0..len`; `len` must be non-zero.
    pub(crate) fn below(&mut self, len: usize) -> usize {
        (self.next_u64() % len.max(1) as u64) as usize
    }
}

/// All companions and the shared inventory, keyed by bot id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Garage {
    pub(crate) bots: BTreeMap<BotId, Bot>,
    pub(crate) resources: Bundle,
    pub(crate) next_id: u32,
    pub(crate) selected: Option<BotId>,
    pub(crate) status: String,
    pub(crate) clock_ticks: u64,
    pub(crate) rng: RngState,
}

impl Garage {
    /// An empty garage with no bots and no resources.
    pub(crate) fn empty(seed: u64) -> Self {
        Self {
            bots: BTreeMap::new(),
            resources: Bundle::default(),
            next_id: 1,
            selected: None,
            status: String::new(),
            clock_ticks: 0,
            rng: RngState::new(seed),
        }
    }

    /// A fresh game: starting inventory and one starter bot.
    pub(crate) fn new(seed: u64) -> Self {
        let mut g = Self::empty(seed);
        g.resources = Bundle::of(crate::catalog::STARTING_RESOURCES);
        let id = g.spawn_bot();
        g.selected = Some(id);
        g.status = "Welcome to the garage! Press H for help.".to_string();
        g
    }

    pub(crate) fn selected_bot(&self) -> Option<&Bot> {
        self.selected.and_then(|id| self.bots.get(&id))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Rules {
    pub(crate) tick_ms: u64,
    /// Idle bots lose 1 energy per interval; 0 disables.
    pub(crate) energy_drain_secs: u32,
    /// Idle bots lose 1 happiness per interval; 0 disables.
    pub(crate) happiness_drain_secs: u32,
    /// Damage at or above this halves the energy drain interval.
    pub(crate) heavy_damage: u8,
    pub(crate) catchup_max_secs: i64,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            energy_drain_secs: 45,
            happiness_drain_secs: 30,
            heavy_damage: 50,
            catchup_max_secs: 24 * 3600,
        }
    }
}

impl Rules {
    /// While the app is closed bots sit powered down: only mission timers run.
    pub(crate) fn offline(&self) -> Self {
        Self {
            energy_drain_secs: 0,
            happiness_drain_secs: 0,
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct GameState {
    pub(crate) version: u32,
    pub(crate) garage: Garage,
    #[serde(skip)]
    pub(crate) scene: Scene,
    #[serde(skip)]
    pub(crate) menu_cursor: usize,
}

impl GameState {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            version: GAME_VERSION,
            garage: Garage::new(seed),
            scene: Scene::Main,
            menu_cursor: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SaveFile {
    pub(crate) version: u32,
    pub(crate) last_seen_utc: DateTime<Utc>,
    pub(crate) state: GameState,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct CatchupSummary {
    /// Time away after clamping to `Rules::catchup_max_secs`.
    pub(crate) away_secs: i64,
    pub(crate) ticks_simulated: u64,
    pub(crate) missions_completed: u32,
    pub(crate) resources_gained: Bundle,
}

impl CatchupSummary {
    pub(crate) fn has_anything(&self) -> bool {
        self.missions_completed > 0
    }

    pub(crate) fn record(&mut self, report: &TickReport) {
        self.ticks_simulated += 1;
        for done in &report.completed {
            self.missions_completed += 1;
            self.resources_gained.grant(&done.reward);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_clamps_both_ends() {
        assert_eq!(adjust(95, 20), 100);
        assert_eq!(adjust(5, -20), 0);
        assert_eq!(adjust(40, 15), 55);
    }

    #[test]
    fn spend_is_all_or_nothing() {
        let mut inv = Bundle::of(&[(ResourceKind::Bolts, 5), (ResourceKind::Wires, 1)]);
        let cost = Bundle::of(&[(ResourceKind::Bolts, 3), (ResourceKind::Wires, 2)]);
        let err = inv.spend(&cost).unwrap_err();
        assert_eq!(
            err,
            ActionError::NotEnoughResources(Bundle::of(&[(ResourceKind::Wires, 1)]))
        );
        assert_eq!(inv.get(ResourceKind::Bolts), 5);
        assert_eq!(inv.get(ResourceKind::Wires), 1);

        inv.add(ResourceKind::Wires, 1);
        inv.spend(&cost).unwrap();
        assert_eq!(inv.get(ResourceKind::Bolts), 2);
        assert_eq!(inv.get(ResourceKind::Wires), 0);
    }

    #[test]
    fn scaled_rounds_down() {
        let b = Bundle::of(&[(ResourceKind::Bolts, 3), (ResourceKind::Circuits, 1)]);
        let s = b.scaled(150);
        assert_eq!(s.get(ResourceKind::Bolts), 4);
        assert_eq!(s.get(ResourceKind::Circuits), 1);
        assert_eq!(b.scaled(100), b);
    }

    #[test]
    fn bundle_display() {
        assert_eq!(Bundle::default().to_string(), "nothing");
        let b = Bundle::of(&[(ResourceKind::Wires, 2), (ResourceKind::Bolts, 1)]);
        assert_eq!(b.to_string(), "1 bolts, 2 wires");
    }

    #[test]
    fn mood_follows_stats() {
        let mut bot = Bot::new(BotId(1), "Tester".into(), 0);
        assert_eq!(bot.mood(), BotMood::Normal);
        bot.happiness = 90;
        assert_eq!(bot.mood(), BotMood::Happy);
        bot.damage = 60;
        assert_eq!(bot.mood(), BotMood::Damaged);
        bot.energy = 10;
        assert_eq!(bot.mood(), BotMood::Tired);
    }

    #[test]
    fn active_mission_seconds_round_up() {
        let m = ActiveMission {
            mission: MissionId::ScrapyardSweep,
            total_ms: 10_000,
            remaining_ms: 1_500,
            reward: Bundle::default(),
            damage: 0,
        };
        assert_eq!(m.remaining_secs(), 2);
        assert!((m.progress() - 0.85).abs() < 1e-4);
    }
}
