use crate::catalog::{self, MissionDef};
use crate::error::ActionError;
use crate::model::{
    adjust, ActiveMission, Bot, BotId, Bundle, CatchupSummary, GameState, Garage, MissionId,
    PartKind, Rules, Scene, MAX_BOTS, MAX_PART_LEVEL, STAT_MAX,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// A state change requested of the garage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Charge(BotId),
    Play(BotId),
    StartMission(BotId, MissionId),
    RecallMission(BotId),
    Upgrade(BotId, PartKind),
    Build,
    Repair(BotId),
    Select(BotId),
    SelectNext(i32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Outcome {
    pub(crate) message: String,
}

impl Outcome {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CompletedMission {
    pub(crate) name: String,
    pub(crate) mission: MissionId,
    pub(crate) reward: Bundle,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LostBot {
    pub(crate) name: String,
    pub(crate) salvage: Bundle,
}

/// What happened during one fixed step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TickReport {
    pub(crate) completed: Vec<CompletedMission>,
    pub(crate) lost: Vec<LostBot>,
}

impl TickReport {
    pub(crate) fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.lost.is_empty()
    }

    /// Status line text for the most notable event, if any.
    pub(crate) fn summary(&self) -> Option<String> {
        if let Some(lost) = self.lost.last() {
            return Some(format!(
                "{} ran out of power and was salvaged for {}",
                lost.name, lost.salvage
            ));
        }
        self.completed.last().map(|done| {
            format!(
                "{} is back from {} with {}",
                done.name,
                catalog::mission(done.mission).name,
                done.reward
            )
        })
    }
}

/// Looks up a bot that is at home.
fn idle_bot(bots: &mut BTreeMap<BotId, Bot>, id: BotId) -> Result<&mut Bot, ActionError> {
    let bot = bots.get_mut(&id).ok_or(ActionError::UnknownBot(id))?;
    if bot.on_mission() {
        return Err(ActionError::Busy(bot.name.clone()));
    }
    Ok(bot)
}

fn check_mission_eligibility(def: &MissionDef, bot: &Bot) -> Result<(), ActionError> {
    if bot.on_mission() {
        return Err(ActionError::AlreadyOnMission(bot.name.clone()));
    }
    if bot.damage >= catalog::MISSION_DAMAGE_LIMIT {
        return Err(ActionError::TooDamaged(bot.name.clone()));
    }
    if bot.energy < def.min_energy {
        return Err(ActionError::NotEnoughEnergy {
            need: def.min_energy,
            have: bot.energy,
        });
    }
    if bot.happiness < def.happiness_cost {
        return Err(ActionError::TooSad {
            name: bot.name.clone(),
            need: def.happiness_cost,
            have: bot.happiness,
        });
    }
    for &(part, need) in def.min_parts {
        let have = bot.part_level(part);
        if have < need {
            return Err(ActionError::PartTooWeak { part, need, have });
        }
    }
    Ok(())
}

impl Garage {
    /// Applies `cmd` and records the result in the status line.
    /// Returns whether the command was accepted.
    pub(crate) fn dispatch(&mut self, cmd: Command) -> bool {
        match self.apply(cmd) {
            Ok(outcome) => {
                info!(?cmd, "{}", outcome.message);
                self.status = outcome.message;
                true
            }
            Err(err) => {
                debug!(?cmd, %err, "action rejected");
                self.status = err.to_string();
                false
            }
        }
    }

    /// Applies one command atomically. On error nothing has changed.
    pub(crate) fn apply(&mut self, cmd: Command) -> Result<Outcome, ActionError> {
        match cmd {
            Command::Charge(id) => {
                let bot = idle_bot(&mut self.bots, id)?;
                if bot.energy >= STAT_MAX {
                    return Err(ActionError::BatteryFull(bot.name.clone()));
                }
                bot.energy = adjust(bot.energy, catalog::CHARGE_ENERGY as i32);
                Ok(Outcome::new(format!(
                    "Charging {}... battery at {}%",
                    bot.name, bot.energy
                )))
            }
            Command::Play(id) => {
                let bot = idle_bot(&mut self.bots, id)?;
                if bot.energy < catalog::PLAY_ENERGY_COST {
                    return Err(ActionError::TooTiredToPlay(bot.name.clone()));
                }
                bot.energy = adjust(bot.energy, -(catalog::PLAY_ENERGY_COST as i32));
                bot.happiness = adjust(bot.happiness, catalog::PLAY_HAPPINESS as i32);
                let mut message = format!("Playing with {}! It seems happy!", bot.name);
                if let Some(lost) = self.reap().pop() {
                    message = format!(
                        "{} played until its battery died. Salvaged {}",
                        lost.name, lost.salvage
                    );
                }
                Ok(Outcome::new(message))
            }
            Command::StartMission(id, mission) => {
                let def = catalog::mission(mission);
                let bot = self.bots.get_mut(&id).ok_or(ActionError::UnknownBot(id))?;
                check_mission_eligibility(def, bot)?;
                let active = catalog::plan_mission(def, bot);
                bot.energy = adjust(bot.energy, -(def.energy_cost as i32));
                bot.happiness = adjust(bot.happiness, -(def.happiness_cost as i32));
                let secs = active.remaining_secs();
                bot.mission = Some(active);
                Ok(Outcome::new(format!(
                    "{} set off on {} ({}s)",
                    bot.name, def.name, secs
                )))
            }
            Command::RecallMission(id) => {
                let bot = self.bots.get_mut(&id).ok_or(ActionError::UnknownBot(id))?;
                let active = bot
                    .mission
                    .take()
                    .ok_or_else(|| ActionError::NotOnMission(bot.name.clone()))?;
                Ok(Outcome::new(format!(
                    "{} abandoned {} and came home empty-handed",
                    bot.name,
                    catalog::mission(active.mission).name
                )))
            }
            Command::Upgrade(id, part) => {
                let bot = self.bots.get_mut(&id).ok_or(ActionError::UnknownBot(id))?;
                let level = bot.part_level(part);
                let cost = catalog::upgrade_cost(part, level).ok_or(ActionError::MaxLevel(part))?;
                if bot.on_mission() {
                    return Err(ActionError::Busy(bot.name.clone()));
                }
                self.resources.spend(&cost)?;
                let next = (level + 1).min(MAX_PART_LEVEL);
                bot.parts.insert(part, next);
                Ok(Outcome::new(format!(
                    "{}'s {} upgraded to level {} ({}% {})",
                    bot.name,
                    part,
                    next,
                    catalog::part_effect(part, next),
                    catalog::part(part).effect_label
                )))
            }
            Command::Build => {
                if self.bots.len() >= MAX_BOTS {
                    return Err(ActionError::BayFull(MAX_BOTS));
                }
                self.resources.spend(&Bundle::of(catalog::BUILD_COST))?;
                let id = self.spawn_bot();
                self.selected = Some(id);
                let name = self.bots.get(&id).map(|b| b.name.as_str()).unwrap_or("?");
                Ok(Outcome::new(format!("Built a new companion: {name}!")))
            }
            Command::Repair(id) => {
                let bot = idle_bot(&mut self.bots, id)?;
                if bot.damage == 0 {
                    return Err(ActionError::NothingToRepair(bot.name.clone()));
                }
                self.resources.spend(&Bundle::of(catalog::REPAIR_COST))?;
                bot.damage = adjust(bot.damage, -(catalog::REPAIR_AMOUNT as i32));
                Ok(Outcome::new(format!(
                    "Repaired {}. Damage down to {}%",
                    bot.name, bot.damage
                )))
            }
            Command::Select(id) => {
                let bot = self.bots.get(&id).ok_or(ActionError::UnknownBot(id))?;
                let message = format!("Selected {}", bot.name);
                self.selected = Some(id);
                Ok(Outcome::new(message))
            }
            Command::SelectNext(delta) => {
                let ids: Vec<BotId> = self.bots.keys().copied().collect();
                if ids.is_empty() {
                    return Err(ActionError::NoBots);
                }
                let len = ids.len() as i32;
                let cur = self
                    .selected
                    .and_then(|s| ids.iter().position(|i| *i == s))
                    .map(|p| p as i32)
                    .unwrap_or(0);
                let next = ids[(cur + delta).rem_euclid(len) as usize];
                self.apply(Command::Select(next))
            }
        }
    }

    /// Creates a bot with a seeded name and design. Caller checks capacity.
    pub(crate) fn spawn_bot(&mut self) -> BotId {
        let id = BotId(self.next_id);
        self.next_id += 1;
        let base = catalog::BOT_NAMES[self.rng.below(catalog::BOT_NAMES.len())];
        let name = if self.bots.values().any(|b| b.name == base) {
            format!("{base}-{}", id.0)
        } else {
            base.to_string()
        };
        let design = self.rng.below(crate::render::BOT_DESIGNS);
        self.bots.insert(id, Bot::new(id, name, design));
        id
    }

    /// Removes every bot whose battery is empty and pays out its salvage.
    fn reap(&mut self) -> Vec<LostBot> {
        let dead: Vec<BotId> = self
            .bots
            .values()
            .filter(|b| b.energy == 0)
            .map(|b| b.id)
            .collect();

        let mut lost = Vec::new();
        for id in dead {
            if let Some(bot) = self.bots.remove(&id) {
                let salvage = catalog::salvage_for(&bot);
                self.resources.grant(&salvage);
                info!(bot = %id, name = %bot.name, %salvage, "bot lost");
                lost.push(LostBot {
                    name: bot.name,
                    salvage,
                });
            }
        }

        if self.selected.map_or(true, |s| !self.bots.contains_key(&s)) {
            self.selected = self.bots.keys().next().copied();
        }
        lost
    }

    /// Advances every timer by one fixed step.
    pub(crate) fn tick(&mut self, rules: &Rules) -> TickReport {
        self.clock_ticks += 1;
        let step = rules.tick_ms;
        let mut report = TickReport::default();

        for bot in self.bots.values_mut() {
            if let Some(active) = bot.mission.as_mut() {
                active.remaining_ms = active.remaining_ms.saturating_sub(step);
                let due = active.remaining_ms == 0;
                if due {
                    if let Some(done) = bot.mission.take() {
                        finish_mission(bot, done, &mut report);
                    }
                }
                continue;
            }
            drain_idle(bot, rules, step);
        }

        for done in &report.completed {
            self.resources.grant(&done.reward);
        }
        report.lost = self.reap();

        if let Some(msg) = report.summary() {
            self.status = msg;
        }
        report
    }
}

fn finish_mission(bot: &mut Bot, done: ActiveMission, report: &mut TickReport) {
    bot.damage = adjust(bot.damage, done.damage as i32);
    info!(
        bot = %bot.id,
        name = %bot.name,
        mission = ?done.mission,
        reward = %done.reward,
        damage = bot.damage,
        "mission complete"
    );
    report.completed.push(CompletedMission {
        name: bot.name.clone(),
        mission: done.mission,
        reward: done.reward,
    });
}

fn drain_idle(bot: &mut Bot, rules: &Rules, step_ms: u64) {
    if rules.energy_drain_secs > 0 {
        let mut interval = rules.energy_drain_secs as u64 * 1000;
        if bot.damage >= rules.heavy_damage {
            interval = (interval / 2).max(1);
        }
        bot.energy_drain_ms += step_ms;
        while bot.energy_drain_ms >= interval {
            bot.energy_drain_ms -= interval;
            bot.energy = adjust(bot.energy, -1);
        }
    }
    if rules.happiness_drain_secs > 0 {
        let interval = rules.happiness_drain_secs as u64 * 1000;
        bot.happiness_drain_ms += step_ms;
        while bot.happiness_drain_ms >= interval {
            bot.happiness_drain_ms -= interval;
            bot.happiness = adjust(bot.happiness, -1);
        }
    }
}

/* -----------------------------
   UI-level actions
------------------------------ */

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PlayerAction {
    Charge,
    Play,
    Repair,
    Build,
    Recall,
    SelectBot(i32),
    MissionsOpen,
    PartsOpen,
    MenuMove(i32),
    MenuConfirm,
    HelpToggle,
    Back,
    Quit,
}

impl GameState {
    pub(crate) fn apply(&mut self, action: PlayerAction) {
        let selected = self.garage.selected;
        let need_bot = |g: &mut Garage| -> Option<BotId> {
            if selected.is_none() {
                g.status = ActionError::NoBots.to_string();
            }
            selected
        };

        match action {
            PlayerAction::Charge => {
                if let Some(id) = need_bot(&mut self.garage) {
                    self.garage.dispatch(Command::Charge(id));
                }
            }
            PlayerAction::Play => {
                if let Some(id) = need_bot(&mut self.garage) {
                    self.garage.dispatch(Command::Play(id));
                }
            }
            PlayerAction::Repair => {
                if let Some(id) = need_bot(&mut self.garage) {
                    self.garage.dispatch(Command::Repair(id));
                }
            }
            PlayerAction::Recall => {
                if let Some(id) = need_bot(&mut self.garage) {
                    self.garage.dispatch(Command::RecallMission(id));
                }
            }
            PlayerAction::Build => {
                self.garage.dispatch(Command::Build);
            }
            PlayerAction::SelectBot(delta) => {
                self.garage.dispatch(Command::SelectNext(delta));
            }
            PlayerAction::MissionsOpen => {
                if need_bot(&mut self.garage).is_some() {
                    self.scene = Scene::Missions;
                    self.menu_cursor = 0;
                }
            }
            PlayerAction::PartsOpen => {
                if need_bot(&mut self.garage).is_some() {
                    self.scene = Scene::Parts;
                    self.menu_cursor = 0;
                }
            }
            PlayerAction::MenuMove(delta) => {
                let len: usize = match self.scene {
                    Scene::Missions => MissionId::ALL.len(),
                    Scene::Parts => PartKind::ALL.len(),
                    _ => return,
                };
                self.menu_cursor =
                    (self.menu_cursor as i32 + delta).rem_euclid(len as i32) as usize;
            }
            PlayerAction::MenuConfirm => {
                let Some(id) = need_bot(&mut self.garage) else {
                    self.scene = Scene::Main;
                    return;
                };
                let cmd = match self.scene {
                    Scene::Missions => MissionId::ALL
                        .get(self.menu_cursor)
                        .map(|m| Command::StartMission(id, *m)),
                    Scene::Parts => PartKind::ALL
                        .get(self.menu_cursor)
                        .map(|p| Command::Upgrade(id, *p)),
                    _ => None,
                };
                if let Some(cmd) = cmd {
                    // A launched mission closes the menu; upgrades keep it open.
                    if self.garage.dispatch(cmd) && matches!(cmd, Command::StartMission(..)) {
                        self.scene = Scene::Main;
                    }
                }
            }
            PlayerAction::HelpToggle => {
                self.scene = match self.scene {
                    Scene::Help => Scene::Main,
                    _ => Scene::Help,
                };
            }
            PlayerAction::Back => self.scene = Scene::Main,
            PlayerAction::Quit => {}
        }
    }
}

/// Replays the time the app was closed. Only mission timers run offline.
pub(crate) fn catch_up(
    state: &mut GameState,
    last_seen: DateTime<Utc>,
    now: DateTime<Utc>,
    rules: &Rules,
) -> CatchupSummary {
    let elapsed = now - last_seen;
    let max_elapsed = ChronoDuration::seconds(rules.catchup_max_secs.max(0));
    let elapsed = elapsed.clamp(ChronoDuration::zero(), max_elapsed);

    let offline = rules.offline();
    let step_ms = offline.tick_ms.max(1) as i64;
    let ticks = (elapsed.num_milliseconds() / step_ms).max(0) as u64;

    let mut summary = CatchupSummary {
        away_secs: elapsed.num_seconds(),
        ..CatchupSummary::default()
    };
    for _ in 0..ticks {
        if !state.garage.bots.values().any(|b| b.on_mission()) {
            break;
        }
        let report = state.garage.tick(&offline);
        summary.record(&report);
    }
    if summary.has_anything() {
        info!(
            ticks = summary.ticks_simulated,
            missions = summary.missions_completed,
            gained = %summary.resources_gained,
            "offline catch-up"
        );
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResourceKind, STAT_MAX};
    use proptest::prelude::*;

    fn garage_with_bot() -> (Garage, BotId) {
        let mut g = Garage::empty(7);
        let id = g.spawn_bot();
        g.selected = Some(id);
        (g, id)
    }

    fn rich(g: &mut Garage) {
        for kind in ResourceKind::ALL {
            g.resources.add(kind, 1_000);
        }
    }

    fn run_until_idle(g: &mut Garage, rules: &Rules) -> Vec<TickReport> {
        let mut reports = Vec::new();
        for _ in 0..10_000 {
            if !g.bots.values().any(|b| b.on_mission()) {
                break;
            }
            reports.push(g.tick(rules));
        }
        reports
    }

    fn no_drain() -> Rules {
        Rules::default().offline()
    }

    #[test]
    fn charge_adds_energy_and_rejects_when_full() {
        let (mut g, id) = garage_with_bot();
        assert_eq!(
            g.apply(Command::Charge(id)),
            Err(ActionError::BatteryFull(g.bots[&id].name.clone()))
        );
        g.bots.get_mut(&id).unwrap().energy = 90;
        g.apply(Command::Charge(id)).unwrap();
        assert_eq!(g.bots[&id].energy, STAT_MAX);
    }

    #[test]
    fn play_costs_energy_and_needs_ten() {
        let (mut g, id) = garage_with_bot();
        g.bots.get_mut(&id).unwrap().happiness = 50;
        g.apply(Command::Play(id)).unwrap();
        assert_eq!(g.bots[&id].energy, 90);
        assert_eq!(g.bots[&id].happiness, 65);

        g.bots.get_mut(&id).unwrap().energy = 9;
        let err = g.apply(Command::Play(id)).unwrap_err();
        assert!(matches!(err, ActionError::TooTiredToPlay(_)));
        assert_eq!(g.bots[&id].energy, 9);
    }

    #[test]
    fn playing_to_zero_salvages_the_bot_once() {
        let (mut g, id) = garage_with_bot();
        g.bots.get_mut(&id).unwrap().energy = 10;
        g.apply(Command::Play(id)).unwrap();
        assert!(g.bots.is_empty());
        assert_eq!(g.resources, Bundle::of(catalog::BASE_SALVAGE));
        assert_eq!(g.selected, None);

        let report = g.tick(&Rules::default());
        assert!(report.lost.is_empty());
        assert_eq!(g.resources, Bundle::of(catalog::BASE_SALVAGE));
    }

    #[test]
    fn mission_grants_reward_exactly_once() {
        let (mut g, id) = garage_with_bot();
        let def = catalog::mission(MissionId::ScrapyardSweep);
        g.dispatch(Command::StartMission(id, MissionId::ScrapyardSweep));
        let bot = &g.bots[&id];
        assert!(bot.on_mission());
        assert_eq!(bot.energy, 100 - def.energy_cost);
        assert_eq!(bot.happiness, 80 - def.happiness_cost);

        let reports = run_until_idle(&mut g, &no_drain());
        let completions: usize = reports.iter().map(|r| r.completed.len()).sum();
        assert_eq!(completions, 1);
        assert_eq!(reports.len(), def.duration_secs as usize);
        assert_eq!(g.resources, Bundle::of(def.reward));
        assert_eq!(g.bots[&id].damage, def.base_damage);

        for _ in 0..30 {
            g.tick(&no_drain());
        }
        assert_eq!(g.resources, Bundle::of(def.reward));
    }

    #[test]
    fn busy_or_weak_bot_cannot_start_mission() {
        let (mut g, id) = garage_with_bot();
        g.apply(Command::StartMission(id, MissionId::ScrapyardSweep))
            .unwrap();
        let before = g.bots[&id].clone();
        let err = g
            .apply(Command::StartMission(id, MissionId::MagnetMine))
            .unwrap_err();
        assert!(matches!(err, ActionError::AlreadyOnMission(_)));
        assert_eq!(g.bots[&id].energy, before.energy);
        assert_eq!(g.bots[&id].mission, before.mission);

        let (mut g, id) = garage_with_bot();
        g.bots.get_mut(&id).unwrap().energy = 19;
        assert_eq!(
            g.dispatch(Command::StartMission(id, MissionId::ScrapyardSweep)),
            false
        );
        assert_eq!(g.status, "Not enough energy: needs 20%, has 19%");
        assert_eq!(g.bots[&id].energy, 19);
        assert!(!g.bots[&id].on_mission());
    }

    #[test]
    fn mission_part_requirements() {
        let (mut g, id) = garage_with_bot();
        let err = g
            .apply(Command::StartMission(id, MissionId::CircuitSalvage))
            .unwrap_err();
        assert_eq!(
            err,
            ActionError::PartTooWeak {
                part: PartKind::Chassis,
                need: 1,
                have: 0
            }
        );
        g.bots.get_mut(&id).unwrap().parts.insert(PartKind::Chassis, 1);
        g.apply(Command::StartMission(id, MissionId::CircuitSalvage))
            .unwrap();
    }

    #[test]
    fn damaged_bot_stays_home() {
        let (mut g, id) = garage_with_bot();
        g.bots.get_mut(&id).unwrap().damage = catalog::MISSION_DAMAGE_LIMIT;
        let err = g
            .apply(Command::StartMission(id, MissionId::ScrapyardSweep))
            .unwrap_err();
        assert!(matches!(err, ActionError::TooDamaged(_)));
    }

    #[test]
    fn recall_cancels_the_timer() {
        let (mut g, id) = garage_with_bot();
        g.apply(Command::StartMission(id, MissionId::ScrapyardSweep))
            .unwrap();
        g.tick(&no_drain());
        g.apply(Command::RecallMission(id)).unwrap();
        assert!(!g.bots[&id].on_mission());
        for _ in 0..60 {
            let report = g.tick(&no_drain());
            assert!(report.completed.is_empty());
        }
        assert!(g.resources.is_empty());
        assert!(matches!(
            g.apply(Command::RecallMission(id)),
            Err(ActionError::NotOnMission(_))
        ));
    }

    #[test]
    fn busy_bot_rejects_other_actions() {
        let (mut g, id) = garage_with_bot();
        rich(&mut g);
        g.bots.get_mut(&id).unwrap().damage = 30;
        g.apply(Command::StartMission(id, MissionId::ScrapyardSweep))
            .unwrap();
        for cmd in [
            Command::Charge(id),
            Command::Play(id),
            Command::Repair(id),
            Command::Upgrade(id, PartKind::Wheels),
        ] {
            assert!(matches!(g.apply(cmd), Err(ActionError::Busy(_))), "{cmd:?}");
        }
    }

    #[test]
    fn upgrade_spends_and_caps() {
        let (mut g, id) = garage_with_bot();
        let err = g.apply(Command::Upgrade(id, PartKind::Wheels)).unwrap_err();
        assert!(matches!(err, ActionError::NotEnoughResources(_)));
        assert_eq!(g.bots[&id].part_level(PartKind::Wheels), 0);

        rich(&mut g);
        for level in 1..=MAX_PART_LEVEL {
            g.apply(Command::Upgrade(id, PartKind::Wheels)).unwrap();
            assert_eq!(g.bots[&id].part_level(PartKind::Wheels), level);
        }
        let before = g.resources.clone();
        assert_eq!(
            g.apply(Command::Upgrade(id, PartKind::Wheels)),
            Err(ActionError::MaxLevel(PartKind::Wheels))
        );
        assert_eq!(g.resources, before);
    }

    #[test]
    fn build_respects_cost_and_capacity() {
        let mut g = Garage::empty(3);
        let err = g.apply(Command::Build).unwrap_err();
        assert!(matches!(err, ActionError::NotEnoughResources(_)));
        assert!(g.bots.is_empty());

        rich(&mut g);
        for _ in 0..MAX_BOTS {
            g.apply(Command::Build).unwrap();
        }
        assert_eq!(g.bots.len(), MAX_BOTS);
        let before = g.resources.clone();
        assert_eq!(g.apply(Command::Build), Err(ActionError::BayFull(MAX_BOTS)));
        assert_eq!(g.resources, before);

        let names: std::collections::BTreeSet<_> = g.bots.values().map(|b| &b.name).collect();
        assert_eq!(names.len(), MAX_BOTS);
    }

    #[test]
    fn repair_reduces_damage() {
        let (mut g, id) = garage_with_bot();
        assert!(matches!(
            g.apply(Command::Repair(id)),
            Err(ActionError::NothingToRepair(_))
        ));
        g.bots.get_mut(&id).unwrap().damage = 40;
        assert!(matches!(
            g.apply(Command::Repair(id)),
            Err(ActionError::NotEnoughResources(_))
        ));
        rich(&mut g);
        g.apply(Command::Repair(id)).unwrap();
        assert_eq!(g.bots[&id].damage, 15);
        g.apply(Command::Repair(id)).unwrap();
        assert_eq!(g.bots[&id].damage, 0);
    }

    #[test]
    fn idle_drain_removes_empty_bot() {
        let (mut g, id) = garage_with_bot();
        let rules = Rules {
            energy_drain_secs: 1,
            ..Rules::default()
        };
        g.bots.get_mut(&id).unwrap().energy = 2;
        let name = g.bots[&id].name.clone();
        let first = g.tick(&rules);
        assert!(first.lost.is_empty());
        let second = g.tick(&rules);
        assert_eq!(second.lost.len(), 1);
        assert_eq!(second.lost[0].name, name);
        assert!(g.bots.is_empty());
        assert!(g.status.contains("salvaged"));
    }

    #[test]
    fn heavy_damage_doubles_drain() {
        let (mut g, id) = garage_with_bot();
        let rules = Rules {
            energy_drain_secs: 10,
            happiness_drain_secs: 0,
            ..Rules::default()
        };
        g.bots.get_mut(&id).unwrap().damage = rules.heavy_damage;
        for _ in 0..10 {
            g.tick(&rules);
        }
        assert_eq!(g.bots[&id].energy, 98);
    }

    #[test]
    fn select_next_wraps() {
        let mut g = Garage::empty(1);
        let a = g.spawn_bot();
        let b = g.spawn_bot();
        g.selected = Some(b);
        g.apply(Command::SelectNext(1)).unwrap();
        assert_eq!(g.selected, Some(a));
        g.apply(Command::SelectNext(-1)).unwrap();
        assert_eq!(g.selected, Some(b));
        assert_eq!(
            Garage::empty(1).apply(Command::SelectNext(1)),
            Err(ActionError::NoBots)
        );
    }

    #[test]
    fn catch_up_finishes_missions_but_does_not_drain() {
        let mut st = GameState::new(11);
        let id = st.garage.selected.unwrap();
        let resources_before = st.garage.resources.clone();
        st.garage
            .apply(Command::StartMission(id, MissionId::MagnetMine))
            .unwrap();
        let energy = st.garage.bots[&id].energy;

        let now = Utc::now();
        let summary = catch_up(
            &mut st,
            now - ChronoDuration::hours(3),
            now,
            &Rules::default(),
        );
        assert_eq!(summary.missions_completed, 1);
        assert!(summary.has_anything());
        assert!(summary.ticks_simulated <= 20);
        assert_eq!(summary.away_secs, 3 * 3600);
        assert_eq!(st.garage.bots[&id].energy, energy);

        let mut expected = resources_before;
        expected.grant(&Bundle::of(catalog::mission(MissionId::MagnetMine).reward));
        assert_eq!(st.garage.resources, expected);
    }

    #[test]
    fn catch_up_ignores_clock_skew() {
        let mut st = GameState::new(11);
        let now = Utc::now();
        let summary = catch_up(&mut st, now + ChronoDuration::hours(1), now, &Rules::default());
        assert_eq!(summary.ticks_simulated, 0);
        assert!(!summary.has_anything());
    }

    #[test]
    fn catch_up_caps_time_away() {
        let mut st = GameState::new(11);
        let id = st.garage.selected.unwrap();
        st.garage
            .apply(Command::StartMission(id, MissionId::ScrapyardSweep))
            .unwrap();
        let now = Utc::now();
        let rules = Rules::default();
        let summary = catch_up(&mut st, now - ChronoDuration::days(3), now, &rules);
        assert_eq!(summary.away_secs, rules.catchup_max_secs);
        assert_eq!(summary.missions_completed, 1);
    }

    #[test]
    fn menu_confirm_upgrades_and_stays_open() {
        let mut st = GameState::new(5);
        rich(&mut st.garage);
        st.apply(PlayerAction::PartsOpen);
        assert!(matches!(st.scene, Scene::Parts));
        let part = PartKind::ALL[0];
        st.apply(PlayerAction::MenuConfirm);
        assert!(matches!(st.scene, Scene::Parts));
        assert_eq!(st.garage.selected_bot().unwrap().part_level(part), 1);
        st.apply(PlayerAction::MenuConfirm);
        assert_eq!(st.garage.selected_bot().unwrap().part_level(part), 2);
    }

    #[test]
    fn actions_without_bots_set_status() {
        let mut st = GameState::new(5);
        st.garage = Garage::empty(5);
        let resources = st.garage.resources.clone();
        for action in [
            PlayerAction::Charge,
            PlayerAction::Play,
            PlayerAction::Repair,
            PlayerAction::Recall,
            PlayerAction::MissionsOpen,
            PlayerAction::PartsOpen,
        ] {
            st.garage.status.clear();
            st.apply(action);
            assert_eq!(st.garage.status, ActionError::NoBots.to_string());
            assert!(matches!(st.scene, Scene::Main));
        }
        assert_eq!(st.garage.resources, resources);
    }

    #[test]
    fn menu_confirm_launches_and_closes() {
        let mut st = GameState::new(5);
        st.apply(PlayerAction::MissionsOpen);
        assert!(matches!(st.scene, Scene::Missions));
        st.apply(PlayerAction::MenuMove(-1));
        assert_eq!(st.menu_cursor, MissionId::ALL.len() - 1);
        st.apply(PlayerAction::MenuMove(1));
        st.apply(PlayerAction::MenuConfirm);
        assert!(matches!(st.scene, Scene::Main));
        assert!(st.garage.selected_bot().unwrap().on_mission());
    }

    fn arb_command(ids: Vec<BotId>) -> impl Strategy<Value = Command> {
        let id = proptest::sample::select(ids);
        let mission = proptest::sample::select(MissionId::ALL.to_vec());
        let part = proptest::sample::select(PartKind::ALL.to_vec());
        prop_oneof![
            id.clone().prop_map(Command::Charge),
            id.clone().prop_map(Command::Play),
            (id.clone(), mission).prop_map(|(i, m)| Command::StartMission(i, m)),
            id.clone().prop_map(Command::RecallMission),
            (id.clone(), part).prop_map(|(i, p)| Command::Upgrade(i, p)),
            Just(Command::Build),
            id.prop_map(Command::Repair),
            (-2i32..3).prop_map(Command::SelectNext),
        ]
    }

    #[derive(Clone, Debug)]
    enum Step {
        Cmd(Command),
        Ticks(u8),
    }

    fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
        let ids: Vec<BotId> = (1..=6).map(BotId).collect();
        proptest::collection::vec(
            prop_oneof![
                3 => arb_command(ids).prop_map(Step::Cmd),
                1 => (1u8..60).prop_map(Step::Ticks),
            ],
            1..80,
        )
    }

    proptest! {
        #[test]
        fn stats_stay_in_bounds(steps in arb_steps(), seed in any::<u64>()) {
            let mut g = Garage::new(seed);
            let rules = Rules { energy_drain_secs: 2, happiness_drain_secs: 1, ..Rules::default() };
            g.resources.grant(&Bundle::of(&[(ResourceKind::Bolts, 200), (ResourceKind::Wires, 200)]));
            for step in steps {
                match step {
                    Step::Cmd(cmd) => {
                        let energy_before = match cmd {
                            Command::Charge(id) | Command::Play(id) => g.bots.get(&id).map(|b| b.energy),
                            _ => None,
                        };
                        let ok = g.apply(cmd).is_ok();
                        if let (true, Some(before)) = (ok, energy_before) {
                            match cmd {
                                Command::Charge(id) => prop_assert!(g.bots[&id].energy >= before),
                                Command::Play(id) => prop_assert!(g.bots.get(&id).map_or(0, |b| b.energy) <= before),
                                _ => {}
                            }
                        }
                    }
                    Step::Ticks(n) => {
                        for _ in 0..n {
                            g.tick(&rules);
                        }
                    }
                }
                prop_assert!(g.bots.len() <= MAX_BOTS);
                for bot in g.bots.values() {
                    prop_assert!(bot.energy <= STAT_MAX);
                    prop_assert!(bot.happiness <= STAT_MAX);
                    prop_assert!(bot.damage <= STAT_MAX);
                    prop_assert!(bot.energy > 0);
                    for kind in PartKind::ALL {
                        prop_assert!(bot.part_level(kind) <= MAX_PART_LEVEL);
                    }
                }
                if let Some(sel) = g.selected {
                    prop_assert!(g.bots.contains_key(&sel));
                }
            }
        }

        #[test]
        fn rejected_commands_change_nothing_but_status(steps in arb_steps()) {
            let mut g = Garage::new(99);
            for step in steps {
                if let Step::Cmd(cmd) = step {
                    let before = g.clone();
                    if g.apply(cmd).is_err() {
                        prop_assert_eq!(format!("{:?}", before.bots), format!("{:?}", g.bots));
                        prop_assert_eq!(&before.resources, &g.resources);
                        prop_assert_eq!(before.selected, g.selected);
                    }
                }
            }
        }
    }
}
