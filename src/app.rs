use crate::config::{self, load_settings, project_paths, save_settings_atomic, Paths, Settings};
use crate::input::{collect_input_nonblocking, map_event_to_action};
use crate::model::{CatchupSummary, GameState, Rules, SaveFile, Scene, SAVE_VERSION};
use crate::render::{draw_center_box, draw_screen, Terminal};
use crate::sim::{catch_up, PlayerAction};
use crate::storage::{load_or_init_save, save_atomic};
use crate::Cli;
use anyhow::Context;
use std::time::{Duration, Instant};
use tracing::{error, info};

const HELP_TEXT: &str = "Keep your bots charged, happy and in one piece.\n\
Bots slowly lose energy and happiness while idle.\n\
A bot whose battery hits 0% is scrapped for parts.\n\n\
C Charge: +20 energy.   P Play: -10 energy, +15 happy.\n\
M Missions: spend energy/happiness, earn resources.\n\
U Upgrade parts: chassis (less damage), sensors\n\
  (bigger rewards), wheels (shorter missions).\n\
R Repair damage.  B Build a new bot.  X Recall bot.\n\
Tab/arrows pick a bot.\n\n\
Esc or H to close help.";

/// Per-run values: settings.json, then CLI flags on top. Never written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RunOptions {
    fps: u32,
    seed: u64,
}

impl RunOptions {
    fn resolve(settings: &Settings, cli: &Cli) -> Self {
        Self {
            fps: cli.fps.unwrap_or(settings.fps_cap).clamp(10, 240),
            seed: cli.seed.unwrap_or(settings.seed),
        }
    }
}

pub(crate) struct App {
    settings: Settings,
    opts: RunOptions,
    rules: Rules,
    state: GameState,
    paths: Paths,
    term: Terminal,
    persist: bool,
    should_quit: bool,
    autosave_at: Instant,
    frame: u64,
}

impl App {
    fn init(cli: Cli) -> anyhow::Result<Self> {
        let paths = project_paths()?;
        config::init_logging(&paths.log_path)?;

        let settings = load_settings(&paths.settings_path);
        let opts = RunOptions::resolve(&settings, &cli);
        let rules = Rules::default();

        let (mut state, loaded_last_seen) = if cli.fresh {
            (GameState::new(opts.seed), None)
        } else {
            load_or_init_save(&paths.save_path, opts.seed)?
        };

        if let Some(last_seen) = loaded_last_seen {
            let summary = catch_up(&mut state, last_seen, chrono::Utc::now(), &rules);
            if summary.has_anything() {
                state.scene = Scene::Recap(summary);
            }
        }

        info!(
            bots = state.garage.bots.len(),
            fresh = cli.fresh,
            persist = !cli.no_save,
            "starting botgotchi"
        );

        let term = Terminal::begin().context("could not set up the terminal")?;

        Ok(Self {
            autosave_at: Instant::now() + Duration::from_secs(settings.autosave_secs.max(1)),
            settings,
            opts,
            rules,
            state,
            paths,
            term,
            persist: !cli.no_save,
            should_quit: false,
            frame: 0,
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.opts.fps;
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);
        let sim_step = Duration::from_millis(self.rules.tick_ms.max(1));
        let autosave_every = Duration::from_secs(self.settings.autosave_secs.max(1));

        let mut last_frame = Instant::now();
        let mut sim_accum = Duration::ZERO;

        while !self.should_quit {
            let frame_start = Instant::now();
            self.term.resize_if_needed()?;

            // input
            for ev in collect_input_nonblocking(frame_dt)? {
                match map_event_to_action(&self.state.scene, ev) {
                    Some(PlayerAction::Quit) => {
                        self.should_quit = true;
                        break;
                    }
                    Some(action) => self.state.apply(action),
                    None => {
                        // any key dismisses the recap
                        if matches!(self.state.scene, Scene::Recap(_)) {
                            self.state.scene = Scene::Main;
                        }
                    }
                }
            }

            // sim fixed-step
            let now = Instant::now();
            sim_accum = sim_accum.saturating_add(now.saturating_duration_since(last_frame));
            last_frame = now;

            let mut eventful = false;
            while sim_accum >= sim_step {
                let report = self.state.garage.tick(&self.rules);
                eventful |= !report.is_empty();
                sim_accum = sim_accum.saturating_sub(sim_step);
            }

            self.render_frame()?;

            if eventful || Instant::now() >= self.autosave_at {
                self.save_now()?;
                self.autosave_at = Instant::now() + autosave_every;
            }

            self.frame = self.frame.wrapping_add(1);
            spin_sleep(frame_dt, frame_start);
        }

        self.save_now()?;
        if self.persist {
            save_settings_atomic(&self.paths.settings_path, &self.settings)?;
        }
        info!("bye");
        Ok(())
    }

    fn render_frame(&mut self) -> anyhow::Result<()> {
        let bg = crossterm::style::Color::Black;
        self.term.cur.clear(bg);

        // eyes close for a few frames roughly every four seconds
        let period = self.opts.fps as u64 * 4;
        let blink = self.frame % period < 3;

        draw_screen(&mut self.term.cur, &self.state, &self.settings, blink);

        match &self.state.scene {
            Scene::Recap(s) => {
                let body = recap_text(s);
                draw_center_box(&mut self.term.cur, "While you were away…", &body);
            }
            Scene::Help => draw_center_box(&mut self.term.cur, "How to play", HELP_TEXT),
            _ => {}
        }

        self.term.present(false)?;
        Ok(())
    }

    fn save_now(&self) -> anyhow::Result<()> {
        if !self.persist {
            return Ok(());
        }
        let save = SaveFile {
            version: SAVE_VERSION,
            last_seen_utc: chrono::Utc::now(),
            state: self.state.clone(),
        };
        save_atomic(&self.paths.save_path, &save)
            .with_context(|| format!("could not write {}", self.paths.save_path.display()))
    }
}

pub(crate) fn run(cli: Cli) -> anyhow::Result<()> {
    let mut app = App::init(cli)?;
    let result = app.run();
    // Restore the terminal even when the loop failed.
    let restored = app.term.end();
    if let Err(err) = &result {
        error!(%err, "exiting on error");
    }
    result.and(restored)
}

fn recap_text(s: &CatchupSummary) -> String {
    format!(
        "Away for {}h {:02}m\nMissions completed: {}\nResources gained: {}\n\nPress any key",
        s.away_secs / 3600,
        s.away_secs % 3600 / 60,
        s.missions_completed,
        s.resources_gained,
    )
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, start: Instant) {
    let end = start + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
