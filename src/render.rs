use crate::catalog;
use crate::config::Settings;
use crate::model::{
    Bot, BotMood, Bundle, GameState, MissionId, PartKind, ResourceKind, Scene, MAX_BOTS,
};
use crossterm::{
    cursor, execute, queue,
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
    },
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

/// Number of head/chest variants a bot can be built with.
pub(crate) const BOT_DESIGNS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
    pub(crate) bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
            bold: false,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            *c = Cell {
                bg,
                ..Cell::default()
            };
        }
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        queue!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    /// Writes changed cells only; a fresh `prev` after resize forces a full repaint.
    pub(crate) fn present(&mut self, force_full: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;
        let mut last_bold = false;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if !force_full && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }
                if last_bold != c.bold {
                    let attr = if c.bold {
                        Attribute::Bold
                    } else {
                        Attribute::NormalIntensity
                    };
                    queue!(self.out, SetAttribute(attr))?;
                    last_bold = c.bold;
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(
            self.out,
            SetAttribute(Attribute::Reset),
            ResetColor,
            EndSynchronizedUpdate
        )?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

/* -----------------------------
   Text helpers
------------------------------ */

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    draw_text_styled(buf, x, y, s, fg, bg, false);
}

fn draw_text_styled(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color, bold: bool) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg, bold });
    }
}

fn bar(value01: f32, width: usize) -> String {
    let v = value01.clamp(0.0, 1.0);
    let fill = (v * width as f32 + 0.5) as usize;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { ' ' });
    }
    s.push(']');
    s
}

struct Palette {
    fg: Color,
    dim: Color,
    hi: Color,
    good: Color,
    warn: Color,
    bad: Color,
    bg: Color,
}

impl Palette {
    fn new(settings: &Settings) -> Self {
        if settings.enable_color {
            Self {
                fg: Color::White,
                dim: Color::DarkGrey,
                hi: Color::Yellow,
                good: Color::Green,
                warn: Color::Yellow,
                bad: Color::Red,
                bg: Color::Black,
            }
        } else {
            Self {
                fg: Color::White,
                dim: Color::White,
                hi: Color::White,
                good: Color::White,
                warn: Color::White,
                bad: Color::White,
                bg: Color::Black,
            }
        }
    }

    /// Colour for a stat where high is good.
    fn level(&self, v: u8) -> Color {
        match v {
            0..=29 => self.bad,
            30..=59 => self.warn,
            _ => self.good,
        }
    }
}

/* -----------------------------
   Bot art
------------------------------ */

const HEADS: [(&str, &str); BOT_DESIGNS] = [("/[", "]\\"), ("<(", ")>"), ("{[", "]}")];
const CHESTS: [&str; BOT_DESIGNS] = ["[+]", "[o]", "[#]"];

/// Four lines of ASCII art for `bot`. `blink` closes the eyes.
pub(crate) fn bot_art(bot: &Bot, blink: bool) -> [String; 4] {
    let design = bot.design % BOT_DESIGNS;
    let (l, r) = HEADS[design];
    let face = if blink {
        "-_-"
    } else {
        match bot.mood() {
            BotMood::Happy => "^-^",
            BotMood::Tired => "-.~",
            BotMood::Damaged => "x-■",
            BotMood::Away => "   ",
            BotMood::Normal => "■-■",
        }
    };
    let legs = if bot.damage >= 50 { " |-/-|" } else { " |---|" };
    [
        format!(" {l}{face}{r}"),
        format!("|  {}  |", CHESTS[design]),
        " \\=|=|=/".to_string(),
        format!("  {legs}"),
    ]
}

/* -----------------------------
   Screen layout
------------------------------ */

pub(crate) fn draw_screen(buf: &mut CellBuffer, st: &GameState, settings: &Settings, blink: bool) {
    let pal = Palette::new(settings);
    let g = &st.garage;

    let title = format!("BOTGOTCHI  |  Bots {}/{}", g.bots.len(), MAX_BOTS);
    draw_text_styled(buf, 1, 0, &title, pal.hi, pal.bg, true);

    let mut x = 1u16;
    for kind in ResourceKind::ALL {
        let s = format!("{}: {}", kind.label(), g.resources.get(kind));
        draw_text(buf, x, 1, &s, pal.fg, pal.bg);
        x = x.saturating_add(s.chars().count() as u16 + 3);
    }

    // Bot roster
    let mut y = 3u16;
    draw_text(buf, 1, y, "Garage", pal.dim, pal.bg);
    y += 1;
    if g.bots.is_empty() {
        draw_text(buf, 3, y, "(empty - press B to build a bot)", pal.dim, pal.bg);
        y += 1;
    }
    for bot in g.bots.values() {
        let selected = g.selected == Some(bot.id);
        let state = match &bot.mission {
            Some(m) => format!(
                "{} {}s",
                catalog::mission(m.mission).name,
                m.remaining_secs()
            ),
            None => "home".to_string(),
        };
        let line = format!(
            "{} {:<12} E{:>3}  H{:>3}  D{:>3}  {}",
            if selected { ">" } else { " " },
            bot.name,
            bot.energy,
            bot.happiness,
            bot.damage,
            state
        );
        let fg = if selected { pal.hi } else { pal.fg };
        draw_text(buf, 1, y, &line, fg, pal.bg);
        y += 1;
    }

    y = y.max(4 + MAX_BOTS as u16) + 1;
    if let Some(bot) = g.selected_bot() {
        draw_bot_panel(buf, bot, &pal, 1, y, blink);
    }

    let menu_x = 44u16;
    match st.scene {
        Scene::Missions => {
            if let Some(bot) = g.selected_bot() {
                draw_missions_menu(buf, bot, st.menu_cursor, &pal, menu_x, 3);
            }
        }
        Scene::Parts => {
            if let Some(bot) = g.selected_bot() {
                draw_parts_menu(buf, bot, st, &pal, menu_x, 3);
            }
        }
        _ => {}
    }

    // status + key help
    let status_y = buf.h.saturating_sub(3);
    draw_text(buf, 1, status_y, &format!("» {}", g.status), pal.fg, pal.bg);

    let help = match st.scene {
        Scene::Main => {
            "c charge | p play | m missions | u upgrade | r repair | b build | x recall | tab next bot | h help | q quit"
        }
        Scene::Missions => "Missions: ↑↓ select | enter launch | tab next bot | esc back",
        Scene::Parts => "Parts: ↑↓ select | enter upgrade | tab next bot | esc back",
        Scene::Help => "Help: esc back | h close | q quit",
        Scene::Recap(_) => "Recap: any key to continue",
    };
    draw_text(buf, 1, buf.h.saturating_sub(1), help, pal.dim, pal.bg);
}

fn draw_bot_panel(buf: &mut CellBuffer, bot: &Bot, pal: &Palette, x: u16, y0: u16, blink: bool) {
    let mut y = y0;
    draw_text_styled(buf, x, y, &format!("{} {}", bot.name, bot.id), pal.hi, pal.bg, true);
    y += 1;

    if let Some(m) = &bot.mission {
        let def = catalog::mission(m.mission);
        draw_text(buf, x + 2, y + 1, &format!("Out on {}", def.name), pal.fg, pal.bg);
        let line = format!("{} {}s left", bar(m.progress(), 16), m.remaining_secs());
        draw_text(buf, x + 2, y + 2, &line, pal.good, pal.bg);
        draw_text(buf, x + 2, y + 3, &format!("Bringing back {}", m.reward), pal.dim, pal.bg);
    } else {
        let art_fg = match bot.mood() {
            BotMood::Tired | BotMood::Damaged => pal.warn,
            BotMood::Happy => pal.good,
            _ => pal.fg,
        };
        for (i, line) in bot_art(bot, blink).iter().enumerate() {
            draw_text(buf, x + 2, y + i as u16, line, art_fg, pal.bg);
        }
    }
    y += 5;

    let stats = [
        ("Energy", bot.energy, pal.level(bot.energy)),
        ("Happy ", bot.happiness, pal.level(bot.happiness)),
        ("Damage", bot.damage, pal.level(100 - bot.damage)),
    ];
    for (name, val, fg) in stats {
        let s = format!("{name}: {} {:>3}%", bar(val as f32 / 100.0, 14), val);
        draw_text(buf, x, y, &s, fg, pal.bg);
        y += 1;
    }

    y += 1;
    for kind in PartKind::ALL {
        let level = bot.part_level(kind);
        let def = catalog::part(kind);
        let s = format!(
            "{:<8} L{}  {:>3}% {}",
            kind.name(),
            level,
            catalog::part_effect(kind, level),
            def.effect_label
        );
        draw_text(buf, x, y, &s, pal.fg, pal.bg);
        y += 1;
    }
}

fn draw_missions_menu(buf: &mut CellBuffer, bot: &Bot, cursor: usize, pal: &Palette, x: u16, y0: u16) {
    draw_text_styled(buf, x, y0, &format!("Send {} on a mission", bot.name), pal.hi, pal.bg, true);
    let mut y = y0 + 2;
    for (i, id) in MissionId::ALL.iter().enumerate() {
        let def = catalog::mission(*id);
        let plan = catalog::plan_mission(def, bot);
        let sel = i == cursor;
        let head = format!(
            "{} {:<16} {:>3}s  -{}E -{}H",
            if sel { ">" } else { " " },
            def.name,
            plan.remaining_secs(),
            def.energy_cost,
            def.happiness_cost
        );
        draw_text(buf, x, y, &head, if sel { pal.hi } else { pal.fg }, pal.bg);
        let mut req = format!("needs {}% energy", def.min_energy);
        for (part, lvl) in def.min_parts {
            req.push_str(&format!(", {} L{}", part.name(), lvl));
        }
        draw_text(buf, x + 4, y + 1, &req, pal.dim, pal.bg);
        draw_text(buf, x + 4, y + 2, &format!("reward {}", plan.reward), pal.dim, pal.bg);
        y += 4;
    }
}

fn draw_parts_menu(buf: &mut CellBuffer, bot: &Bot, st: &GameState, pal: &Palette, x: u16, y0: u16) {
    draw_text_styled(buf, x, y0, &format!("Upgrade {}", bot.name), pal.hi, pal.bg, true);
    let mut y = y0 + 2;
    for (i, kind) in PartKind::ALL.iter().enumerate() {
        let level = bot.part_level(*kind);
        let sel = i == st.menu_cursor;
        let head = format!("{} {:<8} L{}", if sel { ">" } else { " " }, kind.name(), level);
        draw_text(buf, x, y, &head, if sel { pal.hi } else { pal.fg }, pal.bg);
        let detail = match catalog::upgrade_cost(*kind, level) {
            Some(cost) => {
                let affordable = st.garage.resources.covers(&cost);
                let line = format!(
                    "next: {}% {} for {}",
                    catalog::part_effect(*kind, level + 1),
                    catalog::part(*kind).effect_label,
                    cost
                );
                (line, if affordable { pal.good } else { pal.bad })
            }
            None => ("max level".to_string(), pal.dim),
        };
        draw_text(buf, x + 4, y + 1, &detail.0, detail.1, pal.bg);
        y += 3;
    }
    let build = format!("Build new bot (B): {}", Bundle::of(catalog::BUILD_COST));
    draw_text(buf, x, y + 1, &build, pal.dim, pal.bg);
    let repair = format!(
        "Repair (R): -{}% damage for {}",
        catalog::REPAIR_AMOUNT,
        Bundle::of(catalog::REPAIR_COST)
    );
    draw_text(buf, x, y + 2, &repair, pal.dim, pal.bg);
}

/// Bordered box centred on screen with a title and multi-line body.
pub(crate) fn draw_center_box(buf: &mut CellBuffer, title: &str, body: &str) {
    let (w, h) = (buf.w, buf.h);
    let bw = 60u16.min(w.saturating_sub(4));
    let bh = 18u16.min(h.saturating_sub(4));
    if bw < 4 || bh < 4 {
        return;
    }
    let x0 = (w - bw) / 2;
    let y0 = (h - bh) / 2;

    let fg = Color::White;
    let bg = Color::Black;
    let put = |buf: &mut CellBuffer, x: u16, y: u16, ch: char| {
        buf.set(x, y, Cell { ch, fg, bg, bold: false });
    };

    for y in y0..y0 + bh {
        for x in x0..x0 + bw {
            put(buf, x, y, ' ');
        }
    }
    for x in x0..x0 + bw {
        put(buf, x, y0, '─');
        put(buf, x, y0 + bh - 1, '─');
    }
    for y in y0..y0 + bh {
        put(buf, x0, y, '│');
        put(buf, x0 + bw - 1, y, '│');
    }
    put(buf, x0, y0, '┌');
    put(buf, x0 + bw - 1, y0, '┐');
    put(buf, x0, y0 + bh - 1, '└');
    put(buf, x0 + bw - 1, y0 + bh - 1, '┘');

    draw_text_styled(buf, x0 + 2, y0 + 1, title, fg, bg, true);

    let mut yy = y0 + 3;
    for line in body.lines() {
        if yy >= y0 + bh - 1 {
            break;
        }
        let clipped: String = line.chars().take((bw - 4) as usize).collect();
        draw_text(buf, x0 + 2, yy, &clipped, fg, bg);
        yy += 1;
    }
}
