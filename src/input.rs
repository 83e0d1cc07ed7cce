use crate::model::Scene;
use crate::sim::PlayerAction;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Debug)]
pub(crate) struct InputEvent {
    pub(crate) key: KeyCode,
    pub(crate) mods: KeyModifiers,
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                out.push(InputEvent {
                    key: k.code,
                    mods: k.modifiers,
                });
                if out.len() >= 32 {
                    break;
                }
            }
        }
    }
    Ok(out)
}

pub(crate) fn map_event_to_action(scene: &Scene, ev: InputEvent) -> Option<PlayerAction> {
    if matches!(scene, Scene::Recap(_)) {
        return None;
    }

    // Global
    if matches!(ev.key, KeyCode::Char('c') | KeyCode::Char('C'))
        && ev.mods.contains(KeyModifiers::CONTROL)
    {
        return Some(PlayerAction::Quit);
    }
    match ev.key {
        KeyCode::Char('h') | KeyCode::Char('H') => return Some(PlayerAction::HelpToggle),
        KeyCode::Char('q') | KeyCode::Char('Q') => return Some(PlayerAction::Quit),
        KeyCode::Esc => return Some(PlayerAction::Back),
        _ => {}
    }

    match scene {
        Scene::Main => match ev.key {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(PlayerAction::Charge),
            KeyCode::Char('p') | KeyCode::Char('P') => Some(PlayerAction::Play),
            KeyCode::Char('r') | KeyCode::Char('R') => Some(PlayerAction::Repair),
            KeyCode::Char('b') | KeyCode::Char('B') => Some(PlayerAction::Build),
            KeyCode::Char('x') | KeyCode::Char('X') => Some(PlayerAction::Recall),
            KeyCode::Char('m') | KeyCode::Char('M') => Some(PlayerAction::MissionsOpen),
            KeyCode::Char('u') | KeyCode::Char('U') => Some(PlayerAction::PartsOpen),
            KeyCode::Up | KeyCode::BackTab => Some(PlayerAction::SelectBot(-1)),
            KeyCode::Down | KeyCode::Tab => Some(PlayerAction::SelectBot(1)),
            _ => None,
        },
        Scene::Missions | Scene::Parts => match ev.key {
            KeyCode::Up => Some(PlayerAction::MenuMove(-1)),
            KeyCode::Down => Some(PlayerAction::MenuMove(1)),
            KeyCode::Enter => Some(PlayerAction::MenuConfirm),
            KeyCode::Tab => Some(PlayerAction::SelectBot(1)),
            KeyCode::BackTab => Some(PlayerAction::SelectBot(-1)),
            _ => None,
        },
        Scene::Help | Scene::Recap(_) => None,
    }
}
