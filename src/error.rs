use crate::model::{BotId, Bundle, PartKind};
use thiserror::Error;

/// Why an action was turned down. The `Display` text is what the player sees
/// in the status line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub(crate) enum ActionError {
    #[error("No bot {0} in the garage")]
    UnknownBot(BotId),
    #[error("The garage is empty. Press B to build a bot")]
    NoBots,
    #[error("{0}'s battery is already full")]
    BatteryFull(String),
    #[error("Not enough energy: needs {need}%, has {have}%")]
    NotEnoughEnergy { need: u8, have: u8 },
    #[error("{0} is too tired to play...")]
    TooTiredToPlay(String),
    #[error("{name} is too sad to go: needs {need} happiness, has {have}")]
    TooSad { name: String, need: u8, have: u8 },
    #[error("{0} is already on a mission")]
    AlreadyOnMission(String),
    #[error("{0} is out on a mission")]
    Busy(String),
    #[error("{0} is not on a mission")]
    NotOnMission(String),
    #[error("{0} is too damaged for missions. Repair first")]
    TooDamaged(String),
    #[error("{part} must be level {need} (is {have})")]
    PartTooWeak { part: PartKind, need: u8, have: u8 },
    #[error("{0} is already at max level")]
    MaxLevel(PartKind),
    #[error("{0} has nothing to repair")]
    NothingToRepair(String),
    #[error("Not enough resources: missing {0}")]
    NotEnoughResources(Bundle),
    #[error("Bot bay is full ({0} bots max)")]
    BayFull(usize),
}
