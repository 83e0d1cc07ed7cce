use crate::config::atomic_rename;
use crate::model::{GameState, SaveFile, SAVE_VERSION};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::{fs, path::Path};
use tracing::{info, warn};

/// Loads the save at `path`, or starts a new garage seeded with `seed`.
/// The timestamp is `None` for a fresh game.
pub(crate) fn load_or_init_save(
    path: &Path,
    seed: u64,
) -> Result<(GameState, Option<DateTime<Utc>>)> {
    if let Ok(s) = fs::read_to_string(path) {
        match serde_json::from_str::<SaveFile>(&s) {
            Ok(save) if save.version == SAVE_VERSION => {
                info!(
                    path = %path.display(),
                    bots = save.state.garage.bots.len(),
                    "loaded save"
                );
                return Ok((save.state, Some(save.last_seen_utc)));
            }
            Ok(save) => {
                warn!(version = save.version, "save version mismatch, starting fresh");
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "unreadable save, starting fresh");
            }
        }
    }
    Ok((GameState::new(seed), None))
}

pub(crate) fn save_atomic(path: &Path, save: &SaveFile) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(save)?;
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}
