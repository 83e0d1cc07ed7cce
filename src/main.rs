mod app;
mod catalog;
mod config;
mod error;
mod input;
mod model;
mod render;
mod sim;
mod storage;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "botgotchi")]
#[command(about = "Look after a garage of robot companions in your terminal")]
pub(crate) struct Cli {
    /// Ignore any existing save and start a new garage
    #[arg(long, default_value_t = false)]
    fresh: bool,

    /// Play without writing the save file
    #[arg(long, default_value_t = false)]
    no_save: bool,

    /// RNG seed for a new garage (names and designs of built bots)
    #[arg(long)]
    seed: Option<u64>,

    /// Frame rate cap (10-240)
    #[arg(long)]
    fps: Option<u32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    app::run(cli)
}
