use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use nightride::app::{run, RunOptions};

#[derive(Debug, Parser)]
#[command(name = "nightride", version, about = "Nightride FM radio player")]
struct Cli {
    #[arg(long, help = "Enable verbose debug logs")]
    debug: bool,
    #[arg(long, help = "Read commands from stdin instead of starting the TUI")]
    headless: bool,
    #[arg(long, value_name = "PATH", help = "Config file to load instead of the default")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(RunOptions {
        debug: cli.debug,
        headless: cli.headless,
        config_path: cli.config,
    })
}
