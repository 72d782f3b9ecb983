use std::{error::Error, fs::File, io::BufWriter, path::PathBuf};

use clap::Parser;
use log::{info, LevelFilter};
use phsf_rust::{
    config::{Config, TaskProcess},
    RenderConfig, TableWriter,
};

#[derive(Parser, Debug)]
#[command(name = "phsf", about = "Phonon spectral-function aggregation")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: PathBuf,
    /// Only log warnings and errors
    #[arg(long)]
    quiet: bool,
}

fn run_task<T: TaskProcess>(task: &T, render: &RenderConfig) -> Result<(), Box<dyn Error>> {
    let file = File::create(task.output())?;
    let mut writer = TableWriter::new(BufWriter::new(file));
    task.task_execute(render, &mut writer)?;
    info!("Wrote {}", task.output());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let level = if cli.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let config = Config::read(&cli.config)?;
    info!("Loaded config `{}`", config.title());
    if let Some(task) = config.tasks().band_sf() {
        run_task(task, config.render())?;
    }
    if let Some(task) = config.tasks().points_sf() {
        run_task(task, config.render())?;
    }
    Ok(())
}
