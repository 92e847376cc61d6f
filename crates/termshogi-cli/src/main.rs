// USI engine analysis console

mod config;
mod console;
mod render;

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use termshogi_core::{GameRecord, Position};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (default: <user config dir>/termshogi/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Engine binary, overrides `engine_path` in the config file
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Initial position in SFEN
    #[arg(long)]
    sfen: Option<String>,

    /// Log file (stdout is used by the console)
    #[arg(long, default_value = "termshogi.log")]
    log_file: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(&args) {
        eprintln!("warning: logging disabled: {e:#}");
    }

    if let Err(e) = run(args) {
        log::error!("Fatal error: {e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let log_level = if args.debug { "debug" } else { "info" };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)
        .with_context(|| format!("failed to open {}", args.log_file.display()))?;

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, log_level),
    );
    builder
        .format(|buf, record| {
            writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args())
        })
        .write_style(env_logger::WriteStyle::Never)
        .target(env_logger::Target::Pipe(Box::new(file)));
    builder.try_init()?;
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let path = match args.config {
        Some(path) => path,
        None => config::default_path()
            .context("could not determine the user config directory; pass --config")?,
    };
    let mut config = config::load_or_create(&path)?;
    if let Some(engine) = args.engine {
        config.engine_path = engine;
    }
    log::info!("config {} engine {}", path.display(), config.engine_path.display());

    let record = match args.sfen {
        Some(sfen) => {
            let position =
                Position::from_sfen(&sfen).with_context(|| format!("invalid --sfen {sfen:?}"))?;
            GameRecord::new(position)
        }
        None => GameRecord::startpos(),
    };

    let stdin = io::stdin();
    console::run(&config, record, stdin.lock(), Box::new(io::stdout()))
}
