mod cli;
mod commands;

use anyhow::{
  Context,
  Result,
};
use cli::CliOptions;
use the_history::{
  FileStore,
  History,
  OwnerId,
};
use the_scribe_loader::config;

fn main() -> Result<()> {
  let options = CliOptions::parse()?;

  the_scribe_loader::initialize_config_file(options.config_file.clone());
  the_scribe_loader::initialize_log_file(options.log_file.clone());
  setup_logging(options.verbosity).context("failed to initialize logging")?;

  let config = config::load().context("failed to load config")?;
  let store = options
    .store
    .clone()
    .unwrap_or_else(|| config.store_file());
  let owner = OwnerId(options.owner.map_or(config.owner, |owner| owner.0));
  log::debug!("using history store {}", store.display());

  let store = FileStore::open(&store)
    .with_context(|| format!("failed to open history store {}", store.display()))?;
  let history = History::new(store).with_diff_options(config.diff.into());

  let stdout = std::io::stdout();
  commands::run(&history, owner, &options.command, &mut stdout.lock())
}

fn setup_logging(verbosity: u8) -> Result<()> {
  let level = match verbosity {
    0 => log::LevelFilter::Warn,
    1 => log::LevelFilter::Info,
    2 => log::LevelFilter::Debug,
    _ => log::LevelFilter::Trace,
  };

  fern::Dispatch::new()
    .format(|out, message, record| {
      out.finish(format_args!(
        "{} {} [{}] {}",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
        record.target(),
        record.level(),
        message
      ))
    })
    .level(level)
    .chain(fern::log_file(the_scribe_loader::log_file())?)
    .apply()?;

  Ok(())
}
