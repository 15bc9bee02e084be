use arduino_serial::cli::{self, Invocation, USAGE};
use arduino_serial::config::{Config, ConfigLoader};
use arduino_serial::error::AppResult;
use arduino_serial::{logging, Action, Sequencer, SqlStatusStore, SystemPortOpener};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

// --- Main Application Entry Point ---
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let (config_path, actions) = match cli::parse() {
        Ok(Invocation::Help) => {
            print!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Ok(Invocation::Version(version)) => {
            print!("{version}");
            return ExitCode::SUCCESS;
        }
        Ok(Invocation::Run { config, actions }) => (config, actions),
        Err(e) => e.exit(),
    };

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&config.logging);

    match run(&config, actions).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "run aborted");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<PathBuf>) -> AppResult<Config> {
    let loader = match path {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    Ok(loader.into_config())
}

async fn run(config: &Config, actions: Vec<Action>) -> AppResult<()> {
    let store = SqlStatusStore::new(&config.store)?;
    let mut sequencer = Sequencer::new(
        config,
        Box::new(SystemPortOpener),
        Box::new(store),
        std::io::stdout().lock(),
    );
    sequencer.run(actions).await
}
