use crate::prelude::*;
use clap::Parser;

mod atlassian;
mod error;
mod prelude;
mod prompt;
mod translate;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Clone Jira tickets between projects, keeping descriptions, attachments and links"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Path to a .env file with JIRA_BASE_URL, JIRA_EMAIL and JIRA_API_TOKEN
    #[clap(long, short = 'e', env = "JIRACLONE_ENV", global = true)]
    env: Option<std::path::PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "JIRACLONE_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Jira operations
    #[command(subcommand)]
    Jira(crate::atlassian::jira::Commands),
}

impl SubCommands {
    /// Commands that read a settings file, which may name its own `.env`.
    fn reads_settings_file(&self) -> bool {
        match self {
            SubCommands::Jira(cmd) => cmd.reads_settings_file(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let app = App::parse();

    // Loaded before the logger so RUST_LOG can live in the .env file.
    // Commands with a settings file load theirs once the file is read.
    let env_file = if app.command.reads_settings_file() {
        None
    } else {
        crate::atlassian::load_env_file(app.global.env.as_deref())?
    };

    env_logger::init();
    color_eyre::install()?;

    if let Some(path) = env_file {
        log::debug!("Loaded environment from {}", path.display());
    }

    match app.command {
        SubCommands::Jira(cmd) => crate::atlassian::jira::run(cmd, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
