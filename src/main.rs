use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chime::cli;
use chime::cli::edit::{AddArgs, UpdateArgs};
use chime::cli::list::Listing;
use chime::config::ChimeConfig;

#[derive(Parser)]
#[command(name = "chime", version, about = "Local reminders with recurring schedules and notifications")]
struct Cli {
    /// Config file (default: ~/.chime/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the reminder daemon in the foreground
    Serve,
    /// Add a reminder
    Add {
        title: String,
        /// Due time: RFC 3339, or local `YYYY-MM-DDTHH:MM[:SS]`
        #[arg(long)]
        at: String,
        #[arg(long, short)]
        message: Option<String>,
        /// none, daily, weekly or monthly
        #[arg(long)]
        repeat: Option<String>,
        /// Back-reference as kind:id (task, note or goal)
        #[arg(long)]
        link: Option<String>,
    },
    /// Change fields of a reminder
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, short)]
        message: Option<String>,
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        repeat: Option<String>,
    },
    /// Activate or deactivate a reminder
    Toggle { id: String },
    /// Delete a reminder
    Delete { id: String },
    /// List every reminder by due time
    List,
    /// List the next active reminders
    Upcoming {
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
    /// List active reminders due today
    Today,
    /// Export all reminders as JSON to stdout
    Export,
    /// Import reminders from a JSON file
    Import {
        path: PathBuf,
        /// Replace the whole collection instead of merging by id
        #[arg(long)]
        replace: bool,
    },
    /// Check database health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = match &cli.config {
        Some(path) => ChimeConfig::load_from(path)?,
        None => ChimeConfig::load()?,
    };

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => chime::daemon::serve(config).await?,
        Command::Add {
            title,
            at,
            message,
            repeat,
            link,
        } => cli::edit::add(
            &config,
            AddArgs {
                title,
                at,
                message,
                repeat,
                link,
            },
        )?,
        Command::Update {
            id,
            title,
            message,
            at,
            repeat,
        } => cli::edit::update(
            &config,
            &id,
            UpdateArgs {
                title,
                message,
                at,
                repeat,
            },
        )?,
        Command::Toggle { id } => cli::edit::toggle(&config, &id)?,
        Command::Delete { id } => cli::edit::delete(&config, &id)?,
        Command::List => cli::list::list(&config, Listing::All)?,
        Command::Upcoming { limit } => {
            let limit = limit.unwrap_or(config.notifications.upcoming_limit);
            cli::list::list(&config, Listing::Upcoming(limit))?
        }
        Command::Today => cli::list::list(&config, Listing::Today)?,
        Command::Export => cli::export::export(&config)?,
        Command::Import { path, replace } => cli::import::import(&config, &path, replace)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
