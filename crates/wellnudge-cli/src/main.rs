use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "wellnudge-cli", version, about = "Wellnudge notification engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Engine configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Notification preferences
    Prefs {
        #[command(subcommand)]
        action: commands::prefs::PrefsAction,
    },
    /// Delivery time planning
    Plan {
        #[command(subcommand)]
        action: commands::plan::PlanAction,
    },
    /// Goal completion streaks
    Streak {
        #[command(subcommand)]
        action: commands::streak::StreakAction,
    },
    /// Response-time history
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so command output stays parseable
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("WELLNUDGE_LOG").unwrap_or_else(|_| EnvFilter::new("wellnudge=info")),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Config { action } => commands::config::run(action),
        Commands::Prefs { action } => commands::prefs::run(action),
        Commands::Plan { action } => commands::plan::run(action),
        Commands::Streak { action } => commands::streak::run(action).await,
        Commands::History { action } => commands::history::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
