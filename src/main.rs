//! prover-watch - A supervisor for rotating prover containers
//!
//! This is the main CLI entry point for prover-watch.

use clap::{Parser, Subcommand};
use prover_watch::config::{ConfigParser, WatchConfig};
use prover_watch::container::DockerRuntime;
use prover_watch::discovery;
use prover_watch::error::Result;
use prover_watch::monitor::{TickOutcome, TokioClock, Watcher};
use prover_watch::prover::{IdOrdering, ProverId};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// prover-watch - keep one prover container running and rotate it
#[derive(Parser)]
#[command(name = "prover-watch")]
#[command(author = "Evoker Industries")]
#[command(version)]
#[command(about = "Restart crashed prover containers and rotate them by discovered id", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the watch loop
    Run {
        /// Prover ids eligible for rotation, in order (overrides the config file)
        #[arg(short, long, num_args = 1..)]
        roster: Vec<String>,
        /// Roster index of the prover running now
        #[arg(long)]
        initial_index: Option<usize>,
        /// Endpoint returning the latest prover id
        #[arg(long)]
        discovery_url: Option<String>,
        /// Pin the latest prover id instead of querying an endpoint
        #[arg(long)]
        latest: Option<String>,
        /// Prover id ordering (lexical, numeric, version)
        #[arg(long)]
        ordering: Option<IdOrdering>,
        /// Run a single iteration and exit
        #[arg(long)]
        once: bool,
    },

    /// Validate the config file and print the effective configuration
    #[command(name = "check-config")]
    CheckConfig,

    /// Classify a log line with the configured markers
    Classify {
        /// Log line
        line: String,
    },

    /// Check whether one prover id orders before another
    Compare {
        /// Candidate id
        a: String,
        /// Active id
        b: String,
        /// Prover id ordering (lexical, numeric, version)
        #[arg(long)]
        ordering: Option<IdOrdering>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = execute(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let mut config = ConfigParser::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            roster,
            initial_index,
            discovery_url,
            latest,
            ordering,
            once,
        } => {
            if !roster.is_empty() {
                config.roster = roster.into_iter().map(ProverId::from).collect();
            }
            if let Some(index) = initial_index {
                config.initial_index = index;
            }
            if let Some(url) = discovery_url {
                config.discovery.url = Some(url);
            }
            if let Some(id) = latest {
                config.discovery.static_id = Some(ProverId::from(id));
            }
            if let Some(ordering) = ordering {
                config.id_ordering = ordering;
            }

            run(config, once).await?;
        }

        Commands::CheckConfig => {
            ConfigParser::validate(&config)?;
            print!("{}", ConfigParser::to_yaml(&config)?);
        }

        Commands::Classify { line } => {
            let classifier = config.build_classifier()?;
            println!("{}", classifier.classify(&line));
        }

        Commands::Compare { a, b, ordering } => {
            let ordering = ordering.unwrap_or(config.id_ordering);
            let (a, b) = (ProverId::from(a), ProverId::from(b));

            if a.precedes(&b, ordering)? {
                println!("{} precedes {} ({})", a, b, ordering);
            } else {
                println!("{} does not precede {} ({})", a, b, ordering);
            }
        }
    }

    Ok(())
}

async fn run(config: WatchConfig, once: bool) -> Result<()> {
    ConfigParser::validate(&config)?;

    let runtime = Arc::new(DockerRuntime::new(config.runtime.clone()));
    let discovery = discovery::from_config(&config.discovery)?;

    let mut watcher = Watcher::new(
        config.build_roster()?,
        config.build_classifier()?,
        config.watch_settings(),
        runtime,
        discovery,
        Arc::new(TokioClock),
    );

    if once {
        match watcher.tick().await? {
            TickOutcome::Restarted(id) => println!("Restarted crashed prover {}", id),
            TickOutcome::Rotated { from, to } => println!("Rotated prover {} -> {}", from, to),
            TickOutcome::Unchanged => println!("No change"),
        }
        return Ok(());
    }

    tokio::select! {
        result = watcher.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt, shutting down");
        }
    }

    let stats = watcher.stats();
    info!(
        "Stopped after {} iterations, {} restarts, {} rotations",
        stats.ticks, stats.restarts, stats.rotations
    );
    info!("Watch stats: {}", serde_json::to_string(stats)?);

    Ok(())
}
