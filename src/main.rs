//! Binary entrypoint for the Warbound CLI.
//!
//! Commands:
//! - `init` - write a starter `warbound.toml` and create the data store
//! - `status` - print store counts
//! - `maintenance <job>` - run one maintenance job now
//! - `serve` - run the maintenance scheduler until Ctrl-C
//!
//! See the library crate docs for module-level details: `warbound::`.
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::info;

use warbound::config::Config;
use warbound::game::maintenance::{self, MaintenanceJob};
use warbound::game::{GameContext, GameStore};
use warbound::scheduler;

#[derive(Parser)]
#[command(name = "warbound")]
#[command(about = "Faction PvP role-playing game server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "warbound.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and create the data store
    Init,
    /// Show store statistics
    Status,
    /// Run one maintenance job immediately
    Maintenance {
        /// daily-refresh, revive, mail-cleanup, jail-sweep or expire-quests
        job: MaintenanceJob,
    },
    /// Run the maintenance scheduler until interrupted
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            info!("Initializing new Warbound configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);

            let config = Config::load(&cli.config).await?;
            let store = GameStore::open(&config.storage.data_dir)?;
            let stats = store.stats()?;
            info!(
                "Data store ready at {} ({} items, {} quests, {} NPCs)",
                config.storage.data_dir, stats.items, stats.quests, stats.npcs
            );
        }
        Commands::Status => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            let store = GameStore::open(&config.storage.data_dir)?;
            let stats = store.stats()?;
            println!("Warbound v{}", env!("CARGO_PKG_VERSION"));
            println!("Data dir:      {}", config.storage.data_dir);
            println!("Characters:    {}", stats.characters);
            println!("Battles:       {}", stats.battles);
            println!("Quests:        {} ({} active)", stats.quests, stats.active_quests);
            println!("Mail:          {}", stats.mail);
            println!("Items / NPCs:  {} / {}", stats.items, stats.npcs);
        }
        Commands::Maintenance { job } => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            let ctx = build_context(&config)?;
            let report = maintenance::run_job(&ctx, job, Utc::now())?;
            println!("{}: {}", job, report);
        }
        Commands::Serve => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            info!("Starting Warbound v{}", env!("CARGO_PKG_VERSION"));
            let ctx = Arc::new(build_context(&config)?);
            let shutdown = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            scheduler::run(ctx, config.scheduler.clone(), shutdown).await?;
            info!("Warbound stopped");
        }
    }

    Ok(())
}

fn build_context(config: &Config) -> Result<GameContext> {
    let store = GameStore::open(&config.storage.data_dir)?;
    let factions = Arc::new(config.game.load_factions()?);
    Ok(GameContext::new(store, factions, config.game.to_settings()))
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins over the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse::<log::LevelFilter>().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config.as_ref().and_then(|cfg| cfg.logging.file.clone());
    let file = log_file.and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });

    if let Some(f) = file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
