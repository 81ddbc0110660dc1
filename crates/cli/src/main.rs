//! Trihunt CLI - timed multi-category completion challenge.

mod config;
mod report;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use trihunt_coordinator::ChallengeCoordinator;
use trihunt_core::{Attributor, Category, CreatureKind, ItemKind, MilestoneKey};
use trihunt_scheduler::{detect_scheduler, OnceTask, Scheduler};
use trihunt_storage::{JsonSnapshotStore, SnapshotStore};

use config::Config;

#[derive(Parser)]
#[command(name = "trihunt")]
#[command(about = "Timed multi-category completion challenge", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(long, default_value = "trihunt.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new challenge session
    Start,
    /// Stop the current session, keeping the final time
    Stop,
    /// Pause the session clock
    Pause,
    /// Resume the session clock
    Resume,
    /// Show the progress report
    Progress,
    /// List outstanding entries in a category
    Remaining {
        /// items, creatures or milestones
        category: String,
    },
    /// Record a completion on behalf of a participant
    Record {
        /// items, creatures or milestones
        category: String,
        /// Entity key
        entity: String,
        /// Participant to credit
        player: String,
    },
    /// Administratively skip an entry
    Skip {
        /// items, creatures or milestones
        category: String,
        /// Entity key
        entity: String,
    },
    /// Wipe all challenge data
    Reset {
        /// Required; without it the command only warns
        #[arg(long)]
        confirm: bool,
    },
    /// Run a live session: 1 s clock tick plus periodic autosave
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let store = JsonSnapshotStore::new(&config.data_dir).await?;
    let coordinator = ChallengeCoordinator::new(store);
    coordinator.install_catalogues(config.catalogues()?);
    coordinator.load_snapshot().await?;

    match cli.command {
        Commands::Start => {
            let catalogues = config.catalogues()?;
            if coordinator.start(catalogues) {
                coordinator.save_snapshot().await?;
                let (_, required) = coordinator.aggregate_progress();
                println!("Challenge started: {} entries to complete.", required);
            } else if coordinator.is_active() {
                println!("A session is already active; stop or reset it first.");
            } else {
                println!("Nothing to hunt: all catalogues are empty.");
            }
        }
        Commands::Stop => {
            if coordinator.stop() {
                coordinator.save_snapshot().await?;
                println!("Stopped at {}.", coordinator.formatted_elapsed());
            } else {
                println!("No active session.");
            }
        }
        Commands::Pause => {
            if coordinator.pause() {
                coordinator.save_snapshot().await?;
                println!("Paused at {}.", coordinator.formatted_elapsed());
            } else {
                println!("Clock is not running.");
            }
        }
        Commands::Resume => {
            if coordinator.resume() {
                coordinator.save_snapshot().await?;
                println!("Resumed at {}.", coordinator.formatted_elapsed());
            } else {
                println!("Clock is not paused.");
            }
        }
        Commands::Progress => {
            print!("{}", report::render_report(&coordinator));
        }
        Commands::Remaining { category } => {
            let category = parse_category(&category)?;
            let remaining: Vec<String> = match category {
                Category::Items => keys(coordinator.remaining_items()),
                Category::Creatures => keys(coordinator.remaining_creatures()),
                Category::Milestones => keys(coordinator.remaining_milestones()),
            };
            println!("Remaining {} ({})", category, remaining.len());
            for key in remaining {
                println!("  {}", key);
            }
        }
        Commands::Record {
            category,
            entity,
            player,
        } => {
            let category = parse_category(&category)?;
            let by = Attributor::from(player);
            let recorded = match category {
                Category::Items => coordinator.record_item(ItemKind::new(entity.clone()), by),
                Category::Creatures => {
                    coordinator.record_creature(CreatureKind::new(entity.clone()), by)
                }
                Category::Milestones => {
                    coordinator.record_milestone(MilestoneKey::new(entity.clone()), by)
                }
            };
            if recorded {
                coordinator.save_snapshot().await?;
                println!("Recorded {} ({}).", entity, category);
            } else {
                println!("Not recorded: {} is not outstanding in {}.", entity, category);
            }
        }
        Commands::Skip { category, entity } => {
            let category = parse_category(&category)?;
            let skipped = match category {
                Category::Items => coordinator.skip_item(ItemKind::new(entity.clone())),
                Category::Creatures => {
                    coordinator.skip_creature(CreatureKind::new(entity.clone()))
                }
                Category::Milestones => {
                    coordinator.skip_milestone(MilestoneKey::new(entity.clone()))
                }
            };
            if skipped {
                coordinator.save_snapshot().await?;
                println!("Skipped {} ({}).", entity, category);
            } else {
                println!("Not skipped: {} is not outstanding in {}.", entity, category);
            }
        }
        Commands::Reset { confirm } => {
            if !confirm {
                println!("This wipes all challenge data. Re-run with --confirm.");
                return Ok(());
            }
            coordinator.reset_all().await?;
            println!("All challenge data reset.");
        }
        Commands::Run => run_live(&config, coordinator).await?,
    }

    Ok(())
}

/// Live session loop. The detected scheduler drives a 1 s clock tick and
/// a periodic autosave; Ctrl-C cancels both gracefully (an in-flight
/// snapshot write completes) and takes a final save.
async fn run_live(
    config: &Config,
    coordinator: ChallengeCoordinator<JsonSnapshotStore>,
) -> Result<()> {
    let scheduler = detect_scheduler();

    // The terminal session counts as presence.
    coordinator.presence_gained();

    let mut events = coordinator.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("{}", report::render_event(&event)),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let tick_handle = {
        let coordinator = coordinator.clone();
        scheduler.schedule_periodic(
            Duration::from_secs(1),
            Box::new(move || {
                let coordinator = coordinator.clone();
                Box::pin(async move {
                    coordinator.tick();
                })
            }),
        )?
    };

    let save_handle = {
        let coordinator = coordinator.clone();
        scheduler.schedule_periodic(
            Duration::from_secs(config.autosave_seconds.max(1)),
            Box::new(move || {
                let coordinator = coordinator.clone();
                Box::pin(async move {
                    // Failures are logged inside; the session continues.
                    let _ = coordinator.save_snapshot().await;
                })
            }),
        )?
    };

    println!("Live session running; Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    tick_handle.cancel().await;
    save_handle.cancel().await;
    printer.abort();

    // Host going away means nobody is online.
    deferred_presence_lost(scheduler.as_ref(), &coordinator).await;
    coordinator.save_snapshot().await?;
    println!("Final state saved at {}.", coordinator.formatted_elapsed());
    Ok(())
}

/// Run the disconnect-side presence check one tick out, not immediately:
/// at the moment of the signal the departing participant still counts as
/// present. Falls back to an immediate check if scheduling fails.
async fn deferred_presence_lost<S: SnapshotStore + 'static>(
    scheduler: &dyn Scheduler,
    coordinator: &ChallengeCoordinator<S>,
) {
    let (done, finished) = tokio::sync::oneshot::channel();
    let task: OnceTask = {
        let coordinator = coordinator.clone();
        Box::new(move || {
            Box::pin(async move {
                coordinator.presence_lost();
                let _ = done.send(());
            })
        })
    };

    match scheduler.schedule_once(Duration::from_secs(1), task) {
        Ok(()) => {
            let _ = finished.await;
        }
        Err(_) => coordinator.presence_lost(),
    }
}

fn parse_category(s: &str) -> Result<Category> {
    s.parse::<Category>().map_err(|e| anyhow::anyhow!(e))
}

fn keys<E: std::fmt::Display>(entities: Vec<E>) -> Vec<String> {
    entities.into_iter().map(|e| e.to_string()).collect()
}
