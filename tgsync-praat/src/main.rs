//! tgsync - TextGrid store, alignment and Praat round-trip tool
//!
//! Project root priority: `--project`, then `TGSYNC_PROJECT`, then the
//! `project_root` entry of the config file, then the current directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tgsync_align::{annotate_record, annotate_record_segment, MediaSegment, Record};
use tgsync_common::config::TomlConfig;
use tgsync_common::events::EventBus;
use tgsync_common::{AnnotationUnit, Tier};
use tgsync_store::ProjectRegistry;
use tgsync_praat::{AudioResolver, RoundTripCoordinator, RoundTripOutcome, RoundTripRequest};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for tgsync
#[derive(Parser, Debug)]
#[command(name = "tgsync")]
#[command(about = "TextGrid storage, alignment and Praat round trips")]
#[command(version)]
struct Args {
    /// Project folder
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Config file (defaults to the platform config folder)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the backing file of a unit
    Path(UnitArgs),

    /// List stored units of a session
    List { corpus: String, session: String },

    /// Summarize a stored TextGrid
    Show {
        #[command(flatten)]
        unit: UnitArgs,
        /// Print the whole TextGrid as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print store changes until interrupted
    Watch,

    /// Align a record (JSON) against a stored TextGrid
    Align {
        #[command(flatten)]
        unit: UnitArgs,
        /// Record file
        #[arg(long)]
        record: PathBuf,
        /// Only search the part of the TextGrid covered by the record segment
        #[arg(long)]
        segment_only: bool,
    },

    /// Copy a TextGrid file into the store (file stem becomes the unit id)
    Import {
        corpus: String,
        session: String,
        file: PathBuf,
    },

    /// Merge record TextGrids (u1, u2, ...) into the default TextGrid
    Merge { corpus: String, session: String },

    /// Open a unit in Praat and wait until it is sent back
    Open {
        #[command(flatten)]
        unit: UnitArgs,
        /// Session media file; its .wav sibling is opened
        #[arg(long)]
        media: PathBuf,
        /// Segment start in seconds
        #[arg(long)]
        start: f64,
        /// Segment end in seconds
        #[arg(long)]
        end: f64,
        /// Open the whole recording instead of the segment
        #[arg(long)]
        full_audio: bool,
    },
}

#[derive(clap::Args, Debug)]
struct UnitArgs {
    corpus: String,
    session: String,
    /// Unit id
    #[arg(default_value = tgsync_common::unit::DEFAULT_UNIT_ID)]
    unit: String,
}

impl UnitArgs {
    fn unit(&self) -> Result<AnnotationUnit> {
        AnnotationUnit::new(&self.corpus, &self.session, &self.unit).context("Invalid unit")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TomlConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TomlConfig::load_or_default(),
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "tgsync={level},tgsync_common={level},tgsync_store={level},tgsync_align={level},tgsync_praat={level}",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let root = config
        .resolve_project_root(args.project.as_deref())
        .context("Failed to resolve project folder")?;
    info!("Project folder: {}", root.display());

    let registry = ProjectRegistry::new();
    let project = registry.project(&root);
    let store = &project.store;

    match args.command {
        Command::Path(unit) => {
            println!("{}", store.path(&unit.unit()?).display());
        }

        Command::List { corpus, session } => {
            for id in store.units_for_session(&corpus, &session)? {
                println!("{}", id);
            }
        }

        Command::Show { unit, json } => {
            let textgrid = store.load(&unit.unit()?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&textgrid)?);
            } else {
                println!("xmin = {}, xmax = {}", textgrid.xmin(), textgrid.xmax());
                for (n, tier) in textgrid.tiers().iter().enumerate() {
                    let size = match tier {
                        Tier::Interval(t) => t.len(),
                        Tier::Point(t) => t.points().len(),
                    };
                    println!(
                        "{:>3}  {:<12} {:<30} {} items",
                        n + 1,
                        tier.kind().praat_class(),
                        tier.name(),
                        size
                    );
                }
            }
        }

        Command::Watch => {
            let mut subscription = project.bus.subscribe()?;
            info!("Watching {}", project.bus.folder().display());
            loop {
                tokio::select! {
                    change = subscription.recv() => match change {
                        Some(change) => println!("{:?}\t{}", change.kind, change.unit),
                        None => break,
                    },
                    _ = signal::ctrl_c() => break,
                }
            }
        }

        Command::Align {
            unit,
            record,
            segment_only,
        } => {
            let textgrid = store.load(&unit.unit()?)?;
            let record = Record::load_json(&record)
                .with_context(|| format!("Failed to read record {}", record.display()))?;
            let alignment = if segment_only {
                annotate_record_segment(&textgrid, &record)?
            } else {
                annotate_record(&textgrid, &record)
            };
            for (id, entry) in alignment.iter() {
                let tier_name = record.tiers.get(id.tier).map(|t| t.name.as_str()).unwrap_or("?");
                println!(
                    "{}\t{}\t{:.3}\t{:.3}\t{}\t{:?}",
                    tier_name,
                    id,
                    entry.interval.xmin,
                    entry.interval.xmax,
                    entry.interval.text,
                    entry.source
                );
            }
        }

        Command::Import {
            corpus,
            session,
            file,
        } => {
            let unit = store.import_file(&file, &corpus, &session)?;
            println!("{}", store.path(&unit).display());
        }

        Command::Merge { corpus, session } => {
            let merged = store.merge_record_textgrids(&corpus, &session)?;
            println!(
                "Merged {} tiers into {}",
                merged.number_of_tiers(),
                store.path(&store.default_unit(&corpus, &session)?).display()
            );
        }

        Command::Open {
            unit,
            media,
            start,
            end,
            full_audio,
        } => {
            let unit = unit.unit()?;
            let audio_path = AudioResolver::new(&root).resolve(&media)?;
            let events = EventBus::new(config.events.capacity);
            let mut event_rx = events.subscribe();
            tokio::spawn(async move {
                loop {
                    match event_rx.recv().await {
                        Ok(event) => debug!("Event: {:?}", event),
                        Err(RecvError::Lagged(n)) => debug!("Missed {} events", n),
                        Err(RecvError::Closed) => break,
                    }
                }
            });
            let coordinator = Arc::new(RoundTripCoordinator::with_praat(
                store.clone(),
                events,
                &config.praat,
            ));

            let round_trip = coordinator
                .begin_send(RoundTripRequest {
                    unit: unit.clone(),
                    audio_path,
                    segment: MediaSegment::new(start, end)?,
                    use_full_audio: full_audio || config.praat.use_full_audio,
                })
                .await
                .context("Failed to send TextGrid to Praat")?;
            eprintln!(
                "{} is open in Praat. Use 'File > Send back to calling program' or press Ctrl+C to unlock.",
                unit
            );

            let mut finished = Box::pin(round_trip.finished());
            let outcome = tokio::select! {
                outcome = &mut finished => Some(outcome?),
                _ = signal::ctrl_c() => None,
            };
            let outcome = match outcome {
                Some(outcome) => outcome,
                None => {
                    coordinator.force_unlock(&unit)?;
                    finished.await?
                }
            };
            match outcome {
                RoundTripOutcome::Completed { reconciled: true, .. } => {
                    println!("Updated {}", store.path(&unit).display())
                }
                RoundTripOutcome::Completed { reconciled: false, .. } => {
                    bail!("Praat finished but no TextGrid was sent back; {} is unchanged", unit)
                }
                RoundTripOutcome::ForceUnlocked => println!("Unlocked {}", unit),
            }
        }
    }

    Ok(())
}
