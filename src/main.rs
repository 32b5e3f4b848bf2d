//! workout-optimizer - Hevy workout history analysis

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use workout_optimizer::analysis::{AnalysisResult, analyze};
use workout_optimizer::config::AnalysisConfig;
use workout_optimizer::db::Database;
use workout_optimizer::exercises::MuscleGroupMap;
use workout_optimizer::hevy::{self, HevyClient};
use workout_optimizer::logging::{self, LogTarget};
use workout_optimizer::report::{self, WeightUnit};
use workout_optimizer::sync;
use workout_optimizer::tui::App;

const DEFAULT_LOG_FILE: &str = "workout-optimizer.log";

#[derive(Parser)]
#[command(name = "workout-optimizer")]
#[command(author, version, about = "Analyse your Hevy workout history")]
struct Cli {
    /// SQLite database path
    #[arg(long, global = true, env = "WORKOUT_DB", default_value = "workouts.db")]
    db: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by every command that runs the analysis
#[derive(Args, Clone, Debug, PartialEq)]
struct AnalysisArgs {
    /// Rolling window for frequency and balance, in days
    #[arg(short, long, default_value_t = workout_optimizer::config::DEFAULT_WINDOW_DAYS)]
    days: i64,

    /// Sessions without change before an exercise counts as plateaued
    #[arg(short, long, default_value_t = workout_optimizer::config::DEFAULT_PLATEAU_THRESHOLD)]
    plateau: usize,

    /// Ignore sets below this many reps when picking the best set
    #[arg(long, default_value_t = workout_optimizer::config::DEFAULT_MIN_REPS)]
    min_reps: u32,

    /// JSON file mapping exercise names to muscle groups (replaces the built-in map)
    #[arg(long)]
    muscle_map: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = WeightUnit::Kg)]
    unit: WeightUnit,
}

impl AnalysisArgs {
    fn config(&self) -> AnalysisConfig {
        AnalysisConfig {
            window_days: self.days,
            plateau_threshold: self.plateau,
            min_reps: self.min_reps,
            ..AnalysisConfig::default()
        }
    }

    fn muscle_map(&self) -> Result<MuscleGroupMap> {
        match &self.muscle_map {
            Some(path) => MuscleGroupMap::from_json_file(path),
            None => Ok(MuscleGroupMap::builtin()),
        }
    }

    /// Run the analysis over every stored session
    fn run(&self, db: &Database) -> Result<AnalysisResult> {
        let sessions = db.get_sessions(None)?;
        let map = db.muscle_map(self.muscle_map()?)?;
        Ok(analyze(&sessions, &map, &self.config())?)
    }
}

impl Default for AnalysisArgs {
    fn default() -> Self {
        let config = AnalysisConfig::default();
        Self {
            days: config.window_days,
            plateau: config.plateau_threshold,
            min_reps: config.min_reps,
            muscle_map: None,
            unit: WeightUnit::default(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Open TUI dashboard
    Tui {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Log file while the dashboard owns the terminal
        #[arg(long, default_value = DEFAULT_LOG_FILE)]
        log_file: PathBuf,
    },

    /// Fetch new workouts from the Hevy API
    Sync {
        /// Hevy API key (or set HEVY_API_KEY env var)
        #[arg(long, env = "HEVY_API_KEY", hide_env_values = true)]
        api_key: String,

        #[arg(long, env = "HEVY_BASE_URL", default_value = hevy::BASE_URL)]
        base_url: String,

        /// Re-fetch the whole history and exercise templates
        #[arg(long, conflicts_with = "workout")]
        full: bool,

        /// Re-fetch a single workout by id
        #[arg(long)]
        workout: Option<String>,
    },

    /// Import workouts from a Hevy JSON export
    Import {
        file: PathBuf,
    },

    /// Print the full analysis report
    Analyze {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show progression of one exercise
    Progress {
        /// Exercise name (case-insensitive)
        exercise: String,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// List synced sessions
    List {
        /// Number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

fn run_tui(db: Database, args: &AnalysisArgs) -> Result<()> {
    let mut app = App::new(db, args.muscle_map()?, args.config(), args.unit)?;
    app.run()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Default: show TUI
    let command = cli.command.unwrap_or(Commands::Tui {
        analysis: AnalysisArgs::default(),
        log_file: PathBuf::from(DEFAULT_LOG_FILE),
    });

    let log_target = match &command {
        Commands::Tui { log_file, .. } => LogTarget::File(log_file.clone()),
        _ => LogTarget::Stderr,
    };
    logging::init(&log_target)?;

    let db = Database::open(&cli.db).with_context(|| format!("failed to open database {}", cli.db))?;

    match command {
        Commands::Tui { analysis, .. } => run_tui(db, &analysis)?,

        Commands::Sync { api_key, base_url, full, workout } => {
            let client = HevyClient::with_base_url(&api_key, &base_url)?;

            if let Some(id) = workout {
                sync::sync_workout(&client, &db, &id).await?;
                println!("Synced workout {}", id);
                return Ok(());
            }

            let summary = sync::sync(&client, &db, full).await?;
            info!("Sync finished: {:?}", summary);
            println!(
                "Synced {} workouts ({} skipped, {} deleted), {} sessions in database",
                summary.stored,
                summary.skipped,
                summary.deleted,
                db.session_count()?
            );
            if let Some(total) = summary.remote_total {
                println!("Hevy reports {} workouts", total);
            }
            if summary.templates > 0 {
                println!("Refreshed {} exercise templates", summary.templates);
            }
        }

        Commands::Import { file } => {
            let workouts = hevy::load_export(&file)?;
            let fetched = workouts.len();
            let sessions = hevy::into_sessions(workouts);
            let stored = db.upsert_sessions(&sessions)?;
            println!("Imported {} of {} workouts from {}", stored, fetched, file.display());
        }

        Commands::Analyze { analysis, json } => {
            let result = analysis.run(&db)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", report::render(&result, analysis.unit));
            }
        }

        Commands::Progress { exercise, analysis } => {
            let result = analysis.run(&db)?;

            let Some(progression) = result.exercise(&exercise) else {
                bail!("no sets logged for '{}'", exercise);
            };
            print!("{}", report::render_progression(progression, analysis.unit));
            println!("\n{}", workout_optimizer::analysis::exercise_suggestion(progression));
        }

        Commands::List { limit } => {
            let sessions = db.get_sessions(None)?;
            println!("Recent sessions:");
            println!("{:-<60}", "");
            for s in sessions.iter().rev().take(limit) {
                println!(
                    "{} | {:24} | {} exercises, {} sets",
                    s.started_at.format("%Y-%m-%d %H:%M"),
                    s.title.as_deref().unwrap_or("-"),
                    s.exercises.len(),
                    s.set_count()
                );
            }
        }
    }

    Ok(())
}
