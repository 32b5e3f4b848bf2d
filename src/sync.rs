//! Sync - pull Hevy changes into the local store

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::db::Database;
use crate::hevy::{self, HevyClient, WorkoutEvent};

/// What one sync run changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Workouts received from the API
    pub fetched: usize,
    pub stored: usize,
    pub deleted: usize,
    /// Workouts that could not be converted
    pub skipped: usize,
    /// Exercise templates refreshed (0 when the cached set was reused)
    pub templates: usize,
    /// Workout count reported by Hevy, checked on full syncs
    pub remote_total: Option<u64>,
}

/// Bring the store up to date.
///
/// A first run (or `full`) pages the whole history. After that only the
/// workout events since the previous sync are applied, so edits and
/// deletions made in Hevy reach the store too. Exercise templates are
/// fetched when none are cached or on a full sync.
pub async fn sync(client: &HevyClient, db: &Database, full: bool) -> Result<SyncSummary> {
    let started = Utc::now();
    let mut summary = SyncSummary::default();

    if full || db.template_count()? == 0 {
        let templates = client.get_all_exercise_templates().await?;
        summary.templates = db.replace_templates(&templates)?;
    }

    let last_sync = if full { None } else { db.last_sync()? };

    match last_sync {
        Some(since) => {
            info!("Applying workout events since {}", since);
            for event in client.get_all_workout_events(since).await? {
                match event {
                    WorkoutEvent::Updated { workout } => {
                        summary.fetched += 1;
                        match workout.into_session() {
                            Ok(session) => {
                                db.upsert_session(&session)?;
                                summary.stored += 1;
                            }
                            Err(e) => {
                                warn!("Skipping workout: {}", e);
                                summary.skipped += 1;
                            }
                        }
                    }
                    WorkoutEvent::Deleted { id, .. } => {
                        if db.delete_session(&id)? {
                            summary.deleted += 1;
                        }
                    }
                }
            }
        }
        None => {
            // imported data without a sync mark: only fetch what is newer
            let since = if full { None } else { db.latest_session_start()? };
            let workouts = client.get_all_workouts(since).await?;
            summary.fetched = workouts.len();
            if full {
                let total = client.get_workout_count().await?;
                if total != summary.fetched as u64 {
                    warn!("Hevy reports {} workouts, fetched {}", total, summary.fetched);
                }
                summary.remote_total = Some(total);
            }
            let sessions = hevy::into_sessions(workouts);
            summary.stored = db.upsert_sessions(&sessions)?;
            summary.skipped = summary.fetched - summary.stored;
        }
    }

    db.set_last_sync(started)?;
    Ok(summary)
}

/// Re-fetch one workout by id and store it
pub async fn sync_workout(client: &HevyClient, db: &Database, workout_id: &str) -> Result<()> {
    let session = client.get_workout(workout_id).await?.into_session()?;
    db.upsert_session(&session)?;
    Ok(())
}
