//! Hevy API client - read-only access to workout history
//!
//! Docs: https://api.hevyapp.com/docs/

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::AnalysisError;
use crate::models::{ExerciseEntry, ExerciseTemplate, Session, SetRecord};

pub const BASE_URL: &str = "https://api.hevyapp.com/v1";

/// Largest page the workouts endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 10;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Pause between page requests
const PAGE_DELAY: Duration = Duration::from_secs(1);

/// Set as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HevySet {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default, rename = "type")]
    pub set_type: Option<String>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub reps: Option<i64>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub rpe: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HevyExercise {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub exercise_template_id: Option<String>,
    #[serde(default)]
    pub sets: Vec<HevySet>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HevyWorkout {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub exercises: Vec<HevyExercise>,
}

/// One page of `GET /workouts`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPage {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "first_page")]
    pub page_count: u32,
    #[serde(default)]
    pub workouts: Vec<HevyWorkout>,
}

fn first_page() -> u32 {
    1
}

impl WorkoutPage {
    pub fn has_more(&self) -> bool {
        self.page < self.page_count
    }
}

#[derive(Debug, Deserialize)]
struct WorkoutCount {
    #[serde(default)]
    workout_count: u64,
}

/// `GET /workouts/{id}` answers either bare or wrapped in `{"workout": ...}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SingleWorkout {
    Wrapped { workout: HevyWorkout },
    Bare(HevyWorkout),
}

/// Change to a workout since a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkoutEvent {
    /// Created or edited; carries the current version
    Updated { workout: HevyWorkout },
    Deleted {
        id: String,
        #[serde(default)]
        deleted_at: Option<String>,
    },
}

/// One page of `GET /workouts/events`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EventPage {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "first_page")]
    pub page_count: u32,
    #[serde(default)]
    pub events: Vec<WorkoutEvent>,
}

/// One page of `GET /exercise_templates`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TemplatePage {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "first_page")]
    pub page_count: u32,
    #[serde(default)]
    pub exercise_templates: Vec<ExerciseTemplate>,
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            // naive ISO timestamps are taken as UTC
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|n| n.and_utc())
        })
}

impl HevySet {
    fn is_warmup(&self) -> bool {
        self.set_type.as_deref() == Some("warmup")
    }

    fn to_record(&self) -> SetRecord {
        SetRecord {
            weight_kg: self.weight_kg,
            // negative counts are bogus; the analyzer drops the set if nothing else is left
            reps: self.reps.and_then(|r| u32::try_from(r).ok()),
            rpe: self.rpe,
            duration_secs: self.duration_seconds.and_then(|d| u32::try_from(d).ok()),
        }
    }
}

impl HevyWorkout {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.start_time.as_deref().and_then(parse_timestamp)
    }

    /// Convert to the analysis model. Warm-up sets are not counted.
    pub fn into_session(self) -> Result<Session, AnalysisError> {
        let id = self.id.clone().unwrap_or_default();
        if id.is_empty() {
            return Err(AnalysisError::malformed("<unknown>", "workout without an id"));
        }
        let Some(started_at) = self.started_at() else {
            return Err(AnalysisError::malformed(
                &id,
                format!("missing or invalid start_time {:?}", self.start_time),
            ));
        };

        let mut exercises = self.exercises;
        exercises.sort_by_key(|e| e.index.unwrap_or(u32::MAX));

        let exercises = exercises
            .into_iter()
            .map(|e| {
                let name = e
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .or_else(|| e.exercise_template_id.clone())
                    .unwrap_or_default();
                let sets = e
                    .sets
                    .iter()
                    .filter(|s| !s.is_warmup())
                    .map(HevySet::to_record)
                    .collect();
                ExerciseEntry {
                    name,
                    template_id: e.exercise_template_id,
                    sets,
                }
            })
            .collect();

        Ok(Session {
            id,
            title: self.title,
            started_at,
            exercises,
        })
    }
}

/// Convert a batch, skipping (and logging) workouts that can't be used
pub fn into_sessions(workouts: Vec<HevyWorkout>) -> Vec<Session> {
    workouts
        .into_iter()
        .filter_map(|w| match w.into_session() {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Skipping workout: {}", e);
                None
            }
        })
        .collect()
}

/// Parse a JSON export: either `{"workouts": [...]}` or a bare array
pub fn parse_export(json: &str) -> Result<Vec<HevyWorkout>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Export {
        Page { workouts: Vec<HevyWorkout> },
        List(Vec<HevyWorkout>),
    }

    let export: Export = serde_json::from_str(json).context("not a Hevy workout export")?;
    Ok(match export {
        Export::Page { workouts } => workouts,
        Export::List(workouts) => workouts,
    })
}

pub fn load_export(path: &Path) -> Result<Vec<HevyWorkout>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_export(&json)
}

/// Async client for the Hevy public API
pub struct HevyClient {
    client: reqwest::Client,
    base_url: String,
    page_delay: Duration,
}

impl HevyClient {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key).context("API key is not a valid header value")?;
        key.set_sensitive(true);
        headers.insert("api-key", key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_delay: PAGE_DELAY,
        })
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Hevy API returned {} for {}: {}", status, path, body);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("unexpected response body from {}", path))
    }

    /// One page of workouts, newest first
    pub async fn get_workouts(&self, page: u32, page_size: u32) -> Result<WorkoutPage> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self.get_json(
            "/workouts",
            &[("page", page.max(1).to_string()), ("pageSize", page_size.to_string())],
        )
        .await
    }

    pub async fn get_workout(&self, workout_id: &str) -> Result<HevyWorkout> {
        let workout: SingleWorkout = self.get_json(&format!("/workouts/{}", workout_id), &[]).await?;
        Ok(match workout {
            SingleWorkout::Wrapped { workout } => workout,
            SingleWorkout::Bare(workout) => workout,
        })
    }

    pub async fn get_workout_events(&self, since: DateTime<Utc>, page: u32, page_size: u32) -> Result<EventPage> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self.get_json(
            "/workouts/events",
            &[
                ("page", page.max(1).to_string()),
                ("pageSize", page_size.to_string()),
                ("since", since.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            ],
        )
        .await
    }

    /// Every update and deletion since `since`, oldest page last
    pub async fn get_all_workout_events(&self, since: DateTime<Utc>) -> Result<Vec<WorkoutEvent>> {
        let mut all = Vec::new();
        let mut page = 1;

        loop {
            let response = self.get_workout_events(since, page, MAX_PAGE_SIZE).await?;
            let fetched = response.events.len();
            debug!("Fetched events page {}/{} ({} events)", page, response.page_count, fetched);
            let has_more = response.page < response.page_count;
            all.extend(response.events);

            if fetched == 0 || !has_more {
                break;
            }
            page += 1;
            tokio::time::sleep(self.page_delay).await;
        }

        info!("Fetched {} workout events since {}", all.len(), since);
        Ok(all)
    }

    pub async fn get_exercise_templates(&self, page: u32, page_size: u32) -> Result<TemplatePage> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self.get_json(
            "/exercise_templates",
            &[("page", page.max(1).to_string()), ("pageSize", page_size.to_string())],
        )
        .await
    }

    /// Whole template catalogue, built-in and custom
    pub async fn get_all_exercise_templates(&self) -> Result<Vec<ExerciseTemplate>> {
        let mut all = Vec::new();
        let mut page = 1;

        loop {
            let response = self.get_exercise_templates(page, MAX_PAGE_SIZE).await?;
            let fetched = response.exercise_templates.len();
            let has_more = response.page < response.page_count;
            all.extend(response.exercise_templates);

            if fetched == 0 || !has_more {
                break;
            }
            page += 1;
            tokio::time::sleep(self.page_delay).await;
        }

        info!("Fetched {} exercise templates", all.len());
        Ok(all)
    }

    pub async fn get_workout_count(&self) -> Result<u64> {
        let count: WorkoutCount = self.get_json("/workouts/count", &[]).await?;
        Ok(count.workout_count)
    }

    /// Page through the whole history. With `since`, stops at the first page
    /// that reaches workouts started at or before it.
    pub async fn get_all_workouts(&self, since: Option<DateTime<Utc>>) -> Result<Vec<HevyWorkout>> {
        let mut all = Vec::new();
        let mut page = 1;

        loop {
            let response = self.get_workouts(page, MAX_PAGE_SIZE).await?;
            let fetched = response.workouts.len();
            let has_more = response.has_more();

            let mut reached_known = false;
            for workout in response.workouts {
                match (since, workout.started_at()) {
                    (Some(since), Some(at)) if at <= since => reached_known = true,
                    _ => all.push(workout),
                }
            }

            info!("Fetched page {}/{} ({} workouts)", page, response.page_count, fetched);

            if fetched == 0 || !has_more || reached_known {
                break;
            }

            page += 1;
            tokio::time::sleep(self.page_delay).await;
        }

        Ok(all)
    }
}
