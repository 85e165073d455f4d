//! Background publisher for retained MQTT artifacts.
//!
//! Four artifacts are kept fresh on the broker, each on its own cadence:
//!
//! | artifact          | default cadence | topics                        |
//! |-------------------|-----------------|-------------------------------|
//! | current walk      | 5 minutes       | walk                          |
//! | timetable 108/339 | 60 minutes      | full timetable + best trip    |
//! | walk history      | 6 hours         | walk-history                  |
//!
//! Architecture:
//! - Waits for the first broker ConnAck, then spawns one task per cadence;
//!   each task's first tick fires immediately (the initial publish).
//! - Every cycle recomputes its artifact from scratch and only publishes once
//!   the whole artifact has been computed. A failed cycle is logged and
//!   skipped; the broker keeps serving the last retained value. Publishing
//!   fails at once while the broker is down, so a cadence never stalls.
//! - `PublisherState` is diagnostics for the status endpoint only; no cycle
//!   ever reads it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::MissedTickBehavior;
use utoipa::ToSchema;

use crate::config::{CadenceConfig, TopicConfig};
use crate::errors::AppError;
use crate::services::mqtt::ArtifactSink;
use crate::services::open_meteo::OpenMeteoClient;
use crate::services::timetable::{best_trip, current_timetable, Route, Trip};

// ---------------------------------------------------------------------------
// Artifacts and cadences
// ---------------------------------------------------------------------------

/// Something the publisher keeps retained on the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    CurrentWalk,
    Timetable(Route),
    WalkHistory,
}

impl Artifact {
    pub fn name(self) -> String {
        match self {
            Artifact::CurrentWalk => "current_walk".to_string(),
            Artifact::Timetable(route) => format!("timetable_{}", route),
            Artifact::WalkHistory => "walk_history".to_string(),
        }
    }

    /// Every topic this artifact may publish to.
    fn topics(self, topics: &TopicConfig) -> Vec<String> {
        match self {
            Artifact::CurrentWalk => vec![topics.walk.clone()],
            Artifact::Timetable(route) => vec![
                topics.timetable(route).to_string(),
                topics.best(route).to_string(),
            ],
            Artifact::WalkHistory => vec![topics.walk_history.clone()],
        }
    }
}

/// How often one artifact is recomputed and republished.
#[derive(Debug, Clone)]
pub struct PublicationCadence {
    pub artifact: Artifact,
    pub interval: Duration,
}

/// The four standard cadences: current walk, one timetable per route, history.
pub fn default_cadences(config: &CadenceConfig) -> Vec<PublicationCadence> {
    let mut cadences = vec![PublicationCadence {
        artifact: Artifact::CurrentWalk,
        interval: config.current_walk,
    }];
    cadences.extend(Route::ALL.into_iter().map(|route| PublicationCadence {
        artifact: Artifact::Timetable(route),
        interval: config.timetable,
    }));
    cadences.push(PublicationCadence {
        artifact: Artifact::WalkHistory,
        interval: config.walk_history,
    });
    cadences
}

/// Everything a cycle needs to compute its artifact.
#[derive(Clone)]
pub struct PublisherContext {
    pub weather: OpenMeteoClient,
    pub topics: TopicConfig,
    pub walk_history_days: u32,
}

/// A fully computed message, ready for the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl Publication {
    fn json<T: Serialize>(topic: &str, value: &T) -> Result<Self, AppError> {
        let payload = serde_json::to_vec(value)
            .map_err(|e| AppError::Internal(format!("serializing {}: {}", topic, e)))?;
        Ok(Self {
            topic: topic.to_string(),
            payload,
        })
    }
}

// ---------------------------------------------------------------------------
// Publisher state (in-memory, shared via Arc<RwLock<>>)
// ---------------------------------------------------------------------------

/// Status of one artifact's cadence.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ArtifactStatus {
    pub artifact: String,
    pub topics: Vec<String>,
    pub interval_secs: u64,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    /// "published", "error: ...", or "pending"
    pub last_result: String,
    pub total_publishes: u64,
    pub total_failures: u64,
}

/// Global publisher state, exposed via the status endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublisherState {
    /// Whether the broker connection is currently up
    pub connected: bool,
    /// When the cadences were started (first ConnAck)
    pub started_at: Option<DateTime<Utc>>,
    pub artifacts: Vec<ArtifactStatus>,
}

impl PublisherState {
    pub fn new() -> Self {
        Self {
            connected: false,
            started_at: None,
            artifacts: Vec::new(),
        }
    }

    fn artifact_mut(&mut self, name: &str) -> Option<&mut ArtifactStatus> {
        self.artifacts.iter_mut().find(|a| a.artifact == name)
    }
}

impl Default for PublisherState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared publisher state handle.
pub type SharedPublisherState = Arc<RwLock<PublisherState>>;

// ---------------------------------------------------------------------------
// Compute
// ---------------------------------------------------------------------------

/// Full timetable, plus the best trip alone when there is one.
pub fn timetable_publications(
    route: Route,
    trips: &[Trip],
    topics: &TopicConfig,
) -> Result<Vec<Publication>, AppError> {
    let mut publications = vec![Publication::json(topics.timetable(route), &trips)?];
    match best_trip(trips) {
        Some(best) => publications.push(Publication::json(topics.best(route), best)?),
        None => tracing::info!(
            "Publisher: no recommended trip for route {}, keeping previous best",
            route
        ),
    }
    Ok(publications)
}

/// Compute every message of one artifact. Either all of them or an error.
pub async fn compute_publications(
    ctx: &PublisherContext,
    artifact: Artifact,
) -> Result<Vec<Publication>, AppError> {
    match artifact {
        Artifact::CurrentWalk => {
            let sample = ctx.weather.fetch_current_walk().await?;
            Ok(vec![Publication::json(&ctx.topics.walk, &sample)?])
        }
        Artifact::Timetable(route) => {
            let trips = current_timetable(&ctx.weather, route).await?;
            timetable_publications(route, &trips, &ctx.topics)
        }
        Artifact::WalkHistory => {
            let history = ctx.weather.fetch_walk_history(ctx.walk_history_days).await?;
            Ok(vec![Publication::json(&ctx.topics.walk_history, &history)?])
        }
    }
}

/// One cycle: compute the artifact, then publish its messages.
/// Returns the number of messages published.
pub async fn publish_cycle<S: ArtifactSink>(
    ctx: &PublisherContext,
    sink: &S,
    artifact: Artifact,
) -> Result<usize, AppError> {
    let publications = compute_publications(ctx, artifact).await?;
    let count = publications.len();
    for (sent, publication) in publications.into_iter().enumerate() {
        let topic = publication.topic;
        if let Err(e) = sink.publish_retained(&topic, publication.payload).await {
            if sent > 0 {
                tracing::warn!(
                    "Publisher: {} partially published ({} of {} messages) before {} failed",
                    artifact.name(),
                    sent,
                    count,
                    topic
                );
            }
            let reason = match e {
                AppError::Publish(msg) => msg,
                other => other.to_string(),
            };
            return Err(AppError::Publish(format!("{}: {}", topic, reason)));
        }
        tracing::debug!("Publisher: published {}", topic);
    }
    Ok(count)
}

// ---------------------------------------------------------------------------
// Main publisher loop
// ---------------------------------------------------------------------------

/// Run the publisher. Returns only if the connection watch is dropped
/// before the first ConnAck.
///
/// Should be spawned via `tokio::spawn(run_publisher(...))`.
pub async fn run_publisher<S: ArtifactSink>(
    ctx: PublisherContext,
    sink: S,
    cadences: Vec<PublicationCadence>,
    state: SharedPublisherState,
    mut connected: watch::Receiver<bool>,
) {
    tracing::info!("Publisher waiting for broker connection");
    let came_up = connected.wait_for(|up| *up).await.is_ok();
    if !came_up {
        tracing::error!("Publisher: broker event loop stopped before connecting");
        return;
    }

    {
        let mut s = state.write().await;
        s.connected = true;
        s.started_at = Some(Utc::now());
        s.artifacts = cadences
            .iter()
            .map(|c| ArtifactStatus {
                artifact: c.artifact.name(),
                topics: c.artifact.topics(&ctx.topics),
                interval_secs: c.interval.as_secs(),
                last_attempt_at: None,
                last_success_at: None,
                last_result: "pending".to_string(),
                total_publishes: 0,
                total_failures: 0,
            })
            .collect();
    }

    tracing::info!("Publisher started with {} cadences", cadences.len());

    let mut handles = Vec::with_capacity(cadences.len() + 1);
    handles.push(tokio::spawn(track_connection(connected, state.clone())));
    for cadence in cadences {
        handles.push(tokio::spawn(run_cadence(
            ctx.clone(),
            sink.clone(),
            cadence,
            state.clone(),
        )));
    }

    for result in futures::future::join_all(handles).await {
        if let Err(e) = result {
            tracing::error!("Publisher: task ended abnormally: {}", e);
        }
    }
}

/// Mirror the broker connection flag into the status state.
async fn track_connection(mut connected: watch::Receiver<bool>, state: SharedPublisherState) {
    while connected.changed().await.is_ok() {
        let up = *connected.borrow_and_update();
        state.write().await.connected = up;
    }
}

/// Tick forever, publishing the artifact on every tick (the first is immediate).
async fn run_cadence<S: ArtifactSink>(
    ctx: PublisherContext,
    sink: S,
    cadence: PublicationCadence,
    state: SharedPublisherState,
) {
    let name = cadence.artifact.name();
    let mut ticker = tokio::time::interval(tick_period(cadence.interval));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let result = publish_cycle(&ctx, &sink, cadence.artifact).await;
        match &result {
            Ok(count) => tracing::info!("Publisher: {} published ({} messages)", name, count),
            Err(e) => tracing::error!("Publisher: {} skipped this cycle: {}", name, e),
        }
        record_cycle(&state, &name, &result).await;
    }
}

/// `interval()` panics on a zero period.
fn tick_period(interval: Duration) -> Duration {
    interval.max(Duration::from_secs(1))
}

async fn record_cycle(state: &SharedPublisherState, name: &str, result: &Result<usize, AppError>) {
    let mut s = state.write().await;
    let Some(status) = s.artifact_mut(name) else {
        return;
    };
    let now = Utc::now();
    status.last_attempt_at = Some(now);
    match result {
        Ok(_) => {
            status.last_success_at = Some(now);
            status.last_result = "published".to_string();
            status.total_publishes += 1;
        }
        Err(e) => {
            status.last_result = format!("error: {}", e);
            status.total_failures += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
