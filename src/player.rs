use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::data::downsampler::{self, IngestOptions, IngestProgress};
use crate::data::source::{FileSource, RecordSource};
use crate::data::store::SnapshotStore;
use crate::engine::session::PlaybackSession;
use crate::errors::AppError;
use crate::models::config::PlayerConfig;
use crate::models::depth::DepthSnapshot;
use crate::models::playback::{PlaybackCommand, PlaybackState};
use crate::models::series::{Dataset, IngestSummary, SeriesView};

/// Ingestion, query and playback behind one handle.
///
/// The store and the playback session change together: a successful
/// ingestion publishes the new series and replaces the session while holding
/// the session lock, so a command never runs against a session built for a
/// different series than the store reports.
///
/// Every ingestion gets a generation number and its own cancel flag. An
/// ingestion that finishes after a newer one has already published is
/// discarded.
pub struct DepthPlayer {
    config: PlayerConfig,
    store: SnapshotStore,
    session: Mutex<Option<PlaybackSession>>,
    /// Cancel flag of the most recently started ingestion.
    cancel_flag: ArcSwap<AtomicBool>,
    /// Last generation handed out.
    started: AtomicU64,
    /// Generation of the published dataset. Written only under the session lock.
    published: AtomicU64,
}

impl DepthPlayer {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            store: SnapshotStore::new(),
            session: Mutex::new(None),
            cancel_flag: ArcSwap::from_pointee(AtomicBool::new(false)),
            started: AtomicU64::new(0),
            published: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    // ── Ingestion ──

    /// Downsample `source` on a blocking worker and publish the result.
    ///
    /// On failure the previously published series and its playback session
    /// stay active. So they do when a newer ingestion published first; this
    /// one then fails with `IngestionSuperseded`.
    pub async fn ingest(
        &self,
        source: Arc<dyn RecordSource>,
        progress: impl Fn(IngestProgress) + Send + 'static,
    ) -> Result<IngestSummary, AppError> {
        let generation = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel_flag = Arc::new(AtomicBool::new(false));
        self.cancel_flag.store(cancel_flag.clone());
        let options = IngestOptions::from(&self.config);
        let description = source.describe();

        let series = tokio::task::spawn_blocking(move || {
            downsampler::ingest(source.as_ref(), options, &cancel_flag, progress)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?;

        let series = match series {
            Ok(series) => series,
            Err(e) => {
                warn!("Ingestion of {} failed: {}", description, e);
                return Err(e);
            }
        };

        let mut session = self.session.lock().await;
        if generation < self.published.load(Ordering::SeqCst) {
            warn!(
                "Discarding ingestion of {}: a newer dataset is already active",
                description
            );
            return Err(AppError::IngestionSuperseded);
        }
        self.published.store(generation, Ordering::SeqCst);
        let dataset = self.store.publish(series);
        if let Some(old) = session.take() {
            old.shutdown().await;
        }
        *session = Some(PlaybackSession::spawn(
            dataset.clone(),
            self.config.base_interval(),
            self.config.frame_interval(),
        ));

        Ok(dataset.summary())
    }

    /// Ingest a CSV file from disk.
    pub async fn ingest_file(
        &self,
        path: impl Into<PathBuf>,
        progress: impl Fn(IngestProgress) + Send + 'static,
    ) -> Result<IngestSummary, AppError> {
        self.ingest(Arc::new(FileSource::new(path)), progress).await
    }

    /// Ask the most recently started ingestion to stop at its next checkpoint.
    pub fn cancel_ingest(&self) {
        info!("Cancelling ingestion");
        self.cancel_flag.load().store(true, Ordering::Relaxed);
    }

    // ── Query ──

    /// Active dataset, or `None` before the first successful ingestion.
    pub fn dataset(&self) -> Option<Arc<Dataset>> {
        self.store.current()
    }

    /// Full series payload, or `None` if nothing has been ingested.
    pub fn orderbook(&self) -> Option<SeriesView> {
        self.store.current().map(|ds| ds.view())
    }

    /// First `limit` retained samples.
    pub fn preview(&self, limit: usize) -> Result<Vec<DepthSnapshot>, AppError> {
        let dataset = self.store.current().ok_or(AppError::NoData)?;
        Ok(dataset.samples.iter().take(limit).cloned().collect())
    }

    // ── Playback ──

    pub async fn command(&self, command: PlaybackCommand) -> Result<PlaybackState, AppError> {
        let session = self.session.lock().await;
        match session.as_ref() {
            Some(s) => s.send(command).await,
            None => Err(AppError::NoData),
        }
    }

    pub async fn play(&self) -> Result<PlaybackState, AppError> {
        self.command(PlaybackCommand::Play).await
    }

    pub async fn pause(&self) -> Result<PlaybackState, AppError> {
        self.command(PlaybackCommand::Pause).await
    }

    pub async fn stop(&self) -> Result<PlaybackState, AppError> {
        self.command(PlaybackCommand::Stop).await
    }

    pub async fn seek(&self, tick: i64) -> Result<PlaybackState, AppError> {
        self.command(PlaybackCommand::Seek(tick)).await
    }

    pub async fn jump(&self, delta: i64) -> Result<PlaybackState, AppError> {
        self.command(PlaybackCommand::Jump(delta)).await
    }

    pub async fn set_speed(&self, multiplier: f64) -> Result<PlaybackState, AppError> {
        self.command(PlaybackCommand::SetSpeed(multiplier)).await
    }

    /// Jump forward by the configured step.
    pub async fn step_forward(&self) -> Result<PlaybackState, AppError> {
        self.jump(self.config.jump_step as i64).await
    }

    /// Jump back by the configured step.
    pub async fn step_back(&self) -> Result<PlaybackState, AppError> {
        self.jump(-(self.config.jump_step as i64)).await
    }

    pub async fn current_state(&self) -> Option<PlaybackState> {
        self.session.lock().await.as_ref().map(|s| s.state())
    }

    pub async fn current_snapshot(&self) -> Option<DepthSnapshot> {
        self.session
            .lock()
            .await
            .as_ref()
            .and_then(|s| s.current_snapshot())
    }

    /// Dataset and state updates of the active session.
    pub async fn subscribe(&self) -> Option<(Arc<Dataset>, watch::Receiver<PlaybackState>)> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| (s.dataset().clone(), s.subscribe()))
    }

    /// Tear down the active playback session, if any.
    pub async fn close(&self) {
        if let Some(session) = self.session.lock().await.take() {
            session.shutdown().await;
        }
    }
}
