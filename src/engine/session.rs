use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use super::scheduler::PlaybackScheduler;
use crate::errors::AppError;
use crate::models::depth::DepthSnapshot;
use crate::models::playback::{PlaybackCommand, PlaybackState};
use crate::models::series::Dataset;

/// Commands queued ahead of the loop before senders wait.
const COMMAND_QUEUE: usize = 64;

struct Request {
    command: PlaybackCommand,
    reply: oneshot::Sender<PlaybackState>,
}

/// One playback session over one dataset.
///
/// The scheduler lives inside a single tokio task. Commands reach it as
/// messages and are applied between frames, so they never race the advance
/// step. Every state change is published on a watch channel.
pub struct PlaybackSession {
    id: Uuid,
    dataset: Arc<Dataset>,
    commands: mpsc::Sender<Request>,
    state: watch::Receiver<PlaybackState>,
    task: Option<JoinHandle<()>>,
}

impl PlaybackSession {
    /// Start the advance loop. Must be called from within a tokio runtime.
    pub fn spawn(dataset: Arc<Dataset>, base_interval: Duration, frame_interval: Duration) -> Self {
        let scheduler = PlaybackScheduler::new(
            dataset.total_ticks,
            dataset.stride,
            dataset.sample_count(),
            base_interval,
        );
        let (state_tx, state_rx) = watch::channel(scheduler.state());
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);
        let id = Uuid::new_v4();

        let task = tokio::spawn(run_loop(scheduler, cmd_rx, state_tx, frame_interval));
        info!("Playback session {} started for dataset {}", id, dataset.id);

        Self {
            id,
            dataset,
            commands: cmd_tx,
            state: state_rx,
            task: Some(task),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// Deliver a command and wait for the state it produced.
    pub async fn send(&self, command: PlaybackCommand) -> Result<PlaybackState, AppError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Request { command, reply })
            .await
            .map_err(|_| AppError::PlaybackClosed)?;
        response.await.map_err(|_| AppError::PlaybackClosed)
    }

    /// Latest published state.
    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    /// Snapshot displayed at the current tick.
    pub fn current_snapshot(&self) -> Option<DepthSnapshot> {
        let state = self.state();
        self.dataset.samples.get(state.sample_index).cloned()
    }

    /// Receiver that wakes on every state change. Closes when the session ends.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }

    /// Stop the advance loop and wait until it has exited.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        info!("Playback session {} closed", self.id);
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_loop(
    mut scheduler: PlaybackScheduler,
    mut commands: mpsc::Receiver<Request>,
    state_tx: watch::Sender<PlaybackState>,
    frame_interval: Duration,
) {
    let mut frames = time::interval(frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_frame = Instant::now();

    loop {
        tokio::select! {
            request = commands.recv() => {
                let Some(Request { command, reply }) = request else {
                    break;
                };
                let was_playing = scheduler.is_playing();
                scheduler.apply(command);
                if scheduler.is_playing() && !was_playing {
                    frames.reset();
                    last_frame = Instant::now();
                }
                let state = scheduler.state();
                debug!("{:?} -> tick {} ({})", command, state.tick, state.status);
                state_tx.send_replace(state);
                let _ = reply.send(state);
            }
            // Idle sessions wait on commands only.
            _ = frames.tick(), if scheduler.is_playing() => {
                let now = Instant::now();
                let elapsed = now.duration_since(last_frame);
                last_frame = now;
                let advance = scheduler.advance(elapsed);
                if advance.steps > 0 {
                    state_tx.send_replace(scheduler.state());
                }
                if advance.reached_end {
                    info!("Playback reached end of stream at tick {}", scheduler.tick());
                }
            }
        }
    }
    debug!("Playback loop exited");
}
