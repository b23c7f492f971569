use std::path::PathBuf;

use serde::Serialize;
use tauri::{AppHandle, Emitter};
use tracing::{debug, info};
use uuid::Uuid;

use crate::data::downsampler::IngestProgress;
use crate::errors::AppError;
use crate::models::depth::DepthSnapshot;
use crate::models::playback::PlaybackState;
use crate::models::series::{IngestSummary, SeriesView};
use crate::utils::export;
use crate::AppState;

/// Payload of the `playback-frame` event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct FramePayload {
    dataset_id: Uuid,
    state: PlaybackState,
    snapshot: Option<DepthSnapshot>,
}

// ── Data Commands ──

/// Downsample a CSV file into the active series and start a fresh playback
/// session over it.
#[tauri::command]
pub async fn upload_csv(
    app: AppHandle,
    state: tauri::State<'_, AppState>,
    file_path: String,
) -> Result<IngestSummary, AppError> {
    let path = PathBuf::from(&file_path);
    info!("Uploading {}", path.display());

    let progress_app = app.clone();
    let summary = state
        .player
        .ingest_file(path, move |progress| emit_progress(&progress_app, progress))
        .await?;

    spawn_frame_forwarder(app, &state).await;

    info!(
        "Dataset {} ready: {} samples over {} ticks",
        summary.dataset_id, summary.sample_count, summary.total_ticks
    );
    Ok(summary)
}

/// Cancel a running upload.
#[tauri::command]
pub async fn cancel_upload(state: tauri::State<'_, AppState>) -> Result<(), AppError> {
    state.player.cancel_ingest();
    Ok(())
}

/// Full sample series, or `null` before the first upload.
#[tauri::command]
pub async fn get_orderbook(
    state: tauri::State<'_, AppState>,
) -> Result<Option<SeriesView>, AppError> {
    Ok(state.player.orderbook())
}

/// First N retained samples.
#[tauri::command]
pub async fn preview_data(
    state: tauri::State<'_, AppState>,
    limit: usize,
) -> Result<Vec<DepthSnapshot>, AppError> {
    state.player.preview(limit)
}

#[tauri::command]
pub async fn get_speed_presets(state: tauri::State<'_, AppState>) -> Result<Vec<f64>, AppError> {
    Ok(state.player.config().speed_presets.clone())
}

// ── Playback Commands ──

#[tauri::command]
pub async fn play(state: tauri::State<'_, AppState>) -> Result<PlaybackState, AppError> {
    state.player.play().await
}

#[tauri::command]
pub async fn pause(state: tauri::State<'_, AppState>) -> Result<PlaybackState, AppError> {
    state.player.pause().await
}

#[tauri::command]
pub async fn stop(state: tauri::State<'_, AppState>) -> Result<PlaybackState, AppError> {
    state.player.stop().await
}

#[tauri::command]
pub async fn seek(
    state: tauri::State<'_, AppState>,
    tick: i64,
) -> Result<PlaybackState, AppError> {
    state.player.seek(tick).await
}

#[tauri::command]
pub async fn jump(
    state: tauri::State<'_, AppState>,
    delta: i64,
) -> Result<PlaybackState, AppError> {
    state.player.jump(delta).await
}

#[tauri::command]
pub async fn set_speed(
    state: tauri::State<'_, AppState>,
    multiplier: f64,
) -> Result<PlaybackState, AppError> {
    state.player.set_speed(multiplier).await
}

#[tauri::command]
pub async fn step_forward(state: tauri::State<'_, AppState>) -> Result<PlaybackState, AppError> {
    state.player.step_forward().await
}

#[tauri::command]
pub async fn step_back(state: tauri::State<'_, AppState>) -> Result<PlaybackState, AppError> {
    state.player.step_back().await
}

#[tauri::command]
pub async fn get_playback_state(
    state: tauri::State<'_, AppState>,
) -> Result<Option<PlaybackState>, AppError> {
    Ok(state.player.current_state().await)
}

#[tauri::command]
pub async fn get_current_snapshot(
    state: tauri::State<'_, AppState>,
) -> Result<Option<DepthSnapshot>, AppError> {
    Ok(state.player.current_snapshot().await)
}

// ── Export Commands ──

/// Write the retained samples as CSV. Returns the written path.
#[tauri::command]
pub async fn export_samples(
    state: tauri::State<'_, AppState>,
    file_path: Option<String>,
) -> Result<String, AppError> {
    let dataset = state.player.dataset().ok_or(AppError::NoData)?;
    let path = export_path(&state, file_path, &format!("samples_{}.csv", dataset.id));
    export::write_samples_csv(&dataset, &path)?;
    info!("Exported {} samples to {}", dataset.sample_count(), path.display());
    Ok(path.to_string_lossy().to_string())
}

/// Write the mid-price history as CSV. Returns the written path.
#[tauri::command]
pub async fn export_mid_prices(
    state: tauri::State<'_, AppState>,
    file_path: Option<String>,
) -> Result<String, AppError> {
    let dataset = state.player.dataset().ok_or(AppError::NoData)?;
    let path = export_path(&state, file_path, &format!("mid_prices_{}.csv", dataset.id));
    export::write_mid_price_csv(&dataset, &path)?;
    info!("Exported mid prices to {}", path.display());
    Ok(path.to_string_lossy().to_string())
}

// ── Helpers ──

/// Forward ingestion progress to the frontend. `percent` is `null` during
/// the counting pass; `rowsRead` carries the progress there.
fn emit_progress(app: &AppHandle, progress: IngestProgress) {
    let _ = app.emit(
        "ingest-progress",
        serde_json::json!({
            "percent": progress.percent(),
            "phase": progress.phase,
            "rowsRead": progress.rows_read,
            "totalRows": progress.total_rows,
            "samples": progress.samples,
        }),
    );
}

/// Relay every state change of the active session as a `playback-frame`
/// event. The relay ends when the session is replaced or closed.
async fn spawn_frame_forwarder(app: AppHandle, state: &AppState) {
    let Some((dataset, mut updates)) = state.player.subscribe().await else {
        return;
    };
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let playback = *updates.borrow_and_update();
            let payload = FramePayload {
                dataset_id: dataset.id,
                state: playback,
                snapshot: dataset.samples.get(playback.sample_index).cloned(),
            };
            let _ = app.emit("playback-frame", payload);
        }
        debug!("Frame relay for dataset {} ended", dataset.id);
    });
}

fn export_path(state: &AppState, file_path: Option<String>, default_name: &str) -> PathBuf {
    match file_path {
        Some(p) => PathBuf::from(p),
        None => state.data_dir.join("exports").join(default_name),
    }
}
