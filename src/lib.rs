#[cfg(feature = "desktop")]
pub mod commands;
pub mod data;
pub mod engine;
pub mod errors;
pub mod models;
pub mod player;
pub mod utils;

use tracing_subscriber::EnvFilter;

pub use player::DepthPlayer;

/// Install the global tracing subscriber. `RUST_LOG` wins; otherwise `info`.
/// Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[cfg(feature = "desktop")]
mod desktop {
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;

    use tracing::info;

    use crate::models::config::PlayerConfig;
    use crate::player::DepthPlayer;
    use crate::{commands, init_tracing};

    /// Shared application state, accessible from all Tauri commands.
    pub struct AppState {
        pub player: Arc<DepthPlayer>,
        pub data_dir: PathBuf,
    }

    /// Resolve the application data directory and ensure it exists.
    fn get_data_dir() -> PathBuf {
        let dir = resolve_data_path().unwrap_or_else(|| PathBuf::from("./data"));
        fs::create_dir_all(&dir).ok();
        fs::create_dir_all(dir.join("exports")).ok();
        dir
    }

    /// Platform-aware data directory.
    fn resolve_data_path() -> Option<PathBuf> {
        let exe = std::env::current_exe().ok()?;
        let base = exe.parent()?;

        if cfg!(debug_assertions) {
            // target/debug -> project root
            let mut dir = base.to_path_buf();
            for _ in 0..2 {
                dir = dir.parent()?.to_path_buf();
            }
            Some(dir.join("data"))
        } else {
            Some(base.join("data"))
        }
    }

    #[cfg_attr(mobile, tauri::mobile_entry_point)]
    pub fn run() {
        init_tracing();
        info!("Starting Depth Player");

        let data_dir = get_data_dir();
        let config_path = data_dir.join("player.toml");
        let config = PlayerConfig::resolve(Some(&config_path))
            .expect("Failed to load player configuration");
        info!(
            "Config: sample budget {}, base interval {}ms, frame interval {}ms",
            config.sample_budget, config.base_interval_ms, config.frame_interval_ms
        );

        let app_state = AppState {
            player: Arc::new(DepthPlayer::new(config)),
            data_dir,
        };

        tauri::Builder::default()
            .plugin(tauri_plugin_dialog::init())
            .plugin(tauri_plugin_fs::init())
            .manage(app_state)
            .invoke_handler(tauri::generate_handler![
                commands::upload_csv,
                commands::cancel_upload,
                commands::get_orderbook,
                commands::preview_data,
                commands::get_speed_presets,
                commands::play,
                commands::pause,
                commands::stop,
                commands::seek,
                commands::jump,
                commands::set_speed,
                commands::step_forward,
                commands::step_back,
                commands::get_playback_state,
                commands::get_current_snapshot,
                commands::export_samples,
                commands::export_mid_prices,
            ])
            .run(tauri::generate_context!())
            .expect("error while running tauri application");
    }
}

#[cfg(feature = "desktop")]
pub use desktop::{run, AppState};
