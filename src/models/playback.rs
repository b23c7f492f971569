use serde::{Deserialize, Serialize};

/// Playback state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// Not advancing; entered with the cursor reset to 0.
    Stopped,
    Playing,
    /// Not advancing; cursor kept where it was.
    Paused,
}

impl PlaybackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackStatus::Stopped => "stopped",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
        }
    }
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub tick: u64,
    pub playing: bool,
    pub speed_multiplier: f64,
    pub status: PlaybackStatus,
    pub total_ticks: u64,
    pub stride: u64,
    /// Index into the sample series for `tick`.
    pub sample_index: usize,
}

impl PlaybackState {
    /// Cursor position as a fraction of the stream, for the timeline.
    pub fn progress(&self) -> f64 {
        if self.total_ticks == 0 {
            0.0
        } else {
            self.tick as f64 / self.total_ticks as f64
        }
    }
}

/// Commands accepted by a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum PlaybackCommand {
    Play,
    Pause,
    Stop,
    /// Absolute tick; values outside the stream are clamped.
    Seek(i64),
    Jump(i64),
    SetSpeed(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress() {
        let state = PlaybackState {
            tick: 250,
            playing: false,
            speed_multiplier: 1.0,
            status: PlaybackStatus::Paused,
            total_ticks: 1000,
            stride: 10,
            sample_index: 25,
        };
        assert!((state.progress() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_command_wire_format() {
        let cmd: PlaybackCommand = serde_json::from_str(r#"{"type":"jump","value":-100}"#).unwrap();
        assert_eq!(cmd, PlaybackCommand::Jump(-100));
        let cmd: PlaybackCommand = serde_json::from_str(r#"{"type":"setSpeed","value":2.0}"#).unwrap();
        assert_eq!(cmd, PlaybackCommand::SetSpeed(2.0));
        let cmd: PlaybackCommand = serde_json::from_str(r#"{"type":"play"}"#).unwrap();
        assert_eq!(cmd, PlaybackCommand::Play);
    }

    #[test]
    fn test_negative_seek_deserializes() {
        let cmd: PlaybackCommand = serde_json::from_str(r#"{"type":"seek","value":-5}"#).unwrap();
        assert_eq!(cmd, PlaybackCommand::Seek(-5));
    }
}
