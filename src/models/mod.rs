pub mod config;
pub mod depth;
pub mod playback;
pub mod series;
