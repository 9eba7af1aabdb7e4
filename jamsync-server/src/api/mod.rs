//! HTTP API handlers

pub mod health;
pub mod songs;
pub mod tracks;

pub use health::{build_info, health_check, health_routes};
pub use songs::{create_song, get_sections, get_sheet, get_song, save_lyrics, save_sections};
pub use tracks::{import, search_tracks};
