//! # JamSync Common Library
//!
//! Shared code for the JamSync server and its clients:
//! - Song sheet model and the editor boundary shape
//! - Beat-position coordinate system (chord ↔ word anchoring)
//! - Chord transposition
//! - Live session wire events
//! - Render-time chord alignment and auto-advance timing
//! - Configuration loading

pub mod config;
pub mod error;
pub mod events;
pub mod position;
pub mod render;
pub mod sheet;
pub mod transpose;

pub use error::{Error, Result};
pub use sheet::{ChordBeat, Line, Section, Song};
pub use transpose::transpose;
