//! Voice-controlled audiobook reader.
//!
//! Spoken commands are parsed into [`voice::Command`]s, confirmed aloud and
//! applied to a [`playback::PlaybackMachine`] that narrates book pages with
//! one of several text-to-speech engines.

pub mod audio;
pub mod book;
pub mod engine;
pub mod playback;
pub mod reader;
pub mod state;
pub mod util;
pub mod view;
pub mod voice;
pub mod voices;

pub use reader::Reader;
pub use state::ReaderConfig;
