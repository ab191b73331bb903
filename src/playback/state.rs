use std::collections::VecDeque;

use serde::Serialize;
use time::OffsetDateTime;

use crate::engine::EngineKind;

pub const MIN_RATE: f32 = 0.5;
pub const MAX_RATE: f32 = 3.0;
pub const RATE_STEP: f32 = 0.25;
pub const VOLUME_STEP: f32 = 0.1;
pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Stopped,
    /// Waiting for a request/response engine to return audio.
    Generating,
    Playing,
    Paused,
}

/// Snapshot of what is being read. Only [`super::PlaybackMachine`] mutates it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub active_page_number: Option<u32>,
    pub status: PlaybackStatus,
    pub playback_rate: f32,
    pub volume: f32,
    pub active_engine: EngineKind,
}

impl PlaybackState {
    pub fn new(engine: EngineKind) -> Self {
        Self {
            active_page_number: None,
            status: PlaybackStatus::Stopped,
            playback_rate: 1.0,
            volume: 1.0,
            active_engine: engine,
        }
    }

    /// Playing or paused mid-page.
    pub fn is_playing(&self) -> bool {
        matches!(self.status, PlaybackStatus::Playing | PlaybackStatus::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.status == PlaybackStatus::Paused
    }

    pub fn is_generating(&self) -> bool {
        self.status == PlaybackStatus::Generating
    }
}

pub fn clamp_rate(rate: f32) -> f32 {
    round2(rate.clamp(MIN_RATE, MAX_RATE))
}

pub fn clamp_volume(volume: f32) -> f32 {
    round2(volume.clamp(0.0, 1.0))
}

// Repeated 0.1 steps drift; keep two decimals.
fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub page_number: u32,
    pub timestamp: i64,
}

/// Most recently read pages, newest first, without duplicates.
#[derive(Debug, Default, Clone)]
pub struct ReadingHistory {
    entries: VecDeque<HistoryEntry>,
}

impl ReadingHistory {
    pub fn record(&mut self, page_number: u32) {
        self.entries.retain(|entry| entry.page_number != page_number);
        self.entries.push_front(HistoryEntry {
            page_number,
            timestamp: OffsetDateTime::now_utc().unix_timestamp(),
        });
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
