use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use super::state::{
    clamp_rate, clamp_volume, HistoryEntry, PlaybackState, PlaybackStatus, ReadingHistory,
    RATE_STEP, VOLUME_STEP,
};
use super::{PlaybackEvent, PlaybackNotice, RequestId};
use crate::audio::{AudioSink, PlayRequest};
use crate::book::Book;
use crate::engine::{AudioEngine, EngineKind, GeneratedAudio, SynthesisRequest};

struct InFlight {
    request: RequestId,
    cancel: CancellationToken,
}

/// Turns playback commands into engine requests and sink calls.
///
/// At most one generation is in flight: starting a page cancels the
/// previous request's token, and any result that still arrives for it is
/// discarded in [`PlaybackMachine::handle_event`].
pub struct PlaybackMachine {
    state: PlaybackState,
    book: Option<Book>,
    voice: Option<String>,
    engines: HashMap<EngineKind, Arc<dyn AudioEngine>>,
    sink: Arc<dyn AudioSink>,
    events: UnboundedSender<PlaybackEvent>,
    generation: Option<InFlight>,
    // Request whose audio is being generated or played.
    current: Option<RequestId>,
    next_request: RequestId,
    history: ReadingHistory,
    last_error: Option<String>,
}

impl PlaybackMachine {
    pub fn new(
        sink: Arc<dyn AudioSink>,
        events: UnboundedSender<PlaybackEvent>,
        active_engine: EngineKind,
    ) -> Self {
        Self {
            state: PlaybackState::new(active_engine),
            book: None,
            voice: None,
            engines: HashMap::new(),
            sink,
            events,
            generation: None,
            current: None,
            next_request: 0,
            history: ReadingHistory::default(),
            last_error: None,
        }
    }

    pub fn add_engine(&mut self, engine: Arc<dyn AudioEngine>) {
        self.engines.insert(engine.kind(), engine);
    }

    pub fn set_voice(&mut self, voice: Option<String>) {
        self.voice = voice;
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn status(&self) -> PlaybackStatus {
        self.state.status
    }

    pub fn book(&self) -> Option<&Book> {
        self.book.as_ref()
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.entries()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn current_request(&self) -> Option<RequestId> {
        self.current
    }

    pub fn load_book(&mut self, book: Book) {
        self.stop();
        info!("Loaded \"{}\" with {} pages", book.title, book.pages.len());
        self.state.active_page_number = book.pages.first().map(|page| page.page_number);
        self.history.clear();
        self.last_error = None;
        self.book = Some(book);
    }

    /// Starts the active page, or resumes if paused. No-op while a page is
    /// already generating or playing.
    pub fn play(&mut self) -> Option<PlaybackNotice> {
        match self.state.status {
            PlaybackStatus::Playing | PlaybackStatus::Generating => {
                debug!("Play ignored while {:?}", self.state.status);
                None
            }
            PlaybackStatus::Paused => {
                self.resume();
                None
            }
            PlaybackStatus::Stopped => {
                match self.state.active_page_number.or_else(|| self.first_page()) {
                    Some(page) => self.start_page(page),
                    None => Some(PlaybackNotice::NoBook),
                }
            }
        }
    }

    /// Pauses while playing; a second pause resumes.
    pub fn pause(&mut self) {
        match self.state.status {
            PlaybackStatus::Playing => {
                self.sink.pause();
                self.set_status(PlaybackStatus::Paused);
            }
            PlaybackStatus::Paused => self.resume(),
            status => debug!("Pause ignored while {status:?}"),
        }
    }

    fn resume(&mut self) {
        self.sink.resume();
        self.set_status(PlaybackStatus::Playing);
    }

    /// Silences output and cancels any in-flight generation. Never
    /// auto-advances.
    pub fn stop(&mut self) {
        self.cancel_generation();
        if let Some(request) = self.current.take() {
            debug!("Stopping request {request}");
            self.sink.stop();
        }
        self.set_status(PlaybackStatus::Stopped);
    }

    pub fn dispose(&mut self) {
        self.stop();
    }

    pub fn next_page(&mut self) -> Option<PlaybackNotice> {
        if self.book.is_none() {
            return Some(PlaybackNotice::NoBook);
        }
        let target = match self.state.active_page_number {
            Some(current) => self.page_after(current),
            None => self.first_page(),
        };
        match target {
            Some(page) => self.go_to_page(page),
            None => Some(PlaybackNotice::EndOfBook),
        }
    }

    pub fn previous_page(&mut self) -> Option<PlaybackNotice> {
        let Some(book) = &self.book else {
            return Some(PlaybackNotice::NoBook);
        };
        let current = self.state.active_page_number;
        let target = book
            .pages
            .iter()
            .rev()
            .map(|page| page.page_number)
            .find(|number| current.map_or(true, |current| *number < current));
        match target {
            Some(page) => self.go_to_page(page),
            None => Some(PlaybackNotice::StartOfBook),
        }
    }

    /// Moves to `page_number`, restarting playback there if it was active.
    pub fn go_to_page(&mut self, page_number: u32) -> Option<PlaybackNotice> {
        let Some(book) = &self.book else {
            return Some(PlaybackNotice::NoBook);
        };
        if book.page(page_number).is_none() {
            debug!("Page {page_number} is not in the book");
            return Some(PlaybackNotice::PageUnavailable(page_number));
        }
        let was_active = self.state.status != PlaybackStatus::Stopped;
        self.stop();
        self.state.active_page_number = Some(page_number);
        if was_active {
            self.start_page(page_number)
        } else {
            debug!("Active page is now {page_number}");
            None
        }
    }

    pub fn increase_speed(&mut self) -> Option<PlaybackNotice> {
        self.set_rate(self.state.playback_rate + RATE_STEP)
    }

    pub fn decrease_speed(&mut self) -> Option<PlaybackNotice> {
        self.set_rate(self.state.playback_rate - RATE_STEP)
    }

    /// The local engine bakes the rate into synthesis, so a change while it
    /// is playing restarts the page.
    pub fn set_rate(&mut self, rate: f32) -> Option<PlaybackNotice> {
        let rate = clamp_rate(rate);
        if rate == self.state.playback_rate {
            return None;
        }
        debug!("Playback rate {} -> {rate}", self.state.playback_rate);
        self.state.playback_rate = rate;
        if self.state.active_engine != EngineKind::Local {
            self.sink.set_rate(rate);
            return None;
        }
        match (self.state.status, self.state.active_page_number) {
            (PlaybackStatus::Playing, Some(page)) => self.start_page(page),
            _ => None,
        }
    }

    pub fn increase_volume(&mut self) {
        self.set_volume(self.state.volume + VOLUME_STEP);
    }

    pub fn decrease_volume(&mut self) {
        self.set_volume(self.state.volume - VOLUME_STEP);
    }

    pub fn set_volume(&mut self, volume: f32) {
        let volume = clamp_volume(volume);
        self.state.volume = volume;
        self.sink.set_volume(volume);
    }

    pub fn set_engine(&mut self, kind: EngineKind) -> Option<PlaybackNotice> {
        if kind == self.state.active_engine {
            return None;
        }
        self.stop();
        info!("Switching voice engine to {kind}");
        self.state.active_engine = kind;
        if self.engines.contains_key(&kind) {
            None
        } else {
            Some(PlaybackNotice::Error(not_configured(kind)))
        }
    }

    /// `Estás leyendo «{title}», página {N}.`
    pub fn where_am_i(&self) -> String {
        let title = self
            .book
            .as_ref()
            .map(|book| book.title.trim())
            .filter(|title| !title.is_empty())
            .unwrap_or("un libro");
        let page = self
            .state
            .active_page_number
            .or_else(|| self.first_page())
            .unwrap_or(1);
        format!("Estás leyendo «{title}», página {page}.")
    }

    /// Applies an asynchronous result. Events for anything but the current
    /// request are dropped.
    pub fn handle_event(&mut self, event: PlaybackEvent) -> Option<PlaybackNotice> {
        match event {
            PlaybackEvent::AudioReady { request, result } => {
                let pending = self.generation.as_ref().map(|in_flight| in_flight.request);
                if pending != Some(request) {
                    debug!("Discarding audio for superseded request {request}");
                    return None;
                }
                self.generation = None;
                match result {
                    Ok(audio) => self.start_output(request, audio),
                    Err(err) => {
                        warn!("Generation {request} failed ({}): {err}", err.code());
                        Some(self.fail(err.user_message()))
                    }
                }
            }
            PlaybackEvent::Finished { request } => {
                if self.current != Some(request) {
                    debug!("Ignoring end of audio for request {request}");
                    return None;
                }
                self.current = None;
                self.set_status(PlaybackStatus::Stopped);
                self.advance()
            }
            PlaybackEvent::OutputFailed { request, message } => {
                if self.current != Some(request) {
                    debug!("Ignoring output failure for request {request}: {message}");
                    return None;
                }
                warn!("Audio output failed for request {request}: {message}");
                Some(self.fail(format!("Error de reproducción: {message}")))
            }
        }
    }

    fn start_page(&mut self, page_number: u32) -> Option<PlaybackNotice> {
        let Some(text) = self
            .book
            .as_ref()
            .and_then(|book| book.page(page_number))
            .map(|page| page.content.clone())
        else {
            return Some(PlaybackNotice::PageUnavailable(page_number));
        };
        self.stop();
        self.state.active_page_number = Some(page_number);

        let kind = self.state.active_engine;
        let Some(engine) = self.engines.get(&kind).cloned() else {
            return Some(self.fail(not_configured(kind)));
        };

        self.next_request += 1;
        let request = self.next_request;
        let cancel = CancellationToken::new();
        self.current = Some(request);
        self.generation = Some(InFlight {
            request,
            cancel: cancel.clone(),
        });
        self.history.record(page_number);
        self.last_error = None;
        self.set_status(if kind.has_generation_phase() {
            PlaybackStatus::Generating
        } else {
            PlaybackStatus::Playing
        });
        info!("Reading page {page_number} with the {kind} engine (request {request})");

        let synthesis = SynthesisRequest {
            text,
            voice: self.voice.clone(),
            rate: self.state.playback_rate,
        };
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => debug!("Generation {request} cancelled"),
                result = engine.generate(&synthesis) => {
                    if events.send(PlaybackEvent::AudioReady { request, result }).is_err() {
                        debug!("Playback closed before request {request} completed");
                    }
                }
            }
        });
        None
    }

    fn start_output(&mut self, request: RequestId, audio: GeneratedAudio) -> Option<PlaybackNotice> {
        let page = self.state.active_page_number?;
        let play = PlayRequest {
            request,
            page,
            audio,
            rate: self.output_rate(),
            volume: self.state.volume,
        };
        if let Err(err) = self.sink.play(play) {
            warn!("Audio sink rejected page {page}: {err}");
            return Some(self.fail(err.to_string()));
        }
        if self.state.status == PlaybackStatus::Paused {
            self.sink.pause();
        } else {
            self.set_status(PlaybackStatus::Playing);
        }
        None
    }

    fn advance(&mut self) -> Option<PlaybackNotice> {
        let current = self.state.active_page_number?;
        match self.page_after(current) {
            Some(page) => {
                debug!("Auto-advancing to page {page}");
                self.start_page(page).or(Some(PlaybackNotice::Advanced(page)))
            }
            None => {
                info!("Reached the end of the book");
                Some(PlaybackNotice::EndOfBook)
            }
        }
    }

    fn fail(&mut self, message: String) -> PlaybackNotice {
        self.stop();
        self.last_error = Some(message.clone());
        PlaybackNotice::Error(message)
    }

    fn cancel_generation(&mut self) {
        if let Some(in_flight) = self.generation.take() {
            debug!("Cancelling generation {}", in_flight.request);
            in_flight.cancel.cancel();
        }
    }

    // Rate is already applied by the local engine.
    fn output_rate(&self) -> f32 {
        if self.state.active_engine == EngineKind::Local {
            1.0
        } else {
            self.state.playback_rate
        }
    }

    fn set_status(&mut self, status: PlaybackStatus) {
        if self.state.status != status {
            debug!("Playback {:?} -> {status:?}", self.state.status);
            self.state.status = status;
        }
    }

    fn first_page(&self) -> Option<u32> {
        self.book
            .as_ref()
            .and_then(|book| book.pages.first())
            .map(|page| page.page_number)
    }

    fn page_after(&self, current: u32) -> Option<u32> {
        self.book.as_ref().and_then(|book| {
            book.pages
                .iter()
                .map(|page| page.page_number)
                .find(|number| *number > current)
        })
    }
}

impl Drop for PlaybackMachine {
    fn drop(&mut self) {
        self.cancel_generation();
    }
}

fn not_configured(kind: EngineKind) -> String {
    format!("El motor de voz {kind} no está configurado")
}
