//! Continuous-listening lifecycle.
//!
//! Platform recognisers end their stream on their own after a stretch of
//! silence. [`ListeningSession`] restarts them while the user still wants
//! to be heard, and gives up after a bounded number of failed restarts.

use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

pub const DEFAULT_RESTART_ATTEMPTS: u32 = 1;
pub const MAX_RESTART_ATTEMPTS: u32 = 5;

const STATUS_LISTENING: &str = "Escuchando...";
const STATUS_STOPPED: &str = "Detenido";
const STATUS_START_FAILED: &str = "Error al iniciar";
const STATUS_UNSUPPORTED: &str = "Control por voz no disponible";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecognizerError {
    #[error("el reconocimiento de voz no está disponible")]
    Unsupported,
    #[error("el flujo de reconocimiento está cerrado")]
    StreamClosed,
    #[error("{0}")]
    Platform(String),
}

/// Lifecycle and result events emitted by a recogniser, in platform order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    Result { transcript: String, is_final: bool },
    Ended,
    Error(String),
}

/// Continuous speech-to-text stream. Events are delivered out of band
/// (usually through a channel the recogniser was built with).
pub trait SpeechRecognizer: Send {
    fn is_available(&self) -> bool;
    fn start(&mut self) -> Result<(), RecognizerError>;
    fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Listening,
    Restarting,
}

/// What the session publishes to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    Status { text: String, listening: bool },
    Interim(String),
    /// Normalised (lower-cased, trimmed) final transcript.
    Final(String),
}

pub struct ListeningSession {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    updates: UnboundedSender<SessionUpdate>,
    state: SessionState,
    is_listening: bool,
    last_transcript: String,
    restart_attempts: u32,
}

impl ListeningSession {
    pub fn new(
        recognizer: Box<dyn SpeechRecognizer>,
        updates: UnboundedSender<SessionUpdate>,
        restart_attempts: u32,
    ) -> Self {
        let recognizer = if recognizer.is_available() {
            Some(recognizer)
        } else {
            warn!("Speech recognition is not supported on this platform");
            None
        };
        Self {
            recognizer,
            updates,
            state: SessionState::Idle,
            is_listening: false,
            last_transcript: String::new(),
            restart_attempts: restart_attempts.clamp(1, MAX_RESTART_ATTEMPTS),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.is_listening
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_transcript(&self) -> &str {
        &self.last_transcript
    }

    pub fn start(&mut self) {
        let Some(recognizer) = self.recognizer.as_mut() else {
            self.publish_status(STATUS_UNSUPPORTED, false);
            return;
        };
        if self.is_listening {
            debug!("Voice control already listening");
            return;
        }

        info!("Starting speech recognition");
        match recognizer.start() {
            Ok(()) => {
                self.is_listening = true;
                self.state = SessionState::Listening;
            }
            Err(err) => {
                error!("Failed to start speech recognition: {err}");
                self.state = SessionState::Idle;
                self.publish_status(STATUS_START_FAILED, false);
            }
        }
    }

    pub fn stop(&mut self) {
        if !self.is_listening {
            return;
        }
        info!("Stopping speech recognition");
        self.is_listening = false;
        self.state = SessionState::Idle;
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop();
        }
        self.publish_status(STATUS_STOPPED, false);
    }

    pub fn toggle(&mut self) {
        debug!("Toggling voice control, listening={}", self.is_listening);
        if self.is_listening {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Feed one recogniser event through the state machine.
    pub fn handle_event(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Started => {
                debug!("Recognition stream started");
                self.publish_status(STATUS_LISTENING, true);
            }
            RecognitionEvent::Result {
                transcript,
                is_final,
            } => {
                self.last_transcript = transcript.clone();
                if is_final {
                    let normalised = transcript.trim().to_lowercase();
                    debug!("Final transcript {normalised:?}");
                    self.publish(SessionUpdate::Final(normalised));
                } else {
                    self.publish(SessionUpdate::Interim(transcript));
                }
            }
            RecognitionEvent::Ended => self.on_stream_end(),
            RecognitionEvent::Error(code) => {
                error!("Speech recognition error: {code}");
                self.is_listening = false;
                self.state = SessionState::Idle;
                self.publish_status(&format!("Error: {code}"), false);
            }
        }
    }

    /// Release the recogniser. The session cannot be restarted afterwards.
    pub fn dispose(&mut self) {
        self.stop();
        self.recognizer = None;
    }

    fn on_stream_end(&mut self) {
        if !self.is_listening {
            debug!("Recognition stream ended while idle");
            self.state = SessionState::Idle;
            return;
        }

        self.state = SessionState::Restarting;
        info!("Recognition stream ended, restarting");
        let Some(recognizer) = self.recognizer.as_mut() else {
            self.is_listening = false;
            self.state = SessionState::Idle;
            self.publish_status(STATUS_STOPPED, false);
            return;
        };

        let mut last_error = None;
        for attempt in 1..=self.restart_attempts {
            match recognizer.start() {
                Ok(()) => {
                    debug!("Recognition restarted on attempt {attempt}");
                    self.state = SessionState::Listening;
                    return;
                }
                Err(err) => {
                    warn!("Restart attempt {attempt} failed: {err}");
                    last_error = Some(err);
                }
            }
        }

        if let Some(err) = last_error {
            error!("Giving up on speech recognition: {err}");
        }
        self.is_listening = false;
        self.state = SessionState::Idle;
        self.publish_status(STATUS_STOPPED, false);
    }

    fn publish_status(&self, text: &str, listening: bool) {
        self.publish(SessionUpdate::Status {
            text: text.to_string(),
            listening,
        });
    }

    fn publish(&self, update: SessionUpdate) {
        if self.updates.send(update).is_err() {
            debug!("Session update dropped, no subscriber");
        }
    }
}

impl Drop for ListeningSession {
    fn drop(&mut self) {
        if self.is_listening {
            if let Some(recognizer) = self.recognizer.as_mut() {
                recognizer.stop();
            }
        }
    }
}
