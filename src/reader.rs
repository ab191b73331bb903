//! Glue between voice control and the reading state.
//!
//! [`Reader`] owns the listening session, the feedback voice, the playback
//! machine and the view flags. Everything reaches it as a message and is
//! handled in arrival order on one task, so no state is shared.

use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::playback::{PlaybackEvent, PlaybackMachine, PlaybackNotice, PlaybackStatus};
use crate::view::ViewSettings;
use crate::voice::feedback::APOLOGY;
use crate::voice::{
    confirmation_for, parse, Command, FeedbackSynthesizer, ListeningSession, RecognitionEvent,
    SessionUpdate,
};

pub struct Reader {
    session: ListeningSession,
    updates: UnboundedReceiver<SessionUpdate>,
    feedback: FeedbackSynthesizer,
    playback: PlaybackMachine,
    view: ViewSettings,
    status_text: String,
    last_notice: Option<PlaybackNotice>,
}

impl Reader {
    /// `updates` must be the receiving end of the channel `session`
    /// publishes on.
    pub fn new(
        session: ListeningSession,
        updates: UnboundedReceiver<SessionUpdate>,
        feedback: FeedbackSynthesizer,
        playback: PlaybackMachine,
    ) -> Self {
        Self {
            session,
            updates,
            feedback,
            playback,
            view: ViewSettings::default(),
            status_text: String::new(),
            last_notice: None,
        }
    }

    pub fn session(&self) -> &ListeningSession {
        &self.session
    }

    pub fn playback(&self) -> &PlaybackMachine {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackMachine {
        &mut self.playback
    }

    pub fn feedback(&self) -> &FeedbackSynthesizer {
        &self.feedback
    }

    pub fn view(&self) -> &ViewSettings {
        &self.view
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn last_notice(&self) -> Option<&PlaybackNotice> {
        self.last_notice.as_ref()
    }

    pub fn enable_voice_control(&mut self) {
        self.session.start();
        self.drain_updates();
    }

    /// Stops listening and silences everything that was started by voice.
    pub fn disable_voice_control(&mut self) {
        self.session.stop();
        self.feedback.cancel();
        self.playback.stop();
        self.drain_updates();
    }

    pub fn toggle_voice_control(&mut self) {
        if self.session.is_listening() {
            self.disable_voice_control();
        } else {
            self.enable_voice_control();
        }
    }

    pub fn handle_recognition_event(&mut self, event: RecognitionEvent) {
        self.session.handle_event(event);
        self.drain_updates();
    }

    fn drain_updates(&mut self) {
        while let Ok(update) = self.updates.try_recv() {
            self.handle_session_update(update);
        }
    }

    fn handle_session_update(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::Status { text, listening } => {
                info!("Voice control: {text} (listening={listening})");
                self.status_text = text;
            }
            SessionUpdate::Interim(text) => debug!("Interim transcript {text:?}"),
            SessionUpdate::Final(text) => {
                self.handle_transcript(&text);
            }
        }
    }

    /// Parses one final transcript, speaks its confirmation and applies it.
    pub fn handle_transcript(&mut self, transcript: &str) -> Command {
        let command = parse(transcript);
        info!("Heard {transcript:?} as {}", command.name());
        self.dispatch(&command);
        command
    }

    pub fn dispatch(&mut self, command: &Command) {
        match command {
            Command::RepeatLastFeedback => self.feedback.repeat(),
            Command::Unrecognized(_) => self.feedback.say(APOLOGY),
            Command::WhereAmI => {
                let answer = self.playback.where_am_i();
                self.feedback.announce(&answer);
            }
            other => {
                if let Some(text) = confirmation_for(other) {
                    self.feedback.announce(&text);
                }
            }
        }

        let notice = match command {
            Command::NextPage => self.playback.next_page(),
            Command::PreviousPage => self.playback.previous_page(),
            Command::Play => self.playback.play(),
            Command::Pause => {
                self.playback.pause();
                None
            }
            Command::Stop => {
                self.playback.stop();
                None
            }
            Command::IncreaseSpeed => self.playback.increase_speed(),
            Command::DecreaseSpeed => self.playback.decrease_speed(),
            Command::IncreaseVolume => {
                self.playback.increase_volume();
                None
            }
            Command::DecreaseVolume => {
                self.playback.decrease_volume();
                None
            }
            Command::GoToPage(page) => self.playback.go_to_page(*page),
            Command::ZoomIn => {
                self.view.zoom_in();
                None
            }
            Command::ZoomOut => {
                self.view.zoom_out();
                None
            }
            Command::SetTheme(theme) => {
                self.view.set_theme(*theme);
                None
            }
            Command::OpenLibrary => {
                self.view.open_library();
                None
            }
            Command::ShowHelp => {
                self.view.show_help();
                None
            }
            Command::WhereAmI | Command::RepeatLastFeedback | Command::Unrecognized(_) => None,
        };
        if let Some(notice) = notice {
            self.report(notice);
        }
    }

    pub fn handle_playback_event(&mut self, event: PlaybackEvent) {
        if let Some(notice) = self.playback.handle_event(event) {
            self.report(notice);
        }
    }

    fn report(&mut self, notice: PlaybackNotice) {
        let message = notice.message();
        match &notice {
            PlaybackNotice::Error(_) => {
                warn!("{message}");
                self.feedback.say(&message);
            }
            PlaybackNotice::Advanced(_) => info!("{message}"),
            _ => {
                info!("{message}");
                self.feedback.say(&message);
            }
        }
        self.last_notice = Some(notice);
    }

    /// Nothing more can happen without new input.
    pub fn is_idle(&self) -> bool {
        !self.session.is_listening() && self.playback.status() == PlaybackStatus::Stopped
    }

    /// Starts listening and processes events until voice control has ended
    /// and playback is stopped, or the process is interrupted.
    pub async fn run(
        &mut self,
        mut recognition: UnboundedReceiver<RecognitionEvent>,
        mut playback_events: UnboundedReceiver<PlaybackEvent>,
    ) {
        self.enable_voice_control();
        while !self.is_idle() {
            tokio::select! {
                Some(event) = recognition.recv() => self.handle_recognition_event(event),
                Some(event) = playback_events.recv() => self.handle_playback_event(event),
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, shutting down");
                    break;
                }
                else => break,
            }
        }
        self.shutdown();
    }

    pub fn shutdown(&mut self) {
        debug!("Shutting down reader");
        self.session.dispose();
        self.playback.dispose();
        self.feedback.cancel();
        self.drain_updates();
    }
}
