//! Spoken confirmations for recognised commands.

use log::debug;

use super::command::{Command, Theme};

pub const APOLOGY: &str = "No entendí, repite";
pub const NOTHING_TO_REPEAT: &str = "No hay nada que repetir";

/// Voice parameters for a single utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSettings {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub lang: &'static str,
}

impl SpeechSettings {
    /// Slightly faster and higher than narration so confirmations stay short.
    pub fn feedback() -> Self {
        Self {
            rate: 1.2,
            pitch: 1.1,
            volume: 1.0,
            lang: "es-ES",
        }
    }
}

/// Platform speech synthesis used for short announcements.
///
/// Only one utterance may be audible at a time; callers cancel before
/// speaking again.
pub trait SpeechOutput: Send {
    fn is_available(&self) -> bool;
    fn speak(&mut self, text: &str, settings: &SpeechSettings);
    fn cancel(&mut self);
}

/// Fixed confirmation phrase for a command.
///
/// `WhereAmI` needs playback context and `RepeatLastFeedback` replays the
/// previous phrase, so both return `None`.
pub fn confirmation_for(command: &Command) -> Option<String> {
    let text = match command {
        Command::NextPage => "Siguiente página".to_string(),
        Command::PreviousPage => "Página anterior".to_string(),
        Command::Play => "Reproduciendo contenido".to_string(),
        Command::Pause => "Pausado".to_string(),
        Command::Stop => "Detenido".to_string(),
        Command::IncreaseSpeed => "Velocidad aumentada".to_string(),
        Command::DecreaseSpeed => "Más lento".to_string(),
        Command::IncreaseVolume => "Subiendo volumen".to_string(),
        Command::DecreaseVolume => "Bajando volumen".to_string(),
        Command::GoToPage(page) => format!("Cambiando a página {page}"),
        Command::ZoomIn => "Aumentando tamaño".to_string(),
        Command::ZoomOut => "Reduciendo tamaño".to_string(),
        Command::SetTheme(Theme::HighContrast) => "Modo alto contraste activado".to_string(),
        Command::SetTheme(theme) => format!("Tema {} activado", theme.spoken_name()),
        Command::OpenLibrary => "Abriendo biblioteca".to_string(),
        Command::ShowHelp => "Abriendo lista de comandos".to_string(),
        Command::Unrecognized(_) => APOLOGY.to_string(),
        Command::WhereAmI | Command::RepeatLastFeedback => return None,
    };
    Some(text)
}

pub struct FeedbackSynthesizer {
    output: Box<dyn SpeechOutput>,
    settings: SpeechSettings,
    last_feedback: Option<String>,
}

impl FeedbackSynthesizer {
    pub fn new(output: Box<dyn SpeechOutput>) -> Self {
        Self {
            output,
            settings: SpeechSettings::feedback(),
            last_feedback: None,
        }
    }

    /// Speak `text` and remember it for a later "repite".
    pub fn announce(&mut self, text: &str) {
        self.last_feedback = Some(text.to_string());
        self.say(text);
    }

    /// Speak `text` without replacing the remembered feedback.
    pub fn say(&mut self, text: &str) {
        if !self.output.is_available() {
            debug!("Speech output unavailable, dropping feedback {text:?}");
            return;
        }
        self.output.cancel();
        self.output.speak(text, &self.settings);
    }

    pub fn repeat(&mut self) {
        match self.last_feedback.clone() {
            Some(text) => self.say(&text),
            None => self.say(NOTHING_TO_REPEAT),
        }
    }

    pub fn cancel(&mut self) {
        if self.output.is_available() {
            self.output.cancel();
        }
    }

    pub fn last_feedback(&self) -> Option<&str> {
        self.last_feedback.as_deref()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum SpeechCall {
        Speak(String),
        Cancel,
    }

    /// Records every call so tests can assert on the spoken sequence.
    #[derive(Clone)]
    pub struct RecordingSpeech {
        pub available: bool,
        pub calls: Arc<Mutex<Vec<SpeechCall>>>,
    }

    impl RecordingSpeech {
        pub fn new() -> Self {
            Self {
                available: true,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn spoken(&self) -> Vec<String> {
            self.calls
                .lock()
                .iter()
                .filter_map(|call| match call {
                    SpeechCall::Speak(text) => Some(text.clone()),
                    SpeechCall::Cancel => None,
                })
                .collect()
        }
    }

    impl SpeechOutput for RecordingSpeech {
        fn is_available(&self) -> bool {
            self.available
        }

        fn speak(&mut self, text: &str, _settings: &SpeechSettings) {
            self.calls.lock().push(SpeechCall::Speak(text.to_string()));
        }

        fn cancel(&mut self) {
            self.calls.lock().push(SpeechCall::Cancel);
        }
    }

    #[test]
    fn announce_cancels_previous_utterance_first() {
        let speech = RecordingSpeech::new();
        let mut feedback = FeedbackSynthesizer::new(Box::new(speech.clone()));
        feedback.announce("Pausado");
        feedback.announce("Detenido");
        assert_eq!(
            *speech.calls.lock(),
            vec![
                SpeechCall::Cancel,
                SpeechCall::Speak("Pausado".into()),
                SpeechCall::Cancel,
                SpeechCall::Speak("Detenido".into()),
            ]
        );
        assert_eq!(feedback.last_feedback(), Some("Detenido"));
    }

    #[test]
    fn repeat_replays_last_announcement() {
        let speech = RecordingSpeech::new();
        let mut feedback = FeedbackSynthesizer::new(Box::new(speech.clone()));
        feedback.repeat();
        feedback.announce("Siguiente página");
        feedback.say(APOLOGY);
        feedback.repeat();
        assert_eq!(
            speech.spoken(),
            vec![
                NOTHING_TO_REPEAT.to_string(),
                "Siguiente página".to_string(),
                APOLOGY.to_string(),
                "Siguiente página".to_string(),
            ]
        );
    }

    #[test]
    fn unavailable_output_is_silent() {
        let mut speech = RecordingSpeech::new();
        speech.available = false;
        let mut feedback = FeedbackSynthesizer::new(Box::new(speech.clone()));
        feedback.announce("Pausado");
        assert!(speech.calls.lock().is_empty());
        assert_eq!(feedback.last_feedback(), Some("Pausado"));
    }

    #[test]
    fn confirmations_cover_parameters() {
        assert_eq!(
            confirmation_for(&Command::GoToPage(3)).as_deref(),
            Some("Cambiando a página 3")
        );
        assert_eq!(
            confirmation_for(&Command::SetTheme(Theme::HighContrast)).as_deref(),
            Some("Modo alto contraste activado")
        );
        assert_eq!(
            confirmation_for(&Command::SetTheme(Theme::Dark)).as_deref(),
            Some("Tema oscuro activado")
        );
        assert_eq!(
            confirmation_for(&Command::Unrecognized("asdkjasd".into())).as_deref(),
            Some(APOLOGY)
        );
        assert_eq!(confirmation_for(&Command::WhereAmI), None);
    }
}
