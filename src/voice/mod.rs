//! Voice control: turning speech into [`Command`]s and speaking short
//! confirmations back.

pub mod command;
pub mod console;
pub mod feedback;
pub mod parser;
pub mod session;
pub mod stdin;

pub use command::{Command, Theme};
pub use console::ConsoleSpeech;
pub use feedback::{confirmation_for, FeedbackSynthesizer, SpeechOutput, SpeechSettings};
pub use parser::{available_commands, parse};
pub use session::{
    ListeningSession, RecognitionEvent, RecognizerError, SessionState, SessionUpdate,
    SpeechRecognizer,
};
pub use stdin::LineRecognizer;
