use std::io::Write;

use log::{debug, info};

use super::feedback::{SpeechOutput, SpeechSettings};

/// Prints announcements to stdout for terminals without a speech engine.
#[derive(Debug, Default)]
pub struct ConsoleSpeech;

impl SpeechOutput for ConsoleSpeech {
    fn is_available(&self) -> bool {
        true
    }

    fn speak(&mut self, text: &str, settings: &SpeechSettings) {
        info!("Feedback ({}, rate {}): {text}", settings.lang, settings.rate);
        let mut stdout = std::io::stdout().lock();
        if let Err(err) = writeln!(stdout, "» {text}").and_then(|_| stdout.flush()) {
            debug!("Could not print feedback: {err}");
        }
    }

    fn cancel(&mut self) {}
}
