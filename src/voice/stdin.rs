use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;

use log::{debug, warn};
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

use super::session::{RecognitionEvent, RecognizerError, SpeechRecognizer};

#[derive(Default)]
struct LineState {
    active: bool,
    closed: bool,
}

/// Treats each non-empty line of input as a final transcript.
///
/// Lines read while stopped are dropped. End of input ends the stream for
/// good, so later restarts fail with [`RecognizerError::StreamClosed`].
pub struct LineRecognizer {
    source: Option<Box<dyn BufRead + Send>>,
    events: UnboundedSender<RecognitionEvent>,
    state: Arc<Mutex<LineState>>,
}

impl LineRecognizer {
    pub fn new(events: UnboundedSender<RecognitionEvent>) -> Self {
        Self::with_source(Box::new(io::BufReader::new(io::stdin())), events)
    }

    pub fn with_source(
        source: Box<dyn BufRead + Send>,
        events: UnboundedSender<RecognitionEvent>,
    ) -> Self {
        Self {
            source: Some(source),
            events,
            state: Arc::new(Mutex::new(LineState::default())),
        }
    }

    fn spawn_reader(&mut self, source: Box<dyn BufRead + Send>) -> Result<(), RecognizerError> {
        let events = self.events.clone();
        let state = Arc::clone(&self.state);
        thread::Builder::new()
            .name("line-recognizer".into())
            .spawn(move || {
                for line in source.lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(err) => {
                            warn!("Could not read input: {err}");
                            let _ = events.send(RecognitionEvent::Error(err.kind().to_string()));
                            break;
                        }
                    };
                    let transcript = line.trim();
                    if transcript.is_empty() || !state.lock().active {
                        continue;
                    }
                    let event = RecognitionEvent::Result {
                        transcript: transcript.to_string(),
                        is_final: true,
                    };
                    if events.send(event).is_err() {
                        return;
                    }
                }
                debug!("Input closed");
                let mut state = state.lock();
                state.closed = true;
                if state.active {
                    state.active = false;
                    let _ = events.send(RecognitionEvent::Ended);
                }
            })
            .map(|_| ())
            .map_err(|err| RecognizerError::Platform(err.to_string()))
    }
}

impl SpeechRecognizer for LineRecognizer {
    fn is_available(&self) -> bool {
        true
    }

    fn start(&mut self) -> Result<(), RecognizerError> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(RecognizerError::StreamClosed);
            }
            state.active = true;
        }
        let _ = self.events.send(RecognitionEvent::Started);
        if let Some(source) = self.source.take() {
            if let Err(err) = self.spawn_reader(source) {
                self.state.lock().active = false;
                return Err(err);
            }
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.state.lock().active = false;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tokio::sync::mpsc::unbounded_channel;

    use super::*;

    #[tokio::test]
    async fn lines_become_final_results_until_eof() {
        let (tx, mut rx) = unbounded_channel();
        let input = Cursor::new(b"Siguiente\n\n  pausar \n".to_vec());
        let mut recognizer = LineRecognizer::with_source(Box::new(input), tx);
        recognizer.start().unwrap();

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            let ended = event == RecognitionEvent::Ended;
            events.push(event);
            if ended {
                break;
            }
        }
        assert_eq!(
            events,
            vec![
                RecognitionEvent::Started,
                RecognitionEvent::Result {
                    transcript: "Siguiente".into(),
                    is_final: true
                },
                RecognitionEvent::Result {
                    transcript: "pausar".into(),
                    is_final: true
                },
                RecognitionEvent::Ended,
            ]
        );
        assert_eq!(recognizer.start(), Err(RecognizerError::StreamClosed));
    }
}
