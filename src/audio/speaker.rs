use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use rodio::{buffer::SamplesBuffer, Decoder, OutputStream, Sink};
use tokio::sync::mpsc::UnboundedSender;

use super::{AudioSink, AudioSinkError, PlayRequest};
use crate::engine::AudioFormat;
use crate::playback::{PlaybackEvent, RequestId};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

enum SpeakerCommand {
    Play(PlayRequest),
    Pause,
    Resume,
    Stop,
    Volume(f32),
    Rate(f32),
}

/// Plays narration on the default output device.
///
/// `rodio::OutputStream` must stay on the thread that opened it, so a
/// dedicated audio thread owns the device and receives commands.
pub struct SpeakerSink {
    commands: Mutex<Sender<SpeakerCommand>>,
}

impl SpeakerSink {
    pub fn new(events: UnboundedSender<PlaybackEvent>) -> Result<Self, AudioSinkError> {
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        thread::Builder::new()
            .name("reader-audio".into())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => {
                        let _ = ready_tx.send(Ok(()));
                        pair
                    }
                    Err(err) => {
                        error!("No output device: {err}");
                        let _ = ready_tx.send(Err(AudioSinkError::Device));
                        return;
                    }
                };
                run_audio_thread(&handle, rx, events);
            })
            .map_err(|err| AudioSinkError::Io(err.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| AudioSinkError::Device)??;
        info!("Audio output ready");
        Ok(Self {
            commands: Mutex::new(tx),
        })
    }

    fn send(&self, command: SpeakerCommand) {
        if self.commands.lock().send(command).is_err() {
            warn!("Audio thread has exited");
        }
    }
}

fn run_audio_thread(
    handle: &rodio::OutputStreamHandle,
    commands: Receiver<SpeakerCommand>,
    events: UnboundedSender<PlaybackEvent>,
) {
    let mut current: Option<(RequestId, Sink)> = None;
    loop {
        match commands.recv_timeout(POLL_INTERVAL) {
            Ok(SpeakerCommand::Play(request)) => {
                if let Some((_, sink)) = current.take() {
                    sink.stop();
                }
                match start_sink(handle, &request) {
                    Ok(sink) => current = Some((request.request, sink)),
                    Err(err) => {
                        error!("Cannot play page {}: {err}", request.page);
                        let _ = events.send(PlaybackEvent::OutputFailed {
                            request: request.request,
                            message: err.to_string(),
                        });
                    }
                }
            }
            Ok(SpeakerCommand::Pause) => {
                if let Some((_, sink)) = &current {
                    sink.pause();
                }
            }
            Ok(SpeakerCommand::Resume) => {
                if let Some((_, sink)) = &current {
                    sink.play();
                }
            }
            Ok(SpeakerCommand::Stop) => {
                if let Some((_, sink)) = current.take() {
                    sink.stop();
                }
            }
            Ok(SpeakerCommand::Volume(volume)) => {
                if let Some((_, sink)) = &current {
                    sink.set_volume(volume);
                }
            }
            Ok(SpeakerCommand::Rate(rate)) => {
                if let Some((_, sink)) = &current {
                    sink.set_speed(rate);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let finished = matches!(&current, Some((_, sink)) if sink.empty());
        if finished {
            if let Some((request, _)) = current.take() {
                debug!("Request {request} reached end of audio");
                let _ = events.send(PlaybackEvent::Finished { request });
            }
        }
    }
}

fn start_sink(
    handle: &rodio::OutputStreamHandle,
    request: &PlayRequest,
) -> Result<Sink, AudioSinkError> {
    let sink = Sink::try_new(handle).map_err(|_| AudioSinkError::Device)?;
    sink.set_volume(request.volume);
    sink.set_speed(request.rate);
    match request.audio.format {
        AudioFormat::Pcm16 { sample_rate } => {
            let samples: Vec<i16> = request
                .audio
                .bytes
                .chunks_exact(2)
                .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
                .collect();
            sink.append(SamplesBuffer::new(1, sample_rate, samples));
        }
        AudioFormat::Wav | AudioFormat::Mp3 => {
            let decoder = Decoder::new(Cursor::new(request.audio.bytes.clone()))
                .map_err(|err| AudioSinkError::Decode(err.to_string()))?;
            sink.append(decoder);
        }
    }
    sink.play();
    Ok(sink)
}

impl AudioSink for SpeakerSink {
    fn play(&self, request: PlayRequest) -> Result<(), AudioSinkError> {
        self.send(SpeakerCommand::Play(request));
        Ok(())
    }

    fn pause(&self) {
        self.send(SpeakerCommand::Pause);
    }

    fn resume(&self) {
        self.send(SpeakerCommand::Resume);
    }

    fn stop(&self) {
        self.send(SpeakerCommand::Stop);
    }

    fn set_volume(&self, volume: f32) {
        self.send(SpeakerCommand::Volume(volume));
    }

    fn set_rate(&self, rate: f32) {
        self.send(SpeakerCommand::Rate(rate));
    }
}
