use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use log::{debug, info};
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

use super::{AudioSink, AudioSinkError, PlayRequest};
use crate::engine::AudioFormat;
use crate::playback::{PlaybackEvent, RequestId};

#[derive(Default)]
struct Hold {
    paused: bool,
    finished: Option<RequestId>,
}

/// Writes each page's narration to `page-NNNN.<ext>` and reports it as
/// finished immediately, so auto-advance renders the whole book.
///
/// While paused the end of audio is held back until `resume`; `stop`
/// drops it.
pub struct ExportSink {
    output_dir: PathBuf,
    events: UnboundedSender<PlaybackEvent>,
    last_export: Mutex<Option<PathBuf>>,
    hold: Mutex<Hold>,
}

impl ExportSink {
    pub fn new(output_dir: PathBuf, events: UnboundedSender<PlaybackEvent>) -> Self {
        Self {
            output_dir,
            events,
            last_export: Mutex::new(None),
            hold: Mutex::new(Hold::default()),
        }
    }

    fn finish(&self, request: RequestId) {
        if self.events.send(PlaybackEvent::Finished { request }).is_err() {
            debug!("Playback machine gone, end-of-audio not delivered");
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn last_export(&self) -> Option<PathBuf> {
        self.last_export.lock().clone()
    }

    fn write(&self, request: &PlayRequest) -> Result<PathBuf, AudioSinkError> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|err| AudioSinkError::Io(format!("{}: {err}", self.output_dir.display())))?;
        let (extension, bytes) = match request.audio.format {
            AudioFormat::Pcm16 { sample_rate } => ("wav", pcm_to_wav(&request.audio.bytes, sample_rate)?),
            format => (format.extension(), request.audio.bytes.clone()),
        };
        let path = self
            .output_dir
            .join(format!("page-{:04}.{extension}", request.page));
        fs::write(&path, bytes).map_err(|err| AudioSinkError::Io(format!("{}: {err}", path.display())))?;
        Ok(path)
    }
}

fn pcm_to_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>, AudioSinkError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|err| AudioSinkError::Decode(err.to_string()))?;
        for chunk in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))
                .map_err(|err| AudioSinkError::Decode(err.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|err| AudioSinkError::Decode(err.to_string()))?;
    }
    Ok(cursor.into_inner())
}

impl AudioSink for ExportSink {
    fn play(&self, request: PlayRequest) -> Result<(), AudioSinkError> {
        let path = self.write(&request)?;
        info!("Page {} narration exported to {}", request.page, path.display());
        *self.last_export.lock() = Some(path);
        {
            let mut hold = self.hold.lock();
            if hold.paused {
                debug!("Holding end of page {} until resumed", request.page);
                hold.finished = Some(request.request);
                return Ok(());
            }
        }
        self.finish(request.request);
        Ok(())
    }

    fn pause(&self) {
        self.hold.lock().paused = true;
    }

    fn resume(&self) {
        let held = {
            let mut hold = self.hold.lock();
            hold.paused = false;
            hold.finished.take()
        };
        if let Some(request) = held {
            self.finish(request);
        }
    }

    fn stop(&self) {
        *self.hold.lock() = Hold::default();
    }

    fn set_volume(&self, _volume: f32) {}

    fn set_rate(&self, _rate: f32) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GeneratedAudio;
    use tokio::sync::mpsc;

    fn mp3_request(request: RequestId, page: u32) -> PlayRequest {
        PlayRequest {
            request,
            page,
            audio: GeneratedAudio {
                bytes: b"ID3fake".to_vec(),
                format: AudioFormat::Mp3,
            },
            rate: 1.0,
            volume: 1.0,
        }
    }

    #[test]
    fn exports_page_and_reports_end_of_audio() {
        let temp = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ExportSink::new(temp.path().join("out"), tx);
        sink.play(mp3_request(7, 3)).unwrap();
        let path = sink.last_export().unwrap();
        assert!(path.ends_with("page-0003.mp3"));
        assert_eq!(fs::read(path).unwrap(), b"ID3fake");
        assert_eq!(rx.try_recv().unwrap(), PlaybackEvent::Finished { request: 7 });
    }

    #[test]
    fn end_of_audio_waits_for_resume() {
        let temp = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ExportSink::new(temp.path().to_path_buf(), tx);
        sink.pause();
        sink.play(mp3_request(4, 1)).unwrap();
        assert!(rx.try_recv().is_err());
        sink.resume();
        assert_eq!(rx.try_recv().unwrap(), PlaybackEvent::Finished { request: 4 });
    }

    #[test]
    fn stop_drops_held_end_of_audio() {
        let temp = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ExportSink::new(temp.path().to_path_buf(), tx);
        sink.pause();
        sink.play(mp3_request(5, 2)).unwrap();
        sink.stop();
        sink.resume();
        assert!(rx.try_recv().is_err());
        sink.play(mp3_request(6, 3)).unwrap();
        assert_eq!(rx.try_recv().unwrap(), PlaybackEvent::Finished { request: 6 });
    }

    #[tokio::test]
    async fn pause_before_local_audio_blocks_auto_advance() {
        use std::sync::Arc;

        use crate::engine::EngineKind;
        use crate::playback::machine::tests::{book, FakeEngine};
        use crate::playback::{PlaybackMachine, PlaybackNotice, PlaybackStatus};

        let temp = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = Arc::new(ExportSink::new(temp.path().to_path_buf(), tx.clone()));
        let mut machine = PlaybackMachine::new(sink, tx, EngineKind::Local);
        machine.add_engine(Arc::new(FakeEngine::new(EngineKind::Local)));
        machine.load_book(book(3));

        machine.play();
        machine.pause();
        let ready = rx.recv().await.unwrap();
        assert_eq!(machine.handle_event(ready), None);
        assert!(rx.try_recv().is_err());
        assert_eq!(machine.status(), PlaybackStatus::Paused);
        assert_eq!(machine.state().active_page_number, Some(1));

        machine.pause();
        let finished = rx.try_recv().unwrap();
        assert!(matches!(finished, PlaybackEvent::Finished { .. }));
        assert_eq!(machine.handle_event(finished), Some(PlaybackNotice::Advanced(2)));
    }

    #[test]
    fn raw_pcm_is_wrapped_in_wav() {
        let wav = pcm_to_wav(&[0, 0, 255, 127], 24_000).unwrap();
        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 24_000);
        let samples: Vec<i16> = reader.into_samples().map(Result::unwrap).collect();
        assert_eq!(samples, vec![0, i16::MAX]);
    }
}
