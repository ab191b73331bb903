use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use log::{error, info};
use tokio::sync::mpsc::{self, UnboundedSender};

use reader_voice::audio::AudioSink;
use reader_voice::book::{self, ocr::pages_from_text, store::read_book, Book, BookError, BookStore};
use reader_voice::engine::{
    AudioEngine, ClonedVoiceEngine, EngineKind, GeminiEngine, PiperEngine,
};
use reader_voice::playback::{PlaybackEvent, PlaybackMachine};
use reader_voice::util::{logging, piper_path};
use reader_voice::voice::{
    available_commands, ConsoleSpeech, FeedbackSynthesizer, LineRecognizer, ListeningSession,
};
use reader_voice::voices::VoiceLibrary;
use reader_voice::{Reader, ReaderConfig};

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("Failed to initialise logger: {err:#}");
    }
    info!("Starting reader-voice {}", env!("CARGO_PKG_VERSION"));

    if let Err(err) = run() {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: reader-voice <libro.json|libro.pdf|libro.txt>")?;
    let config = ReaderConfig::from_env().context("failed to load configuration")?;
    let book = load_book(&config, &path)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(read_aloud(config, book))
}

fn load_book(config: &ReaderConfig, path: &Path) -> Result<Book> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);
    match extension.as_deref() {
        Some("json") => Ok(read_book(path)?),
        Some("pdf") => {
            let mut imported = book::import_pdf(&config.pdf_command, path)?;
            BookStore::new(config.library_dir.clone())
                .save(&mut imported)
                .context("failed to save imported book")?;
            Ok(imported)
        }
        _ => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("unable to read {}", path.display()))?;
            let pages = pages_from_text(&text);
            if pages.is_empty() {
                return Err(BookError::Empty.into());
            }
            let title = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "libro".to_string());
            Ok(Book::new(book::slug(&title), title, pages))
        }
    }
}

fn build_engine(config: &ReaderConfig) -> Result<Arc<dyn AudioEngine>> {
    let engine: Arc<dyn AudioEngine> = match config.engine {
        EngineKind::Local => {
            let command =
                piper_path::resolve(&config.runtime_dir).context("Piper is not available")?;
            let voices = Arc::new(VoiceLibrary::new(config.voices_dir.clone()));
            Arc::new(PiperEngine::new(
                command,
                voices,
                config.output_dir.join("tmp"),
                config.voice.clone(),
            ))
        }
        EngineKind::Cloud => {
            let key = config
                .gemini_api_key
                .clone()
                .context("READER_GEMINI_API_KEY is not set")?;
            Arc::new(GeminiEngine::new(key))
        }
        EngineKind::ClonedVoice => {
            let key = config
                .elevenlabs_api_key
                .clone()
                .context("READER_ELEVENLABS_API_KEY is not set")?;
            Arc::new(ClonedVoiceEngine::new(key, config.voice_sample_bytes()?))
        }
    };
    Ok(engine)
}

#[cfg(feature = "speaker")]
fn build_sink(
    _config: &ReaderConfig,
    events: UnboundedSender<PlaybackEvent>,
) -> Result<Arc<dyn AudioSink>> {
    let sink = reader_voice::audio::SpeakerSink::new(events)
        .context("no audio output device available")?;
    Ok(Arc::new(sink))
}

#[cfg(not(feature = "speaker"))]
fn build_sink(
    config: &ReaderConfig,
    events: UnboundedSender<PlaybackEvent>,
) -> Result<Arc<dyn AudioSink>> {
    info!("Writing narration to {}", config.output_dir.display());
    Ok(Arc::new(reader_voice::audio::ExportSink::new(
        config.output_dir.clone(),
        events,
    )))
}

async fn read_aloud(config: ReaderConfig, book: Book) -> Result<()> {
    let (playback_tx, playback_rx) = mpsc::unbounded_channel();
    let sink = build_sink(&config, playback_tx.clone())?;
    let mut playback = PlaybackMachine::new(sink, playback_tx, config.engine);
    playback.add_engine(build_engine(&config)?);
    playback.set_voice(config.voice.clone());
    playback.load_book(book);

    let (recognition_tx, recognition_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let session = ListeningSession::new(
        Box::new(LineRecognizer::new(recognition_tx)),
        update_tx,
        config.restart_attempts,
    );
    let feedback = FeedbackSynthesizer::new(Box::new(ConsoleSpeech));
    let mut reader = Reader::new(session, update_rx, feedback, playback);

    println!("Comandos: {}", available_commands().join(", "));
    reader.run(recognition_rx, playback_rx).await;
    info!("Reader finished");
    Ok(())
}
