use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use vocalis_app::config::VoiceSessionConfig;
use vocalis_app::runtime::{VoiceRuntime, VoiceRuntimeOptions};
use vocalis_capture::mock::{MockRecognizer, ScriptedEvent};
use vocalis_capture::{RecognizerEvent, SpeechRecognizer};
use vocalis_playback::{
    AudioSink, DiscardSink, ProcessSynthesizer, SpeechSynthesizer, SynthesisOptions,
};
use vocalis_synth_remote::RemoteSynthesizer;

#[derive(Parser, Debug)]
#[command(name = "vocalis", about = "Voice capture and playback pipelines")]
struct Args {
    /// Path to a session configuration TOML file
    #[arg(long, env = "VOCALIS_CONFIG")]
    config: Option<PathBuf>,

    /// Remote synthesis endpoint; local espeak is used as fallback
    #[arg(long, env = "VOCALIS_TTS_ENDPOINT")]
    tts_endpoint: Option<String>,

    /// Recognition and synthesis language code (e.g. de-DE)
    #[arg(long, env = "VOCALIS_LANGUAGE")]
    language: Option<String>,

    /// Preferences file for volume/language persistence
    #[arg(long, default_value = "vocalis-prefs.toml")]
    prefs: PathBuf,
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "vocalis.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    std::mem::forget(guard);
    Ok(())
}

/// Scripted capture run standing in for a real recognizer, so the pipeline
/// can be exercised end to end on hosts without one.
fn demo_recognizer() -> Arc<dyn SpeechRecognizer> {
    Arc::new(MockRecognizer::with_script(vec![vec![
        ScriptedEvent::after_ms(
            300,
            RecognizerEvent::Interim {
                text: "hallo wie".to_string(),
            },
        ),
        ScriptedEvent::after_ms(
            400,
            RecognizerEvent::Final {
                text: "Hallo, wie geht es dir?".to_string(),
                confidence: 0.92,
            },
        ),
        ScriptedEvent::after_ms(200, RecognizerEvent::Ended),
    ]]))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
    let args = Args::parse();
    tracing::info!("Starting Vocalis");

    let mut session = match &args.config {
        Some(path) => VoiceSessionConfig::load(path)?,
        None => VoiceSessionConfig::default(),
    };
    if args.language.is_some() {
        session.language = args.language.clone();
    }

    let language = session.language.clone().unwrap_or_else(|| "en-US".to_string());
    let fallback: Arc<dyn SpeechSynthesizer> = Arc::new(ProcessSynthesizer::new(None));
    let primary: Arc<dyn SpeechSynthesizer> = match &args.tts_endpoint {
        Some(endpoint) => Arc::new(RemoteSynthesizer::new(endpoint.clone(), language.clone())),
        None => fallback.clone(),
    };
    let audio_sink: Arc<dyn AudioSink> = Arc::new(DiscardSink::default());

    let runtime = VoiceRuntime::build(
        demo_recognizer(),
        primary,
        Some(fallback),
        audio_sink,
        VoiceRuntimeOptions {
            session,
            prefs_path: Some(args.prefs),
        },
    )?;

    // One demo round trip: capture a transcript, then speak it back.
    if let Err(e) = runtime.record().await {
        tracing::warn!("Capture session failed: {}", e.user_message());
    }
    let sink = runtime.transcript_sink();
    let transcript = sink
        .submissions()
        .last()
        .cloned()
        .unwrap_or_else(|| sink.field_text());
    if !transcript.is_empty() {
        let options = SynthesisOptions {
            language: Some(language),
            ..SynthesisOptions::default()
        };
        if let Err(e) = runtime.speak(&transcript, options).await {
            tracing::warn!("Playback failed: {}", e);
        }
    }

    tracing::info!("Waiting for shutdown signal (Ctrl+C)...");
    tokio::signal::ctrl_c().await?;
    runtime.shutdown().await;
    Ok(())
}
