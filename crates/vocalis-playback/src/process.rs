//! Local synthesis fallback via the espeak command line.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error};

use crate::error::SynthesisError;
use crate::synthesizer::SpeechSynthesizer;
use crate::types::{SynthesisOptions, SynthesizedAudio};

/// Default speaking rate in words per minute; `SynthesisOptions::rate` is a
/// multiplier on top of this.
const BASE_RATE_WPM: f32 = 175.0;

/// Local synthesis provider shelling out to `espeak` / `espeak-ng`.
///
/// Serves as the offline fallback when the remote provider fails. Produces
/// WAV on stdout.
pub struct ProcessSynthesizer {
    default_voice: Option<String>,
}

impl ProcessSynthesizer {
    pub fn new(default_voice: Option<String>) -> Self {
        Self { default_voice }
    }

    /// Resolve the espeak command name (espeak or espeak-ng).
    async fn espeak_command() -> Option<String> {
        if Command::new("espeak").arg("--version").output().await.is_ok() {
            Some("espeak".to_string())
        } else if Command::new("espeak-ng")
            .arg("--version")
            .output()
            .await
            .is_ok()
        {
            Some("espeak-ng".to_string())
        } else {
            None
        }
    }

    fn build_args(&self, text: &str, options: &SynthesisOptions) -> Vec<String> {
        let mut args = vec!["--stdout".to_string()];

        // Voice: per-request voice, else the configured default, else derive
        // one from the language code ("de-DE" -> "de").
        let voice = options
            .voice
            .clone()
            .or_else(|| self.default_voice.clone())
            .or_else(|| {
                options
                    .language
                    .as_ref()
                    .and_then(|lang| lang.split('-').next())
                    .map(|s| s.to_lowercase())
            });
        if let Some(voice_id) = voice {
            args.push("-v".to_string());
            args.push(voice_id);
        }

        let wpm = (BASE_RATE_WPM * options.rate.unwrap_or(1.0)).clamp(80.0, 450.0) as u32;
        args.push("-s".to_string());
        args.push(wpm.to_string());

        let pitch = (options.pitch.unwrap_or(1.0) * 50.0).clamp(0.0, 99.0) as u32;
        args.push("-p".to_string());
        args.push(pitch.to_string());

        let amplitude = (options.volume.unwrap_or(1.0) * 200.0).clamp(0.0, 200.0) as u32;
        args.push("-a".to_string());
        args.push(amplitude.to_string());

        args.push(text.to_string());
        args
    }
}

#[async_trait]
impl SpeechSynthesizer for ProcessSynthesizer {
    fn name(&self) -> &str {
        "espeak"
    }

    async fn is_available(&self) -> bool {
        Self::espeak_command().await.is_some()
    }

    async fn synthesize(
        &self,
        text: &str,
        options: &SynthesisOptions,
    ) -> Result<SynthesizedAudio, SynthesisError> {
        let cmd = Self::espeak_command().await.ok_or_else(|| {
            SynthesisError::Unavailable("espeak not found on this host".to_string())
        })?;

        let args = self.build_args(text, options);
        debug!(target: "playback", "Running local synthesis: {} {:?}", cmd, args);

        let output = Command::new(&cmd).args(&args).output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(target: "playback", "espeak failed: {}", stderr);
            return Err(SynthesisError::ProcessFailed(stderr.into_owned()));
        }
        if output.stdout.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }

        Ok(SynthesizedAudio {
            data: output.stdout,
            media_type: "audio/wav".to_string(),
            sample_rate: Some(22_050),
        })
    }
}
