//! Scripted synthesizer for tests and offline demo runs.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::SynthesisError;
use crate::synthesizer::SpeechSynthesizer;
use crate::types::{SynthesisOptions, SynthesizedAudio};

enum Mode {
    /// Pop the next scripted result per call; succeed once the script runs dry.
    Script(Mutex<VecDeque<Result<SynthesizedAudio, SynthesisError>>>),
    AlwaysOk,
    AlwaysFail,
}

/// Synthesizer that plays back pre-scripted results.
pub struct MockSynthesizer {
    name: String,
    mode: Mode,
    calls: Mutex<Vec<String>>,
}

impl MockSynthesizer {
    pub fn succeeding(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::AlwaysOk,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::AlwaysFail,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_results(
        name: &str,
        results: Vec<Result<SynthesizedAudio, SynthesisError>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::Script(Mutex::new(results.into())),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A dummy clip of `bytes` audio bytes.
    pub fn clip(bytes: usize) -> SynthesizedAudio {
        SynthesizedAudio {
            data: vec![0u8; bytes],
            media_type: "audio/wav".to_string(),
            sample_rate: Some(24_000),
        }
    }

    /// Texts this synthesizer was asked to speak, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        !matches!(self.mode, Mode::AlwaysFail)
    }

    async fn synthesize(
        &self,
        text: &str,
        _options: &SynthesisOptions,
    ) -> Result<SynthesizedAudio, SynthesisError> {
        self.calls.lock().push(text.to_string());
        match &self.mode {
            Mode::Script(results) => results
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(Self::clip(100))),
            Mode::AlwaysOk => Ok(Self::clip(100)),
            Mode::AlwaysFail => Err(SynthesisError::Unavailable(format!(
                "{} is scripted to fail",
                self.name
            ))),
        }
    }
}
