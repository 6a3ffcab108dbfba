//! Speech-to-text collaborator.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;

use crate::error::{CareError, ErrorCode};

/// Why voice capture produced no text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoiceError {
    #[error("Your browser doesn't support speech recognition.")]
    Unsupported,

    #[error("No speech was detected. Please try again.")]
    NoSpeech,

    #[error("No microphone was found.")]
    AudioCapture,

    #[error("Microphone permission was denied.")]
    PermissionDenied,

    #[error("Speech recognition failed: {0}")]
    Other(String),
}

impl VoiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unsupported => ErrorCode::VoiUnsupported,
            Self::NoSpeech => ErrorCode::VoiNoSpeech,
            Self::AudioCapture => ErrorCode::VoiAudioCapture,
            Self::PermissionDenied => ErrorCode::VoiPermissionDenied,
            Self::Other(_) => ErrorCode::VoiFailed,
        }
    }

    /// Whether trying again could succeed without changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NoSpeech | Self::Other(_))
    }
}

impl From<VoiceError> for CareError {
    fn from(err: VoiceError) -> Self {
        CareError::Voice {
            message: err.to_string(),
            code: err.code(),
        }
    }
}

/// Produces text from the user's voice.
#[async_trait]
pub trait VoiceInput: Send + Sync {
    /// Listen for one utterance and return its transcript.
    async fn listen(&self) -> Result<String, VoiceError>;
}

/// Voice input for hosts without speech recognition.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedVoiceInput;

#[async_trait]
impl VoiceInput for UnsupportedVoiceInput {
    async fn listen(&self) -> Result<String, VoiceError> {
        Err(VoiceError::Unsupported)
    }
}

/// Voice input that replays queued results, then reports no speech.
#[derive(Debug, Default)]
pub struct ScriptedVoiceInput {
    script: Mutex<VecDeque<Result<String, VoiceError>>>,
}

impl ScriptedVoiceInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a transcript.
    pub fn say(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()))
    }

    /// Queue a failure.
    pub fn fail(self, err: VoiceError) -> Self {
        self.push(Err(err))
    }

    fn push(self, item: Result<String, VoiceError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(item);
        }
        self
    }
}

#[async_trait]
impl VoiceInput for ScriptedVoiceInput {
    async fn listen(&self) -> Result<String, VoiceError> {
        let next = self
            .script
            .lock()
            .map_err(|e| VoiceError::Other(e.to_string()))?
            .pop_front();
        match next {
            Some(Ok(text)) if text.trim().is_empty() => Err(VoiceError::NoSpeech),
            Some(result) => result,
            None => Err(VoiceError::NoSpeech),
        }
    }
}
