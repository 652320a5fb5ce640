/*!
 * Error types for the cuedub application.
 *
 * Library code returns these typed errors so the controller can decide
 * where a failure stops: a language run, a content item, or nothing.
 * They use the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with remote translation or speech APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider answered but returned nothing usable
    #[error("Empty response: {0}")]
    EmptyResponse(String),
}

impl ProviderError {
    /// Map a reqwest failure onto the closest provider error
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }

    /// Map a non-success HTTP status onto a provider error
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

/// Errors raised while decoding, encoding or combining audio clips
#[derive(Error, Debug)]
pub enum AudioError {
    /// WAV container could not be read or written
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Two clips with different layouts were combined
    #[error("Audio format mismatch: expected {expected_channels}ch@{expected_rate}Hz, got {channels}ch@{rate}Hz")]
    FormatMismatch {
        expected_channels: u16,
        expected_rate: u32,
        channels: u16,
        rate: u32,
    },

    /// Sample layout the decoder does not handle
    #[error("Unsupported sample format: {0}")]
    Unsupported(String),

    /// Concatenation was asked to join zero clips
    #[error("No audio clips to combine")]
    Empty,
}

/// Errors from a transcript source
#[derive(Error, Debug)]
pub enum TranscriptError {
    /// Transcripts are switched off for this content item; retrying will not help
    #[error("Transcripts are disabled for {0}")]
    Disabled(String),

    /// No transcript could be obtained right now
    #[error("Transcript unavailable for {content_id}: {reason}")]
    Unavailable {
        content_id: String,
        reason: String,
    },

    /// The transcript exists but could not be parsed
    #[error("Malformed transcript for {content_id}: {reason}")]
    Malformed {
        content_id: String,
        reason: String,
    },
}

/// Main error type of a dubbing run
#[derive(Error, Debug)]
pub enum DubError {
    /// Cue data violates ordering or value constraints
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// No transcript for the content item
    #[error("Transcript unavailable for {content_id} (permanent: {permanent}): {reason}")]
    TranscriptUnavailable {
        content_id: String,
        permanent: bool,
        reason: String,
    },

    /// Translation kept failing for a unit
    #[error("Translation failed for {content_id}/{language} unit {unit} after {attempts} attempts: {reason}")]
    TranslationFailed {
        content_id: String,
        language: String,
        unit: usize,
        attempts: u32,
        reason: String,
    },

    /// The speech engine could not produce audio for a unit
    #[error("Synthesis failed for {content_id}/{language} unit {unit}: {reason}")]
    SynthesisFailed {
        content_id: String,
        language: String,
        unit: usize,
        reason: String,
    },

    /// A cached artifact exists but cannot be decoded; delete it by hand
    #[error("Corrupt cache entry {key}: {reason}")]
    CacheCorruption {
        key: String,
        reason: String,
    },

    /// The artifact store failed to read or write
    #[error("Storage error while {context}: {reason}")]
    Storage {
        context: String,
        reason: String,
    },

    /// Audio processing error
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Shutdown was requested between units
    #[error("Run cancelled")]
    Cancelled,
}

impl DubError {
    /// Wrap a storage backend failure with what was being attempted
    pub fn storage(context: impl Into<String>, error: anyhow::Error) -> Self {
        Self::Storage {
            context: context.into(),
            reason: format!("{:#}", error),
        }
    }

    /// Whether the failure ends the whole content item rather than one language
    pub fn is_item_fatal(&self) -> bool {
        matches!(self, Self::MalformedInput(_) | Self::TranscriptUnavailable { .. })
    }
}

impl From<TranscriptError> for DubError {
    fn from(error: TranscriptError) -> Self {
        match error {
            TranscriptError::Disabled(content_id) => Self::TranscriptUnavailable {
                reason: "transcripts are disabled".to_string(),
                content_id,
                permanent: true,
            },
            TranscriptError::Unavailable { content_id, reason } => Self::TranscriptUnavailable {
                content_id,
                permanent: false,
                reason,
            },
            TranscriptError::Malformed { content_id, reason } => {
                Self::MalformedInput(format!("{}: {}", content_id, reason))
            }
        }
    }
}
