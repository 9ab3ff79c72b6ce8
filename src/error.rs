use std::process::ExitStatus;

use reqwest::StatusCode;

/// Failure talking to the watch backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid backend URL for {endpoint}: {source}")]
    Url {
        endpoint: &'static str,
        source: url::ParseError,
    },

    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: &'static str,
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        source: serde_json::Error,
    },
}

/// Failure bringing up or running playback.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("failed to fetch manifest {url}: {reason}")]
    ManifestFetch { url: String, reason: String },

    #[error("failed to parse manifest {url}: {reason}")]
    ManifestParse { url: String, reason: String },

    #[error("manifest {url} has no playable variants")]
    EmptyManifest { url: String },

    #[error("player '{program}' not found. Install mpv or set {env} to a valid command.")]
    PlayerNotFound { program: String, env: &'static str },

    #[error("player command is empty")]
    EmptyCommand,

    #[error("failed to launch player '{program}': {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },

    #[error("player exited with status {0}")]
    Exit(ExitStatus),

    #[error("failed to open embed {url}: {source}")]
    Embed {
        url: String,
        source: std::io::Error,
    },
}

impl PlayerError {
    /// Whether this error came from attaching the HLS decoder.
    pub fn is_decoder_attach(&self) -> bool {
        matches!(
            self,
            PlayerError::ManifestFetch { .. }
                | PlayerError::ManifestParse { .. }
                | PlayerError::EmptyManifest { .. }
        )
    }
}
