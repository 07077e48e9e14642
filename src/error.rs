// Fatal error taxonomy for idox
// Everything here aborts a run before the first request is dispatched.
// Per-request failures live in transport.rs and are folded into statistics.

use std::path::PathBuf;
use thiserror::Error;

/// Why a raw request blob could not be split into a `Request`.
#[derive(Debug, Error)]
pub enum RequestParseError {
    #[error("request is empty")]
    Empty,

    #[error("request line must be `METHOD URI VERSION`, got {line:?}")]
    RequestLine { line: String },

    #[error("header line is missing the `: ` separator: {line:?}")]
    HeaderLine { line: String },

    #[error("request has no Host header")]
    MissingHost,

    #[error("JSON body could not be parsed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a raw response blob could not be split into a `Response`.
#[derive(Debug, Error)]
pub enum ResponseParseError {
    #[error("response is empty")]
    Empty,

    #[error("status line must be `PROTO CODE [TEXT]`, got {line:?}")]
    StatusLine { line: String },

    #[error("status code is not a number: {code:?}")]
    StatusCode { code: String },

    #[error("header line is missing the `: ` separator: {line:?}")]
    HeaderLine { line: String },
}

#[derive(Debug, Error)]
pub enum IdoxError {
    #[error("the provided request did not match the expected HTTP format: {0}")]
    MalformedRequest(#[source] RequestParseError),

    #[error("the provided response did not match the expected HTTP format: {0}")]
    MalformedResponse(#[source] ResponseParseError),

    #[error("no request source provided (set one of request text, request file or request url)")]
    NoRequestSource,

    #[error("use exactly one of request text, request file or request url")]
    ConflictingRequestSources,

    #[error("injection point must not be empty")]
    EmptyInjectionPoint,

    #[error("injection point {marker:?} was not found in the url, headers, cookies or body")]
    InjectionPointNotFound { marker: String },

    #[error("max_concurrency must be between 1 and {}", tokio::sync::Semaphore::MAX_PERMITS)]
    InvalidConcurrency,

    #[error("numeric sequence step must not be zero")]
    InvalidStep,

    #[error("sequence file does not exist: {}", path.display())]
    SequenceFileMissing { path: PathBuf },

    #[error("failed to open sequence file: {}: {source}", path.display())]
    SequenceFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read request file: {}: {source}", path.display())]
    RequestFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to prepare output directory: {}: {source}", path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClientBuild(#[source] reqwest::Error),
}
