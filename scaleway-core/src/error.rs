//! Error types: vendor transport failures, their classification, and the
//! errors surfaced to the host

use std::time::Duration;

use thiserror::Error;

use crate::validation::ValidationError;

/// Failure reported by a vendor API client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The API answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The request never got an answer
    #[error("transport error: {message}")]
    Transport { message: String, timed_out: bool },
}

impl ApiError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::http(404, format!("{} not found", what))
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport { .. } => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        classify(self)
    }
}

/// How the core reacts to a vendor error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Read collapses to drift; Delete succeeds
    NotFound,
    /// Means "already deleted" for some entity kinds
    Forbidden,
    /// Wait loops keep polling
    Retryable,
    Conflict,
    Fatal,
}

/// Map a vendor error onto the handling it gets
pub fn classify(err: &ApiError) -> ErrorKind {
    match err {
        ApiError::Http { status, .. } => match status {
            404 => ErrorKind::NotFound,
            403 => ErrorKind::Forbidden,
            408 | 429 => ErrorKind::Retryable,
            409 => ErrorKind::Conflict,
            500..=599 => ErrorKind::Retryable,
            _ => ErrorKind::Fatal,
        },
        ApiError::Transport { timed_out: true, .. } => ErrorKind::Retryable,
        ApiError::Transport { .. } => ErrorKind::Fatal,
    }
}

/// Error surfaced to the host
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("{0} not found")]
    NotFound(String),

    #[error("more than one {label} found ({count} matches)")]
    Ambiguous { label: String, count: usize },

    #[error("either {id_attribute} or name must be set")]
    MissingSelector { id_attribute: String },

    #[error("missing {0}: set it on the resource or in the provider configuration")]
    MissingScope(String),

    #[error("{first_attribute} is in {first} but {second_attribute} is in {second}")]
    ScopeMismatch {
        first_attribute: String,
        first: String,
        second_attribute: String,
        second: String,
    },

    #[error("malformed ID '{id}': {reason}")]
    MalformedId { id: String, reason: String },

    #[error("timeout after {elapsed:?} waiting for {what}")]
    Timeout { what: String, elapsed: Duration },

    #[error("{what} ended in state '{status}'")]
    FailedState { what: String, status: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("[{resource_type}] {source}")]
    Resource {
        resource_type: String,
        #[source]
        source: Box<ProviderError>,
    },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProviderError {
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![ValidationError::new(path, message)])
    }

    /// Attach the resource type the error happened in
    pub fn for_resource(self, resource_type: impl Into<String>) -> Self {
        match self {
            already @ Self::Resource { .. } => already,
            other => Self::Resource {
                resource_type: resource_type.into(),
                source: Box::new(other),
            },
        }
    }

    /// The error without resource context
    pub fn root(&self) -> &ProviderError {
        match self {
            Self::Resource { source, .. } => source.root(),
            other => other,
        }
    }

    /// Classification of the underlying vendor error, if any
    pub fn api_kind(&self) -> Option<ErrorKind> {
        match self.root() {
            Self::Api(err) => Some(err.kind()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound(_)) || self.api_kind() == Some(ErrorKind::NotFound)
    }

    pub fn is_forbidden(&self) -> bool {
        self.api_kind() == Some(ErrorKind::Forbidden)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
