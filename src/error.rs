use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of an [Error], used to decide how a failure is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any network I/O.
    Validation,
    /// Network failure, read failure or a non-success status.
    Transport,
    /// Structured error payload returned by the backend.
    Backend,
    /// The transfer was aborted through a cancel handle.
    Cancelled,
    Playback,
    Io,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("could not synthesize speech (HTTP {0})")]
    Status(http::StatusCode),
    #[error("{}", .detail.as_deref().unwrap_or("could not create the audio file"))]
    Backend {
        status: http::StatusCode,
        detail: Option<String>,
    },
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("transfer cancelled")]
    Cancelled,
    #[error("playback error: {0}")]
    Playback(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("please enter the text to read")]
    EmptyText,
    #[error("{name} {value} is out of range {min}..={max}")]
    OutOfRange {
        name: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },
    #[error("only .txt files are accepted: {0}")]
    NotATextFile(String),
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Status(_) | Error::Reqwest(_) => ErrorKind::Transport,
            Error::Backend { .. } => ErrorKind::Backend,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Playback(_) => ErrorKind::Playback,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Render the single string shown to the user for this failure.
    ///
    /// Validation errors are shown inline without a prefix. Everything else is
    /// prefixed, and `backend_hint` appends a reminder to check that the
    /// backend is reachable.
    pub fn user_message(&self, backend_hint: bool) -> String {
        match self {
            Error::Validation(err) => err.to_string(),
            _ if backend_hint => format!(
                "Error: {}\n\nPlease check that the backend is running",
                self
            ),
            _ => format!("Error: {}", self),
        }
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(error: tempfile::PersistError) -> Self {
        Self::Io(error.error)
    }
}
