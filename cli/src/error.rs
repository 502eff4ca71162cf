use thiserror::Error;

/// Failures of a single submission round trip.
///
/// The `Display` text of each variant is what ends up on the error card, so
/// `Rejected` renders the server-provided message unchanged.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("could not read the server response: {0}")]
    MalformedResponse(String),

    #[error("The server did not return a task identifier.")]
    MissingTaskId,

    #[error("event stream failed: {0}")]
    Stream(String),

    #[error("invalid endpoint URL: {0}")]
    Url(String),
}

impl SubmitError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

pub type SubmitResult<T> = Result<T, SubmitError>;
