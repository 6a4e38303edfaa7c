use thiserror::Error;

pub type Result<T> = std::result::Result<T, JournalError>;

#[derive(Debug, Error)]
pub enum JournalError {
    /// A header or cookie resource could not be found or read.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The login endpoint answered with a 4xx status.
    #[error("login rejected with status {status}, most probably login or password is wrong")]
    InvalidCredentials { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("no period contains {today}")]
    NoCurrentPeriod { today: chrono::NaiveDate },

    #[error("invalid date {0:?}, expected day.month.year")]
    InvalidDate(String),
}

impl JournalError {
    pub fn malformed(what: impl Into<String>) -> Self {
        JournalError::MalformedResponse(what.into())
    }
}

impl From<reqwest::Error> for JournalError {
    fn from(err: reqwest::Error) -> Self {
        JournalError::Transport(err.to_string())
    }
}

impl From<url::ParseError> for JournalError {
    fn from(err: url::ParseError) -> Self {
        JournalError::Transport(format!("bad url: {err}"))
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(err: serde_json::Error) -> Self {
        JournalError::MalformedResponse(err.to_string())
    }
}
