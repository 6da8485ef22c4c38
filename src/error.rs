use thiserror::Error;

/// A failure while reading an ICS feed. Carries the 1-based line number the
/// parser was on when it gave up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("ICS parse error on line {line}: {reason}")]
pub struct ParseError {
    pub line: usize,
    pub reason: String,
}

impl ParseError {
    pub fn new<S: Into<String>>(line: usize, reason: S) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Database error: {0}")]
    Data(#[from] sqlx::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Fetch error: HTTP {status} from {url}")]
    FetchStatus { status: u16, url: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn is_pii_safe(&self) -> bool {
        match self {
            Self::Data(_) | Self::Fetch(_) | Self::FetchStatus { .. } | Self::Anyhow(_) => false,
            Self::Parse(_) | Self::Config(_) | Self::Timeout(_) | Self::Cancelled => true,
        }
    }

    pub fn to_safe_string(&self) -> String {
        if self.is_pii_safe() {
            self.to_string()
        } else {
            match self {
                Self::Data(_) => "Database operation failed".to_string(),
                Self::Fetch(_) | Self::FetchStatus { .. } => "Calendar feed request failed".to_string(),
                Self::Anyhow(_) => "Operation failed".to_string(),
                _ => self.to_string(),
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
