use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("google auth: {0}")]
    Auth(String),

    #[error("sheets api returned {status}: {message}")]
    Api { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
