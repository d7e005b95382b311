use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("unable to reach any etcd endpoint ({endpoints}): {reason}")]
    Unreachable { endpoints: String, reason: String },

    #[error("etcd error {code}: {message}")]
    Etcd { code: i64, message: String },

    #[error("unexpected response from {url}: HTTP {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("{0}")]
    Migration(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
