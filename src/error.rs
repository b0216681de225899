use rootcause::Report;
use thiserror::Error;

/// Failures of a whole load call.
///
/// Recoverable defects inside the container (unknown chunks, dangling
/// material references, out-of-range indices) are logged and tolerated; only
/// structural failures end up here.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[cfg(feature = "json")]
    #[error("error serializing json: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

pub type LoadResult<T> = Result<T, Report<LoadError>>;
