use thiserror::Error;

/// Failure taxonomy for evidence collection and dataset refresh.
#[derive(Debug, Error)]
pub enum Error {
    /// A remote fetch failed (timeout, connection refused, HTTP error) or the
    /// fetched metadata carried no usable timestamp. Fatal to the current
    /// refresh call; there is no automatic retry.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Input that could not be parsed (manifest, marker file, dataset export).
    #[error("malformed data: {0}")]
    MalformedData(String),

    /// Underlying filesystem or archive read failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive container itself could not be read.
    #[error("archive error: {0}")]
    Archive(String),

    /// A digest could not be computed for a scanned file.
    #[error("checksum failure: {0}")]
    Checksum(String),
}

pub type Result<T> = std::result::Result<T, Error>;
