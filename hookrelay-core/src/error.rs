use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures that surface while moving an event through the pipeline.
///
/// The HTTP transport keeps its concrete error; collaborator failures are
/// wrapped so callers match on where a problem occurred rather than on the
/// client library behind the seam.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP transport failed before a response body could be read.
    #[error(transparent)]
    Http(#[from] rquest::Error),
    /// The event payload, header map or form body could not be interpreted.
    #[error("payload error: {0}")]
    Payload(#[source] anyhow::Error),
    /// A key/value+list store operation failed.
    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),
    /// A log broker operation failed.
    #[error("broker error: {0}")]
    Broker(#[source] anyhow::Error),
}

impl Error {
    pub fn payload<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Error::Payload(err.into())
    }

    pub fn store<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Error::Store(err.into())
    }

    pub fn broker<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Error::Broker(err.into())
    }
}
