use std::fmt;

use thiserror::Error;

pub type PortalResult<T> = Result<T, PortalError>;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    #[error("transport failure")]
    Transport(#[from] reqwest::Error),
    #[error("response decoding failed")]
    Json(#[from] serde_json::Error),
    #[error("authentication rejected: {message}")]
    Auth { message: String, details: Vec<String> },
    #[error("portal api error: {message}")]
    Api { message: String, details: Vec<String> },
    #[error("token expired at epoch {expired_at_epoch_secs}")]
    TokenExpired { expired_at_epoch_secs: i64 },
    #[error("unexpected payload: {0}")]
    UnexpectedPayload(String),
    #[error("{0}")]
    Message(String),
}

impl PortalError {
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }

    pub fn display_chain(&self) -> DisplayChainedError<'_> {
        DisplayChainedError { inner: self }
    }
}

pub struct DisplayChainedError<'a> {
    inner: &'a (dyn std::error::Error + 'static),
}

impl fmt::Debug for DisplayChainedError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(self.inner);

        while let Some(err) = current {
            if first {
                first = false;
            } else {
                write!(f, " -> ")?;
            }

            write!(f, "{err}")?;
            current = err.source();
        }

        Ok(())
    }
}

impl fmt::Display for DisplayChainedError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
