use shared::error::{ErrorKind, PostApiError};
use thiserror::Error;

use crate::events::Operation;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Api(#[from] PostApiError),
    #[error("{0} is already in flight")]
    Busy(Operation),
}

impl ControllerError {
    /// `None` for rejected duplicate intents, which never reached the network.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Api(err) => Some(err.kind()),
            Self::Busy(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("base url `{0}` cannot carry a path")]
    InvalidBaseUrl(String),
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
#[error("unknown reorder policy `{0}` (expected `stable` or `compat`)")]
pub struct UnknownReorderPolicy(pub String);
