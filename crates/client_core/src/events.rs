//! Controller notifications consumed by the presentation layer.

use std::fmt;

use shared::{
    domain::{Post, PostId},
    error::{ErrorKind, PostApiError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Load,
    Create,
    Update,
    Remove,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Create => "create",
            Self::Update => "update",
            Self::Remove => "remove",
        }
    }

    fn progressive(self) -> &'static str {
        match self {
            Self::Load => "loading posts",
            Self::Create => "creating the post",
            Self::Update => "updating the post",
            Self::Remove => "deleting the post",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    Loaded {
        count: usize,
    },
    Created(Post),
    Updated(Post),
    Removed(PostId),
    Failed {
        operation: Operation,
        kind: ErrorKind,
        message: String,
    },
}

/// One-line, user-facing description of a failed operation.
pub fn failure_banner(operation: Operation, err: &PostApiError) -> String {
    let action = operation.progressive();
    match err {
        PostApiError::Network(_) => {
            format!("Could not reach the server while {action}; check the connection and retry.")
        }
        PostApiError::Server { status, .. } => {
            format!("The server rejected {action} (HTTP {status}); retry later.")
        }
        PostApiError::Decode(_) => {
            format!("The server sent an unexpected response while {action}.")
        }
    }
}
