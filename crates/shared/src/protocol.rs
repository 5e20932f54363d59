use serde::{Deserialize, Serialize};

/// Request body for `POST /posts` and `PUT /posts/{id}`.
///
/// Always a full title+body submission; the client never patches a single
/// field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPayload {
    pub title: String,
    pub body: String,
}

impl PostPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}
