use serde::{Deserialize, Serialize};

use crate::protocol::PostPayload;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);
    };
}

id_newtype!(PostId);

/// A post as stored by the remote API.
///
/// The id is assigned by the server on create and never changes afterwards.
/// Fields the server sends beyond these three (JSONPlaceholder adds `userId`)
/// are ignored on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub body: String,
}

impl Post {
    pub fn new(id: PostId, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn payload(&self) -> PostPayload {
        PostPayload::new(self.title.clone(), self.body.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_post_and_ignores_extra_fields() {
        let raw = r#"{"userId": 1, "id": 7, "title": "hello", "body": "world"}"#;
        let post: Post = serde_json::from_str(raw).expect("decode");
        assert_eq!(post, Post::new(PostId(7), "hello", "world"));
    }

    #[test]
    fn post_id_serializes_as_bare_integer() {
        let encoded = serde_json::to_value(Post::new(PostId(3), "t", "b")).expect("encode");
        assert_eq!(encoded["id"], serde_json::json!(3));
    }
}
