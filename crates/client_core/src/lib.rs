use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Post, PostId},
    error::PostApiError,
    protocol::PostPayload,
};
use tracing::debug;
use url::Url;

pub mod controller;
pub mod error;
pub mod events;

pub use controller::{Draft, DraftMode, PostListController, ReorderPolicy};
pub use error::{ControllerError, SetupError};
pub use events::{failure_banner, ControllerEvent, Operation};

pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";
const POSTS_SEGMENT: &str = "posts";

/// The remote collaborator behind the post list. Every call is a single
/// round trip and holds no state between calls.
#[async_trait]
pub trait PostApi: Send + Sync {
    async fn list(&self) -> Result<Vec<Post>, PostApiError>;
    async fn create(&self, payload: &PostPayload) -> Result<Post, PostApiError>;
    async fn update(&self, id: PostId, payload: &PostPayload) -> Result<Post, PostApiError>;
    async fn delete(&self, id: PostId) -> Result<(), PostApiError>;
}

pub struct HttpPostApi {
    http: Client,
    base_url: Url,
}

impl HttpPostApi {
    pub fn new(base_url: Url) -> Result<Self, SetupError> {
        Self::with_timeout(base_url, None)
    }

    pub fn with_timeout(base_url: Url, timeout: Option<Duration>) -> Result<Self, SetupError> {
        if base_url.cannot_be_a_base() {
            return Err(SetupError::InvalidBaseUrl(base_url.to_string()));
        }
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, id: Option<PostId>) -> Url {
        let mut url = self.base_url.clone();
        // `with_timeout` rejects cannot-be-a-base urls, so segments are always available.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(POSTS_SEGMENT);
            if let Some(id) = id {
                segments.push(&id.0.to_string());
            }
        }
        url
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, PostApiError> {
        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unrecognized status")
                .to_string()
        } else {
            body
        };
        Err(PostApiError::server(status.as_u16(), message))
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, PostApiError> {
        let bytes = self
            .execute(request)
            .await?
            .bytes()
            .await
            .map_err(network_error)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn network_error(err: reqwest::Error) -> PostApiError {
    PostApiError::network(err.to_string())
}

#[async_trait]
impl PostApi for HttpPostApi {
    async fn list(&self) -> Result<Vec<Post>, PostApiError> {
        let url = self.endpoint(None);
        debug!(%url, "GET posts");
        self.execute_json(self.http.get(url)).await
    }

    async fn create(&self, payload: &PostPayload) -> Result<Post, PostApiError> {
        let url = self.endpoint(None);
        debug!(%url, "POST post");
        self.execute_json(self.http.post(url).json(payload)).await
    }

    async fn update(&self, id: PostId, payload: &PostPayload) -> Result<Post, PostApiError> {
        let url = self.endpoint(Some(id));
        debug!(%url, post_id = id.0, "PUT post");
        self.execute_json(self.http.put(url).json(payload)).await
    }

    async fn delete(&self, id: PostId) -> Result<(), PostApiError> {
        let url = self.endpoint(Some(id));
        debug!(%url, post_id = id.0, "DELETE post");
        self.execute(self.http.delete(url)).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
