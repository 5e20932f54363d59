//! Post list controller: the in-memory newest-first collection, the shared
//! draft form, and the orchestration of every mutation through [`PostApi`].

use std::{
    collections::HashSet,
    str::FromStr,
    sync::{Arc, Mutex as StdMutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use shared::{
    domain::{Post, PostId},
    error::PostApiError,
    protocol::PostPayload,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    error::{ControllerError, UnknownReorderPolicy},
    events::{failure_banner, ControllerEvent, Operation},
    PostApi,
};

/// How the collection is reordered after a successful update or remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderPolicy {
    /// Replace or filter in place.
    #[default]
    Stable,
    /// Reverse the whole collection after every update and remove. Legacy
    /// ordering kept for clients that depend on it.
    Compat,
}

impl FromStr for ReorderPolicy {
    type Err = UnknownReorderPolicy;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "stable" => Ok(Self::Stable),
            "compat" => Ok(Self::Compat),
            other => Err(UnknownReorderPolicy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftMode {
    #[default]
    New,
    Editing(PostId),
}

/// The single shared form buffer. There is never more than one post being
/// edited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Draft {
    pub title: String,
    pub body: String,
    pub mode: DraftMode,
}

impl Draft {
    pub fn editing(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            body: post.body.clone(),
            mode: DraftMode::Editing(post.id),
        }
    }

    pub fn editing_id(&self) -> Option<PostId> {
        match self.mode {
            DraftMode::New => None,
            DraftMode::Editing(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Intent {
    Load,
    Submit,
    Remove(PostId),
}

type InflightSet = Arc<StdMutex<HashSet<Intent>>>;

/// Releases an in-flight intent when the owning operation finishes or is
/// dropped mid-request.
struct InflightGuard {
    intents: InflightSet,
    intent: Intent,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.intents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.intent);
    }
}

struct ControllerState {
    posts: Vec<Post>,
    draft: Draft,
    mounted: bool,
}

pub struct PostListController {
    api: Arc<dyn PostApi>,
    policy: ReorderPolicy,
    inner: Mutex<ControllerState>,
    inflight: InflightSet,
    events: broadcast::Sender<ControllerEvent>,
}

impl PostListController {
    pub fn new(api: Arc<dyn PostApi>, policy: ReorderPolicy) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            api,
            policy,
            inner: Mutex::new(ControllerState {
                posts: Vec::new(),
                draft: Draft::default(),
                mounted: false,
            }),
            inflight: Arc::new(StdMutex::new(HashSet::new())),
            events,
        })
    }

    pub fn policy(&self) -> ReorderPolicy {
        self.policy
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn posts(&self) -> Vec<Post> {
        self.inner.lock().await.posts.clone()
    }

    pub async fn draft(&self) -> Draft {
        self.inner.lock().await.draft.clone()
    }

    /// Initial load. Lists once per controller; later calls return
    /// `Ok(false)` without touching the network, even if the first load
    /// failed.
    pub async fn mount(&self) -> Result<bool, ControllerError> {
        {
            let mut guard = self.inner.lock().await;
            if guard.mounted {
                return Ok(false);
            }
            guard.mounted = true;
        }
        self.load_all().await?;
        Ok(true)
    }

    pub async fn load_all(&self) -> Result<usize, ControllerError> {
        let _inflight = self.claim(Intent::Load, Operation::Load)?;
        let mut posts = match self.api.list().await {
            Ok(posts) => posts,
            Err(err) => return Err(self.fail(Operation::Load, err)),
        };

        // Server order is oldest-first.
        posts.reverse();
        let mut seen = HashSet::new();
        posts.retain(|post| seen.insert(post.id));
        let count = posts.len();

        self.inner.lock().await.posts = posts;
        info!(count, "loaded posts");
        let _ = self.events.send(ControllerEvent::Loaded { count });
        Ok(count)
    }

    /// Creates or updates depending on the draft mode.
    pub async fn submit(&self) -> Result<Post, ControllerError> {
        let draft = self.draft().await;
        match draft.mode {
            DraftMode::New => self.create(draft.title, draft.body).await,
            DraftMode::Editing(id) => self.update(id, draft.title, draft.body).await,
        }
    }

    pub async fn create(&self, title: String, body: String) -> Result<Post, ControllerError> {
        let _inflight = self.claim(Intent::Submit, Operation::Create)?;
        let payload = PostPayload::new(title, body);
        let post = match self.api.create(&payload).await {
            Ok(post) => post,
            Err(err) => return Err(self.fail(Operation::Create, err)),
        };

        {
            let mut guard = self.inner.lock().await;
            guard.posts.retain(|entry| entry.id != post.id);
            guard.posts.insert(0, post.clone());
            guard.draft = Draft::default();
        }
        info!(post_id = post.id.0, "created post");
        let _ = self.events.send(ControllerEvent::Created(post.clone()));
        Ok(post)
    }

    pub async fn update(
        &self,
        id: PostId,
        title: String,
        body: String,
    ) -> Result<Post, ControllerError> {
        let _inflight = self.claim(Intent::Submit, Operation::Update)?;
        let payload = PostPayload::new(title, body);
        let post = match self.api.update(id, &payload).await {
            Ok(post) => post,
            Err(err) => return Err(self.fail(Operation::Update, err)),
        };

        {
            let mut guard = self.inner.lock().await;
            let mut replaced = false;
            for entry in guard.posts.iter_mut().filter(|entry| entry.id == id) {
                *entry = post.clone();
                replaced = true;
            }
            if !replaced {
                debug!(post_id = id.0, "updated post is not in the local collection");
            }
            if self.policy == ReorderPolicy::Compat {
                guard.posts.reverse();
            }
            guard.draft = Draft::default();
        }
        info!(post_id = id.0, "updated post");
        let _ = self.events.send(ControllerEvent::Updated(post.clone()));
        Ok(post)
    }

    /// Deletes remotely, then drops every local entry with `id`. The draft is
    /// left as is, even when it is editing the removed post.
    pub async fn remove(&self, id: PostId) -> Result<(), ControllerError> {
        let _inflight = self.claim(Intent::Remove(id), Operation::Remove)?;
        if let Err(err) = self.api.delete(id).await {
            return Err(self.fail(Operation::Remove, err));
        }

        {
            let mut guard = self.inner.lock().await;
            guard.posts.retain(|entry| entry.id != id);
            if self.policy == ReorderPolicy::Compat {
                guard.posts.reverse();
            }
        }
        info!(post_id = id.0, "removed post");
        let _ = self.events.send(ControllerEvent::Removed(id));
        Ok(())
    }

    pub async fn begin_edit(&self, post: &Post) {
        self.inner.lock().await.draft = Draft::editing(post);
    }

    /// Drops any in-progress edit and clears the form.
    pub async fn cancel_edit(&self) {
        self.inner.lock().await.draft = Draft::default();
    }

    pub async fn set_title(&self, title: impl Into<String>) {
        self.inner.lock().await.draft.title = title.into();
    }

    pub async fn set_body(&self, body: impl Into<String>) {
        self.inner.lock().await.draft.body = body.into();
    }

    fn claim(
        &self,
        intent: Intent,
        operation: Operation,
    ) -> Result<InflightGuard, ControllerError> {
        let inserted = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(intent);
        if !inserted {
            warn!(operation = operation.as_str(), "rejected duplicate intent");
            return Err(ControllerError::Busy(operation));
        }
        Ok(InflightGuard {
            intents: Arc::clone(&self.inflight),
            intent,
        })
    }

    fn fail(&self, operation: Operation, err: PostApiError) -> ControllerError {
        warn!(operation = operation.as_str(), error = %err, "post api call failed");
        let _ = self.events.send(ControllerEvent::Failed {
            operation,
            kind: err.kind(),
            message: failure_banner(operation, &err),
        });
        ControllerError::Api(err)
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
