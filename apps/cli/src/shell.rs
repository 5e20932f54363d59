//! Line-oriented front end over the post list controller.
//!
//! Network intents run as spawned tasks so the prompt stays usable while a
//! request is outstanding; outcomes are printed from the controller's event
//! stream.

use std::{fmt::Write as _, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use client_core::{ControllerError, ControllerEvent, Draft, DraftMode, PostListController};
use shared::domain::{Post, PostId};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, warn};

pub const HELP: &str = "\
commands:
  list            show posts, newest first
  title <text>    set the draft title
  body <text>     set the draft body
  edit <id>       load a post into the draft
  cancel          discard the current edit
  submit          create or update from the draft
  delete <id>     delete a post
  reload          fetch the list again
  draft           show the draft
  help            show this message
  quit            leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    Title(String),
    Body(String),
    Edit(PostId),
    Cancel,
    Submit,
    Delete(PostId),
    Reload,
    Draft,
    Help,
    Quit,
}

impl ShellCommand {
    /// `Ok(None)` for blank input.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "list" | "ls" => Self::List,
            "title" => Self::Title(rest.to_string()),
            "body" => Self::Body(rest.to_string()),
            "edit" => Self::Edit(parse_id(rest)?),
            "cancel" => Self::Cancel,
            "submit" => Self::Submit,
            "delete" | "rm" => Self::Delete(parse_id(rest)?),
            "reload" => Self::Reload,
            "draft" => Self::Draft,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command `{other}`; type `help`"),
        };
        Ok(Some(command))
    }
}

fn parse_id(raw: &str) -> Result<PostId> {
    if raw.is_empty() {
        return Err(anyhow!("missing post id"));
    }
    let id = raw
        .parse::<i64>()
        .with_context(|| format!("invalid post id `{raw}`"))?;
    Ok(PostId(id))
}

pub fn render_posts(posts: &[Post]) -> String {
    if posts.is_empty() {
        return "(no posts)".to_string();
    }
    let mut out = String::new();
    for post in posts {
        let _ = writeln!(out, "[{}] {}", post.id.0, post.title);
        if !post.body.is_empty() {
            for line in post.body.lines() {
                let _ = writeln!(out, "    {line}");
            }
        }
    }
    out.trim_end().to_string()
}

pub fn render_draft(draft: &Draft) -> String {
    let mode = match draft.mode {
        DraftMode::New => "new post".to_string(),
        DraftMode::Editing(id) => format!("editing post {}", id.0),
    };
    format!(
        "draft ({mode})\n  title: {}\n  body:  {}",
        draft.title, draft.body
    )
}

pub fn describe_event(event: &ControllerEvent) -> String {
    match event {
        ControllerEvent::Loaded { count } => format!("loaded {count} posts"),
        ControllerEvent::Created(post) => format!("created post {}", post.id.0),
        ControllerEvent::Updated(post) => format!("updated post {}", post.id.0),
        ControllerEvent::Removed(id) => format!("deleted post {}", id.0),
        ControllerEvent::Failed { message, .. } => format!("! {message}"),
    }
}

fn spawn_event_printer(mut events: broadcast::Receiver<ControllerEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("{}", describe_event(&event)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Failures are already announced through `ControllerEvent::Failed`; only
/// rejected duplicates need a message here.
fn report_outcome<T>(result: Result<T, ControllerError>) {
    match result {
        Ok(_) => {}
        Err(ControllerError::Busy(operation)) => {
            println!("! {operation} is still running; wait for it to finish");
        }
        Err(err) => debug!(error = %err, "intent failed"),
    }
}

fn spawn_intent<F, T>(controller: &Arc<PostListController>, intent: F)
where
    F: FnOnce(Arc<PostListController>) -> JoinHandle<Result<T, ControllerError>>,
    T: Send + 'static,
{
    let handle = intent(Arc::clone(controller));
    tokio::spawn(async move {
        match handle.await {
            Ok(result) => report_outcome(result),
            Err(err) => warn!(error = %err, "intent task aborted"),
        }
    });
}

async fn execute(controller: &Arc<PostListController>, command: ShellCommand) {
    match command {
        ShellCommand::List => println!("{}", render_posts(&controller.posts().await)),
        ShellCommand::Title(title) => controller.set_title(title).await,
        ShellCommand::Body(body) => controller.set_body(body).await,
        ShellCommand::Edit(id) => {
            let posts = controller.posts().await;
            match posts.iter().find(|post| post.id == id) {
                Some(post) => {
                    controller.begin_edit(post).await;
                    println!("{}", render_draft(&controller.draft().await));
                }
                None => println!("! no post with id {}", id.0),
            }
        }
        ShellCommand::Cancel => controller.cancel_edit().await,
        ShellCommand::Submit => spawn_intent(controller, |controller| {
            tokio::spawn(async move { controller.submit().await })
        }),
        ShellCommand::Delete(id) => spawn_intent(controller, move |controller| {
            tokio::spawn(async move { controller.remove(id).await })
        }),
        ShellCommand::Reload => spawn_intent(controller, |controller| {
            tokio::spawn(async move { controller.load_all().await })
        }),
        ShellCommand::Draft => println!("{}", render_draft(&controller.draft().await)),
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::Quit => {}
    }
}

pub async fn run(controller: Arc<PostListController>) -> Result<()> {
    let printer = spawn_event_printer(controller.subscribe_events());
    spawn_intent(&controller, |controller| {
        tokio::spawn(async move { controller.mount().await })
    });
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match ShellCommand::parse(&line) {
            Ok(None) => {}
            Ok(Some(ShellCommand::Quit)) => break,
            Ok(Some(command)) => execute(&controller, command).await,
            Err(err) => println!("! {err:#}"),
        }
    }

    printer.abort();
    Ok(())
}

#[cfg(test)]
#[path = "tests/shell_tests.rs"]
mod tests;
