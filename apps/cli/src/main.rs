use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{HttpPostApi, PostListController, ReorderPolicy};
use shared::domain::{Post, PostId};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod shell;

use config::{load_settings, set_base_url};

#[derive(Parser, Debug)]
#[command(name = "posts_cli", about = "List, create, edit and delete posts on a REST endpoint")]
struct Cli {
    /// Root of the API; posts live under `<base-url>/posts`.
    #[arg(long)]
    base_url: Option<String>,
    /// `stable` keeps order on update/delete, `compat` reverses the list after each of them.
    #[arg(long)]
    reorder: Option<ReorderPolicy>,
    /// Per-request timeout in seconds; `0` disables it.
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    List,
    Create {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
    },
    /// Fields left out keep their current value.
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    Delete {
        id: i64,
    },
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(base_url) = &cli.base_url {
        if !set_base_url(&mut settings, base_url) {
            anyhow::bail!("invalid --base-url `{base_url}`");
        }
    }
    if let Some(policy) = cli.reorder {
        settings.reorder_policy = policy;
    }
    if let Some(secs) = cli.timeout_secs {
        settings.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }

    let base_url = settings
        .parsed_base_url()
        .with_context(|| format!("invalid base url `{}`", settings.base_url))?;
    info!(
        %base_url,
        policy = ?settings.reorder_policy,
        timeout = ?settings.request_timeout,
        "starting post client"
    );
    let api = HttpPostApi::with_timeout(base_url, settings.request_timeout)
        .context("failed to set up http client")?;
    let controller = PostListController::new(Arc::new(api), settings.reorder_policy);

    match cli.command.unwrap_or(Command::Shell) {
        Command::List => {
            controller.mount().await.context("failed to load posts")?;
            println!("{}", shell::render_posts(&controller.posts().await));
        }
        Command::Create { title, body } => {
            controller.set_title(title).await;
            controller.set_body(body).await;
            let post = controller.submit().await.context("failed to create post")?;
            println!("{}", shell::render_posts(&[post]));
        }
        Command::Update { id, title, body } => {
            controller.mount().await.context("failed to load posts")?;
            let id = PostId(id);
            let target = controller
                .posts()
                .await
                .into_iter()
                .find(|post| post.id == id)
                .unwrap_or_else(|| Post::new(id, "", ""));
            controller.begin_edit(&target).await;
            if let Some(title) = title {
                controller.set_title(title).await;
            }
            if let Some(body) = body {
                controller.set_body(body).await;
            }
            let post = controller.submit().await.context("failed to update post")?;
            println!("{}", shell::render_posts(&[post]));
        }
        Command::Delete { id } => {
            controller.mount().await.context("failed to load posts")?;
            controller
                .remove(PostId(id))
                .await
                .context("failed to delete post")?;
            println!("deleted post {id}");
        }
        Command::Shell => shell::run(controller).await?,
    }

    Ok(())
}
