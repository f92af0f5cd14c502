use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use client_core::{
    ensure_profile, load_profile_view, profile::leaderboard, CommentThread, GraphqlClient,
    SignedInUser,
};
use shared::domain::{ClassId, Comment, CommentId, Version};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(name = "portal", about = "Catalog comments, summaries and profiles")]
struct Cli {
    /// TOML settings file; `portal.toml` in the working directory is used when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the comments of a catalog item, newest first.
    Comments {
        class_id: String,
    },
    Post {
        class_id: String,
        body: String,
    },
    Edit {
        class_id: String,
        comment_id: String,
        body: String,
    },
    Delete {
        class_id: String,
        comment_id: String,
    },
    /// Ask the foundation model to summarize a thread.
    Summarize {
        class_id: String,
        #[arg(long)]
        draft: Option<String>,
    },
    /// Create the profile on first sign-in, then show it.
    Profile {
        username: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        organization: Option<String>,
    },
    Leaderboard,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;
    let endpoint = settings.endpoint()?;
    info!(endpoint = %endpoint, "portal: using managed API");
    let client = Arc::new(GraphqlClient::new(endpoint.as_str(), settings.credentials()));

    match cli.command {
        Command::Comments { class_id } => {
            let thread = open_thread(&client, class_id).await?;
            print_thread(&thread.visible_comments().await);
        }
        Command::Post { class_id, body } => {
            let thread = open_thread(&client, class_id).await?;
            let created = thread.create(&body).await?;
            println!("created comment {} (v{})", created.id, created.version);
        }
        Command::Edit {
            class_id,
            comment_id,
            body,
        } => {
            let thread = open_thread(&client, class_id).await?;
            let id = CommentId::new(comment_id);
            let version = current_version(&thread, &id).await?;
            thread
                .update(&id, version, &body)
                .await
                .with_context(|| format!("failed to edit comment {id}"))?;
            print_thread(&thread.visible_comments().await);
        }
        Command::Delete {
            class_id,
            comment_id,
        } => {
            let thread = open_thread(&client, class_id).await?;
            let id = CommentId::new(comment_id);
            let version = current_version(&thread, &id).await?;
            thread
                .delete(&id, version)
                .await
                .with_context(|| format!("failed to delete comment {id}"))?;
            print_thread(&thread.visible_comments().await);
        }
        Command::Summarize { class_id, draft } => {
            let thread = CommentThread::new(ClassId::new(class_id), client.clone(), client);
            if let Some(draft) = draft {
                thread.set_draft(draft).await;
            }
            println!("{}", thread.summarize().await);
        }
        Command::Profile {
            username,
            email,
            name,
            organization,
        } => {
            let user = SignedInUser {
                username: username.clone(),
                login_id: email.clone(),
                name,
                organization: organization.clone(),
            };
            ensure_profile(client.as_ref(), &user, &settings.default_organization).await?;
            let view = load_profile_view(
                client.as_ref(),
                &username,
                email.as_deref(),
                organization.as_deref(),
                &settings.default_organization,
            )
            .await?;
            println!("{}", render::profile_block(&view));
        }
        Command::Leaderboard => {
            for (rank, profile) in leaderboard(client.as_ref()).await?.iter().enumerate() {
                println!("{}", render::leaderboard_line(rank + 1, profile));
            }
        }
    }

    Ok(())
}

async fn open_thread(client: &Arc<GraphqlClient>, class_id: String) -> Result<CommentThread> {
    let thread = CommentThread::new(ClassId::new(class_id), client.clone(), client.clone());
    thread.list().await;
    if let Some(err) = thread.last_error().await {
        return Err(anyhow!("failed to load comments: {err}"));
    }
    Ok(thread)
}

async fn current_version(thread: &CommentThread, id: &CommentId) -> Result<Version> {
    thread
        .comments()
        .await
        .iter()
        .find(|comment| &comment.id == id)
        .map(|comment| comment.version)
        .ok_or_else(|| anyhow!("comment {id} not found in thread {}", thread.class_id()))
}

fn print_thread(comments: &[Comment]) {
    if comments.is_empty() {
        println!("No Contents");
        return;
    }
    let now = Utc::now();
    for comment in comments {
        println!("{}", render::comment_block(comment, now));
    }
}
