//! Command handlers behind the `gator` binary.
//!
//! [`AppContext`] is built once per invocation: config first, then the
//! database named by the config. Handlers that act for a user receive the
//! current [`User`], resolved in [`dispatch`].

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::aggregator::{RotationScheduler, SchedulerSettings, Supervisor};
use crate::cli::Command;
use crate::config::Config;
use crate::feed::HttpFeedSource;
use crate::retrieval::{RetrievalEngine, RetrievalRequest, SortField, SortOrder};
use crate::storage::{Database, Post, Store, StoreError, User};

/// Posts loaded into the terminal viewer
const TUI_POST_LIMIT: u32 = 100;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not logged in; run `gator register <name>` or `gator login <name>` first")]
    NotLoggedIn,

    #[error("user {0} does not exist")]
    UnknownUser(String),

    #[error("you are not following {0}")]
    NotFollowing(String),
}

// ============================================================================
// Context
// ============================================================================

/// Everything a command may touch.
pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub db: Database,
}

impl AppContext {
    /// Load the config at `config_path` and open the database it points to.
    pub async fn open(config_path: PathBuf) -> Result<Self> {
        let config = Config::load(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

        let db_path = config.database_path(&config_path);
        if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let db_path_str = db_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
        let db = Database::open(db_path_str).await?;

        Ok(Self {
            config,
            config_path,
            db,
        })
    }

    /// The logged-in user.
    ///
    /// # Errors
    ///
    /// [`CommandError::NotLoggedIn`] when no user is configured,
    /// [`CommandError::UnknownUser`] when the configured user was deleted.
    pub async fn current_user(&self) -> Result<User> {
        let name = self
            .config
            .current_user
            .as_deref()
            .ok_or(CommandError::NotLoggedIn)?;
        match self.db.get_user_by_name(name).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound(_)) => Err(CommandError::UnknownUser(name.to_string()).into()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Run one command. `shutdown` ends the long-running ones (`agg`, `aggservice`).
pub async fn dispatch(ctx: &mut AppContext, command: Command, shutdown: CancellationToken) -> Result<()> {
    match command {
        Command::Register { name } => register(ctx, &name).await,
        Command::Login { name } => login(ctx, &name).await,
        Command::Reset => reset(ctx).await,
        Command::Users => users(ctx).await,
        Command::Feeds => feeds(ctx).await,
        Command::Agg { time_between_reqs } => {
            agg(ctx, parse_duration(&time_between_reqs)?, shutdown).await
        }
        Command::AggService { time_between_reqs } => {
            agg_service(ctx, parse_duration(&time_between_reqs)?, shutdown).await
        }
        Command::AddFeed { name, url } => {
            let user = ctx.current_user().await?;
            add_feed(ctx, &user, &name, &url).await
        }
        Command::Follow { url } => {
            let user = ctx.current_user().await?;
            follow(ctx, &user, &url).await
        }
        Command::Following => {
            let user = ctx.current_user().await?;
            following(ctx, &user).await
        }
        Command::Unfollow { url } => {
            let user = ctx.current_user().await?;
            unfollow(ctx, &user, &url).await
        }
        Command::Browse {
            limit,
            offset,
            sort,
            order,
            feed,
            json,
        } => {
            let user = ctx.current_user().await?;
            let mut request = RetrievalRequest::browse(user.id);
            if let Some(limit) = limit {
                request.limit = parse_count(&limit, "limit")?;
            }
            if let Some(offset) = offset {
                request.offset = parse_count(&offset, "offset")?;
            }
            if let Some(sort) = sort {
                request.sort = sort.parse::<SortField>()?;
            }
            if let Some(order) = order {
                request.order = order.parse::<SortOrder>()?;
            }
            request.feed_filter = feed;
            retrieve(ctx, &request, json).await
        }
        Command::Search { query, json } => {
            let user = ctx.current_user().await?;
            retrieve(ctx, &RetrievalRequest::search(user.id, query), json).await
        }
        Command::Bookmark { post_id } => {
            let user = ctx.current_user().await?;
            bookmark(ctx, &user, post_id).await
        }
        Command::Bookmarks => {
            let user = ctx.current_user().await?;
            let posts = ctx.db.bookmarks_for_user(user.id).await?;
            print_posts(&posts, true);
            Ok(())
        }
        Command::Tui => {
            let user = ctx.current_user().await?;
            let posts = ctx.db.posts_for_user(user.id, TUI_POST_LIMIT, 0).await?;
            crate::ui::run(posts, shutdown).await
        }
    }
}

// ============================================================================
// Users
// ============================================================================

async fn register(ctx: &mut AppContext, name: &str) -> Result<()> {
    let name = non_empty(name, "user name")?;
    let user = ctx.db.create_user(name).await.map_err(|e| match e {
        StoreError::Conflict(_) => anyhow::anyhow!("user {name} already exists"),
        e => e.into(),
    })?;
    ctx.config.set_user(&ctx.config_path, &user.name)?;
    println!("User {} created and logged in (id {})", user.name, user.id);
    Ok(())
}

async fn login(ctx: &mut AppContext, name: &str) -> Result<()> {
    let user = match ctx.db.get_user_by_name(name).await {
        Ok(user) => user,
        Err(StoreError::NotFound(_)) => return Err(CommandError::UnknownUser(name.to_string()).into()),
        Err(e) => return Err(e.into()),
    };
    ctx.config.set_user(&ctx.config_path, &user.name)?;
    println!("Logged in as {}", user.name);
    Ok(())
}

async fn reset(ctx: &AppContext) -> Result<()> {
    let removed = ctx.db.reset_users().await?;
    println!("Deleted {removed} users");
    Ok(())
}

async fn users(ctx: &AppContext) -> Result<()> {
    let current = ctx.config.current_user.as_deref();
    for user in ctx.db.list_users().await? {
        if Some(user.name.as_str()) == current {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }
    Ok(())
}

// ============================================================================
// Feeds and Follows
// ============================================================================

async fn add_feed(ctx: &AppContext, user: &User, name: &str, url: &str) -> Result<()> {
    let name = non_empty(name, "feed name")?;
    let url = non_empty(url, "feed url")?;
    let feed = ctx.db.create_feed(user, name, url).await.map_err(|e| match e {
        StoreError::Conflict(_) => anyhow::anyhow!("a feed with url {url} already exists; follow it instead"),
        e => e.into(),
    })?;
    println!("Added feed {} ({})", feed.name, feed.url);
    println!("  id: {}", feed.id);
    println!("  followed by {}", user.name);
    Ok(())
}

async fn feeds(ctx: &AppContext) -> Result<()> {
    for feed in ctx.db.list_feeds().await? {
        println!("* {} ({}) added by {}", feed.feed_name, feed.feed_url, feed.user_name);
    }
    Ok(())
}

async fn follow(ctx: &AppContext, user: &User, url: &str) -> Result<()> {
    let feed = ctx.db.get_feed_by_url(url).await?;
    let record = ctx.db.create_feed_follow(user, &feed).await.map_err(|e| match e {
        StoreError::Conflict(_) => anyhow::anyhow!("already following {url}"),
        e => e.into(),
    })?;
    println!("{} now follows {}", record.user_name, record.feed_name);
    Ok(())
}

async fn following(ctx: &AppContext, user: &User) -> Result<()> {
    for follow in ctx.db.feed_follows_for_user(user.id).await? {
        println!("* {}", follow.feed_name);
    }
    Ok(())
}

async fn unfollow(ctx: &AppContext, user: &User, url: &str) -> Result<()> {
    let feed = ctx.db.get_feed_by_url(url).await?;
    if ctx.db.delete_feed_follow(user.id, feed.id).await? == 0 {
        return Err(CommandError::NotFollowing(url.to_string()).into());
    }
    println!("{} unfollowed {}", user.name, feed.name);
    Ok(())
}

// ============================================================================
// Collection
// ============================================================================

fn build_scheduler(ctx: &AppContext, interval: Duration) -> Result<RotationScheduler> {
    let source = HttpFeedSource::new(&ctx.config.user_agent).context("Failed to build HTTP client")?;
    Ok(RotationScheduler::new(
        Arc::new(ctx.db.clone()),
        Arc::new(source),
        SchedulerSettings {
            interval,
            fetch_timeout: ctx.config.fetch_timeout(),
            max_concurrent: ctx.config.max_concurrent_fetches,
        },
    ))
}

async fn agg(ctx: &AppContext, interval: Duration, shutdown: CancellationToken) -> Result<()> {
    let scheduler = build_scheduler(ctx, interval)?;
    println!("Collecting feeds every {}", format_duration(interval));
    scheduler.run(shutdown).await
}

async fn agg_service(ctx: &AppContext, interval: Duration, shutdown: CancellationToken) -> Result<()> {
    let scheduler = Arc::new(build_scheduler(ctx, interval)?);
    let supervisor = Supervisor::new(ctx.config.restart_delay(), ctx.config.shutdown_grace());
    println!(
        "Collecting feeds every {} (restarting after {} on exit)",
        format_duration(interval),
        format_duration(supervisor.restart_delay)
    );

    supervisor
        .run(
            move |token| {
                let scheduler = Arc::clone(&scheduler);
                async move { scheduler.run(token).await }
            },
            shutdown,
        )
        .await;
    Ok(())
}

// ============================================================================
// Retrieval
// ============================================================================

async fn retrieve(ctx: &AppContext, request: &RetrievalRequest, json: bool) -> Result<()> {
    let engine = RetrievalEngine::new(Arc::new(ctx.db.clone()));
    let posts = engine.run(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&posts)?);
    } else if posts.is_empty() {
        println!("No posts found");
    } else {
        print_posts(&posts, request.search_query.is_none());
    }
    Ok(())
}

async fn bookmark(ctx: &AppContext, user: &User, post_id: Uuid) -> Result<()> {
    ctx.db.bookmark(user.id, post_id).await.map_err(|e| match e {
        StoreError::Conflict(_) => anyhow::anyhow!("post {post_id} is already bookmarked"),
        StoreError::NotFound(_) => anyhow::anyhow!("post {post_id} does not exist"),
        e => e.into(),
    })?;
    println!("Bookmarked post {post_id}");
    Ok(())
}

fn print_posts(posts: &[Post], with_description: bool) {
    for post in posts {
        println!("{}", post.title);
        println!("  {}", post.url);
        println!("  {}", format_time(post.published_or_created()));
        if with_description {
            if let Some(description) = &post.description {
                println!("  {}", description);
            }
        }
        println!("  post {} from feed {}", post.id, post.feed_id);
        println!();
    }
}

/// RFC 1123 in GMT
pub fn format_time(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
        .unwrap_or_else(|| millis.to_string())
}

// ============================================================================
// Argument Parsing
// ============================================================================

fn non_empty<'a>(value: &'a str, what: &str) -> Result<&'a str, CommandError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CommandError::InvalidArgument(format!("{what} must not be empty")));
    }
    Ok(trimmed)
}

/// Parse a page size or offset given on the command line.
fn parse_count(value: &str, what: &str) -> Result<u32, CommandError> {
    value.trim().parse().map_err(|_| {
        CommandError::InvalidArgument(format!(
            "{what} must be a whole number of posts, got {value:?}"
        ))
    })
}

/// Parse a compound duration such as `500ms`, `90s`, `1h30m` or `2d`.
///
/// Every number needs a unit and the total must be non-zero.
pub fn parse_duration(s: &str) -> Result<Duration, CommandError> {
    let invalid = || CommandError::InvalidArgument(format!(
        "invalid duration {s:?}; use a form like 30s, 1m or 1h30m"
    ));

    let text = s.trim().to_lowercase();
    if text.is_empty() {
        return Err(invalid());
    }

    let mut total = Duration::ZERO;
    let mut rest = text.as_str();
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
        if digits == 0 {
            return Err(invalid());
        }
        let value: u64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let millis_per_unit: u64 = match &rest[..unit_len] {
            "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        let millis = value.checked_mul(millis_per_unit).ok_or_else(invalid)?;
        total = total
            .checked_add(Duration::from_millis(millis))
            .ok_or_else(invalid)?;
    }

    if total.is_zero() {
        return Err(CommandError::InvalidArgument(
            "duration must be greater than zero".to_string(),
        ));
    }
    Ok(total)
}

/// Format a duration for display, the inverse of [`parse_duration`]
pub fn format_duration(d: Duration) -> String {
    let mut millis = d.as_millis();
    if millis == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    for (unit, size) in [("d", 86_400_000u128), ("h", 3_600_000), ("m", 60_000), ("s", 1_000), ("ms", 1)] {
        if millis >= size {
            out.push_str(&format!("{}{}", millis / size, unit));
            millis %= size;
        }
    }
    out
}
