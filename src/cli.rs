use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "gator", version, about = "Multi-user RSS aggregator")]
pub struct Args {
    /// Config file [default: ~/.config/gator/config.toml]
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a user and log in as them
    Register { name: String },

    /// Switch to an existing user
    Login { name: String },

    /// Delete every user, along with their feeds, follows and bookmarks
    Reset,

    /// List users
    Users,

    /// Register a feed and follow it
    #[command(name = "addfeed")]
    AddFeed { name: String, url: String },

    /// List every registered feed
    Feeds,

    /// Follow a feed someone already added
    Follow { url: String },

    /// List the feeds you follow
    Following,

    Unfollow { url: String },

    /// Collect feeds in the foreground until interrupted
    Agg {
        /// Time between fetches, e.g. 30s, 1m, 1h30m
        time_between_reqs: String,
    },

    /// Collect feeds, restarting the collector whenever it stops
    #[command(name = "aggservice")]
    AggService {
        /// Time between fetches, e.g. 30s, 1m, 1h30m
        time_between_reqs: String,
    },

    /// Show recent posts from followed feeds
    Browse {
        /// Posts per page [default: 2]
        #[arg(allow_negative_numbers = true)]
        limit: Option<String>,
        /// Posts to skip [default: 0]
        #[arg(allow_negative_numbers = true)]
        offset: Option<String>,
        /// title or published [default: published]
        sort: Option<String>,
        /// asc or desc [default: desc]
        order: Option<String>,
        /// Only posts from this feed id
        feed: Option<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Find posts whose title or description contains a phrase
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },

    /// Save a post for later
    Bookmark { post_id: Uuid },

    /// List saved posts
    Bookmarks,

    /// Browse recent posts in a terminal list
    Tui,
}
