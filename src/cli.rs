use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// kobosync — Kobo project sync and column projection from the terminal
#[derive(Parser)]
#[command(name = "kobosync", version, about)]
pub struct Cli {
    /// Override the backend URL (defaults to KOBOSYNC_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in / out of the portal
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Manage Kobo API tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Choose which columns a project displays and exports
    Columns {
        #[command(subcommand)]
        command: ColumnCommands,
    },

    /// Configure scheduled syncs
    AutoSync {
        #[command(subcommand)]
        command: AutoSyncCommands,
    },

    /// Show a live countdown to a project's next scheduled sync
    Watch { uid: String },

    /// Export a project's submissions as CSV
    Export {
        uid: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print (or download) a submission attachment through the image proxy
    ImageUrl {
        project_uid: String,
        submission_id: String,
        filename: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Store the current user and API key
    Login {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long, env = "KOBOSYNC_API_KEY", hide_env_values = true)]
        api_key: String,
    },
    /// Show who is signed in
    Show,
    /// Forget the stored session
    Logout,
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// List registered tokens (masked)
    List,
    /// Register a new Kobo API token
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, env = "KOBO_TOKEN", hide_env_values = true)]
        token: String,
        /// Save every project the token exposes right away
        #[arg(long)]
        save_all: bool,
    },
    /// Delete a token
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// List saved projects
    List,
    /// Show one project, fetched fresh
    Show { uid: String },
    /// Save a project to the backend. A project that is not saved yet is
    /// found by importing the given token first.
    Save {
        uid: String,
        #[arg(long, env = "KOBO_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Display name used if the token gets registered
        #[arg(long, default_value = "kobosync")]
        token_name: String,
    },
    /// Trigger a sync of one project
    Sync { uid: String },
    /// Trigger a sync of every saved project
    SyncAll,
    /// Delete a saved project
    Delete { uid: String },
}

#[derive(Subcommand)]
pub enum ColumnCommands {
    /// Turn one column on or off
    Toggle { uid: String, column: String },
    /// Show every available column
    SelectAll { uid: String },
    /// Hide every column
    Clear { uid: String },
    /// Replace the selection
    Set {
        uid: String,
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum AutoSyncCommands {
    /// Enable or disable scheduled syncs
    Set {
        uid: String,
        /// Seconds between syncs: 1800, 3600, 7200, 21600, 43200 or 86400.
        /// Defaults to the current interval.
        #[arg(long)]
        interval: Option<u64>,
        /// Turn scheduled syncs off instead
        #[arg(long, conflicts_with = "interval")]
        disable: bool,
    },
    /// Show the schedule and time left
    Show { uid: String },
}
