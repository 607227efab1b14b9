//! CLI argument parsing types.
//!
//! This module provides the command-line interface structure for the sonarapi binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// SonarCloud quality profiles command-line interface.
#[derive(Parser, Debug)]
#[command(name = "sonarapi", about = "SonarCloud quality profiles CLI", version)]
pub struct Cli {
    /// Output results as JSON instead of a table.
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Organization key.
    #[arg(long, global = true, env = "SONAR_ORGANIZATION")]
    pub organization: Option<String>,

    /// Log requests to stderr (repeat for more detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Identifies a profile by language and name.
#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// Quality profile language (e.g., java).
    #[arg(long)]
    pub language: String,

    /// Quality profile name.
    #[arg(long = "profile")]
    pub profile: String,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search quality profiles.
    Search {
        /// Only profiles for this language.
        #[arg(long)]
        language: Option<String>,

        /// Only profiles associated with this project key.
        #[arg(long)]
        project: Option<String>,

        /// Only the profile with this name.
        #[arg(long = "profile")]
        profile: Option<String>,

        /// Only the default profile of each language.
        #[arg(long)]
        defaults: bool,
    },

    /// Show a profile's ancestors and children.
    Show {
        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Print the history of changes on a profile.
    Changelog {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Start date or datetime.
        #[arg(long)]
        since: Option<String>,

        /// End date or datetime.
        #[arg(long)]
        to: Option<String>,

        /// Stop after this many events.
        #[arg(long)]
        limit: Option<usize>,

        /// Events requested per page.
        #[arg(long)]
        page_size: Option<u64>,
    },

    /// Backup a profile as XML.
    Backup {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Write to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Restore a profile from an XML backup.
    Restore {
        /// Backup file.
        file: PathBuf,
    },

    /// Export a profile.
    Export {
        /// Output format (see `exporters`).
        #[arg(long)]
        exporter: Option<String>,

        #[arg(long)]
        language: Option<String>,

        /// Profile to export; the language default when omitted.
        #[arg(long = "profile")]
        profile: Option<String>,

        /// Write to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// List available export formats.
    Exporters,

    /// Create a profile.
    Create {
        /// Quality profile language.
        #[arg(long)]
        language: String,

        /// Quality profile name.
        name: String,
    },

    /// Delete a profile and all its descendants.
    Delete {
        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Make a profile the default for its language.
    SetDefault {
        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Associate a project with a profile.
    AddProject {
        /// Project key.
        #[arg(long)]
        project: String,

        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Remove a project's association with a profile.
    RemoveProject {
        /// Project key.
        #[arg(long)]
        project: String,

        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Change a profile's parent.
    ChangeParent {
        #[command(flatten)]
        profile: ProfileArgs,

        /// New parent profile name; omit to detach.
        #[arg(long)]
        parent: Option<String>,
    },
}
