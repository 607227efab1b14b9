//! SonarCloud quality profiles API client library.
//!
//! A Rust library for the SonarCloud `api/qualityprofiles` resource family.
//! Every operation is a thin async function bound to an entry in the
//! [`endpoint`] registry; the changelog is read lazily, page by page,
//! through a [`PagedFetcher`].
//!
//! # Quick Start
//!
//! ```no_run
//! use sonarapi::{
//!     get_history_of_changes_on_quality_profile, search_quality_profiles, ChangelogQuery,
//!     ProfileSelector, SearchQuery, SonarClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> sonarapi::Result<()> {
//!     // Create client from environment variables
//!     let client = SonarClient::from_env()?;
//!
//!     // List the profiles of an organization
//!     let profiles = search_quality_profiles(&client, &SearchQuery::for_organization("acme")).await?;
//!     println!("Found {} profiles", profiles.len());
//!
//!     // Walk the changelog of one of them
//!     let query = ChangelogQuery::new(ProfileSelector::new("java", "Sonar way", "acme"));
//!     let events = get_history_of_changes_on_quality_profile(&client, &query)?
//!         .collect_all()
//!         .await?;
//!     println!("Found {} changes", events.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! The client reads configuration from environment variables:
//!
//! - `SONAR_TOKEN` (required) - Your SonarCloud user token
//! - `SONAR_URL` (optional) - Base URL (defaults to `https://sonarcloud.io`)

pub mod cli;
mod client;
pub mod endpoint;
mod error;
pub mod mcp;
mod models;
pub mod output;
mod pagination;

#[cfg(feature = "test-server")]
pub mod mock_server;

// Re-export core types
pub use client::SonarClient;
pub use endpoint::{Endpoint, RequestSpec};
pub use error::{Result, SonarError};
pub use pagination::{Cursor, Page, PagedFetcher, Query, DEFAULT_MAX_PAGES};

// Re-export models
pub use models::{
    // Quality profile types
    CreatedProfile,
    InheritedProfile,
    ProfileActions,
    ProfileInheritance,
    ProfileSelector,
    QualityProfile,
    SearchQuery,
    // Changelog types
    ChangelogAction,
    ChangelogEvent,
    ChangelogQuery,
    // Backup types
    ExportQuery,
    Exporter,
    ProfileBackup,
    RestoreResult,
};

pub use models::{format_sonar_date, parse_sonar_date};

// Re-export operations
pub use models::{
    associate_project_with_quality_profile, change_parent_of_quality_profile,
    create_quality_profile, delete_quality_profile, remove_project_associate_with_quality_profile,
    search_quality_profiles, set_default_quality_profile, show_quality_profile,
};
pub use models::{get_changelog_page, get_history_of_changes_on_quality_profile};
pub use models::{
    backup_quality_profile, export_quality_profile, list_quality_profile_exporters,
    restore_quality_profile,
};
