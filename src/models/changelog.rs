//! Quality profile changelog.
//!
//! The changelog is the history of rule activations, deactivations and
//! parameter changes applied to a profile, most recent first. It is the one
//! paginated endpoint in the family and is read through a [`PagedFetcher`].

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::client::SonarClient;
use crate::endpoint::{self, RequestSpec};
use crate::error::{Result, SonarError};
use crate::models::date;
use crate::models::quality_profile::ProfileSelector;
use crate::pagination::{Page, PagedFetcher, Query, PAGE_PARAM, PAGE_SIZE_PARAM};

/// Key holding the items of a changelog page.
const EVENTS_KEY: &str = "events";

/// What happened to a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangelogAction {
    Activated,
    Deactivated,
    Updated,
    #[serde(other)]
    Unknown,
}

/// A single changelog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogEvent {
    /// When the change happened.
    #[serde(default, with = "date::optional")]
    pub date: Option<DateTime<FixedOffset>>,

    #[serde(default)]
    pub author_login: Option<String>,

    #[serde(default)]
    pub author_name: Option<String>,

    pub action: ChangelogAction,

    #[serde(default)]
    pub rule_key: Option<String>,

    #[serde(default)]
    pub rule_name: Option<String>,

    /// Changed rule parameters (severity and rule-specific values).
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl ChangelogEvent {
    /// Author to display: the name if known, else the login.
    pub fn author(&self) -> Option<&str> {
        self.author_name
            .as_deref()
            .or(self.author_login.as_deref())
    }
}

/// Filters for reading a profile's changelog.
#[derive(Debug, Clone)]
pub struct ChangelogQuery {
    pub profile: ProfileSelector,
    /// Start date, either a date (server timezone) or a datetime.
    pub since: Option<String>,
    /// End date, either a date (server timezone) or a datetime.
    pub to: Option<String>,
}

impl ChangelogQuery {
    /// Read the whole changelog of a profile.
    pub fn new(profile: ProfileSelector) -> Self {
        Self {
            profile,
            since: None,
            to: None,
        }
    }

    /// Parameters sent with every page request.
    pub fn to_query(&self) -> Query {
        Query::new()
            .with("language", self.profile.language.as_str())
            .with("qualityProfile", self.profile.quality_profile.as_str())
            .with("organization", self.profile.organization.as_str())
            .with_opt("since", self.since.as_deref())
            .with_opt("to", self.to.as_deref())
    }
}

/// Get the history of changes on a quality profile.
///
/// Returns a fetcher that walks every page of the changelog lazily; events
/// come out most recent first.
///
/// # Example
///
/// ```no_run
/// use sonarapi::{get_history_of_changes_on_quality_profile, ChangelogQuery, ProfileSelector, SonarClient};
///
/// # async fn example() -> sonarapi::Result<()> {
/// let client = SonarClient::from_env()?;
/// let query = ChangelogQuery::new(ProfileSelector::new("java", "Sonar way", "acme"));
///
/// let mut events = get_history_of_changes_on_quality_profile(&client, &query)?;
/// while let Some(event) = events.next().await? {
///     println!("{:?} {:?}", event.action, event.rule_key);
/// }
/// # Ok(())
/// # }
/// ```
pub fn get_history_of_changes_on_quality_profile(
    client: &SonarClient,
    query: &ChangelogQuery,
) -> Result<PagedFetcher<ChangelogEvent>> {
    PagedFetcher::new(client, &endpoint::CHANGELOG, query.to_query(), EVENTS_KEY)
}

/// Fetch a single page of a profile's changelog.
///
/// # Arguments
///
/// * `client` - The SonarCloud API client
/// * `query` - Profile and date filters
/// * `page` - Page number (1-indexed)
/// * `page_size` - Number of events per page
#[tracing::instrument(skip(client))]
pub async fn get_changelog_page(
    client: &SonarClient,
    query: &ChangelogQuery,
    page: u64,
    page_size: u64,
) -> Result<Page<ChangelogEvent>> {
    let spec = RequestSpec::new(&endpoint::CHANGELOG)
        .extend(&query.to_query())
        .param(PAGE_PARAM, page.to_string())
        .param(PAGE_SIZE_PARAM, page_size.to_string());

    let response = client.execute(spec).await?;
    let body: serde_json::Value = response.json().await.map_err(SonarError::HttpError)?;
    Page::from_value(body, EVENTS_KEY)
}
