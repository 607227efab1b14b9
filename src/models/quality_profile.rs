//! Quality profile model and operations.
//!
//! A quality profile is a named, language-specific set of analysis rules
//! owned by an organization. Profiles are addressed by the
//! (language, name, organization) triple captured in [`ProfileSelector`].

use chrono::{DateTime, FixedOffset};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::client::SonarClient;
use crate::endpoint::{self, RequestSpec};
use crate::error::{Result, SonarError};
use crate::models::date;

/// A SonarCloud quality profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityProfile {
    /// Profile key (e.g., "AU-Tpxb--iU5OvuD2FLy").
    pub key: String,

    /// Profile name.
    pub name: String,

    /// Language key (e.g., "java").
    pub language: String,

    /// Human-readable language name.
    #[serde(default)]
    pub language_name: Option<String>,

    /// Whether the profile inherits from a parent.
    #[serde(default)]
    pub is_inherited: bool,

    /// Whether this is the default profile for its language.
    #[serde(default)]
    pub is_default: bool,

    /// Whether the profile is provided by the platform.
    #[serde(default)]
    pub is_built_in: bool,

    /// Parent profile key.
    #[serde(default)]
    pub parent_key: Option<String>,

    /// Parent profile name.
    #[serde(default)]
    pub parent_name: Option<String>,

    #[serde(default)]
    pub active_rule_count: Option<u32>,

    #[serde(default)]
    pub active_deprecated_rule_count: Option<u32>,

    /// Number of projects explicitly associated with the profile.
    #[serde(default)]
    pub project_count: Option<u32>,

    #[serde(default, with = "date::optional")]
    pub rule_updated_at: Option<DateTime<FixedOffset>>,

    #[serde(default, with = "date::optional")]
    pub last_used: Option<DateTime<FixedOffset>>,

    #[serde(default, with = "date::optional")]
    pub user_updated_at: Option<DateTime<FixedOffset>>,

    /// Owning organization.
    #[serde(default)]
    pub organization: Option<String>,

    /// Actions the current user may perform.
    #[serde(default)]
    pub actions: Option<ProfileActions>,
}

/// Permissions of the current user on a profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileActions {
    #[serde(default)]
    pub edit: bool,
    #[serde(default)]
    pub set_as_default: bool,
    #[serde(default)]
    pub copy: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub associate_projects: bool,
}

impl QualityProfile {
    /// Returns true if the profile has a parent.
    pub fn has_parent(&self) -> bool {
        self.parent_key.is_some()
    }

    /// Selector addressing this profile within `organization`.
    pub fn selector(&self, organization: &str) -> ProfileSelector {
        ProfileSelector::new(&self.language, &self.name, organization)
    }
}

/// Identifies a profile by language, name and organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSelector {
    /// Quality profile language.
    pub language: String,
    /// Quality profile name.
    pub quality_profile: String,
    /// Organization key.
    pub organization: String,
}

impl ProfileSelector {
    pub fn new(language: &str, name: &str, organization: &str) -> Self {
        Self {
            language: language.to_string(),
            quality_profile: name.to_string(),
            organization: organization.to_string(),
        }
    }
}

/// Query parameters for searching quality profiles.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Organization key.
    pub organization: String,

    /// Return only the default profile of each language.
    pub defaults: bool,

    /// Only profiles for this language.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Only the profiles associated with this project key.
    #[serde(rename = "project", skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,

    /// Only the profile with this name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_profile: Option<String>,
}

impl SearchQuery {
    /// Search every profile of an organization.
    pub fn for_organization(organization: &str) -> Self {
        Self {
            organization: organization.to_string(),
            ..Default::default()
        }
    }
}

/// Result of creating a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedProfile {
    pub profile: QualityProfile,
    /// Warnings raised while importing rules.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// A profile's ancestors and children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileInheritance {
    pub profile: InheritedProfile,
    /// Ancestors, nearest first.
    #[serde(default)]
    pub ancestors: Vec<InheritedProfile>,
    #[serde(default)]
    pub children: Vec<InheritedProfile>,
}

/// A profile as it appears in an inheritance tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InheritedProfile {
    pub key: String,
    pub name: String,
    /// Parent profile key.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub active_rule_count: u32,
    #[serde(default)]
    pub overriding_rule_count: Option<u32>,
    #[serde(default)]
    pub is_built_in: bool,
}

/// API response wrapper for searching profiles.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    profiles: Vec<QualityProfile>,
}

#[derive(Serialize)]
struct ProjectAssociation<'a> {
    project: &'a str,
    #[serde(flatten)]
    profile: &'a ProfileSelector,
}

#[derive(Serialize)]
struct ParentChange<'a> {
    #[serde(rename = "parentQualityProfile", skip_serializing_if = "Option::is_none")]
    parent: Option<&'a str>,
    #[serde(flatten)]
    profile: &'a ProfileSelector,
}

#[derive(Serialize)]
struct NewProfile<'a> {
    language: &'a str,
    name: &'a str,
    organization: &'a str,
}

/// Search quality profiles.
///
/// # Example
///
/// ```no_run
/// use sonarapi::{search_quality_profiles, SearchQuery, SonarClient};
///
/// # async fn example() -> sonarapi::Result<()> {
/// let client = SonarClient::from_env()?;
/// let query = SearchQuery {
///     language: Some("java".to_string()),
///     ..SearchQuery::for_organization("acme")
/// };
/// for profile in search_quality_profiles(&client, &query).await? {
///     println!("{} ({})", profile.name, profile.language);
/// }
/// # Ok(())
/// # }
/// ```
#[tracing::instrument(skip(client))]
pub async fn search_quality_profiles(
    client: &SonarClient,
    query: &SearchQuery,
) -> Result<Vec<QualityProfile>> {
    let spec = RequestSpec::new(&endpoint::SEARCH).params_from(query)?;
    let response = client.execute(spec).await?;
    let data: SearchResponse = response.json().await.map_err(SonarError::HttpError)?;
    Ok(data.profiles)
}

/// Select the default profile for a language.
#[tracing::instrument(skip(client))]
pub async fn set_default_quality_profile(
    client: &SonarClient,
    profile: &ProfileSelector,
) -> Result<()> {
    let spec = RequestSpec::new(&endpoint::SET_DEFAULT).params_from(profile)?;
    client.execute(spec).await?;
    Ok(())
}

/// Associate a project with a quality profile.
#[tracing::instrument(skip(client))]
pub async fn associate_project_with_quality_profile(
    client: &SonarClient,
    project: &str,
    profile: &ProfileSelector,
) -> Result<()> {
    let spec = RequestSpec::new(&endpoint::ADD_PROJECT)
        .params_from(&ProjectAssociation { project, profile })?;
    client.execute(spec).await?;
    Ok(())
}

/// Remove a project's association with a quality profile.
#[tracing::instrument(skip(client))]
pub async fn remove_project_associate_with_quality_profile(
    client: &SonarClient,
    project: &str,
    profile: &ProfileSelector,
) -> Result<()> {
    let spec = RequestSpec::new(&endpoint::REMOVE_PROJECT)
        .params_from(&ProjectAssociation { project, profile })?;
    client.execute(spec).await?;
    Ok(())
}

/// Change a quality profile's parent.
///
/// Passing `None` as the parent detaches the profile from its parent.
#[tracing::instrument(skip(client))]
pub async fn change_parent_of_quality_profile(
    client: &SonarClient,
    parent: Option<&str>,
    profile: &ProfileSelector,
) -> Result<()> {
    let spec = RequestSpec::new(&endpoint::CHANGE_PARENT)
        .params_from(&ParentChange { parent, profile })?;
    client.execute(spec).await?;
    Ok(())
}

/// Create an empty quality profile.
#[tracing::instrument(skip(client))]
pub async fn create_quality_profile(
    client: &SonarClient,
    language: &str,
    name: &str,
    organization: &str,
) -> Result<CreatedProfile> {
    let spec = RequestSpec::new(&endpoint::CREATE).params_from(&NewProfile {
        language,
        name,
        organization,
    })?;
    let response = client.execute(spec).await?;
    let created: CreatedProfile = response.json().await.map_err(SonarError::HttpError)?;
    Ok(created)
}

/// Delete a quality profile and all its descendants.
///
/// The default quality profile cannot be deleted.
#[tracing::instrument(skip(client))]
pub async fn delete_quality_profile(client: &SonarClient, profile: &ProfileSelector) -> Result<()> {
    let spec = RequestSpec::new(&endpoint::DELETE).params_from(profile)?;
    client.execute(spec).await?;
    Ok(())
}

/// Show a quality profile's ancestors and children.
#[tracing::instrument(skip(client))]
pub async fn show_quality_profile(
    client: &SonarClient,
    profile: &ProfileSelector,
) -> Result<ProfileInheritance> {
    let spec = RequestSpec::new(&endpoint::INHERITANCE).params_from(profile)?;
    let response = client.execute(spec).await?;
    let inheritance: ProfileInheritance =
        response.json().await.map_err(SonarError::HttpError)?;
    Ok(inheritance)
}
