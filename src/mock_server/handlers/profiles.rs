//! Quality profile endpoint handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;

use super::{required, sonar_error, state_error, ProfileParams, SharedState};

/// Query parameters for searching profiles.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub organization: Option<String>,
    #[serde(default)]
    pub defaults: bool,
    pub language: Option<String>,
    pub project: Option<String>,
    pub quality_profile: Option<String>,
}

/// Form body for creating a profile.
#[derive(Debug, Default, Deserialize)]
pub struct CreateForm {
    pub language: Option<String>,
    pub name: Option<String>,
    pub organization: Option<String>,
}

/// Form body for (dis)associating a project.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectForm {
    pub project: Option<String>,
    pub language: Option<String>,
    pub quality_profile: Option<String>,
    pub organization: Option<String>,
}

impl ProjectForm {
    fn profile(&self) -> ProfileParams {
        ProfileParams {
            language: self.language.clone(),
            quality_profile: self.quality_profile.clone(),
            organization: self.organization.clone(),
        }
    }
}

/// Form body for changing a profile's parent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeParentForm {
    pub parent_quality_profile: Option<String>,
    pub language: Option<String>,
    pub quality_profile: Option<String>,
    pub organization: Option<String>,
}

/// GET /api/qualityprofiles/search
pub async fn search_profiles(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, Response> {
    let organization = required(&params.organization, "organization")?;
    let state = state.read().await;

    let profiles = state.search(
        organization,
        params.defaults,
        params.language.as_deref(),
        params.project.as_deref(),
        params.quality_profile.as_deref(),
    );

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "profiles": profiles })),
    )
        .into_response())
}

/// POST /api/qualityprofiles/create
pub async fn create_profile(
    State(state): State<SharedState>,
    Form(form): Form<CreateForm>,
) -> Result<Response, Response> {
    let organization = required(&form.organization, "organization")?;
    let language = required(&form.language, "language")?;
    let name = required(&form.name, "name")?;

    let mut state = state.write().await;
    let profile = state
        .create(organization, language, name)
        .map_err(state_error)?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "profile": profile, "warnings": [] })),
    )
        .into_response())
}

/// POST /api/qualityprofiles/delete
pub async fn delete_profile(
    State(state): State<SharedState>,
    Form(form): Form<ProfileParams>,
) -> Result<StatusCode, Response> {
    let p = form.require()?;
    let mut state = state.write().await;
    state
        .delete(p.organization, p.language, p.name)
        .map_err(state_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/qualityprofiles/set_default
pub async fn set_default_profile(
    State(state): State<SharedState>,
    Form(form): Form<ProfileParams>,
) -> Result<StatusCode, Response> {
    let p = form.require()?;
    let mut state = state.write().await;
    state
        .set_default(p.organization, p.language, p.name)
        .map_err(state_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/qualityprofiles/add_project
pub async fn add_project(
    State(state): State<SharedState>,
    Form(form): Form<ProjectForm>,
) -> Result<StatusCode, Response> {
    let project = required(&form.project, "project")?;
    let profile = form.profile();
    let p = profile.require()?;

    let mut state = state.write().await;
    state
        .add_project(p.organization, p.language, p.name, project)
        .map_err(state_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/qualityprofiles/remove_project
pub async fn remove_project(
    State(state): State<SharedState>,
    Form(form): Form<ProjectForm>,
) -> Result<StatusCode, Response> {
    let project = required(&form.project, "project")?;
    let profile = form.profile();
    let p = profile.require()?;

    let mut state = state.write().await;
    state
        .remove_project(p.organization, p.language, p.name, project)
        .map_err(state_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/qualityprofiles/inheritance
pub async fn show_inheritance(
    State(state): State<SharedState>,
    Query(params): Query<ProfileParams>,
) -> Result<Response, Response> {
    let p = params.require()?;
    let state = state.read().await;

    match state.inheritance(p.organization, p.language, p.name) {
        Some(inheritance) => Ok((StatusCode::OK, Json(inheritance)).into_response()),
        None => Err(sonar_error(
            StatusCode::NOT_FOUND,
            format!(
                "Quality Profile for language '{}' and name '{}' does not exist",
                p.language, p.name
            ),
        )),
    }
}

/// POST /api/qualityprofiles/change_parent
pub async fn change_parent(
    State(state): State<SharedState>,
    Form(form): Form<ChangeParentForm>,
) -> Result<StatusCode, Response> {
    let profile = ProfileParams {
        language: form.language.clone(),
        quality_profile: form.quality_profile.clone(),
        organization: form.organization.clone(),
    };
    let p = profile.require()?;
    let parent = form
        .parent_quality_profile
        .as_deref()
        .filter(|parent| !parent.is_empty());

    let mut state = state.write().await;
    state
        .change_parent(p.organization, p.language, p.name, parent)
        .map_err(state_error)?;
    Ok(StatusCode::NO_CONTENT)
}
