//! Backup, restore and export endpoint handlers.

use axum::{
    extract::{Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::{required, sonar_error, state_error, ProfileParams, SharedState};

/// Export formats the mock offers, as (key, name, languages).
const EXPORTERS: &[(&str, &str, &[&str])] = &[("pmd", "PMD", &["java"])];

/// Query parameters for exporting a profile.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportParams {
    pub organization: Option<String>,
    pub exporter_key: Option<String>,
    pub language: Option<String>,
    pub quality_profile: Option<String>,
}

fn xml(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        body,
    )
        .into_response()
}

fn not_found(language: &str, name: &str) -> Response {
    sonar_error(
        StatusCode::NOT_FOUND,
        format!("Quality Profile for language '{language}' and name '{name}' does not exist"),
    )
}

/// GET /api/qualityprofiles/backup
pub async fn backup_profile(
    State(state): State<SharedState>,
    Query(params): Query<ProfileParams>,
) -> Result<Response, Response> {
    let p = params.require()?;
    let state = state.read().await;

    state
        .backup(p.organization, p.language, p.name)
        .map(xml)
        .ok_or_else(|| not_found(p.language, p.name))
}

/// POST /api/qualityprofiles/restore
///
/// Expects a multipart body with a `backup` file part. `organization` may
/// come as a text part or in the query string.
pub async fn restore_profile(
    State(state): State<SharedState>,
    Query(query): Query<ProfileParams>,
    mut multipart: Multipart,
) -> Result<Response, Response> {
    let mut organization = query.organization;
    let mut backup = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| sonar_error(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let text = field
            .text()
            .await
            .map_err(|e| sonar_error(StatusCode::BAD_REQUEST, e.to_string()))?;

        match name.as_str() {
            "backup" => backup = Some(text),
            "organization" => organization = Some(text),
            _ => {}
        }
    }

    let organization = required(&organization, "organization")?;
    let backup = required(&backup, "backup")?;

    let mut state = state.write().await;
    let result = state.restore(organization, backup).map_err(state_error)?;

    Ok((StatusCode::OK, Json(result)).into_response())
}

/// GET /api/qualityprofiles/export
///
/// Without `exporterKey` the backup format is returned. Without
/// `qualityProfile` the default profile of the language is exported, so
/// `language` is only required in that case.
pub async fn export_profile(
    State(state): State<SharedState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, Response> {
    let organization = required(&params.organization, "organization")?;
    let state = state.read().await;

    let (language, name) = match params.quality_profile.as_deref().filter(|n| !n.is_empty()) {
        Some(name) => {
            let language = match params.language.as_deref().filter(|l| !l.is_empty()) {
                Some(language) => language.to_string(),
                None => state
                    .search(organization, false, None, None, Some(name))
                    .into_iter()
                    .next()
                    .map(|profile| profile.language)
                    .ok_or_else(|| {
                        sonar_error(
                            StatusCode::NOT_FOUND,
                            format!("Quality Profile with name '{name}' does not exist"),
                        )
                    })?,
            };
            (language, name.to_string())
        }
        None => {
            let language = params
                .language
                .as_deref()
                .filter(|l| !l.is_empty())
                .ok_or_else(|| {
                    sonar_error(
                        StatusCode::BAD_REQUEST,
                        "The 'language' parameter is required when no quality profile is given",
                    )
                })?;
            let name = state
                .search(organization, true, Some(language), None, None)
                .into_iter()
                .next()
                .map(|profile| profile.name)
                .ok_or_else(|| not_found(language, "<default>"))?;
            (language.to_string(), name)
        }
    };
    let language = language.as_str();

    let stored = state
        .find(organization, language, &name)
        .ok_or_else(|| not_found(language, &name))?;

    match params.exporter_key.as_deref() {
        None => state
            .backup(organization, language, &name)
            .map(xml)
            .ok_or_else(|| not_found(language, &name)),
        Some("pmd") => {
            let rules: String = stored
                .rules
                .iter()
                .map(|rule| format!("<rule ref=\"{rule}\"/>"))
                .collect();
            Ok(xml(format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?><ruleset name=\"{name}\">{rules}</ruleset>"
            )))
        }
        Some(other) => {
            let keys: Vec<&str> = EXPORTERS.iter().map(|(key, _, _)| *key).collect();
            Err(sonar_error(
                StatusCode::BAD_REQUEST,
                format!(
                    "Value of parameter 'exporterKey' ({other}) must be one of: [{}]",
                    keys.join(", ")
                ),
            ))
        }
    }
}

/// GET /api/qualityprofiles/exporters
pub async fn list_exporters() -> impl IntoResponse {
    let exporters: Vec<serde_json::Value> = EXPORTERS
        .iter()
        .map(|(key, name, languages)| {
            serde_json::json!({ "key": key, "name": name, "languages": languages })
        })
        .collect();

    (
        StatusCode::OK,
        Json(serde_json::json!({ "exporters": exporters })),
    )
}
