//! HTTP request handlers for the mock server.

pub mod backup;
pub mod changelog;
pub mod profiles;

pub use backup::*;
pub use changelog::*;
pub use profiles::*;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::mock_server::state::MockState;

pub(crate) type SharedState = Arc<RwLock<MockState>>;

/// Error body in the shape SonarCloud uses.
pub(crate) fn sonar_error(status: StatusCode, msg: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({
            "errors": [{ "msg": msg.into() }]
        })),
    )
        .into_response()
}

fn missing(param: &str) -> Response {
    sonar_error(
        StatusCode::BAD_REQUEST,
        format!("The '{param}' parameter is missing"),
    )
}

/// The (language, qualityProfile, organization) triple most endpoints take.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileParams {
    pub language: Option<String>,
    pub quality_profile: Option<String>,
    pub organization: Option<String>,
}

/// Borrowed, validated form of [`ProfileParams`].
pub(crate) struct ProfileRef<'a> {
    pub organization: &'a str,
    pub language: &'a str,
    pub name: &'a str,
}

impl ProfileParams {
    pub(crate) fn require(&self) -> Result<ProfileRef<'_>, Response> {
        Ok(ProfileRef {
            organization: required(&self.organization, "organization")?,
            language: required(&self.language, "language")?,
            name: required(&self.quality_profile, "qualityProfile")?,
        })
    }
}

pub(crate) fn required<'a>(value: &'a Option<String>, param: &str) -> Result<&'a str, Response> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| missing(param))
}

/// Map a state error to a response.
///
/// Messages about missing profiles become 404, the rest 400.
pub(crate) fn state_error(msg: String) -> Response {
    if msg.contains("does not exist") {
        sonar_error(StatusCode::NOT_FOUND, msg)
    } else {
        sonar_error(StatusCode::BAD_REQUEST, msg)
    }
}
