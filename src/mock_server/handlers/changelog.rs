//! Changelog endpoint handler.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::Deserialize;

use super::{sonar_error, ProfileParams, SharedState};
use crate::{parse_sonar_date, ChangelogEvent};

/// Page size used when the request has no `ps`.
const DEFAULT_PAGE_SIZE: u64 = 50;

/// Largest page size the server accepts.
const MAX_PAGE_SIZE: u64 = 500;

/// Query parameters for reading a changelog.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogParams {
    pub language: Option<String>,
    pub quality_profile: Option<String>,
    pub organization: Option<String>,
    pub since: Option<String>,
    pub to: Option<String>,
    pub p: Option<u64>,
    pub ps: Option<u64>,
}

/// GET /api/qualityprofiles/changelog
pub async fn get_changelog(
    State(state): State<SharedState>,
    Query(params): Query<ChangelogParams>,
) -> Result<Response, Response> {
    let profile = ProfileParams {
        language: params.language.clone(),
        quality_profile: params.quality_profile.clone(),
        organization: params.organization.clone(),
    };
    let p = profile.require()?;

    let page = params.p.unwrap_or(1).max(1);
    let page_size = params.ps.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(sonar_error(
            StatusCode::BAD_REQUEST,
            format!("'ps' value ({page_size}) must be between 1 and {MAX_PAGE_SIZE}"),
        ));
    }

    let since = params.since.as_deref().map(|s| parse_bound(s, false)).transpose()?;
    let to = params.to.as_deref().map(|s| parse_bound(s, true)).transpose()?;

    let state = state.read().await;
    let stored = state.find(p.organization, p.language, p.name).ok_or_else(|| {
        sonar_error(
            StatusCode::NOT_FOUND,
            format!(
                "Quality Profile for language '{}' and name '{}' does not exist",
                p.language, p.name
            ),
        )
    })?;

    let events: Vec<&ChangelogEvent> = stored
        .events
        .iter()
        .filter(|e| in_range(e, since, to))
        .collect();

    let total = events.len() as u64;
    let start = ((page - 1).saturating_mul(page_size)).min(total) as usize;
    let end = (start as u64 + page_size).min(total) as usize;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "p": page,
            "ps": page_size,
            "total": total,
            "events": &events[start..end],
        })),
    )
        .into_response())
}

/// Parse a `since`/`to` bound: a datetime, or a date meaning the start of
/// that day (or of the next day for an inclusive upper bound).
fn parse_bound(value: &str, end_of_day: bool) -> Result<DateTime<FixedOffset>, Response> {
    if let Some(datetime) = parse_sonar_date(value) {
        return Ok(datetime);
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|date| if end_of_day { date + Duration::days(1) } else { date })
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc().fixed_offset())
        .ok_or_else(|| {
            sonar_error(
                StatusCode::BAD_REQUEST,
                format!("'{value}' cannot be parsed as either a date or date+time"),
            )
        })
}

fn in_range(
    event: &ChangelogEvent,
    since: Option<DateTime<FixedOffset>>,
    to: Option<DateTime<FixedOffset>>,
) -> bool {
    match event.date {
        Some(date) => since.map_or(true, |s| date >= s) && to.map_or(true, |t| date < t),
        None => since.is_none() && to.is_none(),
    }
}
