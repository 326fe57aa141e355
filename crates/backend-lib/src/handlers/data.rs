// ============================
// crates/backend-lib/src/handlers/data.rs
// ============================
//! Read-only views over the user's platforms.
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use taskcollect_common::{Class, Event, Lesson, Message, Report, Resource, Task, User};

use crate::error::AppError;
use crate::middleware::CurrentSession;
use crate::AppState;

type ApiResult<T> = Result<Json<T>, AppError>;

/// Summary of the logged-in user
#[derive(Debug, Serialize)]
pub struct Home {
    pub school: String,
    pub name: String,
    pub timezone: String,
    pub platforms: Vec<String>,
}

impl From<&User> for Home {
    fn from(user: &User) -> Self {
        let mut platforms: Vec<String> = user.site_tokens.keys().cloned().collect();
        platforms.sort();
        Self {
            school: user.school.clone(),
            name: user.disp_name.clone(),
            timezone: user.timezone.clone(),
            platforms,
        }
    }
}

pub async fn home(Extension(session): Extension<CurrentSession>) -> Json<Home> {
    Json(Home::from(&session.user))
}

pub async fn classes(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> ApiResult<Vec<Class>> {
    Ok(Json(state.orchestrator.classes(&session.user).await?))
}

/// Active tasks
pub async fn due_tasks(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> ApiResult<Vec<Task>> {
    Ok(Json(state.orchestrator.due_tasks(&session.user).await?))
}

/// Tasks of every class
pub async fn class_tasks(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> ApiResult<Vec<Task>> {
    Ok(Json(state.orchestrator.class_tasks(&session.user).await?))
}

pub async fn grades(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> ApiResult<Vec<Task>> {
    Ok(Json(state.orchestrator.graded(&session.user).await?))
}

pub async fn resources(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> ApiResult<Vec<Resource>> {
    Ok(Json(state.orchestrator.resources(&session.user).await?))
}

pub async fn resource(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path((platform, id)): Path<(String, String)>,
) -> ApiResult<Resource> {
    Ok(Json(state.orchestrator.resource(&session.user, &platform, &id).await?))
}

pub async fn task(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path((platform, id)): Path<(String, String)>,
) -> ApiResult<Task> {
    Ok(Json(state.orchestrator.task(&session.user, &platform, &id).await?))
}

/// Bounds of `GET /timetable`, RFC 3339
#[derive(Debug, Default, Deserialize)]
pub struct TimetableQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Monday 00:00 UTC of the week containing `now`, and a week later
fn current_week(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let monday = now.date_naive() - Duration::days(i64::from(now.weekday().num_days_from_monday()));
    let start = Utc.from_utc_datetime(&monday.and_time(NaiveTime::MIN));
    (start, start + Duration::weeks(1))
}

pub async fn timetable(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<TimetableQuery>,
) -> ApiResult<Vec<Lesson>> {
    let (week_start, week_end) = current_week(Utc::now());
    let start = query.start.unwrap_or(week_start);
    let end = query.end.unwrap_or_else(|| start + (week_end - week_start));
    Ok(Json(state.orchestrator.lessons(&session.user, start, end).await?))
}

pub async fn events(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> ApiResult<Vec<Event>> {
    Ok(Json(state.orchestrator.events(&session.user).await?))
}

pub async fn messages(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> ApiResult<Vec<Message>> {
    Ok(Json(state.orchestrator.messages(&session.user).await?))
}

pub async fn reports(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> ApiResult<Vec<Report>> {
    Ok(Json(state.orchestrator.reports(&session.user).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_week() {
        let sunday = Utc.with_ymd_and_hms(2024, 5, 19, 23, 0, 0).unwrap();
        let (start, end) = current_week(sunday);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 5, 13, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap());
    }
}
