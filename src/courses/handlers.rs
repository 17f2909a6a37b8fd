use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{CourseListQuery, CourseResponse, CreateCourseRequest, PublishRequest};
use crate::{
    auth::extractors::Identity,
    error::{AppError, AppResult},
    payments::dto::round_money,
    state::AppState,
    store::{Course, NewCourse},
};

const TITLE_MAX: usize = 200;
const RECOMMENDATION_LIMIT: usize = 3;

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/api/courses", get(list_courses).post(create_course))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/api/courses/:id/publish", patch(set_published))
}

pub fn recommendation_routes() -> Router<AppState> {
    Router::new().route("/api/ai/recommendations", get(recommendations))
}

/// Published catalogue, or one instructor's courses. Drafts are only listed for
/// the instructor themself and admins.
#[instrument(skip(state), fields(user_id = %identity.user_id))]
pub async fn list_courses(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<CourseListQuery>,
) -> AppResult<Json<Vec<Course>>> {
    let courses = match query.instructor_id {
        Some(instructor_id) => {
            let all = state.store.list_courses_by_instructor(instructor_id).await?;
            if instructor_id == identity.user_id || identity.is_admin() {
                all
            } else {
                all.into_iter()
                    .filter(|c| c.is_published && !c.is_archived)
                    .collect()
            }
        }
        None => state.store.list_courses(true).await?,
    };
    Ok(Json(courses))
}

/// Published courses the caller does not own yet, in catalogue order, capped at three.
#[instrument(skip(state), fields(user_id = %identity.user_id))]
pub async fn recommendations(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<Vec<Course>>> {
    let user = state
        .store
        .get_user_by_id(identity.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;
    let picks: Vec<Course> = state
        .store
        .list_courses(true)
        .await?
        .into_iter()
        .filter(|c| !c.is_archived && !user.purchased_course_ids.contains(&c.id))
        .take(RECOMMENDATION_LIMIT)
        .collect();
    info!(count = picks.len(), "recommendations served");
    Ok(Json(picks))
}

#[instrument(skip(state, payload), fields(user_id = %identity.user_id))]
pub async fn create_course(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateCourseRequest>,
) -> AppResult<(StatusCode, Json<CourseResponse>)> {
    let title = payload.title.trim();
    if title.is_empty() || title.chars().count() > TITLE_MAX {
        return Err(AppError::validation("Title is required (up to 200 characters)"));
    }
    if payload.price < Decimal::ZERO {
        return Err(AppError::validation("Price cannot be negative"));
    }

    let course = state
        .store
        .create_course(NewCourse {
            title: title.to_string(),
            description: payload.description,
            price: round_money(payload.price),
            currency: payload
                .currency
                .unwrap_or_else(|| state.config.yookassa.currency.clone()),
            instructor_id: identity.user_id,
            is_published: false,
        })
        .await?;
    info!(course_id = %course.id, "course created");
    Ok((
        StatusCode::CREATED,
        Json(CourseResponse {
            success: true,
            course,
        }),
    ))
}

#[instrument(skip(state, payload), fields(user_id = %identity.user_id))]
pub async fn set_published(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<PublishRequest>,
) -> AppResult<Json<CourseResponse>> {
    let course = state
        .store
        .get_course_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Course not found"))?;
    if course.instructor_id != identity.user_id {
        return Err(AppError::forbidden("You can only publish your own courses"));
    }

    let course = state
        .store
        .set_course_published(id, payload.is_published)
        .await?
        .ok_or_else(|| AppError::not_found("Course not found"))?;
    info!(course_id = %course.id, published = course.is_published, "course visibility changed");
    Ok(Json(CourseResponse {
        success: true,
        course,
    }))
}
