//! JSON handlers for the LMS endpoints

use super::auth::Authenticated;
use super::error::ApiResult;
use super::server::AppState;
use crate::analytics::{Achievements, CourseStats, InstructorDashboard, LeaderboardEntry};
use crate::auth::IssuedSession;
use crate::grading::CourseGrade;
use crate::services::{CourseOutline, QuizAttemptOutcome};
use crate::types::{
    CompletionOutcome, Course, CourseFilter, CourseId, CourseStatus, CourseUpdates,
    EnrollOutcome, Enrollment, Lesson, LessonContent, LessonId, Module, ModuleId, QuizAttempt,
    Role, Submission, SubmissionId, User, UserId,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

const DEFAULT_USER_PAGE: usize = 100;

// ---- request bodies ----

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CourseQuery {
    pub status: Option<CourseStatus>,
    pub instructor_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateLessonRequest {
    pub title: String,
    pub content: LessonContent,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    pub score: u32,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Deserialize)]
pub struct AttemptRequest {
    pub answers: Vec<usize>,
}

// ---- accounts ----

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.lms.register(&req.email, &req.name, &req.password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<IssuedSession>> {
    Ok(Json(state.lms.login(&req.email, &req.password).await?))
}

pub async fn logout(State(state): State<AppState>, auth: Authenticated) -> ApiResult<StatusCode> {
    state.lms.logout(&auth.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(auth: Authenticated) -> Json<User> {
    Json(auth.user)
}

pub async fn my_enrollments(
    State(state): State<AppState>,
    auth: Authenticated,
) -> ApiResult<Json<Vec<Enrollment>>> {
    Ok(Json(state.lms.my_enrollments(&auth.actor()).await?))
}

pub async fn my_achievements(
    State(state): State<AppState>,
    auth: Authenticated,
) -> ApiResult<Json<Achievements>> {
    let actor = auth.actor();
    Ok(Json(state.lms.achievements(&actor, actor.id).await?))
}

pub async fn list_users(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(q): Query<LimitQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let limit = q.limit.unwrap_or(DEFAULT_USER_PAGE);
    Ok(Json(state.lms.list_users(&auth.actor(), limit).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state
        .lms
        .create_user(&auth.actor(), &req.email, &req.name, &req.password, req.role)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.lms.get_user(&auth.actor(), user_id).await?))
}

pub async fn set_role(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(user_id): Path<UserId>,
    Json(req): Json<SetRoleRequest>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.lms.set_role(&auth.actor(), user_id, req.role).await?))
}

pub async fn user_achievements(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<Achievements>> {
    Ok(Json(state.lms.achievements(&auth.actor(), user_id).await?))
}

pub async fn instructor_dashboard(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<InstructorDashboard>> {
    Ok(Json(
        state
            .lms
            .instructor_dashboard(&auth.actor(), user_id)
            .await?,
    ))
}

// ---- catalog ----

pub async fn list_courses(
    State(state): State<AppState>,
    auth: Option<Authenticated>,
    Query(q): Query<CourseQuery>,
) -> ApiResult<Json<Vec<Course>>> {
    let actor = auth.map(|a| a.actor());
    let filter = CourseFilter {
        status: q.status,
        instructor_id: q.instructor_id,
    };
    Ok(Json(state.lms.list_courses(actor.as_ref(), &filter).await?))
}

pub async fn create_course(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(req): Json<CreateCourseRequest>,
) -> ApiResult<(StatusCode, Json<Course>)> {
    let course = state
        .lms
        .create_course(&auth.actor(), &req.title, &req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn get_course(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(course_id): Path<CourseId>,
) -> ApiResult<Json<Course>> {
    Ok(Json(state.lms.get_course(&auth.actor(), course_id).await?))
}

pub async fn update_course(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(course_id): Path<CourseId>,
    Json(updates): Json<CourseUpdates>,
) -> ApiResult<Json<Course>> {
    Ok(Json(
        state
            .lms
            .update_course(&auth.actor(), course_id, updates)
            .await?,
    ))
}

pub async fn delete_course(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(course_id): Path<CourseId>,
) -> ApiResult<StatusCode> {
    state.lms.delete_course(&auth.actor(), course_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn publish_course(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(course_id): Path<CourseId>,
) -> ApiResult<Json<Course>> {
    Ok(Json(state.lms.publish_course(&auth.actor(), course_id).await?))
}

pub async fn archive_course(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(course_id): Path<CourseId>,
) -> ApiResult<Json<Course>> {
    Ok(Json(state.lms.archive_course(&auth.actor(), course_id).await?))
}

pub async fn course_outline(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(course_id): Path<CourseId>,
) -> ApiResult<Json<CourseOutline>> {
    Ok(Json(state.lms.course_outline(&auth.actor(), course_id).await?))
}

pub async fn add_module(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(course_id): Path<CourseId>,
    Json(req): Json<TitleRequest>,
) -> ApiResult<(StatusCode, Json<Module>)> {
    let module = state
        .lms
        .add_module(&auth.actor(), course_id, &req.title)
        .await?;
    Ok((StatusCode::CREATED, Json(module)))
}

pub async fn delete_module(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(module_id): Path<ModuleId>,
) -> ApiResult<StatusCode> {
    state.lms.delete_module(&auth.actor(), module_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_lesson(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(module_id): Path<ModuleId>,
    Json(req): Json<CreateLessonRequest>,
) -> ApiResult<(StatusCode, Json<Lesson>)> {
    let lesson = state
        .lms
        .add_lesson(&auth.actor(), module_id, &req.title, req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

pub async fn get_lesson(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(lesson_id): Path<LessonId>,
) -> ApiResult<Json<Lesson>> {
    Ok(Json(state.lms.get_lesson(&auth.actor(), lesson_id).await?))
}

pub async fn delete_lesson(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(lesson_id): Path<LessonId>,
) -> ApiResult<StatusCode> {
    state.lms.delete_lesson(&auth.actor(), lesson_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- enrollment and progress ----

pub async fn enroll(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(course_id): Path<CourseId>,
) -> ApiResult<(StatusCode, Json<EnrollOutcome>)> {
    let outcome = state.lms.enroll(&auth.actor(), course_id).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

pub async fn unenroll_self(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(course_id): Path<CourseId>,
) -> ApiResult<StatusCode> {
    let actor = auth.actor();
    state.lms.unenroll(&actor, actor.id, course_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_enrollments(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(course_id): Path<CourseId>,
) -> ApiResult<Json<Vec<Enrollment>>> {
    Ok(Json(state.lms.list_enrollments(&auth.actor(), course_id).await?))
}

pub async fn get_enrollment(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((course_id, user_id)): Path<(CourseId, UserId)>,
) -> ApiResult<Json<Enrollment>> {
    Ok(Json(
        state
            .lms
            .get_enrollment(&auth.actor(), user_id, course_id)
            .await?,
    ))
}

pub async fn remove_enrollment(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((course_id, user_id)): Path<(CourseId, UserId)>,
) -> ApiResult<StatusCode> {
    state.lms.unenroll(&auth.actor(), user_id, course_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn complete_lesson(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(lesson_id): Path<LessonId>,
) -> ApiResult<Json<CompletionOutcome>> {
    Ok(Json(state.lms.complete_lesson(&auth.actor(), lesson_id).await?))
}

// ---- grading ----

pub async fn submit_assignment(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(lesson_id): Path<LessonId>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<(StatusCode, Json<Submission>)> {
    let submission = state
        .lms
        .submit_assignment(&auth.actor(), lesson_id, &req.body)
        .await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

pub async fn lesson_submissions(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(lesson_id): Path<LessonId>,
) -> ApiResult<Json<Vec<Submission>>> {
    Ok(Json(
        state
            .lms
            .lesson_submissions(&auth.actor(), lesson_id)
            .await?,
    ))
}

pub async fn user_submissions(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((course_id, user_id)): Path<(CourseId, UserId)>,
) -> ApiResult<Json<Vec<Submission>>> {
    Ok(Json(
        state
            .lms
            .user_submissions(&auth.actor(), user_id, course_id)
            .await?,
    ))
}

pub async fn grade_submission(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(submission_id): Path<SubmissionId>,
    Json(req): Json<GradeRequest>,
) -> ApiResult<Json<Submission>> {
    Ok(Json(
        state
            .lms
            .grade_submission(&auth.actor(), submission_id, req.score, &req.feedback)
            .await?,
    ))
}

pub async fn attempt_quiz(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(lesson_id): Path<LessonId>,
    Json(req): Json<AttemptRequest>,
) -> ApiResult<(StatusCode, Json<QuizAttemptOutcome>)> {
    let outcome = state
        .lms
        .attempt_quiz(&auth.actor(), lesson_id, req.answers)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn quiz_attempts(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(lesson_id): Path<LessonId>,
) -> ApiResult<Json<Vec<QuizAttempt>>> {
    Ok(Json(state.lms.quiz_attempts(&auth.actor(), lesson_id).await?))
}

pub async fn course_grade(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((course_id, user_id)): Path<(CourseId, UserId)>,
) -> ApiResult<Json<Option<CourseGrade>>> {
    Ok(Json(
        state
            .lms
            .course_grade(&auth.actor(), user_id, course_id)
            .await?,
    ))
}

// ---- analytics ----

pub async fn course_stats(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(course_id): Path<CourseId>,
) -> ApiResult<Json<CourseStats>> {
    Ok(Json(state.lms.course_stats(&auth.actor(), course_id).await?))
}

pub async fn leaderboard(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(course_id): Path<CourseId>,
    Query(q): Query<LimitQuery>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    Ok(Json(
        state
            .lms
            .leaderboard(&auth.actor(), course_id, q.limit)
            .await?,
    ))
}
