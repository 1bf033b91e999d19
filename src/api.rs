// Trivia API - REST layer with Axum
//
// Handlers receive the question store through `AppState`; request bodies are
// deserialized into typed structs and validated once before any store call.

use crate::entities::{Category, NewQuestion, Question, QuestionPatch, ValidationError};
use crate::pagination::{paginate_questions, PaginationError};
use crate::quiz::{resolve_candidates, select_next, CategoryFilter};
use crate::store::QuestionStore;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use log::{debug, error, info};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn QuestionStore>,
}

impl AppState {
    pub fn new(store: impl QuestionStore + 'static) -> Self {
        AppState {
            store: Arc::new(store),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unprocessable: {0}")]
    Unprocessable(String),

    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "Bad request",
            ApiError::NotFound(_) => "Requested resource can not be found",
            ApiError::Unprocessable(_) => "Request can not be processed",
            ApiError::Internal(_) => "internal server error",
        }
    }
}

/// Store failures caused by invalid input are the client's fault
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<ValidationError>() {
            Some(reason) => ApiError::Unprocessable(reason.to_string()),
            None => ApiError::Internal(err),
        }
    }
}

impl From<PaginationError> for ApiError {
    fn from(err: PaginationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::NotFound(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: u16,
    message: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(_) => error!("{}", self),
            _ => debug!("{}", self),
        }

        let status = self.status();
        let body = ErrorBody {
            success: false,
            error: status.as_u16(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Request types
// ============================================================================

/// `?page=N` on the question listing
///
/// Absent or empty `page` means page 1.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

impl PageQuery {
    fn page(&self) -> ApiResult<usize> {
        let raw = match self.page.as_deref().map(str::trim) {
            None | Some("") => return Ok(1),
            Some(raw) => raw,
        };

        match raw.parse::<usize>() {
            Ok(page) if page >= 1 => Ok(page),
            _ => Err(ApiError::BadRequest(format!("invalid page {:?}", raw))),
        }
    }
}

/// Body of `POST /questions`: a search when `searchTerm` is non-empty,
/// otherwise a new question
#[derive(Debug, Default, Deserialize)]
pub struct QuestionsPostBody {
    #[serde(rename = "searchTerm", alias = "search_term", default)]
    pub search_term: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(default)]
    pub difficulty: Option<i64>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum QuestionsPost {
    Search(String),
    Create(NewQuestion),
}

impl QuestionsPostBody {
    pub fn into_request(self) -> ApiResult<QuestionsPost> {
        if let Some(term) = self.search_term.filter(|t| !t.is_empty()) {
            return Ok(QuestionsPost::Search(term));
        }

        match (self.question, self.answer, self.category, self.difficulty) {
            (Some(question), Some(answer), Some(category), Some(difficulty))
                if !question.is_empty() && !answer.is_empty() =>
            {
                Ok(QuestionsPost::Create(NewQuestion {
                    question,
                    answer,
                    category,
                    difficulty,
                }))
            }
            _ => Err(ApiError::BadRequest(
                "question, answer, category and difficulty are required".to_string(),
            )),
        }
    }
}

/// Body of `POST /quizzes`
#[derive(Debug, Default, Deserialize)]
pub struct QuizBody {
    #[serde(alias = "previousQuestions", default)]
    pub previous_questions: Option<Vec<i64>>,
    #[serde(alias = "quizCategory", default)]
    pub quiz_category: Option<QuizCategory>,
}

#[derive(Debug, Deserialize)]
pub struct QuizCategory {
    /// `0` selects every category
    #[serde(deserialize_with = "int_or_string")]
    pub id: i64,
    #[serde(rename = "type", default)]
    pub label: Option<String>,
}

/// Category ids arrive as numbers or numeric strings depending on the client
fn int_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(i64),
        Str(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Int(id) => Ok(id),
        Repr::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

pub struct QuizRequest {
    pub previous: HashSet<i64>,
    pub filter: CategoryFilter,
    /// Category label as the client named it, for logging
    pub label: Option<String>,
}

impl QuizBody {
    pub fn into_request(self) -> ApiResult<QuizRequest> {
        let (Some(previous), Some(category)) = (self.previous_questions, self.quiz_category) else {
            return Err(ApiError::BadRequest(
                "previous_questions and quiz_category are required".to_string(),
            ));
        };

        Ok(QuizRequest {
            previous: previous.into_iter().collect(),
            filter: CategoryFilter::from(category.id),
            label: category.label,
        })
    }
}

// ============================================================================
// Response types
// ============================================================================

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Serialize)]
struct CategoriesResponse {
    success: bool,
    categories: BTreeMap<i64, String>,
}

#[derive(Serialize)]
struct QuestionPageResponse {
    success: bool,
    questions: Vec<Question>,
    total_questions: usize,
    categories: BTreeMap<i64, String>,
    current_category: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse {
    success: bool,
    questions: Vec<Question>,
    total_questions: usize,
    current_category: Option<i64>,
}

#[derive(Serialize)]
struct CategoryQuestionsResponse {
    success: bool,
    questions: Vec<Question>,
    total_questions: usize,
    current_category: String,
}

#[derive(Serialize)]
struct QuestionResponse {
    success: bool,
    question: Question,
}

#[derive(Serialize)]
struct CreatedResponse {
    success: bool,
    created: i64,
    question: Question,
}

#[derive(Serialize)]
struct DeletedResponse {
    success: bool,
    deleted: i64,
}

#[derive(Serialize)]
struct QuizResponse {
    success: bool,
    /// `null` once every candidate has been served
    question: Option<Question>,
}

fn category_labels(categories: Vec<Category>) -> BTreeMap<i64, String> {
    categories
        .into_iter()
        .map(|c| (c.id, c.category_type))
        .collect()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /categories - All categories as `{id: type}`
async fn list_categories(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let categories = state.store.fetch_all_categories()?;

    Ok(Json(CategoriesResponse {
        success: true,
        categories: category_labels(categories),
    }))
}

/// GET /questions?page=N - One page of questions
async fn list_questions(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let page = query.page()?;

    let questions = state.store.fetch_all()?;
    let current = paginate_questions(&questions, page)?;
    if current.is_empty() {
        return Err(ApiError::NotFound(format!("page {} is empty", page)));
    }

    Ok(Json(QuestionPageResponse {
        success: true,
        questions: current.to_vec(),
        total_questions: questions.len(),
        categories: category_labels(state.store.fetch_all_categories()?),
        current_category: None,
    }))
}

/// GET /questions/:id - A single question
async fn get_question(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;

    let question = state
        .store
        .get_question(id)?
        .ok_or_else(|| ApiError::NotFound(format!("question {}", id)))?;

    Ok(Json(QuestionResponse {
        success: true,
        question,
    }))
}

/// PATCH /questions/:id - Partial update
async fn update_question(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<QuestionPatch>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let Json(patch) = body?;
    if patch.is_empty() {
        return Err(ApiError::BadRequest("no fields to update".to_string()));
    }

    let question = state
        .store
        .update_question(id, &patch)?
        .ok_or_else(|| ApiError::NotFound(format!("question {}", id)))?;

    info!("updated question {}", id);
    Ok(Json(QuestionResponse {
        success: true,
        question,
    }))
}

/// DELETE /questions/:id
async fn delete_question(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;

    if !state.store.delete_question(id)? {
        return Err(ApiError::NotFound(format!("question {}", id)));
    }

    info!("deleted question {}", id);
    Ok(Json(DeletedResponse {
        success: true,
        deleted: id,
    }))
}

/// POST /questions - Search by `searchTerm` or create a question
async fn post_questions(
    State(state): State<AppState>,
    body: Result<Json<QuestionsPostBody>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = body?;

    match body.into_request()? {
        QuestionsPost::Search(term) => {
            let questions = state.store.search_questions(&term)?;
            if questions.is_empty() {
                return Err(ApiError::NotFound(format!("no question matches {:?}", term)));
            }

            Ok(Json(SearchResponse {
                success: true,
                total_questions: questions.len(),
                current_category: questions.first().map(|q| q.category),
                questions,
            })
            .into_response())
        }
        QuestionsPost::Create(new_question) => {
            let question = state.store.insert_question(new_question)?;

            info!("created question {}", question.id);
            Ok((
                StatusCode::CREATED,
                Json(CreatedResponse {
                    success: true,
                    created: question.id,
                    question,
                }),
            )
                .into_response())
        }
    }
}

/// GET /categories/:id/questions - Every question in one category
async fn category_questions(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;

    let category = state
        .store
        .get_category(id)?
        .ok_or_else(|| ApiError::NotFound(format!("category {}", id)))?;
    let questions = state.store.fetch_by_category(id)?;

    Ok(Json(CategoryQuestionsResponse {
        success: true,
        total_questions: questions.len(),
        questions,
        current_category: category.category_type,
    }))
}

/// POST /quizzes - Next unseen question, or `null` when the quiz is over
async fn play_quiz(
    State(state): State<AppState>,
    body: Result<Json<QuizBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = body?;
    let request = body.into_request()?;

    if let CategoryFilter::Only(id) = request.filter {
        if state.store.get_category(id)?.is_none() {
            return Err(ApiError::NotFound(format!("category {}", id)));
        }
    }

    let candidates = resolve_candidates(state.store.as_ref(), request.filter)?;
    let draw = select_next(candidates, &request.previous);
    if draw.is_exhausted() {
        debug!(
            "quiz exhausted after {} questions ({:?} {})",
            request.previous.len(),
            request.filter,
            request.label.as_deref().unwrap_or("-")
        );
    }

    Ok(Json(QuizResponse {
        success: true,
        question: draw.into_question(),
    }))
}

/// Unmatched routes
async fn not_found() -> ApiError {
    ApiError::NotFound("no such route".to_string())
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .route("/categories", get(list_categories))
        .route("/categories/:id/questions", get(category_questions))
        .route("/questions", get(list_questions).post(post_questions))
        .route(
            "/questions/:id",
            get(get_question)
                .patch(update_question)
                .delete(delete_question),
        )
        .route("/quizzes", post(play_quiz))
        .nest("/api", api_routes)
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
