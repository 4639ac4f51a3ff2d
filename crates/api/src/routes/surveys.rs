use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use survey_domain::mutation::parse_question_number;
use survey_domain::questions::{Question, QuestionDraft};
use survey_domain::responses::{ResponseSubmission, SurveyResponse};
use survey_domain::token::SurveyToken;
use survey_domain::util::format_ms_rfc3339;
use validator::Validate;

use super::{json_body, map_domain_error, parse_token};
use crate::{error::ApiError, state::AppState, validation};

#[derive(Debug, Deserialize, Serialize, Validate)]
pub(super) struct QuestionPayload {
    #[serde(default, alias = "text")]
    #[validate(length(max = 1024))]
    question: String,
    #[serde(default, alias = "question_format")]
    format: String,
    #[serde(default, alias = "specification")]
    #[validate(length(max = 50))]
    options: Vec<String>,
}

impl From<QuestionPayload> for QuestionDraft {
    fn from(payload: QuestionPayload) -> Self {
        Self {
            text: payload.question,
            format: payload.format,
            options: payload.options,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(super) struct SurveyPayload {
    #[serde(default)]
    #[validate(length(max = 256))]
    title: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    questions: Vec<QuestionPayload>,
}

impl SurveyPayload {
    fn into_parts(self) -> Result<(String, Vec<QuestionDraft>), ApiError> {
        validation::validate(&self)?;
        for question in &self.questions {
            validation::validate(question)?;
        }
        let drafts = self.questions.into_iter().map(QuestionDraft::from).collect();
        Ok((self.title, drafts))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(super) struct ResponsePayload {
    #[serde(default)]
    #[validate(length(max = 128))]
    name: String,
    #[serde(default, alias = "answer")]
    #[validate(length(max = 100))]
    answers: Vec<String>,
}

#[derive(Serialize)]
pub(super) struct MessageResponse {
    message: &'static str,
}

impl MessageResponse {
    fn new(message: &'static str) -> Json<Self> {
        Json(Self { message })
    }
}

#[derive(Serialize)]
pub(super) struct CreatedResponse {
    message: String,
    token: String,
}

#[derive(Serialize)]
struct QuestionView {
    question: String,
    format: &'static str,
    options: Vec<String>,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            question: question.text.clone(),
            format: question.kind.format().as_str(),
            options: question.kind.options().to_vec(),
        }
    }
}

#[derive(Serialize)]
pub(super) struct SurveyView {
    title: String,
    questions: Vec<QuestionView>,
}

#[derive(Serialize)]
struct ResponseView {
    respondent_name: String,
    answers: Vec<String>,
    submitted_at: String,
}

impl From<SurveyResponse> for ResponseView {
    fn from(response: SurveyResponse) -> Self {
        Self {
            submitted_at: format_ms_rfc3339(response.submitted_at_ms),
            respondent_name: response.respondent_name,
            answers: response.answers,
        }
    }
}

#[derive(Serialize)]
pub(super) struct ResponseListView {
    responses: Vec<ResponseView>,
}

/// Unknown surveys are reported before the request body is looked at.
async fn ensure_survey(state: &AppState, token: &SurveyToken) -> Result<(), ApiError> {
    state
        .surveys
        .get_survey(token)
        .await
        .map(|_| ())
        .map_err(map_domain_error)
}

pub(super) async fn create_survey(
    State(state): State<AppState>,
    payload: Result<Json<SurveyPayload>, JsonRejection>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let (title, drafts) = json_body(payload)?.into_parts()?;
    let survey = state
        .surveys
        .create_survey(title, drafts)
        .await
        .map_err(map_domain_error)?;
    tracing::info!(
        token = %survey.token,
        survey_id = %survey.survey_id,
        questions = survey.questions.len(),
        "survey created"
    );
    Ok(Json(CreatedResponse {
        message: format!(
            "Survey successfully created. The token of this survey is: {}",
            survey.token
        ),
        token: survey.token.to_string(),
    }))
}

pub(super) async fn get_survey(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<SurveyView>, ApiError> {
    let token = parse_token(&token)?;
    let survey = state
        .surveys
        .get_survey(&token)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(SurveyView {
        questions: survey.questions.iter().map(QuestionView::from).collect(),
        title: survey.title,
    }))
}

pub(super) async fn replace_survey(
    State(state): State<AppState>,
    Path(token): Path<String>,
    payload: Result<Json<SurveyPayload>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = parse_token(&token)?;
    ensure_survey(&state, &token).await?;
    let (title, drafts) = json_body(payload)?.into_parts()?;
    let survey = state
        .surveys
        .replace_survey(&token, title, drafts)
        .await
        .map_err(map_domain_error)?;
    tracing::info!(token = %token, revision = survey.revision, "survey replaced");
    Ok(MessageResponse::new("Survey successfully updated"))
}

pub(super) async fn edit_question(
    State(state): State<AppState>,
    Path((token, number)): Path<(String, String)>,
    payload: Result<Json<QuestionPayload>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = parse_token(&token)?;
    ensure_survey(&state, &token).await?;
    let payload = json_body(payload)?;
    validation::validate(&payload)?;
    let number = parse_question_number(&number);
    let survey = state
        .surveys
        .edit_question(&token, number, payload.into())
        .await
        .map_err(map_domain_error)?;
    tracing::info!(token = %token, number, revision = survey.revision, "question edited");
    Ok(MessageResponse::new("The survey question was successfully updated"))
}

pub(super) async fn delete_survey(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = parse_token(&token)?;
    state
        .surveys
        .delete_survey(&token)
        .await
        .map_err(map_domain_error)?;
    tracing::info!(token = %token, "survey deleted");
    Ok(MessageResponse::new("Survey successfully deleted"))
}

pub(super) async fn delete_question(
    State(state): State<AppState>,
    Path((token, number)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = parse_token(&token)?;
    let number = parse_question_number(&number);
    let survey = state
        .surveys
        .delete_question(&token, number)
        .await
        .map_err(map_domain_error)?;
    tracing::info!(
        token = %token,
        number,
        remaining = survey.questions.len(),
        "question deleted"
    );
    Ok(MessageResponse::new("The question was successfully deleted"))
}

pub(super) async fn submit_response(
    State(state): State<AppState>,
    Path(token): Path<String>,
    payload: Result<Json<ResponsePayload>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = parse_token(&token)?;
    ensure_survey(&state, &token).await?;
    let payload = json_body(payload)?;
    validation::validate(&payload)?;
    state
        .surveys
        .submit_response(
            &token,
            ResponseSubmission {
                respondent_name: payload.name,
                answers: payload.answers,
            },
        )
        .await
        .map_err(map_domain_error)?;
    tracing::info!(token = %token, "response submitted");
    Ok(MessageResponse::new("Response successfully submitted"))
}

pub(super) async fn list_responses(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ResponseListView>, ApiError> {
    let token = parse_token(&token)?;
    let responses = state
        .surveys
        .list_responses(&token)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(ResponseListView {
        responses: responses.into_iter().map(ResponseView::from).collect(),
    }))
}
