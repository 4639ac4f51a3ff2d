use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::{Value, to_value};
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::Client;
use survey_domain::DomainResult;
use survey_domain::error::DomainError;
use survey_domain::ports::BoxFuture;
use survey_domain::ports::surveys::SurveyRepository;
use survey_domain::questions::{Question, QuestionDraft, validate_question};
use survey_domain::responses::SurveyResponse;
use survey_domain::surveys::Survey;
use survey_domain::token::SurveyToken;
use survey_domain::util::{format_ms_rfc3339, parse_rfc3339_ms};
use tokio::sync::RwLock;

use crate::db::{self, DbConfig};

const TOKEN_CONFLICTS_TOTAL: &str = "survey_store_token_conflicts_total";

const SURVEY_FIELDS: &str = "survey_id, token, title, questions, revision, \
     <string>created_at AS created_at, <string>updated_at AS updated_at";

fn register_token_conflict(backend: &'static str, token: &SurveyToken) {
    counter!(TOKEN_CONFLICTS_TOTAL, "backend" => backend).increment(1);
    tracing::warn!(backend, token = %token, "survey token already taken");
}

#[derive(Clone, Debug)]
struct StoredSurvey {
    survey: Survey,
    responses: Vec<SurveyResponse>,
}

/// Process-local store keyed by token. Every check-and-write happens under
/// the map's write lock, so revision guards and token uniqueness hold
/// without further coordination.
#[derive(Default)]
pub struct InMemorySurveyRepository {
    store: Arc<RwLock<HashMap<String, StoredSurvey>>>,
}

impl InMemorySurveyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SurveyRepository for InMemorySurveyRepository {
    fn create(&self, survey: &Survey) -> BoxFuture<'_, DomainResult<Survey>> {
        let survey = survey.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            if store.contains_key(survey.token.as_str()) {
                register_token_conflict("memory", &survey.token);
                return Err(DomainError::Conflict);
            }
            store.insert(
                survey.token.to_string(),
                StoredSurvey {
                    survey: survey.clone(),
                    responses: Vec::new(),
                },
            );
            Ok(survey)
        })
    }

    fn get_by_token(&self, token: &SurveyToken) -> BoxFuture<'_, DomainResult<Option<Survey>>> {
        let token = token.to_string();
        let store = self.store.clone();
        Box::pin(async move {
            let store = store.read().await;
            Ok(store.get(&token).map(|stored| stored.survey.clone()))
        })
    }

    fn update(
        &self,
        survey: &Survey,
        expected_revision: u64,
    ) -> BoxFuture<'_, DomainResult<Survey>> {
        let survey = survey.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            let stored = store
                .get_mut(survey.token.as_str())
                .ok_or(DomainError::NotFound)?;
            if stored.survey.revision != expected_revision {
                return Err(DomainError::Conflict);
            }
            stored.survey = survey.clone();
            Ok(survey)
        })
    }

    fn delete(&self, token: &SurveyToken) -> BoxFuture<'_, DomainResult<bool>> {
        let token = token.to_string();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            Ok(store.remove(&token).is_some())
        })
    }

    fn append_response(
        &self,
        token: &SurveyToken,
        expected_revision: u64,
        response: &SurveyResponse,
    ) -> BoxFuture<'_, DomainResult<()>> {
        let token = token.to_string();
        let response = response.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            let stored = store.get_mut(&token).ok_or(DomainError::NotFound)?;
            if stored.survey.revision != expected_revision {
                return Err(DomainError::Conflict);
            }
            stored.responses.push(response);
            Ok(())
        })
    }

    fn list_responses(
        &self,
        token: &SurveyToken,
    ) -> BoxFuture<'_, DomainResult<Option<Vec<SurveyResponse>>>> {
        let token = token.to_string();
        let store = self.store.clone();
        Box::pin(async move {
            let store = store.read().await;
            Ok(store.get(&token).map(|stored| stored.responses.clone()))
        })
    }
}

/// One record per survey in table `survey`, keyed by token, with responses
/// embedded as an array on the record.
#[derive(Clone)]
pub struct SurrealSurveyRepository {
    client: Arc<Surreal<Client>>,
}

impl SurrealSurveyRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }

    pub async fn new(db_config: &DbConfig) -> anyhow::Result<Self> {
        let client = db::connect(db_config).await?;
        let repository = Self::with_client(Arc::new(client));
        repository.define_schema().await?;
        Ok(repository)
    }

    /// Idempotent; safe to run on every start.
    pub async fn define_schema(&self) -> anyhow::Result<()> {
        self.client
            .query(
                "DEFINE TABLE IF NOT EXISTS survey SCHEMALESS; \
                 DEFINE INDEX IF NOT EXISTS survey_token_unique ON TABLE survey \
                    COLUMNS token UNIQUE;",
            )
            .await?
            .check()?;
        Ok(())
    }

    fn map_surreal_error(err: surrealdb::Error) -> DomainError {
        let error_message = err.to_string().to_lowercase();
        if error_message.contains("already exists")
            || error_message.contains("duplicate")
            || error_message.contains("unique")
            || error_message.contains("conflict")
        {
            return DomainError::Conflict;
        }
        DomainError::Store(format!("surreal query failed: {error_message}"))
    }

    fn invalid_result(err: surrealdb::Error) -> DomainError {
        DomainError::Store(format!("invalid query result: {err}"))
    }

    fn parse_datetime_ms(value: &str) -> DomainResult<i64> {
        parse_rfc3339_ms(value)
            .ok_or_else(|| DomainError::Store(format!("invalid survey datetime '{value}'")))
    }

    fn build_payload(survey: &Survey) -> SurrealSurveyCreateRow {
        SurrealSurveyCreateRow {
            survey_id: survey.survey_id.clone(),
            token: survey.token.clone(),
            title: survey.title.clone(),
            questions: survey
                .questions
                .iter()
                .map(SurrealQuestionRow::from)
                .collect(),
            revision: survey.revision,
            created_at: format_ms_rfc3339(survey.created_at_ms),
            updated_at: format_ms_rfc3339(survey.updated_at_ms),
        }
    }

    fn map_row(row: SurrealSurveyRow) -> DomainResult<Survey> {
        let questions = row
            .questions
            .into_iter()
            .enumerate()
            .map(|(index, question)| question.into_question(index))
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(Survey {
            survey_id: row.survey_id,
            token: row.token,
            title: row.title,
            questions,
            revision: row.revision,
            created_at_ms: Self::parse_datetime_ms(&row.created_at)?,
            updated_at_ms: Self::parse_datetime_ms(&row.updated_at)?,
        })
    }

    fn decode_rows(rows: Vec<Value>) -> DomainResult<Vec<Survey>> {
        rows.into_iter()
            .map(|row| {
                serde_json::from_value::<SurrealSurveyRow>(row)
                    .map_err(|err| DomainError::Store(format!("invalid survey row: {err}")))
                    .and_then(Self::map_row)
            })
            .collect()
    }

    /// Tells a failed revision guard apart from a missing record.
    fn guard_failure(existing: Vec<Value>) -> DomainError {
        if existing.is_empty() {
            DomainError::NotFound
        } else {
            DomainError::Conflict
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SurrealQuestionRow {
    text: String,
    format: String,
    #[serde(default)]
    options: Vec<String>,
}

impl From<&Question> for SurrealQuestionRow {
    fn from(question: &Question) -> Self {
        let draft = QuestionDraft::from(question);
        Self {
            text: draft.text,
            format: draft.format,
            options: draft.options,
        }
    }
}

impl SurrealQuestionRow {
    fn into_question(self, index: usize) -> DomainResult<Question> {
        let draft = QuestionDraft {
            text: self.text,
            format: self.format,
            options: self.options,
        };
        validate_question(index, &draft)
            .map_err(|err| DomainError::Store(format!("stored question is invalid: {err}")))
    }
}

#[derive(Debug, Serialize)]
struct SurrealSurveyCreateRow {
    survey_id: String,
    token: SurveyToken,
    title: String,
    questions: Vec<SurrealQuestionRow>,
    revision: u64,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct SurrealSurveyRow {
    survey_id: String,
    token: SurveyToken,
    title: String,
    questions: Vec<SurrealQuestionRow>,
    revision: u64,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SurrealResponseRow {
    respondent_name: String,
    answers: Vec<String>,
    submitted_at: String,
}

impl SurrealResponseRow {
    fn from_response(response: &SurveyResponse) -> Self {
        Self {
            respondent_name: response.respondent_name.clone(),
            answers: response.answers.clone(),
            submitted_at: format_ms_rfc3339(response.submitted_at_ms),
        }
    }

    fn into_response(self) -> DomainResult<SurveyResponse> {
        Ok(SurveyResponse {
            submitted_at_ms: SurrealSurveyRepository::parse_datetime_ms(&self.submitted_at)?,
            respondent_name: self.respondent_name,
            answers: self.answers,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SurrealResponsesRow {
    #[serde(default)]
    responses: Vec<SurrealResponseRow>,
}

impl SurveyRepository for SurrealSurveyRepository {
    fn create(&self, survey: &Survey) -> BoxFuture<'_, DomainResult<Survey>> {
        let payload = Self::build_payload(survey);
        let token = survey.token.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let payload = to_value(payload)
                .map_err(|err| DomainError::Store(format!("invalid payload: {err}")))?;
            let query = format!(
                "CREATE type::thing('survey', $token) SET \
                    survey_id = $payload.survey_id, \
                    token = $payload.token, \
                    title = $payload.title, \
                    questions = $payload.questions, \
                    revision = $payload.revision, \
                    responses = [], \
                    created_at = <datetime>$payload.created_at, \
                    updated_at = <datetime>$payload.updated_at; \
                 SELECT {SURVEY_FIELDS} FROM type::thing('survey', $token);"
            );
            let result = client
                .query(query)
                .bind(("token", token.to_string()))
                .bind(("payload", payload))
                .await
                .and_then(|response| response.check())
                .map_err(Self::map_surreal_error);
            let mut response = match result {
                Err(DomainError::Conflict) => {
                    register_token_conflict("surreal", &token);
                    return Err(DomainError::Conflict);
                }
                other => other?,
            };
            let rows: Vec<Value> = response.take(1).map_err(Self::invalid_result)?;
            Self::decode_rows(rows)?
                .pop()
                .ok_or_else(|| DomainError::Store("create returned no row".to_string()))
        })
    }

    fn get_by_token(&self, token: &SurveyToken) -> BoxFuture<'_, DomainResult<Option<Survey>>> {
        let token = token.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(format!(
                    "SELECT {SURVEY_FIELDS} FROM type::thing('survey', $token)"
                ))
                .bind(("token", token))
                .await
                .map_err(Self::map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(Self::invalid_result)?;
            Ok(Self::decode_rows(rows)?.pop())
        })
    }

    fn update(
        &self,
        survey: &Survey,
        expected_revision: u64,
    ) -> BoxFuture<'_, DomainResult<Survey>> {
        let payload = Self::build_payload(survey);
        let survey = survey.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let payload = to_value(payload)
                .map_err(|err| DomainError::Store(format!("invalid payload: {err}")))?;
            let mut response = client
                .query(
                    "UPDATE type::thing('survey', $token) SET \
                        title = $payload.title, \
                        questions = $payload.questions, \
                        revision = $payload.revision, \
                        updated_at = <datetime>$payload.updated_at \
                     WHERE revision = $expected_revision \
                     RETURN revision; \
                     SELECT revision FROM type::thing('survey', $token);",
                )
                .bind(("token", survey.token.to_string()))
                .bind(("payload", payload))
                .bind(("expected_revision", expected_revision))
                .await
                .and_then(|response| response.check())
                .map_err(Self::map_surreal_error)?;
            let updated: Vec<Value> = response.take(0).map_err(Self::invalid_result)?;
            if updated.is_empty() {
                let existing: Vec<Value> = response.take(1).map_err(Self::invalid_result)?;
                return Err(Self::guard_failure(existing));
            }
            Ok(survey)
        })
    }

    fn delete(&self, token: &SurveyToken) -> BoxFuture<'_, DomainResult<bool>> {
        let token = token.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(
                    "SELECT token FROM type::thing('survey', $token); \
                     DELETE type::thing('survey', $token);",
                )
                .bind(("token", token))
                .await
                .and_then(|response| response.check())
                .map_err(Self::map_surreal_error)?;
            let existing: Vec<Value> = response.take(0).map_err(Self::invalid_result)?;
            Ok(!existing.is_empty())
        })
    }

    fn append_response(
        &self,
        token: &SurveyToken,
        expected_revision: u64,
        response: &SurveyResponse,
    ) -> BoxFuture<'_, DomainResult<()>> {
        let token = token.to_string();
        let row = SurrealResponseRow::from_response(response);
        let client = self.client.clone();
        Box::pin(async move {
            let row = to_value(row)
                .map_err(|err| DomainError::Store(format!("invalid payload: {err}")))?;
            let mut response = client
                .query(
                    "UPDATE type::thing('survey', $token) SET responses += $response \
                     WHERE revision = $expected_revision \
                     RETURN revision; \
                     SELECT revision FROM type::thing('survey', $token);",
                )
                .bind(("token", token))
                .bind(("response", row))
                .bind(("expected_revision", expected_revision))
                .await
                .and_then(|response| response.check())
                .map_err(Self::map_surreal_error)?;
            let updated: Vec<Value> = response.take(0).map_err(Self::invalid_result)?;
            if updated.is_empty() {
                let existing: Vec<Value> = response.take(1).map_err(Self::invalid_result)?;
                return Err(Self::guard_failure(existing));
            }
            Ok(())
        })
    }

    fn list_responses(
        &self,
        token: &SurveyToken,
    ) -> BoxFuture<'_, DomainResult<Option<Vec<SurveyResponse>>>> {
        let token = token.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query("SELECT responses FROM type::thing('survey', $token)")
                .bind(("token", token))
                .await
                .map_err(Self::map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(Self::invalid_result)?;
            let Some(row) = rows.into_iter().next() else {
                return Ok(None);
            };
            let row = serde_json::from_value::<SurrealResponsesRow>(row)
                .map_err(|err| DomainError::Store(format!("invalid responses row: {err}")))?;
            let responses = row
                .responses
                .into_iter()
                .map(SurrealResponseRow::into_response)
                .collect::<DomainResult<Vec<_>>>()?;
            Ok(Some(responses))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_domain::questions::QuestionKind;

    fn token(raw: &str) -> SurveyToken {
        SurveyToken::parse(raw).expect("token")
    }

    fn sample_survey(raw: &str) -> Survey {
        Survey {
            survey_id: format!("survey-{raw}"),
            token: token(raw),
            title: "Sat Survey".to_string(),
            questions: vec![Question {
                text: "How was it?".to_string(),
                kind: QuestionKind::LikertScale {
                    options: vec!["Bad".to_string(), "OK".to_string(), "Great".to_string()],
                },
            }],
            revision: 1,
            created_at_ms: 1_739_750_400_000,
            updated_at_ms: 1_739_750_400_000,
        }
    }

    fn sample_response(name: &str) -> SurveyResponse {
        SurveyResponse {
            respondent_name: name.to_string(),
            answers: vec!["Great".to_string()],
            submitted_at_ms: 1_739_750_460_000,
        }
    }

    #[tokio::test]
    async fn in_memory_create_rejects_a_taken_token() {
        let repo = InMemorySurveyRepository::new();
        repo.create(&sample_survey("abcde")).await.expect("first create");

        let mut duplicate = sample_survey("abcde");
        duplicate.title = "Another Survey".to_string();
        let err = repo.create(&duplicate).await.expect_err("duplicate");
        assert!(matches!(err, DomainError::Conflict));

        let stored = repo
            .get_by_token(&token("abcde"))
            .await
            .expect("get")
            .expect("present");
        assert_eq!(stored.title, "Sat Survey");
    }

    #[tokio::test]
    async fn in_memory_update_checks_revision() {
        let repo = InMemorySurveyRepository::new();
        let survey = repo.create(&sample_survey("abcde")).await.expect("create");

        let mut next = survey.clone();
        next.title = "Renamed Survey".to_string();
        next.revision = 2;
        repo.update(&next, 1).await.expect("first update");

        let mut stale = survey.clone();
        stale.title = "Stale Survey".to_string();
        stale.revision = 2;
        let err = repo.update(&stale, 1).await.expect_err("stale");
        assert!(matches!(err, DomainError::Conflict));

        let stored = repo
            .get_by_token(&token("abcde"))
            .await
            .expect("get")
            .expect("present");
        assert_eq!(stored.title, "Renamed Survey");
        assert_eq!(stored.revision, 2);
    }

    #[tokio::test]
    async fn in_memory_update_of_missing_survey_is_not_found() {
        let repo = InMemorySurveyRepository::new();
        let err = repo
            .update(&sample_survey("zzzzz"), 1)
            .await
            .expect_err("missing");
        assert!(matches!(err, DomainError::NotFound));
    }

    #[tokio::test]
    async fn in_memory_responses_follow_the_survey_lifecycle() {
        let repo = InMemorySurveyRepository::new();
        repo.create(&sample_survey("abcde")).await.expect("create");

        let listed = repo.list_responses(&token("abcde")).await.expect("list");
        assert_eq!(listed, Some(vec![]));

        repo.append_response(&token("abcde"), 1, &sample_response("WAN Ho"))
            .await
            .expect("append");
        let err = repo
            .append_response(&token("abcde"), 7, &sample_response("Late Comer"))
            .await
            .expect_err("stale revision");
        assert!(matches!(err, DomainError::Conflict));

        let listed = repo.list_responses(&token("abcde")).await.expect("list");
        assert_eq!(listed, Some(vec![sample_response("WAN Ho")]));

        assert!(repo.delete(&token("abcde")).await.expect("delete"));
        assert!(!repo.delete(&token("abcde")).await.expect("second delete"));
        assert_eq!(
            repo.list_responses(&token("abcde")).await.expect("list"),
            None
        );
    }

    #[test]
    fn surreal_rows_decode_into_typed_questions() {
        let rows = vec![serde_json::json!({
            "survey_id": "survey-abcde",
            "token": "abcde",
            "title": "Sat Survey",
            "questions": [
                {
                    "text": "How was it?",
                    "format": "Likert Scale",
                    "options": ["Bad", "OK", "Great"]
                },
                { "text": "Anything else?", "format": "Textbox", "options": [] }
            ],
            "revision": 3,
            "created_at": "2025-02-17T00:00:00Z",
            "updated_at": "2025-02-17T00:01:00.250Z"
        })];

        let surveys = SurrealSurveyRepository::decode_rows(rows).expect("decode");
        assert_eq!(surveys.len(), 1);
        let survey = &surveys[0];
        assert_eq!(survey.revision, 3);
        assert_eq!(survey.questions[1].kind, QuestionKind::Textbox);
        assert_eq!(survey.updated_at_ms - survey.created_at_ms, 60_250);
    }

    #[test]
    fn surreal_rows_with_corrupt_questions_are_store_errors() {
        let rows = vec![serde_json::json!({
            "survey_id": "survey-abcde",
            "token": "abcde",
            "title": "Sat Survey",
            "questions": [{ "text": "How was it?", "format": "Dropdown", "options": [] }],
            "revision": 1,
            "created_at": "2025-02-17T00:00:00Z",
            "updated_at": "2025-02-17T00:00:00Z"
        })];

        let err = SurrealSurveyRepository::decode_rows(rows).expect_err("corrupt");
        assert!(matches!(err, DomainError::Store(_)));
    }

    #[test]
    fn surreal_rows_with_invalid_tokens_are_store_errors() {
        let rows = vec![serde_json::json!({
            "survey_id": "survey-abcde",
            "token": "ab/de",
            "title": "Sat Survey",
            "questions": [{ "text": "Anything else?", "format": "Textbox", "options": [] }],
            "revision": 1,
            "created_at": "2025-02-17T00:00:00Z",
            "updated_at": "2025-02-17T00:00:00Z"
        })];

        let err = SurrealSurveyRepository::decode_rows(rows).expect_err("bad token");
        assert!(
            matches!(err, DomainError::Store(message) if message.contains("invalid survey row"))
        );
    }

    #[test]
    fn guard_failure_distinguishes_missing_from_stale() {
        assert!(matches!(
            SurrealSurveyRepository::guard_failure(vec![]),
            DomainError::NotFound
        ));
        assert!(matches!(
            SurrealSurveyRepository::guard_failure(vec![serde_json::json!({ "revision": 4 })]),
            DomainError::Conflict
        ));
    }
}
