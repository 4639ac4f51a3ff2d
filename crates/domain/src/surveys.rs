use std::sync::Arc;
use std::time::Duration;

use crate::DomainResult;
use crate::error::DomainError;
use crate::mutation::{delete_at, edit_at};
use crate::ports::BoxFuture;
use crate::ports::surveys::SurveyRepository;
use crate::questions::{Question, QuestionDraft, validate_questions, validate_title};
use crate::responses::{ResponseSubmission, SurveyResponse, validate_response};
use crate::token::{RandomTokenIssuer, SurveyToken, TokenIssuer};
use crate::util::{now_ms, uuid_v7_without_dashes};

const INITIAL_REVISION: u64 = 1;

#[derive(Clone, Debug, PartialEq)]
pub struct Survey {
    pub survey_id: String,
    pub token: SurveyToken,
    pub title: String,
    pub questions: Vec<Question>,
    pub revision: u64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct SurveyServiceConfig {
    /// Deadline for every individual store call.
    pub store_timeout: Duration,
    /// How many fresh tokens to try before giving up on a create.
    pub token_max_attempts: usize,
}

impl Default for SurveyServiceConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            token_max_attempts: 16,
        }
    }
}

#[derive(Clone)]
pub struct SurveyService {
    repository: Arc<dyn SurveyRepository>,
    issuer: Arc<dyn TokenIssuer>,
    config: SurveyServiceConfig,
}

impl SurveyService {
    pub fn new(repository: Arc<dyn SurveyRepository>, config: SurveyServiceConfig) -> Self {
        Self {
            repository,
            issuer: Arc::new(RandomTokenIssuer),
            config,
        }
    }

    pub fn with_issuer(mut self, issuer: Arc<dyn TokenIssuer>) -> Self {
        self.issuer = issuer;
        self
    }

    /// Validates the survey, then inserts it under a freshly issued token.
    /// A token the store already holds is reported as `Conflict` and
    /// replaced by a new one.
    pub async fn create_survey(
        &self,
        title: String,
        drafts: Vec<QuestionDraft>,
    ) -> DomainResult<Survey> {
        validate_title(&title)?;
        let questions = validate_questions(&drafts)?;

        let now = now_ms();
        let survey_id = uuid_v7_without_dashes();
        for _ in 0..self.config.token_max_attempts {
            let survey = Survey {
                survey_id: survey_id.clone(),
                token: self.issuer.issue(),
                title: title.clone(),
                questions: questions.clone(),
                revision: INITIAL_REVISION,
                created_at_ms: now,
                updated_at_ms: now,
            };
            match self.bounded(self.repository.create(&survey)).await {
                Err(DomainError::Conflict) => continue,
                result => return result,
            }
        }

        Err(DomainError::Store(format!(
            "no unused token after {} attempts",
            self.config.token_max_attempts
        )))
    }

    pub async fn get_survey(&self, token: &SurveyToken) -> DomainResult<Survey> {
        self.load(token).await
    }

    pub async fn replace_survey(
        &self,
        token: &SurveyToken,
        title: String,
        drafts: Vec<QuestionDraft>,
    ) -> DomainResult<Survey> {
        let current = self.load(token).await?;
        validate_title(&title)?;
        let questions = validate_questions(&drafts)?;
        self.persist(current, title, questions).await
    }

    pub async fn edit_question(
        &self,
        token: &SurveyToken,
        number: usize,
        replacement: QuestionDraft,
    ) -> DomainResult<Survey> {
        let current = self.load(token).await?;
        let drafts = edit_at(drafts_of(&current), number, replacement)?;
        let questions = validate_questions(&drafts)?;
        let title = current.title.clone();
        self.persist(current, title, questions).await
    }

    /// Removing the last question fails validation with `EmptySurvey`.
    pub async fn delete_question(
        &self,
        token: &SurveyToken,
        number: usize,
    ) -> DomainResult<Survey> {
        let current = self.load(token).await?;
        let drafts = delete_at(drafts_of(&current), number)?;
        let questions = validate_questions(&drafts)?;
        let title = current.title.clone();
        self.persist(current, title, questions).await
    }

    pub async fn delete_survey(&self, token: &SurveyToken) -> DomainResult<()> {
        if self.bounded(self.repository.delete(token)).await? {
            Ok(())
        } else {
            Err(DomainError::NotFound)
        }
    }

    pub async fn submit_response(
        &self,
        token: &SurveyToken,
        submission: ResponseSubmission,
    ) -> DomainResult<SurveyResponse> {
        let current = self.load(token).await?;
        let response = SurveyResponse {
            respondent_name: submission.respondent_name,
            answers: submission.answers,
            submitted_at_ms: now_ms(),
        };
        validate_response(&response, &current.questions)?;
        self.bounded(
            self.repository
                .append_response(token, current.revision, &response),
        )
        .await?;
        Ok(response)
    }

    pub async fn list_responses(&self, token: &SurveyToken) -> DomainResult<Vec<SurveyResponse>> {
        let responses = self
            .bounded(self.repository.list_responses(token))
            .await?
            .ok_or(DomainError::NotFound)?;
        if responses.is_empty() {
            return Err(DomainError::EmptyResult);
        }
        Ok(responses)
    }

    async fn load(&self, token: &SurveyToken) -> DomainResult<Survey> {
        self.bounded(self.repository.get_by_token(token))
            .await?
            .ok_or(DomainError::NotFound)
    }

    async fn persist(
        &self,
        current: Survey,
        title: String,
        questions: Vec<Question>,
    ) -> DomainResult<Survey> {
        let expected_revision = current.revision;
        let updated = Survey {
            title,
            questions,
            revision: expected_revision + 1,
            updated_at_ms: now_ms(),
            ..current
        };
        self.bounded(self.repository.update(&updated, expected_revision))
            .await
    }

    async fn bounded<T>(&self, call: BoxFuture<'_, DomainResult<T>>) -> DomainResult<T> {
        tokio::time::timeout(self.config.store_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(DomainError::Store(format!(
                    "store call exceeded {}ms",
                    self.config.store_timeout.as_millis()
                )))
            })
    }
}

fn drafts_of(survey: &Survey) -> Vec<QuestionDraft> {
    survey.questions.iter().map(QuestionDraft::from).collect()
}
